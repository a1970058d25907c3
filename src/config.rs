use chrono::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_SESSION_IDLE_SECS: i64 = 15 * 60;
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Service-side tunables. Clients cannot change any of these per request.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Words per page, at least 1.
    pub page_size: usize,
    /// Sessions idle longer than this are expired.
    pub idle_timeout: Duration,
    /// Creating a session beyond this evicts the least recently used one.
    pub max_sessions: usize,
    /// How often the server sweeps expired sessions.
    pub sweep_interval: std::time::Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            idle_timeout: Duration::seconds(DEFAULT_SESSION_IDLE_SECS),
            max_sessions: DEFAULT_MAX_SESSIONS,
            sweep_interval: std::time::Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    #[must_use]
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    #[must_use]
    pub fn with_sweep_interval(mut self, sweep_interval: std::time::Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }
}
