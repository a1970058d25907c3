//! Search sessions: a computed match list plus a delivery cursor, addressed by an
//! opaque token.
//!
//! # State Machine
//! - `Active`: cursor is before the end of the match list
//! - `Exhausted`: every match was delivered; further pages are empty
//! - expired: removed from the table by the idle sweep, an idle check on access,
//!   or capacity eviction. Any later lookup reports `SessionNotFound`.
//!
//! # Locking
//! The table is an `RwLock` over `token -> Arc<Mutex<SearchSession>>`. Lookups take
//! the read lock only long enough to clone the `Arc`; the page is then cut under the
//! per-session mutex, so two requests on one token get consecutive pages and
//! requests on different tokens never wait on each other. Code that needs both
//! locks takes the table lock first.

use crate::config::SearchConfig;
use crate::criteria::SearchCriteria;
use crate::dictionary::Dictionary;
use crate::error::{Result, SearchError};
use crate::matcher::compute_matches;
use crate::{debug_log, info_log};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Uuid);

impl SessionToken {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// A token that does not parse cannot name a live session.
    pub fn parse(text: &str) -> Result<Self> {
        Uuid::parse_str(text.trim())
            .map(Self)
            .map_err(|_| SearchError::SessionNotFound(text.to_string()))
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Exhausted,
}

/// One slice of a session's match list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    pub session: SessionToken,
    pub words: Vec<String>,
    /// Total matches in the session.
    pub total: usize,
    /// Matches delivered so far, including this page.
    pub delivered: usize,
    pub exhausted: bool,
}

#[derive(Debug)]
struct SearchSession {
    criteria: SearchCriteria,
    matches: Vec<String>,
    cursor: usize,
    created_at: DateTime<Utc>,
    last_access: DateTime<Utc>,
    evicted: bool,
}

impl SearchSession {
    fn state(&self) -> SessionState {
        if self.cursor >= self.matches.len() {
            SessionState::Exhausted
        } else {
            SessionState::Active
        }
    }

    fn is_idle(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        now.signed_duration_since(self.last_access) > timeout
    }

    fn next_page(&mut self, token: SessionToken, page_size: usize, now: DateTime<Utc>) -> SearchPage {
        let end = self.cursor.saturating_add(page_size).min(self.matches.len());
        let words = self.matches[self.cursor..end].to_vec();
        self.cursor = end;
        self.last_access = now;
        SearchPage {
            session: token,
            words,
            total: self.matches.len(),
            delivered: self.cursor,
            exhausted: self.state() == SessionState::Exhausted,
        }
    }
}

type SessionTable = HashMap<SessionToken, Arc<Mutex<SearchSession>>>;

/// Owns every live search session.
#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<SessionTable>,
    config: SearchConfig,
}

impl SessionManager {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Compute the matches once, store them under a fresh token and return the
    /// first page. `page.session` is the new token.
    pub fn create(&self, criteria: SearchCriteria, dictionary: &Dictionary) -> SearchPage {
        self.create_at(criteria, dictionary, Utc::now())
    }

    pub fn create_at(&self, criteria: SearchCriteria, dictionary: &Dictionary, now: DateTime<Utc>) -> SearchPage {
        let matches = compute_matches(&criteria, dictionary);
        let token = SessionToken::generate();
        let mut session = SearchSession {
            criteria,
            matches,
            cursor: 0,
            created_at: now,
            last_access: now,
            evicted: false,
        };
        let page = session.next_page(token, self.config.page_size, now);
        info_log!(
            "Session {} created with {} matches ({})",
            token,
            page.total,
            session.criteria
        );

        let mut sessions = self.write_table();
        if sessions.len() >= self.config.max_sessions {
            self.evict_for_capacity(&mut sessions, now);
        }
        sessions.insert(token, Arc::new(Mutex::new(session)));
        page
    }

    /// Next page of an existing session. Empty once exhausted.
    pub fn resume(&self, token: &SessionToken) -> Result<SearchPage> {
        self.resume_at(token, Utc::now())
    }

    pub fn resume_at(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<SearchPage> {
        let entry = self.live_entry(token, now)?;
        let mut session = entry.lock().unwrap_or_else(PoisonError::into_inner);
        // Ended or evicted between the lookup and the lock.
        if session.evicted {
            return Err(SearchError::SessionNotFound(token.to_string()));
        }

        let page = session.next_page(*token, self.config.page_size, now);
        debug_log!(
            "Session {} delivered {}/{} (created {})",
            token,
            page.delivered,
            page.total,
            session.created_at
        );
        Ok(page)
    }

    /// Drop a session explicitly. Returns whether it existed.
    pub fn end(&self, token: &SessionToken) -> bool {
        let removed = self.write_table().remove(token);
        match removed {
            Some(entry) => {
                entry.lock().unwrap_or_else(PoisonError::into_inner).evicted = true;
                true
            }
            None => false,
        }
    }

    /// Remove sessions idle longer than the configured timeout.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.write_table();
        let removed = Self::remove_idle(&mut sessions, now, self.config.idle_timeout);
        if removed > 0 {
            log::info!("Swept {} expired sessions, {} live", removed, sessions.len());
        }
        removed
    }

    /// State of a live session, `None` if the token is unknown or idle past the timeout.
    #[must_use]
    pub fn state(&self, token: &SessionToken) -> Option<SessionState> {
        self.state_at(token, Utc::now())
    }

    #[must_use]
    pub fn state_at(&self, token: &SessionToken, now: DateTime<Utc>) -> Option<SessionState> {
        let entry = self.live_entry(token, now).ok()?;
        let session = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Some(session.state())
    }

    /// Criteria the session was created with.
    pub fn criteria(&self, token: &SessionToken) -> Result<SearchCriteria> {
        self.criteria_at(token, Utc::now())
    }

    pub fn criteria_at(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<SearchCriteria> {
        let entry = self.live_entry(token, now)?;
        let session = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(session.criteria.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read_table().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a session that is neither removed nor idle. An idle session is
    /// expired here and removed from the table.
    fn live_entry(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<Arc<Mutex<SearchSession>>> {
        let entry = self
            .read_table()
            .get(token)
            .cloned()
            .ok_or_else(|| SearchError::SessionNotFound(token.to_string()))?;

        let mut session = entry.lock().unwrap_or_else(PoisonError::into_inner);
        if session.evicted {
            return Err(SearchError::SessionNotFound(token.to_string()));
        }
        if session.is_idle(now, self.config.idle_timeout) {
            session.evicted = true;
            drop(session);
            self.write_table().remove(token);
            debug_log!("Session {} expired on access", token);
            return Err(SearchError::SessionNotFound(token.to_string()));
        }
        drop(session);
        Ok(entry)
    }

    fn remove_idle(sessions: &mut SessionTable, now: DateTime<Utc>, timeout: chrono::Duration) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| {
            let mut session = entry.lock().unwrap_or_else(PoisonError::into_inner);
            if session.is_idle(now, timeout) {
                session.evicted = true;
                false
            } else {
                true
            }
        });
        before - sessions.len()
    }

    fn evict_for_capacity(&self, sessions: &mut SessionTable, now: DateTime<Utc>) {
        Self::remove_idle(sessions, now, self.config.idle_timeout);
        while sessions.len() >= self.config.max_sessions {
            let oldest = sessions
                .iter()
                .map(|(token, entry)| {
                    let session = entry.lock().unwrap_or_else(PoisonError::into_inner);
                    (*token, session.last_access)
                })
                .min_by_key(|(_, last_access)| *last_access)
                .map(|(token, _)| token);
            let Some(token) = oldest else { break };
            if let Some(entry) = sessions.remove(&token) {
                entry.lock().unwrap_or_else(PoisonError::into_inner).evicted = true;
                log::warn!("Session table full, evicted least recently used session {token}");
            }
        }
    }

    fn read_table(&self) -> std::sync::RwLockReadGuard<'_, SessionTable> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_table(&self) -> std::sync::RwLockWriteGuard<'_, SessionTable> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::Language;
    use crate::dictionary::parse_dictionary;
    use chrono::Duration;
    use std::collections::HashSet;
    use std::thread;

    fn numbered_dictionary(count: usize) -> Dictionary {
        // Five-letter words AAAAA, AAAAB, ... in a fixed order.
        let words: Vec<String> = (0..count)
            .map(|mut n| {
                let mut word = vec!['A'; 5];
                for slot in word.iter_mut().rev() {
                    *slot = (b'A' + (n % 26) as u8) as char;
                    n /= 26;
                }
                word.into_iter().collect()
            })
            .collect();
        Dictionary::from_words(Language::parse("en").unwrap(), words)
    }

    fn any_five() -> SearchCriteria {
        SearchCriteria::new("en", 5, None, "", "").unwrap()
    }

    fn manager() -> SessionManager {
        SessionManager::new(SearchConfig::default())
    }

    #[test]
    fn test_create_returns_first_page() {
        let manager = manager();
        let page = manager.create(any_five(), &numbered_dictionary(25));
        assert_eq!(page.words.len(), 10);
        assert_eq!(page.total, 25);
        assert_eq!(page.delivered, 10);
        assert!(!page.exhausted);
        assert_eq!(manager.state(&page.session), Some(SessionState::Active));
    }

    #[test]
    fn test_resume_continues_without_overlap() {
        let manager = manager();
        let first = manager.create(any_five(), &numbered_dictionary(25));
        let second = manager.resume(&first.session).unwrap();
        assert_eq!(second.session, first.session);
        assert_eq!(second.words.len(), 10);
        let a: HashSet<&String> = first.words.iter().collect();
        assert!(second.words.iter().all(|w| !a.contains(w)));

        let third = manager.resume(&first.session).unwrap();
        assert_eq!(third.words.len(), 5);
        assert!(third.exhausted);
    }

    #[test]
    fn test_pages_concatenate_to_full_match_list() {
        let dictionary = numbered_dictionary(37);
        let manager = manager();
        let mut page = manager.create(any_five(), &dictionary);
        let mut collected = page.words.clone();
        while !page.exhausted {
            page = manager.resume(&page.session).unwrap();
            collected.extend(page.words.iter().cloned());
        }
        assert_eq!(collected, compute_matches(&any_five(), &dictionary));
    }

    #[test]
    fn test_exhausted_session_keeps_returning_empty_pages() {
        let manager = manager();
        let first = manager.create(any_five(), &numbered_dictionary(3));
        assert!(first.exhausted);
        for _ in 0..3 {
            let page = manager.resume(&first.session).unwrap();
            assert!(page.words.is_empty());
            assert!(page.exhausted);
            assert_eq!(page.delivered, 3);
        }
        assert_eq!(manager.state(&first.session), Some(SessionState::Exhausted));
    }

    #[test]
    fn test_zero_match_session_is_valid() {
        let manager = manager();
        let criteria = SearchCriteria::new("en", 5, None, "z", "").unwrap();
        let page = manager.create(criteria, &numbered_dictionary(5));
        assert!(page.words.is_empty());
        assert_eq!(page.total, 0);
        assert!(manager.resume(&page.session).unwrap().words.is_empty());
    }

    #[test]
    fn test_unknown_token_not_found() {
        let manager = manager();
        let token = SessionToken::generate();
        assert!(matches!(
            manager.resume(&token),
            Err(SearchError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_malformed_token_not_found() {
        assert!(matches!(
            SessionToken::parse("not-a-token"),
            Err(SearchError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_idle_session_expires_on_access() {
        let manager = SessionManager::new(SearchConfig::default().with_idle_timeout(Duration::minutes(5)));
        let start = Utc::now();
        let page = manager.create_at(any_five(), &numbered_dictionary(30), start);

        assert!(manager.resume_at(&page.session, start + Duration::minutes(4)).is_ok());
        // Each access refreshes the idle clock.
        assert!(manager.resume_at(&page.session, start + Duration::minutes(8)).is_ok());
        let err = manager
            .resume_at(&page.session, start + Duration::minutes(14))
            .unwrap_err();
        assert!(matches!(err, SearchError::SessionNotFound(_)));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_idle_session_reports_no_state_or_criteria() {
        let manager = SessionManager::new(SearchConfig::default().with_idle_timeout(Duration::minutes(5)));
        let start = Utc::now();
        let page = manager.create_at(any_five(), &numbered_dictionary(30), start);

        assert_eq!(
            manager.state_at(&page.session, start + Duration::minutes(4)),
            Some(SessionState::Active)
        );
        // Lookups do not refresh the idle clock.
        assert_eq!(manager.state_at(&page.session, start + Duration::minutes(6)), None);
        assert!(matches!(
            manager.criteria_at(&page.session, start + Duration::minutes(6)),
            Err(SearchError::SessionNotFound(_))
        ));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_idle_sessions() {
        let manager = SessionManager::new(SearchConfig::default().with_idle_timeout(Duration::minutes(5)));
        let start = Utc::now();
        let old = manager.create_at(any_five(), &numbered_dictionary(5), start);
        let fresh = manager.create_at(any_five(), &numbered_dictionary(5), start + Duration::minutes(4));

        assert_eq!(manager.sweep_expired_at(start + Duration::minutes(6)), 1);
        assert_eq!(manager.len(), 1);
        assert!(manager.resume_at(&old.session, start + Duration::minutes(6)).is_err());
        assert!(manager.resume_at(&fresh.session, start + Duration::minutes(6)).is_ok());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let manager = SessionManager::new(SearchConfig::default().with_max_sessions(2));
        let start = Utc::now();
        let dictionary = numbered_dictionary(30);
        let a = manager.create_at(any_five(), &dictionary, start);
        let b = manager.create_at(any_five(), &dictionary, start + Duration::seconds(1));
        // Touch `a` so `b` becomes the least recently used.
        manager.resume_at(&a.session, start + Duration::seconds(2)).unwrap();
        let c = manager.create_at(any_five(), &dictionary, start + Duration::seconds(3));

        assert_eq!(manager.len(), 2);
        assert!(manager.state(&b.session).is_none());
        assert!(manager.state(&a.session).is_some());
        assert!(manager.state(&c.session).is_some());
    }

    #[test]
    fn test_criteria_fixed_at_creation() {
        let manager = manager();
        let criteria = SearchCriteria::new("en", 5, Some("A????"), "", "").unwrap();
        let page = manager.create(criteria.clone(), &numbered_dictionary(30));
        assert_eq!(manager.criteria(&page.session).unwrap(), criteria);
    }

    #[test]
    fn test_end_removes_session() {
        let manager = manager();
        let page = manager.create(any_five(), &numbered_dictionary(30));
        assert!(manager.end(&page.session));
        assert!(!manager.end(&page.session));
        assert!(manager.resume(&page.session).is_err());
    }

    #[test]
    fn test_concurrent_resume_never_duplicates() {
        let manager = Arc::new(SessionManager::new(SearchConfig::default().with_page_size(3)));
        let dictionary = numbered_dictionary(300);
        let first = manager.create(any_five(), &dictionary);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let token = first.session;
                thread::spawn(move || {
                    let mut words = Vec::new();
                    loop {
                        let page = manager.resume(&token).unwrap();
                        if page.words.is_empty() {
                            break words;
                        }
                        words.extend(page.words);
                    }
                })
            })
            .collect();

        let mut all: Vec<String> = first.words.clone();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(all.len(), 300);
        assert_eq!(unique.len(), 300);
    }
}
