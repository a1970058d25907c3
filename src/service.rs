//! Request façade over the dictionary store, matcher and session table.
//!
//! A request without a session token is a new search: its criteria are validated
//! before any dictionary or session work happens. A request with a token is a
//! continuation: criteria sent alongside it are ignored, the ones stored at session
//! creation apply.

use crate::config::SearchConfig;
use crate::criteria::{Language, SearchCriteria, SearchRequest};
use crate::debug_log;
use crate::dictionary::DictionaryStore;
use crate::error::{Result, SearchError};
use crate::matcher::compute_matches;
use crate::session::{SearchPage, SessionManager, SessionToken};

#[derive(Debug)]
pub struct SearchService {
    dictionaries: DictionaryStore,
    sessions: SessionManager,
}

impl SearchService {
    pub fn new(dictionaries: DictionaryStore, config: SearchConfig) -> Self {
        Self {
            dictionaries,
            sessions: SessionManager::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        self.sessions.config()
    }

    /// Start or continue a search depending on whether `token` is present.
    ///
    /// Blank tokens count as absent.
    pub fn search(&self, request: Option<&SearchRequest>, token: Option<&str>) -> Result<SearchPage> {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => {
                if request.is_some() {
                    debug_log!("Continuation for {}, ignoring resent criteria", token);
                }
                self.next_page(token)
            }
            None => {
                let request =
                    request.ok_or_else(|| SearchError::invalid("missing search criteria"))?;
                self.start(request)
            }
        }
    }

    /// New session for `request`; returns its first page.
    pub fn start(&self, request: &SearchRequest) -> Result<SearchPage> {
        let criteria = request.validate()?;
        let dictionary = self.dictionaries.load(criteria.language())?;
        Ok(self.sessions.create(criteria, &dictionary))
    }

    pub fn next_page(&self, token: &str) -> Result<SearchPage> {
        let token = SessionToken::parse(token)?;
        self.sessions.resume(&token)
    }

    /// Every match for `request` at once, without creating a session.
    pub fn all_matches(&self, request: &SearchRequest) -> Result<Vec<String>> {
        let criteria = request.validate()?;
        let dictionary = self.dictionaries.load(criteria.language())?;
        Ok(compute_matches(&criteria, &dictionary))
    }

    pub fn session_criteria(&self, token: &str) -> Result<SearchCriteria> {
        let token = SessionToken::parse(token)?;
        self.sessions.criteria(&token)
    }

    pub fn end_session(&self, token: &str) -> Result<()> {
        let parsed = SessionToken::parse(token)?;
        if self.sessions.end(&parsed) {
            Ok(())
        } else {
            Err(SearchError::SessionNotFound(token.to_string()))
        }
    }

    pub fn sweep_expired(&self) -> usize {
        self.sessions.sweep_expired()
    }

    #[must_use]
    pub fn available_languages(&self) -> Vec<Language> {
        self.dictionaries.available_languages()
    }

    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }
}
