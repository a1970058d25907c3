use std::io;
use thiserror::Error;

/// Everything a search request can fail with.
///
/// An empty match set is not an error; callers get an empty page instead.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed length, pattern or letters, or a letter both included and excluded.
    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    /// The token is unknown, expired or evicted. Clients start a new search.
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("failed to load dictionary for '{language}': {source}")]
    DictionaryLoad {
        language: String,
        #[source]
        source: io::Error,
    },
}

impl SearchError {
    /// Stable machine-readable code, used in HTTP error bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCriteria(_) => "invalid_criteria",
            Self::UnsupportedLanguage(_) => "unsupported_language",
            Self::SessionNotFound(_) => "session_not_found",
            Self::DictionaryLoad { .. } => "dictionary_load",
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidCriteria(message.into())
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            SearchError::invalid("bad"),
            SearchError::UnsupportedLanguage("xx".to_string()),
            SearchError::SessionNotFound("t".to_string()),
            SearchError::DictionaryLoad {
                language: "en".to_string(),
                source: io::Error::other("boom"),
            },
        ];
        let codes: std::collections::HashSet<&str> = errors.iter().map(SearchError::code).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_error_display() {
        let err = SearchError::invalid("letter 'A' is both included and excluded");
        assert_eq!(
            err.to_string(),
            "invalid criteria: letter 'A' is both included and excluded"
        );
        let err = SearchError::UnsupportedLanguage("xx".to_string());
        assert_eq!(err.to_string(), "unsupported language 'xx'");
    }
}
