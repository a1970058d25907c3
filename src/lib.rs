// Library interface for wordfinder
// This allows integration tests to access internal modules

pub mod cli;
pub mod config;
pub mod criteria;
pub mod dictionary;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod repl;
pub mod server;
pub mod service;
pub mod session;

// Re-export commonly used items for easier testing
pub use config::SearchConfig;
pub use criteria::{Language, PatternSymbol, SearchCriteria, SearchRequest};
pub use dictionary::{
    Dictionary, DictionaryStore, load_dictionary_from_file, parse_dictionary, write_words,
};
pub use error::SearchError;
pub use matcher::{compute_matches, matches};
pub use repl::finder_loop;
pub use service::SearchService;
pub use session::{SearchPage, SessionManager, SessionState, SessionToken};
