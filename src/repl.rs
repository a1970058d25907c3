//! Interactive filtering shell.
//!
//! Criteria are built up one command at a time (`length`, `pattern`, `contains`,
//! `exclude`, `language`), then `search` opens a session on the service and `more`
//! pages through it. Changing any criterion ends the open session, since a
//! session's criteria never change after creation.

use crate::criteria::{SearchRequest, WILDCARD, parse_letters};
use crate::dictionary::write_words;
use crate::error::SearchError;
use crate::service::SearchService;
use crate::session::SearchPage;
use crate::{debug_log, info_log};
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Language(String),
    Length(String),
    Exclude(String),
    Contains(String),
    Pattern(String),
    Search,
    More,
    List,
    Reset,
    Save(String),
    Help,
    Exit,
}

impl Command {
    /// Parse one input line. The command word is case-insensitive; arguments are
    /// kept as typed.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (word, arg) = match line.split_once(char::is_whitespace) {
            Some((word, arg)) => (word, arg.trim()),
            None => (line, ""),
        };
        let arg = arg.to_string();
        let with_arg = |build: fn(String) -> Self| (!arg.is_empty()).then(|| build(arg.clone()));

        match word.to_lowercase().as_str() {
            "language" => with_arg(Self::Language),
            "length" => with_arg(Self::Length),
            "exclude" => with_arg(Self::Exclude),
            "contains" | "include" => with_arg(Self::Contains),
            "pattern" => with_arg(Self::Pattern),
            "save" => with_arg(Self::Save),
            "search" if arg.is_empty() => Some(Self::Search),
            "more" | "next" if arg.is_empty() => Some(Self::More),
            "list" if arg.is_empty() => Some(Self::List),
            "reset" if arg.is_empty() => Some(Self::Reset),
            "help" if arg.is_empty() => Some(Self::Help),
            "exit" | "quit" if arg.is_empty() => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Criteria being assembled in the shell. Unlike `SearchCriteria` this is mutable
/// and may be incomplete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriteriaDraft {
    pub language: String,
    pub length: i64,
    pub pattern: Option<String>,
    pub included: BTreeSet<char>,
    pub excluded: BTreeSet<char>,
}

impl CriteriaDraft {
    #[must_use]
    pub fn new(language: &str, length: i64) -> Self {
        Self {
            language: language.to_string(),
            length,
            pattern: None,
            included: BTreeSet::new(),
            excluded: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn to_request(&self) -> SearchRequest {
        SearchRequest {
            language: self.language.clone(),
            length: self.length,
            include: self.included.iter().collect(),
            exclude: self.excluded.iter().collect(),
            pattern: self.pattern.clone(),
        }
    }

    #[must_use]
    pub fn pattern_display(&self) -> String {
        self.pattern.clone().unwrap_or_else(|| {
            let width = usize::try_from(self.length).unwrap_or(0);
            WILDCARD.to_string().repeat(width)
        })
    }
}

/// Terminal side of the shell, so the loop can run against scripted input in tests.
pub trait FinderInterface {
    /// `None` when the line was not a command; the interface reports that itself.
    fn read_command(&mut self) -> Option<Command>;
    fn display_criteria(&mut self, draft: &CriteriaDraft);
    fn display_page(&mut self, page: &SearchPage);
    fn display_message(&mut self, message: &str);
    fn display_error(&mut self, error: &SearchError);
    fn display_help(&mut self);
}

struct Shell<'a> {
    service: &'a SearchService,
    defaults: CriteriaDraft,
    draft: CriteriaDraft,
    session: Option<String>,
}

enum Flow {
    Continue,
    Exit,
}

/// Run the shell until `exit` or end of input.
pub fn finder_loop<I: FinderInterface>(
    service: &SearchService,
    language: &str,
    length: i64,
    interface: &mut I,
) {
    let defaults = CriteriaDraft::new(language, length);
    let mut shell = Shell {
        service,
        draft: defaults.clone(),
        defaults,
        session: None,
    };
    info_log!("Shell started for '{}' length {}", language, length);
    interface.display_criteria(&shell.draft);

    loop {
        let Some(command) = interface.read_command() else {
            continue;
        };
        debug_log!("Shell command {:?}", command);
        if let Flow::Exit = shell.apply(command, interface) {
            break;
        }
    }
    shell.end_session();
}

impl Shell<'_> {
    fn apply<I: FinderInterface>(&mut self, command: Command, interface: &mut I) -> Flow {
        match command {
            Command::Language(code) => {
                self.end_session();
                self.draft.language = code;
                interface.display_criteria(&self.draft);
            }
            Command::Length(text) => match text.parse::<i64>() {
                Ok(length) => {
                    self.end_session();
                    self.draft.length = length;
                    if self
                        .draft
                        .pattern
                        .as_ref()
                        .is_some_and(|p| p.chars().count() as i64 != length)
                    {
                        self.draft.pattern = None;
                        interface.display_message("Pattern cleared to match the new length.");
                    }
                    interface.display_criteria(&self.draft);
                }
                Err(_) => interface.display_message("Error: Length must be a number."),
            },
            Command::Exclude(text) => self.update_letters(&text, false, interface),
            Command::Contains(text) => self.update_letters(&text, true, interface),
            Command::Pattern(pattern) => {
                self.end_session();
                self.draft.length = pattern.chars().count() as i64;
                self.draft.pattern = Some(pattern);
                interface.display_criteria(&self.draft);
            }
            Command::Search => {
                self.end_session();
                match self.service.start(&self.draft.to_request()) {
                    Ok(page) => {
                        self.session = Some(page.session.to_string());
                        interface.display_page(&page);
                    }
                    Err(e) => interface.display_error(&e),
                }
            }
            Command::More => self.more(interface),
            Command::List => interface.display_criteria(&self.draft),
            Command::Reset => {
                self.end_session();
                self.draft = self.defaults.clone();
                interface.display_message("Criteria reset.");
                interface.display_criteria(&self.draft);
            }
            Command::Save(path) => match self.service.all_matches(&self.draft.to_request()) {
                Ok(words) => match write_words(PathBuf::from(&path), &words) {
                    Ok(()) => interface.display_message(&format!("Saved {} words to {path}.", words.len())),
                    Err(e) => interface.display_message(&format!("Error: could not write {path}: {e}")),
                },
                Err(e) => interface.display_error(&e),
            },
            Command::Help => interface.display_help(),
            Command::Exit => {
                interface.display_message("Exiting program.");
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    fn update_letters<I: FinderInterface>(&mut self, text: &str, include: bool, interface: &mut I) {
        let letters = match parse_letters(text, if include { "contains" } else { "exclude" }) {
            Ok(letters) => letters,
            Err(e) => {
                interface.display_error(&e);
                return;
            }
        };

        let (target, other, verb, other_name) = if include {
            (&mut self.draft.included, &self.draft.excluded, "contain", "excluded")
        } else {
            (&mut self.draft.excluded, &self.draft.included, "exclude", "contained")
        };
        let conflicts: String = letters.intersection(other).collect();
        if !conflicts.is_empty() {
            interface.display_message(&format!(
                "Cannot {verb} letters {conflicts} as they are already in {other_name} letters."
            ));
            return;
        }
        target.extend(letters);
        self.end_session();
        interface.display_criteria(&self.draft);
    }

    fn more<I: FinderInterface>(&mut self, interface: &mut I) {
        let Some(token) = self.session.clone() else {
            interface.display_message("No active search. Type 'search' first.");
            return;
        };
        match self.service.next_page(&token) {
            Ok(page) => interface.display_page(&page),
            Err(e @ SearchError::SessionNotFound(_)) => {
                self.session = None;
                interface.display_error(&e);
                interface.display_message("The search expired. Type 'search' to start again.");
            }
            Err(e) => interface.display_error(&e),
        }
    }

    fn end_session(&mut self) {
        if let Some(token) = self.session.take() {
            // Already expired sessions are fine to ignore here.
            let _ = self.service.end_session(&token);
        }
    }
}
