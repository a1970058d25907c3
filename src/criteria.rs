//! Search criteria: the immutable value a search session is created from.
//!
//! Clients send a loose [`SearchRequest`] (strings as typed into the form). It only
//! becomes a [`SearchCriteria`] after validation, so every criteria value in the
//! system satisfies its invariants:
//!
//! - `length` is positive and at most [`MAX_WORD_LENGTH`]
//! - the pattern has exactly `length` symbols
//! - no letter is both included and excluded
//!
//! Letters are folded to uppercase one character at a time, the same folding the
//! dictionary applies to its words, so comparisons are case-insensitive.

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const WILDCARD: char = '?';
pub const MAX_WORD_LENGTH: usize = 64;

/// Uppercase a single character without changing the character count.
///
/// Characters whose uppercase form spans several characters (such as `ß`) are kept
/// as they are.
#[must_use]
pub fn fold_letter(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Dictionary language code, e.g. `en` or `nl`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    /// Accepts 2 to 8 ASCII letters in any case.
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim();
        if (2..=8).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_lowercase()))
        } else {
            Err(SearchError::UnsupportedLanguage(code.to_string()))
        }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl FromStr for Language {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSymbol {
    Letter(char),
    Wildcard,
}

impl PatternSymbol {
    fn from_char(c: char) -> Option<Self> {
        if c == WILDCARD {
            Some(Self::Wildcard)
        } else if c.is_alphabetic() {
            Some(Self::Letter(fold_letter(c)))
        } else {
            None
        }
    }

    #[must_use]
    pub fn to_char(self) -> char {
        match self {
            Self::Letter(c) => c,
            Self::Wildcard => WILDCARD,
        }
    }
}

/// Raw search input as sent by the client.
///
/// Field aliases accept both the short names (`include`) and the ones the browser
/// form posts (`included`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub language: String,
    pub length: i64,
    #[serde(default, alias = "included")]
    pub include: String,
    #[serde(default, alias = "excluded")]
    pub exclude: String,
    /// Omitted means all wildcards.
    #[serde(default)]
    pub pattern: Option<String>,
}

impl SearchRequest {
    pub fn validate(&self) -> Result<SearchCriteria> {
        SearchCriteria::new(
            &self.language,
            self.length,
            self.pattern.as_deref(),
            &self.include,
            &self.exclude,
        )
    }
}

/// Validated, frozen search criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    language: Language,
    length: usize,
    pattern: Vec<PatternSymbol>,
    included: BTreeSet<char>,
    excluded: BTreeSet<char>,
}

impl SearchCriteria {
    pub fn new(
        language: &str,
        length: i64,
        pattern: Option<&str>,
        include: &str,
        exclude: &str,
    ) -> Result<Self> {
        let length = match usize::try_from(length) {
            Ok(n) if (1..=MAX_WORD_LENGTH).contains(&n) => n,
            _ => {
                return Err(SearchError::invalid(format!(
                    "length must be between 1 and {MAX_WORD_LENGTH}, got {length}"
                )));
            }
        };

        let pattern = match pattern {
            Some(text) => parse_pattern(text, length)?,
            None => vec![PatternSymbol::Wildcard; length],
        };
        let included = parse_letters(include, "include")?;
        let excluded = parse_letters(exclude, "exclude")?;

        let conflicts: String = included.intersection(&excluded).collect();
        if !conflicts.is_empty() {
            return Err(SearchError::invalid(format!(
                "letters '{conflicts}' are both included and excluded"
            )));
        }

        Ok(Self {
            language: Language::parse(language)?,
            length,
            pattern,
            included,
            excluded,
        })
    }

    #[must_use]
    pub fn language(&self) -> &Language {
        &self.language
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn pattern(&self) -> &[PatternSymbol] {
        &self.pattern
    }

    #[must_use]
    pub fn included(&self) -> &BTreeSet<char> {
        &self.included
    }

    #[must_use]
    pub fn excluded(&self) -> &BTreeSet<char> {
        &self.excluded
    }

    #[must_use]
    pub fn pattern_string(&self) -> String {
        self.pattern.iter().map(|s| s.to_char()).collect()
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let included: String = self.included.iter().collect();
        let excluded: String = self.excluded.iter().collect();
        write!(
            f,
            "{} len={} pattern={} include={} exclude={}",
            self.language,
            self.length,
            self.pattern_string(),
            included,
            excluded
        )
    }
}

fn parse_pattern(text: &str, length: usize) -> Result<Vec<PatternSymbol>> {
    let symbols = text
        .trim()
        .chars()
        .map(|c| {
            PatternSymbol::from_char(c).ok_or_else(|| {
                SearchError::invalid(format!(
                    "pattern may only contain letters and '{WILDCARD}', found '{c}'"
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if symbols.len() != length {
        return Err(SearchError::invalid(format!(
            "pattern has {} symbols but length is {length}",
            symbols.len()
        )));
    }
    Ok(symbols)
}

/// Whitespace and commas separate letters; anything else must be a letter.
pub(crate) fn parse_letters(text: &str, field: &str) -> Result<BTreeSet<char>> {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .map(|c| {
            if c.is_alphabetic() {
                Ok(fold_letter(c))
            } else {
                Err(SearchError::invalid(format!(
                    "{field} may only contain letters, found '{c}'"
                )))
            }
        })
        .collect()
}
