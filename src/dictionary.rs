//! Per-language word dictionaries.
//!
//! A dictionary file is a newline-delimited word list named `<code>.txt` inside the
//! dictionary directory. Words are trimmed and folded to uppercase; lines holding
//! anything but letters are skipped, and duplicates keep their first position.
//!
//! [`DictionaryStore`] loads each language at most once per process. Loading is
//! single-flight: concurrent first requests for a language wait on the same slot and
//! share the loaded `Arc<Dictionary>`. Failed loads leave the slot empty, so other
//! languages stay servable and a repaired file is picked up on the next request.

use crate::criteria::{Language, fold_letter};
use crate::error::{Result, SearchError};
use crate::{debug_log, info_log};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

const DICTIONARY_EXTENSION: &str = "txt";

/// Immutable word list for one language, indexed by word length.
#[derive(Debug)]
pub struct Dictionary {
    language: Language,
    by_length: HashMap<usize, Vec<String>>,
    word_count: usize,
}

impl Dictionary {
    pub fn from_words<I, S>(language: Language, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut by_length: HashMap<usize, Vec<String>> = HashMap::new();
        for word in words.into_iter().filter_map(|w| normalize_word(w.as_ref())) {
            if seen.insert(word.clone()) {
                by_length.entry(word.chars().count()).or_default().push(word);
            }
        }
        Self {
            language,
            by_length,
            word_count: seen.len(),
        }
    }

    #[must_use]
    pub fn language(&self) -> &Language {
        &self.language
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.word_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }

    /// Words with exactly `length` characters, in file order.
    ///
    /// The iterator is `Clone`, so a caller can restart it without touching the
    /// dictionary again.
    pub fn words_of_length(&self, length: usize) -> impl Iterator<Item = &str> + Clone + '_ {
        self.by_length
            .get(&length)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(String::as_str)
    }
}

/// Trim and uppercase a raw line; `None` if it is empty or holds non-letters.
#[must_use]
pub fn normalize_word(raw: &str) -> Option<String> {
    let word = raw.trim();
    if word.is_empty() || !word.chars().all(char::is_alphabetic) {
        return None;
    }
    Some(word.chars().map(fold_letter).collect())
}

pub fn parse_dictionary(language: Language, data: &str) -> Dictionary {
    Dictionary::from_words(language, data.lines())
}

pub fn load_dictionary_from_file<P: AsRef<Path>>(language: Language, path: P) -> io::Result<Dictionary> {
    let data = fs::read_to_string(path)?;
    let dictionary = parse_dictionary(language, &data);
    if dictionary.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "dictionary contains no valid words",
        ));
    }
    Ok(dictionary)
}

/// Write words one per line, as the dictionary loader reads them.
pub fn write_words<P: AsRef<Path>>(path: P, words: &[String]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for word in words {
        writeln!(writer, "{word}")?;
    }
    writer.flush()
}

const LOCAL_DICTIONARY_DIR: &str = "dictionaries";

/// `<data dir>/wordfinder/dictionaries` when it exists, otherwise `./dictionaries`
/// next to a checkout.
#[must_use]
pub fn default_dictionary_dir() -> PathBuf {
    installed_or_local(dirs::data_dir())
}

fn installed_or_local(data_dir: Option<PathBuf>) -> PathBuf {
    data_dir
        .map(|dir| dir.join("wordfinder").join("dictionaries"))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from(LOCAL_DICTIONARY_DIR))
}

#[derive(Debug)]
enum Source {
    Directory(PathBuf),
    Memory(HashMap<Language, String>),
}

type Slot = Arc<Mutex<Option<Arc<Dictionary>>>>;

/// Process-wide, lazily filled dictionary cache.
#[derive(Debug)]
pub struct DictionaryStore {
    source: Source,
    slots: Mutex<HashMap<Language, Slot>>,
}

impl DictionaryStore {
    pub fn from_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self::with_source(Source::Directory(dir.into()))
    }

    /// Store backed by `(code, word list)` pairs instead of files.
    ///
    /// Invalid codes are skipped.
    pub fn in_memory<I, C, D>(dictionaries: I) -> Self
    where
        I: IntoIterator<Item = (C, D)>,
        C: AsRef<str>,
        D: Into<String>,
    {
        let map = dictionaries
            .into_iter()
            .filter_map(|(code, data)| Language::parse(code.as_ref()).ok().map(|l| (l, data.into())))
            .collect();
        Self::with_source(Source::Memory(map))
    }

    fn with_source(source: Source) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Loaded dictionary for `language`, loading it on first use.
    pub fn load(&self, language: &Language) -> Result<Arc<Dictionary>> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(language.clone()).or_default())
        };

        // Holding the slot lock while loading makes concurrent callers wait here
        // and reuse the result instead of reading the file again.
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(dictionary) = guard.as_ref() {
            debug_log!("Dictionary cache hit for '{}'", language);
            return Ok(Arc::clone(dictionary));
        }

        let started = Instant::now();
        let dictionary = Arc::new(self.read_source(language)?);
        log::info!(
            "Loaded {} words for '{}' in {:?}",
            dictionary.len(),
            language,
            started.elapsed()
        );
        *guard = Some(Arc::clone(&dictionary));
        Ok(dictionary)
    }

    fn read_source(&self, language: &Language) -> Result<Dictionary> {
        match &self.source {
            Source::Memory(map) => map
                .get(language)
                .map(|data| parse_dictionary(language.clone(), data))
                .ok_or_else(|| SearchError::UnsupportedLanguage(language.to_string())),
            Source::Directory(dir) => {
                let path = dir
                    .join(language.code())
                    .with_extension(DICTIONARY_EXTENSION);
                if !path.is_file() {
                    info_log!("No dictionary file at {}", path.display());
                    return Err(SearchError::UnsupportedLanguage(language.to_string()));
                }
                load_dictionary_from_file(language.clone(), &path).map_err(|source| {
                    log::warn!("Dictionary {} failed to load: {}", path.display(), source);
                    SearchError::DictionaryLoad {
                        language: language.to_string(),
                        source,
                    }
                })
            }
        }
    }

    /// Languages this store can serve, sorted by code.
    #[must_use]
    pub fn available_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = match &self.source {
            Source::Memory(map) => map.keys().cloned().collect(),
            Source::Directory(dir) => fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .filter_map(|entry| entry.ok().map(|e| e.path()))
                        .filter(|path| {
                            path.extension().is_some_and(|ext| ext == DICTIONARY_EXTENSION)
                        })
                        .filter_map(|path| {
                            path.file_stem()
                                .and_then(|stem| stem.to_str())
                                .and_then(|stem| Language::parse(stem).ok())
                        })
                        .collect()
                })
                .unwrap_or_default(),
        };
        languages.sort();
        languages
    }
}
