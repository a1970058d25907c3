use crate::config::{
    DEFAULT_MAX_SESSIONS, DEFAULT_PAGE_SIZE, DEFAULT_SESSION_IDLE_SECS, DEFAULT_SWEEP_INTERVAL_SECS,
    SearchConfig,
};
use crate::criteria::SearchRequest;
use crate::dictionary::default_dictionary_dir;
use crate::error::SearchError;
use crate::repl::{Command, CriteriaDraft, FinderInterface};
use crate::session::SearchPage;
use clap::{Args, Parser, Subcommand};
use std::io::BufRead;
use std::net::SocketAddr;
use std::path::PathBuf;

const WORDS_PER_ROW: usize = 5;

/// Word Finder: search word lists by length, pattern and letters
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding `<language>.txt` word lists
    #[arg(short = 'd', long = "dictionaries", global = true)]
    pub dictionary_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// What to run; defaults to the interactive shell
    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Serve the search API over HTTP
    Serve(ServeArgs),
    /// Interactive filtering shell
    Repl(ReplArgs),
    /// Print every match for one set of criteria
    Search(SearchArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Words per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Seconds a session may stay idle before it expires
    #[arg(long, default_value_t = DEFAULT_SESSION_IDLE_SECS)]
    pub session_idle_secs: i64,

    /// Maximum number of live sessions
    #[arg(long, default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    /// Seconds between expired-session sweeps
    #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL_SECS)]
    pub sweep_interval_secs: u64,
}

#[derive(Args, Debug)]
pub struct ReplArgs {
    /// Initial language code
    #[arg(short = 'L', long, default_value = "en")]
    pub language: String,

    /// Initial word length
    #[arg(short, long, default_value_t = 5)]
    pub length: i64,

    /// Words shown per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

impl Default for ReplArgs {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            length: 5,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Language code
    #[arg(short = 'L', long, default_value = "en")]
    pub language: String,

    /// Word length
    #[arg(short, long)]
    pub length: i64,

    /// Letters and '?' wildcards, one per position
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Letters that must appear
    #[arg(short, long, default_value = "")]
    pub include: String,

    /// Letters that must not appear
    #[arg(short, long, default_value = "")]
    pub exclude: String,
}

impl Cli {
    #[must_use]
    pub fn dictionary_dir(&self) -> PathBuf {
        self.dictionary_dir
            .clone()
            .unwrap_or_else(default_dictionary_dir)
    }
}

impl ServeArgs {
    #[must_use]
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig::default()
            .with_page_size(self.page_size)
            .with_idle_timeout(chrono::Duration::seconds(self.session_idle_secs.max(1)))
            .with_max_sessions(self.max_sessions)
            .with_sweep_interval(std::time::Duration::from_secs(self.sweep_interval_secs))
    }
}

impl ReplArgs {
    #[must_use]
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig::default().with_page_size(self.page_size)
    }
}

impl SearchArgs {
    #[must_use]
    pub fn to_request(&self) -> SearchRequest {
        SearchRequest {
            language: self.language.clone(),
            length: self.length,
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            pattern: self.pattern.clone(),
        }
    }
}

#[must_use]
pub fn parse_cli() -> Cli {
    Cli::parse()
}

// UI Input/Output functions

pub enum ShellInput {
    Command(Command),
    Invalid,
    EndOfInput,
}

pub fn read_command<R: BufRead>(reader: &mut R) -> ShellInput {
    println!("\nEnter command (type 'help' for the list):");
    let mut input = String::new();
    match reader.read_line(&mut input) {
        Ok(0) => ShellInput::EndOfInput,
        Ok(_) => match Command::parse(&input) {
            Some(command) => ShellInput::Command(command),
            None => {
                println!("Unknown command. Type 'help' to see the list of available commands.");
                ShellInput::Invalid
            }
        },
        Err(e) => {
            println!("Could not read input: {e}");
            ShellInput::EndOfInput
        }
    }
}

pub fn display_criteria(draft: &CriteriaDraft) {
    let included: String = draft.included.iter().collect();
    let excluded: String = draft.excluded.iter().collect();
    println!("Language: {}", draft.language);
    println!("Length:   {}", draft.length);
    println!("Pattern:  {}", draft.pattern_display());
    println!("Contains: {}", if included.is_empty() { "-" } else { included.as_str() });
    println!("Excludes: {}", if excluded.is_empty() { "-" } else { excluded.as_str() });
}

pub fn display_page(page: &SearchPage) {
    if page.total == 0 {
        println!("No words match.");
        return;
    }
    for row in page.words.chunks(WORDS_PER_ROW) {
        println!("{}", row.join("  "));
    }
    if page.exhausted {
        println!("({} of {} shown, no more words)", page.delivered, page.total);
    } else {
        println!(
            "({} of {} shown, type 'more' for the next page)",
            page.delivered, page.total
        );
    }
}

pub fn display_error(error: &SearchError) {
    println!("Error: {error}");
}

pub fn display_help() {
    let commands = [
        ("length <number>", "Keep only words of exactly this length."),
        ("pattern <pattern>", "Fixed letters by position, '?' for any letter, e.g. ?a?e?."),
        ("contains <letters>", "Letters that must appear somewhere in the word."),
        ("exclude <letters>", "Letters that must not appear in the word."),
        ("language <code>", "Dictionary to search, e.g. en or nl."),
        ("search", "Run the search and show the first page."),
        ("more", "Show the next page of the last search."),
        ("save <filename>", "Write every match to a file, one per line."),
        ("list", "Display the current criteria."),
        ("reset", "Reset the criteria to the starting values."),
        ("exit", "Exit the program."),
    ];
    println!("Available commands:");
    for (command, description) in commands {
        println!("- {command}:\n  {description}");
    }
}

/// CLI implementation of the FinderInterface trait
/// This struct wraps a BufRead reader and prints to stdout
pub struct CliInterface<R: BufRead> {
    reader: R,
}

impl<R: BufRead> CliInterface<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> FinderInterface for CliInterface<R> {
    fn read_command(&mut self) -> Option<Command> {
        match read_command(&mut self.reader) {
            ShellInput::Command(command) => Some(command),
            ShellInput::EndOfInput => Some(Command::Exit),
            ShellInput::Invalid => None,
        }
    }

    fn display_criteria(&mut self, draft: &CriteriaDraft) {
        display_criteria(draft);
    }

    fn display_page(&mut self, page: &SearchPage) {
        display_page(page);
    }

    fn display_message(&mut self, message: &str) {
        println!("{message}");
    }

    fn display_error(&mut self, error: &SearchError) {
        display_error(error);
    }

    fn display_help(&mut self) {
        display_help();
    }
}
