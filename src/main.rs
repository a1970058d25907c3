use anyhow::Context;
use std::io;
use std::sync::Arc;
use wordfinder::cli::{CliInterface, Mode, ReplArgs, parse_cli};
use wordfinder::logging::init_logger;
use wordfinder::{DictionaryStore, SearchConfig, SearchService, finder_loop, server};

fn main() -> anyhow::Result<()> {
    let cli = parse_cli();
    init_logger(cli.verbose);

    let dictionary_dir = cli.dictionary_dir();
    log::info!("Using dictionaries in {}", dictionary_dir.display());
    let store = DictionaryStore::from_dir(&dictionary_dir);

    match cli.mode.unwrap_or_else(|| Mode::Repl(ReplArgs::default())) {
        Mode::Serve(args) => {
            let service = Arc::new(SearchService::new(store, args.search_config()));
            let available = service.available_languages();
            if available.is_empty() {
                log::warn!("No dictionaries found in {}", dictionary_dir.display());
            }
            let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            runtime
                .block_on(server::serve(args.bind, service))
                .with_context(|| format!("server on {} failed", args.bind))?;
        }
        Mode::Repl(args) => {
            let service = SearchService::new(store, args.search_config());
            let stdin = io::stdin();
            let mut interface = CliInterface::new(stdin.lock());
            finder_loop(&service, &args.language, args.length, &mut interface);
        }
        Mode::Search(args) => {
            let service = SearchService::new(store, SearchConfig::default());
            let words = service.all_matches(&args.to_request())?;
            for word in &words {
                println!("{word}");
            }
            log::info!("{} matches", words.len());
        }
    }
    Ok(())
}
