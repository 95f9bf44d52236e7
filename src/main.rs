//! npms - search npm packages from the terminal
//!
//! Prints npms.io search results for each query, caching them between runs.

use std::process::ExitCode;

use clap::Parser;
use futures::future::join_all;

use npms_search::cli::{CacheChoice, Cli, OutputFormat, StartupConfig};
use npms_search::logging::init_logging;
use npms_search::output::{describe_error, render};
use npms_search::{CacheManager, CacheStore, MemoryCache, NpmsClient, SearchTransport, Searcher};

/// Searches every query concurrently and prints the results in argument order
async fn run<C: CacheStore, T: SearchTransport>(
    searcher: Searcher<C, T>,
    queries: &[String],
    format: OutputFormat,
) -> ExitCode {
    let lookups = join_all(queries.iter().map(|query| searcher.lookup(query))).await;
    let show_headings = queries.len() > 1;
    let mut failed = false;

    for (query, result) in queries.iter().zip(lookups) {
        let heading = show_headings.then_some(query.as_str());
        match result.map(|lookup| render(&lookup.records, format, heading)) {
            Ok(Ok(rendered)) => print!("{}", terminate(rendered)),
            Ok(Err(err)) => {
                failed = true;
                eprintln!("Failed to render results for '{}': {}", query, err);
            }
            Err(err) => {
                failed = true;
                eprintln!("{}", describe_error(query, &err));
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn terminate(mut rendered: String) -> String {
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    rendered
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err);
            return ExitCode::from(2);
        }
    };

    init_logging(config.verbosity);

    let transport = NpmsClient::with_base_url(config.endpoint.clone());
    let search = config.search.clone();
    let queries = &cli.queries;
    let output = config.output;

    match config.cache {
        CacheChoice::Dir(dir) => {
            let cache = CacheManager::with_dir(dir);
            run(Searcher::with_config(cache, transport, search), queries, output).await
        }
        CacheChoice::UserDir => match CacheManager::new() {
            Some(cache) => {
                tracing::debug!(dir = %cache.dir().display(), "Using cache directory");
                run(Searcher::with_config(cache, transport, search), queries, output).await
            }
            None => {
                tracing::warn!("Could not determine a cache directory, caching in memory");
                let cache = MemoryCache::new();
                run(Searcher::with_config(cache, transport, search), queries, output).await
            }
        },
        CacheChoice::Memory => {
            let cache = MemoryCache::new();
            run(Searcher::with_config(cache, transport, search), queries, output).await
        }
    }
}
