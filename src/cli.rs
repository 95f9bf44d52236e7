//! Command-line interface parsing for the `npms` binary
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a validated [`StartupConfig`].

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::npms::NPMS_SEARCH_URL;
use crate::search::{SearchConfig, DEFAULT_NAMESPACE, DEFAULT_PAGE_SIZE};

/// Largest page size the npms API accepts
pub const MAX_PAGE_SIZE: usize = 250;

/// Error types for CLI argument validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// The page size is outside the range the API accepts
    #[error("Invalid size: {0}. Size must be between 1 and 250")]
    InvalidSize(usize),

    /// The cache namespace is empty
    #[error("Invalid namespace: the cache namespace must not be empty")]
    EmptyNamespace,
}

/// npms - search npm packages from the terminal
#[derive(Parser, Debug)]
#[command(name = "npms")]
#[command(about = "Search npm packages via npms.io, with a local result cache")]
#[command(version)]
pub struct Cli {
    /// Search terms; each one is searched separately
    ///
    /// Examples:
    ///   npms git-pick
    ///   npms react vue --json
    #[arg(required = true, value_name = "QUERY")]
    pub queries: Vec<String>,

    /// Number of results to request per query
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub size: usize,

    /// How long results stay cached, in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 3600)]
    pub ttl: u64,

    /// Cache-key prefix for this tool's entries
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Search endpoint URL
    #[arg(long, value_name = "URL", default_value = NPMS_SEARCH_URL)]
    pub endpoint: String,

    /// Directory for cached results (defaults to the user cache directory)
    #[arg(long, value_name = "DIR", conflicts_with = "no_cache")]
    pub cache_dir: Option<PathBuf>,

    /// Keep cached results in memory for this run only
    #[arg(long)]
    pub no_cache: bool,

    /// Print results as JSON, one array per query
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Where search results are cached
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheChoice {
    /// The XDG user cache directory
    #[default]
    UserDir,
    /// A directory given on the command line
    Dir(PathBuf),
    /// Process memory
    Memory,
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    pub search: SearchConfig,
    pub endpoint: String,
    pub cache: CacheChoice,
    pub output: OutputFormat,
    pub verbosity: u8,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if the size or namespace is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.size == 0 || cli.size > MAX_PAGE_SIZE {
            return Err(CliError::InvalidSize(cli.size));
        }
        if cli.namespace.is_empty() {
            return Err(CliError::EmptyNamespace);
        }

        let cache = match (&cli.cache_dir, cli.no_cache) {
            (_, true) => CacheChoice::Memory,
            (Some(dir), false) => CacheChoice::Dir(dir.clone()),
            (None, false) => CacheChoice::UserDir,
        };

        Ok(StartupConfig {
            search: SearchConfig {
                namespace: cli.namespace.clone(),
                ttl: Duration::from_secs(cli.ttl),
                page_size: cli.size,
            },
            endpoint: cli.endpoint.clone(),
            cache,
            output: if cli.json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            verbosity: cli.verbose,
        })
    }
}
