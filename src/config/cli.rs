use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the `immersion-lookup` binary.
#[derive(Debug, Parser)]
#[command(
    name = "immersion-lookup",
    version,
    about = "Cached example-sentence lookups against the Immersion Kit dictionary"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "IMMERSION_CONFIG_FILE", value_name = "PATH", global = true)]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the dictionary API base URL.
    #[arg(long = "api-base-url", value_name = "URL", global = true)]
    pub api_base_url: Option<String>,

    /// Override the number of fetch attempts per lookup.
    #[arg(long = "api-max-attempts", value_name = "COUNT", global = true)]
    pub api_max_attempts: Option<u32>,

    /// Override the local store database file.
    #[arg(long = "store-path", value_name = "PATH", global = true)]
    pub store_path: Option<PathBuf>,

    /// Override the preferences JSON file.
    #[arg(long = "preferences-path", value_name = "PATH", global = true)]
    pub preferences_path: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Look up example sentences for a vocabulary term.
    Lookup(LookupArgs),
    /// Locate an example by its exact sentence.
    #[command(name = "find-sentence")]
    FindSentence(FindSentenceArgs),
    /// Resolve the example starred for a term in the preferences file.
    Starred(StarredArgs),
    /// Local store maintenance.
    Cache(CacheArgs),
}

#[derive(Debug, Args, Clone)]
pub struct LookupArgs {
    pub vocab: String,

    /// Use the API's exact-match syntax.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub exact: bool,
}

#[derive(Debug, Args, Clone)]
pub struct FindSentenceArgs {
    pub sentence: String,

    /// Which identical match to return, starting at 0.
    #[arg(long, default_value_t = 0)]
    pub occurrence: usize,
}

#[derive(Debug, Args, Clone)]
pub struct StarredArgs {
    pub vocab: String,
}

#[derive(Debug, Args, Clone)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CacheCommand {
    /// List every cached search term.
    List,
    /// Remove one cached search term.
    Delete { key: String },
    /// Drop the whole cache table.
    Destroy,
}
