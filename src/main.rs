use std::{process, sync::Arc};

use immersion_lookup::{
    config::{self, CacheCommand, Command, Settings},
    error::AppError,
    infra::telemetry,
    pipeline::{LookupPipeline, PipelineConfig},
    preferences::{MemoryPreferences, PreferenceStore},
    remote::DictionaryClient,
    store::{LocalStore, StoreConfig},
};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        eprintln!("{}", error.presentation_message());
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Command::Lookup(args) => {
            let pipeline = build_pipeline(&settings).await?;
            let result = pipeline.lookup(&args.vocab, args.exact).await?;
            print_json(&result)
        }
        Command::FindSentence(args) => {
            let pipeline = build_pipeline(&settings).await?;
            let example = pipeline
                .find_by_sentence(&args.sentence, args.occurrence)
                .await?;
            print_json(&example)
        }
        Command::Starred(args) => {
            let pipeline = build_pipeline(&settings).await?;
            let example = pipeline.starred_example(&args.vocab).await?;
            print_json(&example)
        }
        Command::Cache(args) => run_cache(&settings, args.command).await,
    }
}

async fn build_pipeline(settings: &Settings) -> Result<LookupPipeline, AppError> {
    let client = DictionaryClient::new(settings.api.base_url.as_str())?;
    let store = LocalStore::open(&StoreConfig::from(&settings.store)).await?;

    let preferences: Arc<dyn PreferenceStore> = match settings.preferences.path.as_ref() {
        Some(path) => Arc::new(MemoryPreferences::from_json_file(path)?),
        None => Arc::new(MemoryPreferences::new()),
    };

    Ok(LookupPipeline::new(
        client,
        Arc::new(store),
        preferences,
        PipelineConfig::from(&settings.api),
    ))
}

#[derive(Serialize)]
struct ListedEntry<'a> {
    key: &'a str,
    examples: usize,
    written_at: Option<String>,
    stale: bool,
}

async fn run_cache(settings: &Settings, command: CacheCommand) -> Result<(), AppError> {
    let store = LocalStore::open(&StoreConfig::from(&settings.store)).await?;

    match command {
        CacheCommand::List => {
            let entries = store.list_all().await?;
            let listed: Vec<ListedEntry<'_>> = entries
                .iter()
                .map(|entry| ListedEntry {
                    key: &entry.key,
                    examples: entry.examples().len(),
                    written_at: entry
                        .written_at_utc()
                        .and_then(|at| at.format(&Rfc3339).ok()),
                    stale: store.is_stale(entry),
                })
                .collect();
            print_json(&listed)
        }
        CacheCommand::Delete { key } => {
            store.delete_entry(&key).await?;
            info!(key = %key, "Cached entry deleted");
            Ok(())
        }
        CacheCommand::Destroy => store.destroy().await.map_err(|(_, err)| AppError::from(err)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
