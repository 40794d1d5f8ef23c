//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    CacheArgs, CacheCommand, CliArgs, Command, FindSentenceArgs, GlobalOverrides, LookupArgs,
    StarredArgs,
};

use crate::store::StoreConfig;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "immersion";
const ENV_PREFIX: &str = "IMMERSION";
const ENV_SEPARATOR: &str = "__";
const DEFAULT_API_BASE_URL: &str = "https://api.immersionkit.com";
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 2_000;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub store: StoreSettings,
    pub preferences: PreferenceSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub max_attempts: NonZeroU32,
    pub retry_backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub path: PathBuf,
    pub ttl: Duration,
    pub capacity: NonZeroUsize,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone, Default)]
pub struct PreferenceSettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    load_with_environment(cli, environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR)
}

fn load_with_environment(cli: &CliArgs, environment: Environment) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(environment);

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    store: RawStoreSettings,
    preferences: RawPreferenceSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(url) = overrides.api_base_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(attempts) = overrides.api_max_attempts {
            self.api.max_attempts = Some(attempts);
        }
        if let Some(path) = overrides.store_path.as_ref() {
            self.store.path = Some(path.clone());
        }
        if let Some(path) = overrides.preferences_path.as_ref() {
            self.preferences.path = Some(path.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        Ok(Self {
            api: build_api_settings(raw.api)?,
            store: build_store_settings(raw.store)?,
            preferences: PreferenceSettings {
                path: raw.preferences.path.filter(|p| !p.as_os_str().is_empty()),
            },
            logging: build_logging_settings(raw.logging)?,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let base = api
        .base_url
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let base_url = Url::parse(base.trim())
        .map_err(|err| LoadError::invalid("api.base_url", format!("failed to parse: {err}")))?;

    let max_attempts = non_zero_u32(
        api.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).into(),
        "api.max_attempts",
    )?;
    let retry_backoff =
        Duration::from_millis(api.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS));

    Ok(ApiSettings {
        base_url,
        max_attempts,
        retry_backoff,
    })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let defaults = StoreConfig::default();

    let path = store.path.unwrap_or(defaults.path);
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid("store.path", "path must not be empty"));
    }

    let ttl_seconds = store.ttl_seconds.unwrap_or(defaults.ttl.as_secs());
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "store.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let capacity = match store.capacity {
        Some(value) => NonZeroUsize::new(value)
            .ok_or_else(|| LoadError::invalid("store.capacity", "must be greater than zero"))?,
        None => defaults.capacity,
    };

    let max_connections = match store.max_connections {
        Some(value) => non_zero_u32(value.into(), "store.max_connections")?,
        None => defaults.max_connections,
    };

    Ok(StoreSettings {
        path,
        ttl: Duration::from_secs(ttl_seconds),
        capacity,
        max_connections,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    max_attempts: Option<u32>,
    retry_backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    path: Option<PathBuf>,
    ttl_seconds: Option<u64>,
    capacity: Option<usize>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPreferenceSettings {
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
