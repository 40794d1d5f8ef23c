//! Local store configuration.
//!
//! Controls where the example cache lives, how long entries stay fresh and
//! how many entries it keeps, via `immersion.toml`:
//!
//! ```toml
//! [store]
//! path = "ImmersionKitDB.sqlite3"
//! ttl_seconds = 604800
//! capacity = 500
//! ```

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    time::Duration,
};

pub(crate) const DEFAULT_STORE_PATH: &str = "ImmersionKitDB.sqlite3";
pub(crate) const DEFAULT_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub(crate) const DEFAULT_CAPACITY: usize = 500;
pub(crate) const DEFAULT_MAX_CONNECTIONS: u32 = 4;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file.
    pub path: PathBuf,
    /// Entries at least this old are dropped when read.
    pub ttl: Duration,
    /// Maximum number of cached search terms.
    pub capacity: NonZeroUsize,
    pub max_connections: NonZeroU32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            capacity: NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            max_connections: NonZeroU32::new(DEFAULT_MAX_CONNECTIONS).unwrap_or(NonZeroU32::MIN),
        }
    }
}

impl From<&crate::config::StoreSettings> for StoreConfig {
    fn from(settings: &crate::config::StoreSettings) -> Self {
        Self {
            path: settings.path.clone(),
            ttl: settings.ttl,
            capacity: settings.capacity,
            max_connections: settings.max_connections,
        }
    }
}

impl StoreConfig {
    /// Config for a database at `path`, other values defaulted.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub(crate) fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    pub(crate) fn capacity_i64(&self) -> i64 {
        i64::try_from(self.capacity.get()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = StoreConfig::default();
        assert_eq!(config.path, PathBuf::from("ImmersionKitDB.sqlite3"));
        assert_eq!(config.ttl, Duration::from_secs(604_800));
        assert_eq!(config.capacity.get(), 500);
        assert_eq!(config.ttl_ms(), 604_800_000);
    }

    #[test]
    fn at_overrides_path_only() {
        let config = StoreConfig::at("/tmp/cache.sqlite3");
        assert_eq!(config.path, PathBuf::from("/tmp/cache.sqlite3"));
        assert_eq!(config.capacity_i64(), 500);
    }
}
