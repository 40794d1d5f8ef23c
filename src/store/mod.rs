//! Local example cache.
//!
//! One SQLite table (`dataStore` in `ImmersionKitDB`) keyed by the search
//! term as queried. Rows hold the slimmed payload and the write time.
//!
//! The store cleans itself up on read: expired rows and rows whose payload
//! no longer validates are deleted by [`LocalStore::get`]. Writes enforce a
//! capacity bound by evicting the oldest rows first.

mod config;
mod entry;
mod local;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use config::StoreConfig;
pub use entry::CacheEntry;
pub use local::LocalStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("failed to encode cached payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// The cache operations the lookup pipeline depends on.
#[async_trait]
pub trait ExampleCache: Send + Sync {
    /// Fresh, valid entry for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError>;

    /// Store a slimmed copy of `payload` under `key`.
    ///
    /// Invalid payloads are skipped, not rejected. Returns whether a row was
    /// written.
    async fn put(&self, key: &str, payload: &Value) -> Result<bool, StoreError>;
}
