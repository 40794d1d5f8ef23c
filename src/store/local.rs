//! SQLite-backed local store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use immersion_api_types::{LookupResponse, SlimPayload};
use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::validation::{ValidationFailure, validate};

use super::config::StoreConfig;
use super::entry::{CacheEntry, is_expired};
use super::{ExampleCache, StoreError};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const METRIC_CACHE_HIT: &str = "immersion_cache_hit_total";
const METRIC_CACHE_MISS: &str = "immersion_cache_miss_total";
const METRIC_CACHE_EVICT: &str = "immersion_cache_evict_total";
const METRIC_CACHE_PURGE: &str = "immersion_cache_purge_total";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS dataStore (\
    key TEXT PRIMARY KEY NOT NULL, \
    payload TEXT NOT NULL, \
    written_at INTEGER NOT NULL\
)";
const CREATE_WRITTEN_AT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS dataStore_written_at ON dataStore (written_at)";

#[derive(sqlx::FromRow)]
struct EntryRow {
    key: String,
    payload: String,
    written_at: i64,
}

impl EntryRow {
    fn decode(self) -> Result<CacheEntry, ValidationFailure> {
        let value: Value =
            serde_json::from_str(&self.payload).map_err(|_| ValidationFailure::NotValid)?;
        validate(&value)?;
        let payload: SlimPayload =
            serde_json::from_value(value).map_err(|_| ValidationFailure::NotValid)?;
        Ok(CacheEntry {
            key: self.key,
            payload,
            written_at: self.written_at,
        })
    }
}

/// Handle to the local example cache.
///
/// Cloning yields another handle to the same database. [`LocalStore::destroy`]
/// refuses to run while other handles are alive.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<Inner>,
}

struct Inner {
    pool: SqlitePool,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    // Serializes writers so the count-evict-insert sequence stays exact.
    write_gate: Mutex<()>,
}

impl LocalStore {
    /// Open the store, creating the table if it does not exist yet.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.get())
            .connect_with(options)
            .await
            .map_err(|err| {
                warn!(
                    path = %config.path.display(),
                    error = %err,
                    "Failed to open local store"
                );
                StoreError::unavailable(format!(
                    "failed to open {}: {err}",
                    config.path.display()
                ))
            })?;

        for statement in [CREATE_TABLE, CREATE_WRITTEN_AT_INDEX] {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|err| StoreError::unavailable(format!("failed to create table: {err}")))?;
        }

        debug!(path = %config.path.display(), "Local store opened");

        Ok(Self {
            inner: Arc::new(Inner {
                pool,
                config: config.clone(),
                clock,
                write_gate: Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Look up `key`, dropping the row if it is stale or no longer valid.
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let row: Option<EntryRow> =
            sqlx::query_as("SELECT key, payload, written_at FROM dataStore WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.inner.pool)
                .await?;

        let Some(row) = row else {
            counter!(METRIC_CACHE_MISS).increment(1);
            return Ok(None);
        };

        let now = self.inner.clock.now_ms();
        if is_expired(row.written_at, now, self.inner.config.ttl_ms()) {
            debug!(key, written_at = row.written_at, now, "Cached entry expired");
            self.purge(key, row.written_at).await?;
            counter!(METRIC_CACHE_MISS).increment(1);
            return Ok(None);
        }

        let written_at = row.written_at;
        match row.decode() {
            Ok(entry) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                Ok(Some(entry))
            }
            Err(reason) => {
                warn!(key, reason = %reason, "Dropping invalid cached entry");
                self.purge(key, written_at).await?;
                counter!(METRIC_CACHE_MISS).increment(1);
                Ok(None)
            }
        }
    }

    /// Validate, slim and store `payload` under `key`.
    ///
    /// Payloads that fail validation or carry no examples are skipped
    /// silently. Returns whether a row was written.
    #[instrument(skip(self, payload))]
    pub async fn put(&self, key: &str, payload: &Value) -> Result<bool, StoreError> {
        if let Err(reason) = validate(payload) {
            debug!(key, reason = %reason, "Skipping cache write for invalid payload");
            return Ok(false);
        }

        let response: LookupResponse = match LookupResponse::deserialize(payload) {
            Ok(response) => response,
            Err(err) => {
                debug!(key, error = %err, "Skipping cache write for undecodable payload");
                return Ok(false);
            }
        };

        let slim = SlimPayload::from_response(&response);
        if slim.first_examples().is_empty() {
            debug!(key, "Skipping cache write for payload without examples");
            return Ok(false);
        }
        let encoded = serde_json::to_string(&slim)?;

        let _gate = self.inner.write_gate.lock().await;
        let mut tx = self.inner.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT 1 FROM dataStore WHERE key = ?")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_none() {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dataStore")
                .fetch_one(&mut *tx)
                .await?;
            let overflow = count + 1 - self.inner.config.capacity_i64();
            if overflow > 0 {
                let evicted = sqlx::query(
                    "DELETE FROM dataStore WHERE key IN \
                     (SELECT key FROM dataStore ORDER BY written_at ASC, rowid ASC LIMIT ?)",
                )
                .bind(overflow)
                .execute(&mut *tx)
                .await?
                .rows_affected();
                counter!(METRIC_CACHE_EVICT).increment(evicted);
                debug!(key, evicted, "Evicted oldest cached entries");
            }
        }

        sqlx::query(
            "INSERT INTO dataStore (key, payload, written_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, written_at = excluded.written_at",
        )
        .bind(key)
        .bind(encoded)
        .bind(self.inner.clock.now_ms())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Remove `key`. Absent keys are not an error.
    pub async fn delete_entry(&self, key: &str) -> Result<(), StoreError> {
        let _gate = self.inner.write_gate.lock().await;
        sqlx::query("DELETE FROM dataStore WHERE key = ?")
            .bind(key)
            .execute(&self.inner.pool)
            .await?;
        Ok(())
    }

    /// Every decodable row, in no particular order.
    pub async fn list_all(&self) -> Result<Vec<CacheEntry>, StoreError> {
        let rows: Vec<EntryRow> = sqlx::query_as("SELECT key, payload, written_at FROM dataStore")
            .fetch_all(&self.inner.pool)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let key = row.key.clone();
            match row.decode() {
                Ok(entry) => entries.push(entry),
                Err(reason) => debug!(key = %key, reason = %reason, "Skipping invalid row in listing"),
            }
        }
        Ok(entries)
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dataStore")
            .fetch_one(&self.inner.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    /// Whether `entry` would be dropped if read now.
    pub fn is_stale(&self, entry: &CacheEntry) -> bool {
        entry.is_expired(self.inner.clock.now_ms(), self.inner.config.ttl_ms())
    }

    /// Drop the whole table and close the database.
    ///
    /// Fails with [`StoreError::Unavailable`] while other handles are open;
    /// the handle is returned so the caller can retry later.
    pub async fn destroy(self) -> Result<(), (Self, StoreError)> {
        let others = Arc::strong_count(&self.inner) - 1;
        if others > 0 {
            warn!(
                open_handles = others,
                "Local store destroy blocked by open handles; close them and retry"
            );
            return Err((
                self,
                StoreError::unavailable(format!("destroy blocked by {others} open handle(s)")),
            ));
        }

        let dropped = {
            let _gate = self.inner.write_gate.lock().await;
            sqlx::query("DROP TABLE IF EXISTS dataStore")
                .execute(&self.inner.pool)
                .await
        };
        if let Err(err) = dropped {
            return Err((self, StoreError::from(err)));
        }

        self.inner.pool.close().await;
        info!(path = %self.inner.config.path.display(), "Local store destroyed");
        Ok(())
    }

    /// Delete the row for `key` only if it is still the one that was read.
    /// A concurrent overwrite carries a newer `written_at` and survives.
    async fn purge(&self, key: &str, written_at: i64) -> Result<bool, StoreError> {
        let _gate = self.inner.write_gate.lock().await;
        let deleted = sqlx::query("DELETE FROM dataStore WHERE key = ? AND written_at = ?")
            .bind(key)
            .bind(written_at)
            .execute(&self.inner.pool)
            .await?
            .rows_affected();
        if deleted > 0 {
            counter!(METRIC_CACHE_PURGE).increment(deleted);
        } else {
            debug!(key, written_at, "Row was rewritten before purge; keeping it");
        }
        Ok(deleted > 0)
    }
}

#[async_trait]
impl ExampleCache for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        LocalStore::get(self, key).await
    }

    async fn put(&self, key: &str, payload: &Value) -> Result<bool, StoreError> {
        LocalStore::put(self, key, payload).await
    }
}
