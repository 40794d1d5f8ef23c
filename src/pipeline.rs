//! Example lookup pipeline.
//!
//! `lookup` runs blacklist check → cache → remote fetch → validation, retrying
//! only when the API answers with a payload that fails validation. Transport
//! failures and non-2xx statuses surface immediately as
//! [`LookupError::FetchFailed`].

use std::{num::NonZeroU32, sync::Arc, time::Duration, time::Instant};

use immersion_api_types::{Example, LookupResponse, SlimPayload};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::preferences::{PreferenceFlag, PreferenceStore};
use crate::remote::{DictionaryClient, FetchError};
use crate::store::ExampleCache;
use crate::validation::{ValidationFailure, validate};

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

const METRIC_FETCH_ATTEMPT: &str = "immersion_fetch_attempt_total";
const METRIC_VALIDATION_FAILURE: &str = "immersion_validation_failure_total";
const METRIC_LOOKUP_MS: &str = "immersion_lookup_ms";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fetches per lookup before giving up on invalid payloads.
    pub max_attempts: NonZeroU32,
    pub retry_backoff: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::new(DEFAULT_MAX_ATTEMPTS).unwrap_or(NonZeroU32::MIN),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl From<&crate::config::ApiSettings> for PipelineConfig {
    fn from(settings: &crate::config::ApiSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            retry_backoff: settings.retry_backoff,
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to fetch examples: {0}")]
    FetchFailed(#[from] FetchError),
    #[error("no valid response after {attempts} attempts: {reason}")]
    Exhausted {
        attempts: u32,
        reason: ValidationFailure,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupSource {
    Blacklisted,
    Cache,
    Remote,
}

impl LookupSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LookupSource::Blacklisted => "blacklisted",
            LookupSource::Cache => "cache",
            LookupSource::Remote => "remote",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupResult {
    pub source: LookupSource,
    pub examples: Vec<Example>,
}

impl LookupResult {
    fn blacklisted() -> Self {
        Self {
            source: LookupSource::Blacklisted,
            examples: Vec::new(),
        }
    }
}

/// Search key for `vocab`; exact mode uses the API's corner-bracket syntax.
pub fn search_key(vocab: &str, exact: bool) -> String {
    if exact {
        format!("「{vocab}」")
    } else {
        vocab.to_string()
    }
}

pub struct LookupPipeline {
    client: DictionaryClient,
    cache: Arc<dyn ExampleCache>,
    preferences: Arc<dyn PreferenceStore>,
    config: PipelineConfig,
}

impl LookupPipeline {
    pub fn new(
        client: DictionaryClient,
        cache: Arc<dyn ExampleCache>,
        preferences: Arc<dyn PreferenceStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            client,
            cache,
            preferences,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Examples for `vocab`, from the cache when possible.
    ///
    /// Blacklisted terms return an empty result without touching the cache
    /// or the network. Storage failures degrade to a cache miss.
    #[instrument(skip(self))]
    pub async fn lookup(&self, vocab: &str, exact: bool) -> Result<LookupResult, LookupError> {
        let started_at = Instant::now();
        let result = self.resolve(vocab, exact).await;

        let source = match &result {
            Ok(found) => found.source.as_str(),
            Err(_) => "error",
        };
        histogram!(METRIC_LOOKUP_MS, "source" => source)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        result
    }

    async fn resolve(&self, vocab: &str, exact: bool) -> Result<LookupResult, LookupError> {
        if self.is_blacklisted(vocab).await {
            info!(vocab, "Term is blacklisted; skipping lookup");
            return Ok(LookupResult::blacklisted());
        }

        let key = search_key(vocab, exact);
        match self.cache.get(&key).await {
            Ok(Some(entry)) if !entry.examples().is_empty() => {
                debug!(key = %key, examples = entry.examples().len(), "Serving cached examples");
                return Ok(LookupResult {
                    source: LookupSource::Cache,
                    examples: entry.examples().to_vec(),
                });
            }
            Ok(_) => debug!(key = %key, "Cache miss"),
            Err(err) => warn!(key = %key, error = %err, "Local store read failed; treating as miss"),
        }

        let examples = self.fetch_validated(&key).await?;
        Ok(LookupResult {
            source: LookupSource::Remote,
            examples,
        })
    }

    /// Find the `occurrence`-th example (0-based) whose sentence equals
    /// `sentence`, across every result and category.
    ///
    /// Always queries the API in exact mode and never touches the cache.
    #[instrument(skip(self))]
    pub async fn find_by_sentence(
        &self,
        sentence: &str,
        occurrence: usize,
    ) -> Result<Option<Example>, LookupError> {
        let key = search_key(sentence, true);
        counter!(METRIC_FETCH_ATTEMPT).increment(1);
        let payload = self.client.fetch(&key).await?;
        let response = LookupResponse::deserialize(&payload).map_err(FetchError::Decode)?;

        let found = response
            .data
            .iter()
            .flatten()
            .flat_map(|result| result.examples.iter().flatten())
            .filter(|example| example.sentence.as_deref() == Some(sentence))
            .nth(occurrence)
            .map(Example::from);

        debug!(found = found.is_some(), "Sentence search finished");
        Ok(found)
    }

    /// The example the user starred for `vocab`, if any.
    pub async fn starred_example(&self, vocab: &str) -> Result<Option<Example>, LookupError> {
        match self.preferences.record(vocab).await {
            Some(record) => match record.flag {
                PreferenceFlag::Starred(occurrence) => {
                    self.find_by_sentence(&record.sentence, occurrence).await
                }
                PreferenceFlag::Blacklisted => Ok(None),
            },
            None => Ok(None),
        }
    }

    async fn is_blacklisted(&self, vocab: &str) -> bool {
        self.preferences
            .record(vocab)
            .await
            .is_some_and(|record| record.is_blacklisted())
    }

    async fn fetch_validated(&self, key: &str) -> Result<Vec<Example>, LookupError> {
        let max_attempts = self.config.max_attempts.get();
        let mut attempt = 0;

        loop {
            attempt += 1;
            counter!(METRIC_FETCH_ATTEMPT).increment(1);
            let payload = self.client.fetch(key).await?;

            let reason = match validate(&payload) {
                Ok(()) => {
                    let response =
                        LookupResponse::deserialize(&payload).map_err(FetchError::Decode)?;
                    let examples = SlimPayload::from_response(&response)
                        .data
                        .into_iter()
                        .next()
                        .map(|result| result.examples)
                        .unwrap_or_default();

                    match self.cache.put(key, &payload).await {
                        Ok(written) => debug!(key, written, attempt, "Stored fetched examples"),
                        Err(err) => warn!(key, error = %err, "Failed to cache fetched examples"),
                    }
                    return Ok(examples);
                }
                Err(reason) => reason,
            };

            counter!(METRIC_VALIDATION_FAILURE).increment(1);
            if attempt >= max_attempts {
                warn!(key, attempt, reason = %reason, "Giving up on invalid responses");
                return Err(LookupError::Exhausted {
                    attempts: attempt,
                    reason,
                });
            }

            warn!(
                key,
                attempt,
                reason = %reason,
                backoff_ms = u64::try_from(self.config.retry_backoff.as_millis()).unwrap_or(u64::MAX),
                "Invalid dictionary response; retrying"
            );
            tokio::time::sleep(self.config.retry_backoff).await;
        }
    }
}
