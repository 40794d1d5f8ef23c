//! Cached example-sentence lookups against the Immersion Kit dictionary API.
//!
//! The [`pipeline::LookupPipeline`] checks the user's blacklist, serves from
//! the [`store::LocalStore`] when it can, and otherwise fetches from the API,
//! validating every response and retrying a bounded number of times when the
//! API hands back a degenerate payload.

pub mod clock;
pub mod config;
pub mod error;
pub mod infra;
pub mod pipeline;
pub mod preferences;
pub mod remote;
pub mod store;
pub mod validation;

pub use immersion_api_types::{CategoryCounts, Example, LookupResponse, SlimPayload};
pub use pipeline::{LookupError, LookupPipeline, LookupResult, LookupSource, PipelineConfig};
pub use store::{CacheEntry, ExampleCache, LocalStore, StoreConfig, StoreError};
pub use validation::{ValidationFailure, validate};
