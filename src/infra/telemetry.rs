use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "immersion_cache_hit_total",
            Unit::Count,
            "Total number of local store reads that returned a fresh entry."
        );
        describe_counter!(
            "immersion_cache_miss_total",
            Unit::Count,
            "Total number of local store reads that found nothing usable."
        );
        describe_counter!(
            "immersion_cache_evict_total",
            Unit::Count,
            "Total number of entries evicted to stay within capacity."
        );
        describe_counter!(
            "immersion_cache_purge_total",
            Unit::Count,
            "Total number of expired or invalid entries deleted on read."
        );
        describe_counter!(
            "immersion_fetch_attempt_total",
            Unit::Count,
            "Total number of dictionary API requests issued."
        );
        describe_counter!(
            "immersion_validation_failure_total",
            Unit::Count,
            "Total number of dictionary responses rejected by validation."
        );
        describe_histogram!(
            "immersion_lookup_ms",
            Unit::Milliseconds,
            "End-to-end lookup latency, labelled by the source of the result."
        );
    });
}
