use immersion_api_types::{Example, SlimPayload};
use serde::Serialize;
use time::OffsetDateTime;

/// A cached lookup for one search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// Search term as queried, including exact-match brackets.
    pub key: String,
    pub payload: SlimPayload,
    /// Unix milliseconds of the last write.
    pub written_at: i64,
}

impl CacheEntry {
    pub fn examples(&self) -> &[Example] {
        self.payload.first_examples()
    }

    pub fn written_at_utc(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.written_at) * 1_000_000).ok()
    }

    pub(crate) fn is_expired(&self, now_ms: i64, ttl_ms: i64) -> bool {
        is_expired(self.written_at, now_ms, ttl_ms)
    }
}

pub(crate) fn is_expired(written_at: i64, now_ms: i64, ttl_ms: i64) -> bool {
    now_ms.saturating_sub(written_at) >= ttl_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_boundary_is_inclusive() {
        assert!(!is_expired(1_000, 1_999, 1_000));
        assert!(is_expired(1_000, 2_000, 1_000));
        assert!(is_expired(1_000, 5_000, 1_000));
    }

    #[test]
    fn written_at_converts_to_utc() {
        let entry = CacheEntry {
            key: "k".into(),
            payload: SlimPayload::default(),
            written_at: 1_700_000_000_000,
        };
        let at = entry.written_at_utc().expect("valid timestamp");
        assert_eq!(at.unix_timestamp(), 1_700_000_000);
        assert!(entry.examples().is_empty());
        assert!(entry.is_expired(1_700_000_000_500, 500));
    }
}
