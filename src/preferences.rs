//! Per-term user preferences.
//!
//! Records are `"<sentence>,<flag>"` strings keyed by vocabulary term. Flag
//! `2` blacklists the term; any other integer is the occurrence index of a
//! starred example sentence.

use std::{collections::HashMap, fs, path::Path};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::warn;

const BLACKLIST_FLAG: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceFlag {
    Blacklisted,
    /// Occurrence index of the starred sentence among identical matches.
    Starred(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceRecord {
    pub sentence: String,
    pub flag: PreferenceFlag,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreferenceError {
    #[error("preference record `{0}` has no flag")]
    MissingFlag(String),
    #[error("preference record `{0}` has a non-numeric flag")]
    InvalidFlag(String),
}

impl PreferenceRecord {
    /// Parse a stored record. The flag follows the last comma, so sentences
    /// may contain commas themselves.
    pub fn parse(raw: &str) -> Result<Self, PreferenceError> {
        let (sentence, flag) = raw
            .rsplit_once(',')
            .ok_or_else(|| PreferenceError::MissingFlag(raw.to_string()))?;
        let flag: u32 = flag
            .trim()
            .parse()
            .map_err(|_| PreferenceError::InvalidFlag(raw.to_string()))?;

        let flag = if flag == BLACKLIST_FLAG {
            PreferenceFlag::Blacklisted
        } else {
            PreferenceFlag::Starred(flag as usize)
        };

        Ok(Self {
            sentence: sentence.to_string(),
            flag,
        })
    }

    pub fn encode(&self) -> String {
        let flag = match self.flag {
            PreferenceFlag::Blacklisted => BLACKLIST_FLAG as usize,
            PreferenceFlag::Starred(index) => index,
        };
        format!("{},{flag}", self.sentence)
    }

    pub fn is_blacklisted(&self) -> bool {
        self.flag == PreferenceFlag::Blacklisted
    }
}

/// Read access to the preferences store. Owned by the host, not by the
/// lookup pipeline.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Raw record for `vocab`, if one exists.
    async fn raw(&self, vocab: &str) -> Option<String>;

    /// Parsed record for `vocab`. Malformed records count as absent.
    async fn record(&self, vocab: &str) -> Option<PreferenceRecord> {
        let raw = self.raw(vocab).await?;
        match PreferenceRecord::parse(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(vocab, error = %err, "Ignoring malformed preference record");
                None
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum PreferenceLoadError {
    #[error("failed to read preferences file: {0}")]
    Io(#[from] std::io::Error),
    #[error("preferences file is not a JSON object of strings: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-memory preferences, optionally seeded from a JSON export.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    records: DashMap<String, String>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `{ "<vocab>": "<sentence>,<flag>" }` JSON object.
    pub fn from_json_file(path: &Path) -> Result<Self, PreferenceLoadError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, PreferenceLoadError> {
        let records: HashMap<String, String> = serde_json::from_str(contents)?;
        Ok(Self {
            records: records.into_iter().collect(),
        })
    }

    pub fn set(&self, vocab: impl Into<String>, record: &PreferenceRecord) {
        self.records.insert(vocab.into(), record.encode());
    }

    pub fn set_raw(&self, vocab: impl Into<String>, raw: impl Into<String>) {
        self.records.insert(vocab.into(), raw.into());
    }

    pub fn remove(&self, vocab: &str) {
        self.records.remove(vocab);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
    async fn raw(&self, vocab: &str) -> Option<String> {
        self.records.get(vocab).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parse_blacklist_flag() {
        let record = PreferenceRecord::parse("猫が好き,2").expect("parses");
        assert_eq!(record.sentence, "猫が好き");
        assert!(record.is_blacklisted());
    }

    #[test]
    fn parse_starred_with_commas_in_sentence() {
        let record = PreferenceRecord::parse("はい、そう,です,1").expect("parses");
        assert_eq!(record.sentence, "はい、そう,です");
        assert_eq!(record.flag, PreferenceFlag::Starred(1));
        assert_eq!(record.encode(), "はい、そう,です,1");
    }

    #[test]
    fn parse_rejects_malformed_records() {
        assert_eq!(
            PreferenceRecord::parse("no flag"),
            Err(PreferenceError::MissingFlag("no flag".into()))
        );
        assert!(matches!(
            PreferenceRecord::parse("sentence,x"),
            Err(PreferenceError::InvalidFlag(_))
        ));
    }

    #[tokio::test]
    async fn malformed_record_reads_as_absent() {
        let prefs = MemoryPreferences::new();
        prefs.set_raw("word", "garbage");
        assert_eq!(prefs.raw("word").await.as_deref(), Some("garbage"));
        assert!(prefs.record("word").await.is_none());
    }

    #[tokio::test]
    async fn loads_json_export() {
        let mut file = tempfile::NamedTempFile::new().expect("tmp file");
        file.write_all(r#"{"食べる":"ご飯を食べる,0","猫":",2"}"#.as_bytes())
            .expect("write");

        let prefs = MemoryPreferences::from_json_file(file.path()).expect("loads");
        assert_eq!(prefs.len(), 2);

        let starred = prefs.record("食べる").await.expect("record");
        assert_eq!(starred.flag, PreferenceFlag::Starred(0));
        assert!(prefs.record("猫").await.expect("record").is_blacklisted());

        prefs.remove("猫");
        assert!(prefs.record("猫").await.is_none());
    }
}
