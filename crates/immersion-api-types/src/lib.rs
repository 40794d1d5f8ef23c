//! Wire types for the Immersion Kit `look_up_dictionary` endpoint and the
//! reduced projection of it that clients keep in their local cache.
//!
//! The remote shape is read-only from a client's point of view:
//!
//! ```json
//! { "data": [ { "category_count": { "anime": 3 },
//!               "examples": [ { "sentence": "...", "image_url": "..." } ] } ] }
//! ```
//!
//! Every field is optional on the wire. Structural checks belong to the
//! caller; these types only describe the shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-category hit counts, kept as raw JSON values. Any count the caller's
/// structural checks accept must decode here, so nothing is narrowed to an
/// integer type.
pub type CategoryCounts = BTreeMap<String, Value>;

/// Full response body of `GET /look_up_dictionary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<DictionaryResult>>,
}

/// One dictionary result; the API returns one per matched headword.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DictionaryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_count: Option<CategoryCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<RemoteExample>>,
    /// Fields this crate does not model (exact matches, dictionary info, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An example as delivered by the API, including fields clients discard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteExample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Example fields a client actually renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_name: Option<String>,
}

impl From<&RemoteExample> for Example {
    fn from(remote: &RemoteExample) -> Self {
        Self {
            image_url: remote.image_url.clone(),
            sound_url: remote.sound_url.clone(),
            sentence: remote.sentence.clone(),
            translation: remote.translation.clone(),
            deck_name: remote.deck_name.clone(),
        }
    }
}

/// Slimmed response kept in the local cache.
///
/// Serializes to the same outer shape as [`LookupResponse`] so a stored
/// payload can be re-checked with the same structural rules as a fresh one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlimPayload {
    pub data: Vec<SlimResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlimResult {
    pub category_count: CategoryCounts,
    pub examples: Vec<Example>,
}

impl SlimPayload {
    /// Project a remote response down to the cached fields.
    ///
    /// Results without a category map or example list are dropped.
    pub fn from_response(response: &LookupResponse) -> Self {
        let data = response
            .data
            .iter()
            .flatten()
            .filter_map(|result| {
                let category_count = result.category_count.clone()?;
                let examples = result.examples.as_ref()?.iter().map(Example::from).collect();
                Some(SlimResult {
                    category_count,
                    examples,
                })
            })
            .collect();
        Self { data }
    }

    /// Examples of the first result, or an empty slice.
    pub fn first_examples(&self) -> &[Example] {
        self.data
            .first()
            .map(|result| result.examples.as_slice())
            .unwrap_or_default()
    }
}
