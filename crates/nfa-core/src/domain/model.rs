//! Marketplace model metadata.

use serde::{Deserialize, Deserializer, Serialize};

/// A model registered on the marketplace.
///
/// Immutable once fetched. The marketplace identifier is kept as an
/// opaque string even when upstream encodes it as a JSON integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// On-chain model identifier.
    #[serde(deserialize_with = "deserialize_model_id")]
    pub id: String,
    /// Human-readable model name, matched against client handles.
    pub name: String,
    /// Provider endpoint advertised for the model.
    #[serde(default)]
    pub endpoint: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

impl ModelRecord {
    /// Create a record with only an id and a name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            endpoint: String::new(),
            description: String::new(),
        }
    }
}

/// Body of `GET /blockchain/models`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub models: Vec<ModelRecord>,
}

/// Accept `"id": "0xabc"` as well as `"id": 1`.
fn deserialize_model_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}
