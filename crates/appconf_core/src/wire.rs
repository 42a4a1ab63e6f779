//! JSON documents exchanged with the store on `/kv/{key}`.

use crate::model::{ContentType, KeyValueEntry, Label};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// API version sent with every request.
pub const API_VERSION: &str = "1.0";

/// Key-value document returned by GET and PUT.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyValueDocument {
    /// Wire key.
    pub key: String,
    /// Label; `null` or empty means "no label".
    #[serde(default)]
    pub label: Option<String>,
    /// Content type tag.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Stored value.
    #[serde(default)]
    pub value: Option<String>,
    /// Server-assigned timestamp.
    #[serde(default)]
    pub last_modified: Option<String>,
    /// Passthrough tags.
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
}

impl KeyValueDocument {
    /// Normalises the document into a [`KeyValueEntry`].
    pub fn into_entry(self) -> KeyValueEntry {
        KeyValueEntry {
            key: self.key,
            label: Label::from_wire(self.label.as_deref()),
            value: self.value.unwrap_or_default(),
            content_type: ContentType::from_wire(self.content_type.as_deref().unwrap_or("")),
            last_modified: self.last_modified,
            tags: self.tags.unwrap_or_default(),
        }
    }
}

impl From<&KeyValueEntry> for KeyValueDocument {
    fn from(entry: &KeyValueEntry) -> Self {
        Self {
            key: entry.key.clone(),
            label: Some(entry.label.as_wire().to_string()),
            content_type: Some(entry.content_type.as_str().to_string()),
            value: Some(entry.value.clone()),
            last_modified: entry.last_modified.clone(),
            tags: Some(entry.tags.clone()),
        }
    }
}

/// Body of a PUT request.
///
/// The store expects `Value` capitalised and `content_type` in snake case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetKeyValueBody {
    /// Encoded value.
    #[serde(rename = "Value", alias = "value")]
    pub value: String,
    /// Content type tag of the value.
    pub content_type: String,
}
