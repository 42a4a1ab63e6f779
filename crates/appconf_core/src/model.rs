//! Entries as the reconciler sees them.

use std::collections::BTreeMap;
use std::fmt;

/// Reserved label spelling meaning "no label".
///
/// The wire uses the empty string for an unlabelled entry; this constant is
/// what callers declare and what reads expose, so the two never get confused.
pub const LABEL_NONE: &str = "%00";

/// Namespace discriminator for keys.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Label {
    /// The entry carries no label.
    #[default]
    None,
    /// A named label. Never empty and never [`LABEL_NONE`].
    Named(String),
}

impl Label {
    /// Builds a label from a declared spelling.
    ///
    /// Both the empty string and [`LABEL_NONE`] mean "no label".
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        if label.is_empty() || label == LABEL_NONE {
            Label::None
        } else {
            Label::Named(label)
        }
    }

    /// Builds a label from the wire representation (absent or empty means none).
    pub fn from_wire(label: Option<&str>) -> Self {
        match label {
            None => Label::None,
            Some(label) => Label::new(label),
        }
    }

    /// Returns the spelling sent in the `label` query parameter.
    pub fn as_wire(&self) -> &str {
        match self {
            Label::None => "",
            Label::Named(name) => name,
        }
    }

    /// Returns the spelling exposed to callers.
    pub fn as_declared(&self) -> &str {
        match self {
            Label::None => LABEL_NONE,
            Label::Named(name) => name,
        }
    }

    /// Returns true if this is the "no label" sentinel.
    pub fn is_none(&self) -> bool {
        matches!(self, Label::None)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::None => f.write_str("Label::None"),
            Label::Named(name) => write!(f, "Label({name:?})"),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_declared())
    }
}

impl From<&str> for Label {
    fn from(label: &str) -> Self {
        Label::new(label)
    }
}

impl From<String> for Label {
    fn from(label: String) -> Self {
        Label::new(label)
    }
}

/// Content type of a plain key-value.
pub const CONTENT_TYPE_KEY_VALUE: &str = "application/vnd.microsoft.appconfig.kv+json";
/// Content type of a Key Vault reference.
pub const CONTENT_TYPE_KEY_VAULT_REF: &str =
    "application/vnd.microsoft.appconfig.keyvaultref+json;charset=utf-8";
/// Content type of a feature flag.
pub const CONTENT_TYPE_FEATURE_FLAG: &str = "application/vnd.microsoft.appconfig.ff+json;charset=utf-8";

/// Wire tag selecting how an entry's value is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Plain value stored verbatim.
    KeyValue,
    /// `{"uri": ...}` wrapper pointing at a Key Vault secret.
    KeyVaultReference,
    /// Feature flag descriptor.
    FeatureFlag,
    /// Anything this crate does not interpret (including an empty tag).
    Other(String),
}

impl ContentType {
    /// Parses the wire spelling.
    pub fn from_wire(value: &str) -> Self {
        match value {
            CONTENT_TYPE_KEY_VALUE => ContentType::KeyValue,
            CONTENT_TYPE_KEY_VAULT_REF => ContentType::KeyVaultReference,
            CONTENT_TYPE_FEATURE_FLAG => ContentType::FeatureFlag,
            other => ContentType::Other(other.to_string()),
        }
    }

    /// Returns the wire spelling.
    pub fn as_str(&self) -> &str {
        match self {
            ContentType::KeyValue => CONTENT_TYPE_KEY_VALUE,
            ContentType::KeyVaultReference => CONTENT_TYPE_KEY_VAULT_REF,
            ContentType::FeatureFlag => CONTENT_TYPE_FEATURE_FLAG,
            ContentType::Other(other) => other,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(label, key) -> value` record as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueEntry {
    /// Wire key (feature keys keep their prefix here).
    pub key: String,
    /// Label, normalised so that "no label" is [`Label::None`].
    pub label: Label,
    /// Opaque value; its meaning depends on `content_type`.
    pub value: String,
    /// Tag selecting the payload codec.
    pub content_type: ContentType,
    /// Server-assigned modification timestamp.
    pub last_modified: Option<String>,
    /// Read-only passthrough tags.
    pub tags: BTreeMap<String, String>,
}

/// A feature flag view of a [`KeyValueEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureEntry {
    /// Feature name with the storage prefix stripped.
    pub name: String,
    /// Label of the underlying entry.
    pub label: Label,
    /// Whether the flag is on.
    pub enabled: bool,
    /// Free-form description.
    pub description: String,
    /// Content type of the underlying entry.
    pub content_type: ContentType,
    /// Server-assigned modification timestamp.
    pub last_modified: Option<String>,
    /// Read-only passthrough tags.
    pub tags: BTreeMap<String, String>,
}
