//! Payload codecs.
//!
//! Every entry value is one of three shapes, each tied to its own wire
//! content type:
//!
//! | Shape | Stored value | Content type |
//! |-------|--------------|--------------|
//! | [`Payload::Plain`] | verbatim | [`CONTENT_TYPE_KEY_VALUE`] |
//! | [`Payload::KeyVaultReference`] | `{"uri":"<locator>"}` | [`CONTENT_TYPE_KEY_VAULT_REF`] |
//! | [`Payload::FeatureFlag`] | feature descriptor JSON | [`CONTENT_TYPE_FEATURE_FLAG`] |
//!
//! Feature flags are additionally stored under [`FEATURE_PREFIX`]`<name>`.
//!
//! [`CONTENT_TYPE_KEY_VALUE`]: crate::CONTENT_TYPE_KEY_VALUE
//! [`CONTENT_TYPE_KEY_VAULT_REF`]: crate::CONTENT_TYPE_KEY_VAULT_REF
//! [`CONTENT_TYPE_FEATURE_FLAG`]: crate::CONTENT_TYPE_FEATURE_FLAG

use crate::error::{AppConfigError, AppConfigResult};
use crate::model::{ContentType, FeatureEntry, KeyValueEntry};
use serde::{Deserialize, Serialize};
use url::Url;

/// Key prefix under which feature flags are stored.
pub const FEATURE_PREFIX: &str = ".appconfig.featureflag/";

/// Returns the storage key of a feature.
pub fn feature_storage_key(name: &str) -> String {
    format!("{FEATURE_PREFIX}{name}")
}

/// Strips the feature prefix from a storage key, if present.
pub fn strip_feature_prefix(key: &str) -> &str {
    key.strip_prefix(FEATURE_PREFIX).unwrap_or(key)
}

/// Which codec governs an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// Plain text value.
    Plain,
    /// Key Vault secret reference.
    KeyVaultReference,
    /// Feature flag descriptor.
    FeatureFlag,
}

impl PayloadKind {
    /// Content type written for this kind.
    pub fn content_type(self) -> ContentType {
        match self {
            PayloadKind::Plain => ContentType::KeyValue,
            PayloadKind::KeyVaultReference => ContentType::KeyVaultReference,
            PayloadKind::FeatureFlag => ContentType::FeatureFlag,
        }
    }

    /// Resource name used in diagnostics.
    pub fn resource_name(self) -> &'static str {
        match self {
            PayloadKind::Plain => "key_value",
            PayloadKind::KeyVaultReference => "key_secret",
            PayloadKind::FeatureFlag => "feature",
        }
    }

    /// Maps a logical key onto the key stored remotely.
    pub fn storage_key(self, key: &str) -> String {
        match self {
            PayloadKind::FeatureFlag => feature_storage_key(key),
            PayloadKind::Plain | PayloadKind::KeyVaultReference => key.to_string(),
        }
    }
}

/// `{"uri": ...}` wrapper stored for Key Vault references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyVaultReference {
    /// Secret locator.
    #[serde(alias = "URI", alias = "Uri")]
    pub uri: String,
}

impl KeyVaultReference {
    /// Wraps a secret locator as-is.
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            uri: locator.into(),
        }
    }

    /// Wraps a secret locator, optionally stripping its version segment.
    pub fn with_latest_version(locator: &str, latest_version: bool) -> AppConfigResult<Self> {
        if latest_version {
            Ok(Self::new(trim_to_latest_version(locator)?))
        } else {
            Ok(Self::new(locator))
        }
    }

    /// Serializes to the stored value string.
    pub fn encode(&self) -> AppConfigResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a stored value string.
    pub fn decode(value: &str) -> AppConfigResult<Self> {
        Ok(serde_json::from_str(value)?)
    }
}

/// Removes the version segment from a secret locator.
///
/// A locator such as `https://vault/secrets/name/v1` has exactly four path
/// segments (the leading empty one included); only then is the last one
/// dropped. Only the path is rewritten and the rest of the locator is kept
/// byte-for-byte. Other locators are returned unchanged.
pub fn trim_to_latest_version(locator: &str) -> AppConfigResult<String> {
    Url::parse(locator).map_err(|e| AppConfigError::InvalidSecretLocator(format!("{locator}: {e}")))?;

    let authority_start = locator.find("://").map_or(0, |i| i + 3);
    let Some(path_start) = locator[authority_start..]
        .find(['/', '?', '#'])
        .map(|i| authority_start + i)
        .filter(|&i| locator[i..].starts_with('/'))
    else {
        return Ok(locator.to_string());
    };
    let path_end = locator[path_start..]
        .find(['?', '#'])
        .map_or(locator.len(), |i| path_start + i);

    let path = &locator[path_start..path_end];
    match path.rfind('/') {
        Some(cut) if path.split('/').count() == 4 => Ok(format!(
            "{}{}",
            &locator[..path_start + cut],
            &locator[path_end..]
        )),
        _ => Ok(locator.to_string()),
    }
}

/// Client filter section of a feature descriptor; always empty here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureConditions {
    /// Client filters.
    #[serde(default)]
    pub client_filters: Vec<serde_json::Value>,
}

/// Feature flag descriptor stored as the entry value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    /// Feature name (unprefixed).
    pub id: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Whether the flag is on.
    #[serde(default)]
    pub enabled: bool,
    /// Activation conditions.
    #[serde(default)]
    pub conditions: FeatureConditions,
}

impl FeatureDescriptor {
    /// Builds a descriptor with no client filters.
    pub fn new(name: impl Into<String>, enabled: bool, description: impl Into<String>) -> Self {
        Self {
            id: name.into(),
            description: description.into(),
            enabled,
            conditions: FeatureConditions::default(),
        }
    }

    /// Serializes to the stored value string.
    pub fn encode(&self) -> AppConfigResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a stored value string.
    pub fn decode(value: &str) -> AppConfigResult<Self> {
        Ok(serde_json::from_str(value)?)
    }
}

/// Declared feature flag state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureFlag {
    /// Whether the flag is on.
    pub enabled: bool,
    /// Free-form description.
    pub description: String,
}

/// A value together with the codec that governs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Stored verbatim.
    Plain(String),
    /// Wrapped as `{"uri": ...}`.
    KeyVaultReference(KeyVaultReference),
    /// Serialized as a feature descriptor.
    FeatureFlag(FeatureFlag),
}

/// What is actually sent in a PUT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Storage key (prefixed for features).
    pub key: String,
    /// Encoded value string.
    pub value: String,
    /// Content type tag.
    pub content_type: ContentType,
}

impl Payload {
    /// Plain value payload.
    pub fn plain(value: impl Into<String>) -> Self {
        Payload::Plain(value.into())
    }

    /// Key Vault reference payload, optionally tracking the latest version.
    pub fn secret_reference(locator: &str, latest_version: bool) -> AppConfigResult<Self> {
        Ok(Payload::KeyVaultReference(KeyVaultReference::with_latest_version(
            locator,
            latest_version,
        )?))
    }

    /// Feature flag payload.
    pub fn feature(enabled: bool, description: impl Into<String>) -> Self {
        Payload::FeatureFlag(FeatureFlag {
            enabled,
            description: description.into(),
        })
    }

    /// Codec kind of this payload.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Plain(_) => PayloadKind::Plain,
            Payload::KeyVaultReference(_) => PayloadKind::KeyVaultReference,
            Payload::FeatureFlag(_) => PayloadKind::FeatureFlag,
        }
    }

    /// Content type written for this payload.
    pub fn content_type(&self) -> ContentType {
        self.kind().content_type()
    }

    /// Encodes this payload for the logical `key` (feature name for flags).
    pub fn encode(&self, key: &str) -> AppConfigResult<EncodedPayload> {
        let value = match self {
            Payload::Plain(value) => value.clone(),
            Payload::KeyVaultReference(reference) => reference.encode()?,
            Payload::FeatureFlag(flag) => {
                FeatureDescriptor::new(key, flag.enabled, flag.description.clone()).encode()?
            }
        };

        Ok(EncodedPayload {
            key: self.kind().storage_key(key),
            value,
            content_type: self.content_type(),
        })
    }

    /// Decodes a stored entry with the codec for `kind`.
    pub fn decode(kind: PayloadKind, entry: &KeyValueEntry) -> AppConfigResult<Self> {
        match kind {
            PayloadKind::Plain => Ok(Payload::Plain(entry.value.clone())),
            PayloadKind::KeyVaultReference => Ok(Payload::KeyVaultReference(
                KeyVaultReference::decode(&entry.value)?,
            )),
            PayloadKind::FeatureFlag => {
                let descriptor = FeatureDescriptor::decode(&entry.value)?;
                Ok(Payload::FeatureFlag(FeatureFlag {
                    enabled: descriptor.enabled,
                    description: descriptor.description,
                }))
            }
        }
    }

    /// Value exposed to callers: the plain value, the secret locator, or
    /// the feature description.
    pub fn exposed_value(&self) -> &str {
        match self {
            Payload::Plain(value) => value,
            Payload::KeyVaultReference(reference) => &reference.uri,
            Payload::FeatureFlag(flag) => &flag.description,
        }
    }
}

/// Builds the feature view of a stored entry.
pub fn feature_entry(entry: &KeyValueEntry) -> AppConfigResult<FeatureEntry> {
    let descriptor = FeatureDescriptor::decode(&entry.value)?;

    Ok(FeatureEntry {
        name: strip_feature_prefix(&entry.key).to_string(),
        label: entry.label.clone(),
        enabled: descriptor.enabled,
        description: descriptor.description,
        content_type: entry.content_type.clone(),
        last_modified: entry.last_modified.clone(),
        tags: entry.tags.clone(),
    })
}
