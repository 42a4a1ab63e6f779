//! CLI command implementations.

pub mod delete;
pub mod lookup;
pub mod read;
pub mod write;

use appconf_core::{FeatureEntry, PayloadKind, ResourceIdentifier};
use appconf_reconciler::ManagedEntry;
use clap::ValueEnum;
use serde::Serialize;

/// Kind of entry a command operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    /// Plain key-value
    KeyValue,
    /// Key Vault secret reference
    Secret,
    /// Feature flag
    Feature,
}

impl From<Kind> for PayloadKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::KeyValue => PayloadKind::Plain,
            Kind::Secret => PayloadKind::KeyVaultReference,
            Kind::Feature => PayloadKind::FeatureFlag,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable
    Text,
    /// JSON
    Json,
}

/// What a command prints for one entry.
#[derive(Debug, Serialize)]
pub struct EntryReport {
    /// Persisted identifier.
    pub id: String,
    /// Logical key (feature name for flags).
    pub key: String,
    /// Label, `%00` for none.
    pub label: String,
    /// Exposed value: plain value, secret locator or feature description.
    pub value: String,
    /// Content type tag.
    pub content_type: String,
    /// Feature state, for flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Server timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl EntryReport {
    /// Builds a report for a managed entry.
    pub fn from_managed(managed: &ManagedEntry) -> Self {
        Self {
            id: managed.id.encode(),
            key: managed.id.key().to_string(),
            label: managed.label().as_declared().to_string(),
            value: managed.value().to_string(),
            content_type: managed.entry.content_type.to_string(),
            enabled: managed.as_feature().map(|feature| feature.enabled),
            last_modified: managed.entry.last_modified.clone(),
        }
    }

    /// Builds a report for a looked-up feature.
    pub fn from_feature(id: &ResourceIdentifier, feature: &FeatureEntry) -> Self {
        Self {
            id: id.encode(),
            key: feature.name.clone(),
            label: feature.label.as_declared().to_string(),
            value: feature.description.clone(),
            content_type: feature.content_type.to_string(),
            enabled: Some(feature.enabled),
            last_modified: feature.last_modified.clone(),
        }
    }

    /// Prints the report.
    pub fn print(&self, format: Format) -> Result<(), Box<dyn std::error::Error>> {
        match format {
            Format::Json => println!("{}", serde_json::to_string_pretty(self)?),
            Format::Text => {
                println!("id:            {}", self.id);
                println!("key:           {}", self.key);
                println!("label:         {}", self.label);
                println!("value:         {}", self.value);
                println!("content type:  {}", self.content_type);
                if let Some(enabled) = self.enabled {
                    println!("enabled:       {}", enabled);
                }
                if let Some(last_modified) = &self.last_modified {
                    println!("last modified: {}", last_modified);
                }
            }
        }
        Ok(())
    }
}
