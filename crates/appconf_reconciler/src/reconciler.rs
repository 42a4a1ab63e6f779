//! The per-entry create/read/update/delete/import state machine.
//!
//! An entry moves `absent -> managed -> (updated)* -> absent`. The caller
//! persists only the [`ResourceIdentifier`] between runs; everything else
//! is re-read from the store.
//!
//! ## Policies
//!
//! - Create never adopts an entry that already exists remotely: it fails
//!   with [`AppConfigError::NeedsImport`].
//! - Read turns a not-found into [`ReadOutcome::Absent`] so out-of-band
//!   deletions show up as drift instead of failures. Every other error
//!   propagates.
//! - Delete is idempotent.
//! - Label and key never change after creation; only the payload is
//!   updated.

use crate::config::ReconcilerConfig;
use crate::declaration::Declaration;
use appconf_client::{ClientRegistry, Transport};
use appconf_core::{
    feature_storage_key, AppConfigError, AppConfigResult, FeatureEntry, IdentifierKind,
    KeyValueEntry, Label, Payload, PayloadKind, ResourceIdentifier,
};
use std::sync::Arc;
use tracing::{debug, info};

/// An entry under management.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedEntry {
    /// Persisted identity.
    pub id: ResourceIdentifier,
    /// Entry as last read from the store.
    pub entry: KeyValueEntry,
    /// Decoded payload.
    pub payload: Payload,
}

impl ManagedEntry {
    /// Value exposed to the caller: the plain value, the secret locator or
    /// the feature description.
    pub fn value(&self) -> &str {
        self.payload.exposed_value()
    }

    /// Label of the entry.
    pub fn label(&self) -> &Label {
        &self.entry.label
    }

    /// Feature view, for feature flag entries.
    pub fn as_feature(&self) -> Option<FeatureEntry> {
        match &self.payload {
            Payload::FeatureFlag(flag) => Some(FeatureEntry {
                name: self.id.key().to_string(),
                label: self.entry.label.clone(),
                enabled: flag.enabled,
                description: flag.description.clone(),
                content_type: self.entry.content_type.clone(),
                last_modified: self.entry.last_modified.clone(),
                tags: self.entry.tags.clone(),
            }),
            Payload::Plain(_) | Payload::KeyVaultReference(_) => None,
        }
    }
}

/// Result of reading a managed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The entry exists.
    Present(ManagedEntry),
    /// The entry is gone; the caller should drop it from its state.
    Absent,
}

impl ReadOutcome {
    /// Returns the entry if present.
    pub fn into_present(self) -> Option<ManagedEntry> {
        match self {
            ReadOutcome::Present(entry) => Some(entry),
            ReadOutcome::Absent => None,
        }
    }

    /// Returns true if the entry is gone.
    pub fn is_absent(&self) -> bool {
        matches!(self, ReadOutcome::Absent)
    }
}

/// Drives entries through their lifecycle against the stores in a
/// [`ClientRegistry`].
///
/// A reconciler holds no per-entry state and can be shared between threads;
/// distinct entries may be reconciled in parallel.
#[derive(Debug)]
pub struct Reconciler {
    registry: Arc<ClientRegistry>,
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Creates a reconciler with the default configuration.
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self::with_config(registry, ReconcilerConfig::default())
    }

    /// Creates a reconciler with a custom configuration.
    pub fn with_config(registry: Arc<ClientRegistry>, config: ReconcilerConfig) -> Self {
        Self { registry, config }
    }

    /// Returns the client registry.
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Creates a declared entry that must not exist yet.
    ///
    /// # Errors
    ///
    /// [`AppConfigError::NeedsImport`] if `(label, key)` already exists
    /// remotely, whatever its value.
    pub fn create(&self, declaration: &Declaration) -> AppConfigResult<ManagedEntry> {
        let id = declaration.identifier()?;
        let kind = declaration.kind();
        let transport = self.transport(&id)?;
        let storage_key = storage_key(&id, kind)?;

        info!("Creating {} {}", kind.resource_name(), id);

        match transport.get_with_retry(&declaration.label, &storage_key, &self.config.read_retry) {
            Ok(_) => {
                return Err(AppConfigError::NeedsImport {
                    resource: kind.resource_name(),
                    id: id.encode(),
                })
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        transport.set_payload(&declaration.label, &declaration.key, &declaration.payload)?;
        self.fetch(&transport, &id, kind)
    }

    /// Reads a managed entry.
    ///
    /// A not-found (after retries) yields [`ReadOutcome::Absent`]; every
    /// other failure is returned as an error.
    pub fn read(&self, id: &ResourceIdentifier, kind: PayloadKind) -> AppConfigResult<ReadOutcome> {
        let transport = self.transport(id)?;
        match self.fetch(&transport, id, kind) {
            Ok(managed) => Ok(ReadOutcome::Present(managed)),
            Err(err) if err.is_not_found() => {
                info!("{} {} not found, removing from state", kind.resource_name(), id);
                Ok(ReadOutcome::Absent)
            }
            Err(err) => Err(err),
        }
    }

    /// Overwrites the payload of a managed entry and reads it back.
    pub fn update(&self, id: &ResourceIdentifier, payload: &Payload) -> AppConfigResult<ManagedEntry> {
        let kind = payload.kind();
        storage_key(id, kind)?;
        let transport = self.transport(id)?;

        info!("Updating {} {}", kind.resource_name(), id);
        transport.set_payload(id.label(), id.key(), payload)?;
        self.fetch(&transport, id, kind)
    }

    /// Deletes a managed entry. Deleting an absent entry succeeds.
    pub fn delete(&self, id: &ResourceIdentifier) -> AppConfigResult<()> {
        let transport = self.transport(id)?;
        let key = match id.kind() {
            IdentifierKind::KeyValue => id.key().to_string(),
            IdentifierKind::Feature => feature_storage_key(id.key()),
        };

        info!("Deleting {}", id);
        let removed = transport.delete(id.label(), &key)?;
        if !removed {
            debug!("{} was already absent", id);
        }
        Ok(())
    }

    /// Adopts an entry that was not created by this reconciler.
    ///
    /// # Errors
    ///
    /// [`AppConfigError::NotFound`] if the entry does not exist.
    pub fn import(&self, id: &str, kind: PayloadKind) -> AppConfigResult<ManagedEntry> {
        let id = ResourceIdentifier::decode(id)?;
        info!("Importing {} {}", kind.resource_name(), id);

        match self.read(&id, kind)? {
            ReadOutcome::Present(managed) => Ok(managed),
            ReadOutcome::Absent => Err(AppConfigError::not_found(storage_key(&id, kind)?)),
        }
    }

    pub(crate) fn transport(&self, id: &ResourceIdentifier) -> AppConfigResult<Arc<Transport>> {
        self.registry.get_or_create(&id.endpoint())
    }

    /// Retried read of `id`, decoded with the codec for `kind`.
    pub(crate) fn fetch(
        &self,
        transport: &Transport,
        id: &ResourceIdentifier,
        kind: PayloadKind,
    ) -> AppConfigResult<ManagedEntry> {
        let key = storage_key(id, kind)?;
        info!("Fetching {} {}", kind.resource_name(), id);

        let entry = transport.get_with_retry(id.label(), &key, &self.config.read_retry)?;
        let payload = Payload::decode(kind, &entry)?;

        match &payload {
            Payload::Plain(value) => debug!("{} has been fetched: {}", id, value),
            _ => info!("{} has been fetched: {}", id, payload.exposed_value()),
        }

        Ok(ManagedEntry {
            id: id.clone(),
            entry,
            payload,
        })
    }
}

/// Wire key for `id` read with the codec for `kind`.
///
/// Feature flags are only reachable through feature identifiers and
/// vice versa.
pub(crate) fn storage_key(id: &ResourceIdentifier, kind: PayloadKind) -> AppConfigResult<String> {
    match (id.kind(), kind) {
        (IdentifierKind::Feature, PayloadKind::FeatureFlag) => Ok(feature_storage_key(id.key())),
        (IdentifierKind::KeyValue, PayloadKind::Plain | PayloadKind::KeyVaultReference) => {
            Ok(id.key().to_string())
        }
        (IdentifierKind::Feature, _) => Err(AppConfigError::InvalidIdentifier(format!(
            "{id} identifies a feature, not a {}",
            kind.resource_name()
        ))),
        (IdentifierKind::KeyValue, _) => Err(AppConfigError::InvalidIdentifier(format!(
            "{id} does not identify a feature"
        ))),
    }
}
