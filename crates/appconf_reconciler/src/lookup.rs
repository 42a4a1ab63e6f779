//! Read-only lookups of entries that are not necessarily managed.
//!
//! Unlike [`Reconciler::read`], a missing entry is reported as
//! [`AppConfigError::NotFound`](appconf_core::AppConfigError::NotFound).

use crate::reconciler::{ManagedEntry, Reconciler};
use appconf_core::{
    feature_entry, AppConfigResult, FeatureEntry, Label, PayloadKind, ResourceIdentifier,
};
use tracing::info;

impl Reconciler {
    /// Looks up a plain key-value.
    pub fn lookup_key_value(
        &self,
        endpoint: &str,
        label: &Label,
        key: &str,
    ) -> AppConfigResult<ManagedEntry> {
        let id = ResourceIdentifier::from_endpoint(endpoint, label.clone(), key)?;
        self.lookup(&id, PayloadKind::Plain)
    }

    /// Looks up a Key Vault reference; the exposed value is the locator.
    pub fn lookup_secret_reference(
        &self,
        endpoint: &str,
        label: &Label,
        key: &str,
    ) -> AppConfigResult<ManagedEntry> {
        let id = ResourceIdentifier::from_endpoint(endpoint, label.clone(), key)?;
        self.lookup(&id, PayloadKind::KeyVaultReference)
    }

    /// Looks up a feature flag by name.
    pub fn lookup_feature(
        &self,
        endpoint: &str,
        label: &Label,
        name: &str,
    ) -> AppConfigResult<FeatureEntry> {
        let id = ResourceIdentifier::feature_from_endpoint(endpoint, label.clone(), name)?;
        let managed = self.lookup(&id, PayloadKind::FeatureFlag)?;
        feature_entry(&managed.entry)
    }

    fn lookup(&self, id: &ResourceIdentifier, kind: PayloadKind) -> AppConfigResult<ManagedEntry> {
        info!("Looking up {} {}", kind.resource_name(), id);
        let transport = self.transport(id)?;
        self.fetch(&transport, id, kind)
    }
}
