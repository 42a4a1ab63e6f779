//! Declared entries as supplied by a configuration front-end.

use appconf_core::{AppConfigResult, Label, Payload, PayloadKind, ResourceIdentifier};

/// One entry the caller wants to exist remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Store endpoint, e.g. `https://my-store.azconfig.io`.
    pub endpoint: String,
    /// Label; immutable once created.
    pub label: Label,
    /// Logical key (feature name for flags); immutable once created.
    pub key: String,
    /// Desired value.
    pub payload: Payload,
}

impl Declaration {
    /// Declares a plain key-value.
    pub fn key_value(
        endpoint: impl Into<String>,
        label: Label,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            label,
            key: key.into(),
            payload: Payload::plain(value),
        }
    }

    /// Declares a Key Vault reference.
    ///
    /// With `latest_version` the locator's version segment is dropped so the
    /// reference always resolves to the newest secret version.
    pub fn secret_reference(
        endpoint: impl Into<String>,
        label: Label,
        key: impl Into<String>,
        locator: &str,
        latest_version: bool,
    ) -> AppConfigResult<Self> {
        Ok(Self {
            endpoint: endpoint.into(),
            label,
            key: key.into(),
            payload: Payload::secret_reference(locator, latest_version)?,
        })
    }

    /// Declares a feature flag.
    pub fn feature(
        endpoint: impl Into<String>,
        label: Label,
        name: impl Into<String>,
        enabled: bool,
        description: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            label,
            key: name.into(),
            payload: Payload::feature(enabled, description),
        }
    }

    /// Codec kind of the declared payload.
    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }

    /// Identifier the entry gets once managed.
    pub fn identifier(&self) -> AppConfigResult<ResourceIdentifier> {
        match self.kind() {
            PayloadKind::FeatureFlag => ResourceIdentifier::feature_from_endpoint(
                &self.endpoint,
                self.label.clone(),
                self.key.as_str(),
            ),
            PayloadKind::Plain | PayloadKind::KeyVaultReference => {
                ResourceIdentifier::from_endpoint(&self.endpoint, self.label.clone(), self.key.as_str())
            }
        }
    }
}
