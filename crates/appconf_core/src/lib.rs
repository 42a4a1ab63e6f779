//! # appconf core
//!
//! Data model and codecs for reconciling declared configuration entries
//! against an App Configuration store.
//!
//! This crate provides:
//! - The entry model ([`KeyValueEntry`], [`FeatureEntry`], [`Label`], [`ContentType`])
//! - The persisted [`ResourceIdentifier`] codec
//! - Payload codecs for plain values, Key Vault references and feature flags
//! - The wire documents exchanged on `/kv/{key}`
//! - The shared error taxonomy
//!
//! Nothing in this crate performs I/O.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod error;
mod identifier;
mod model;
mod payload;
pub mod wire;

pub use error::{AppConfigError, AppConfigResult, BoxedCause, ErrorKind};
pub use identifier::{endpoint_host, IdentifierKind, ResourceIdentifier};
pub use model::{
    ContentType, FeatureEntry, KeyValueEntry, Label, CONTENT_TYPE_FEATURE_FLAG,
    CONTENT_TYPE_KEY_VALUE, CONTENT_TYPE_KEY_VAULT_REF, LABEL_NONE,
};
pub use payload::{
    feature_entry, feature_storage_key, strip_feature_prefix, trim_to_latest_version,
    EncodedPayload, FeatureConditions, FeatureDescriptor, FeatureFlag, KeyVaultReference, Payload,
    PayloadKind, FEATURE_PREFIX,
};
