//! # appconf reconciler
//!
//! Converges the entries of an App Configuration store onto declared
//! state, one entry at a time.
//!
//! This crate provides:
//! - [`Reconciler`]: create / read / update / delete / import of plain
//!   key-values, Key Vault references and feature flags
//! - Read-only lookups for entries that are not managed
//! - [`Declaration`]: the desired state of one entry
//! - [`ReconcilerConfig`]: read retry policy
//!
//! ## Eventual consistency
//!
//! The store may answer 404 for an entry that was just written. Every
//! read the reconciler issues goes through the configured
//! [`RetryPolicy`](appconf_client::RetryPolicy), which by default makes 5
//! attempts 500 ms apart before concluding the entry is absent.
//!
//! ## Example
//!
//! ```
//! use appconf_client::{
//!     AnonymousAuthorizer, ClientConfig, ClientRegistry, InMemoryStore, RetryPolicy, Transport,
//! };
//! use appconf_core::{Label, Payload, PayloadKind};
//! use appconf_reconciler::{Declaration, Reconciler, ReconcilerConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let registry = ClientRegistry::new(move |endpoint| {
//!     Ok(Transport::new(endpoint, store.clone(), Arc::new(AnonymousAuthorizer), ClientConfig::default()))
//! });
//! let config = ReconcilerConfig::new()
//!     .with_read_retry(RetryPolicy::new(5).with_initial_delay(Duration::from_millis(10)));
//! let reconciler = Reconciler::with_config(Arc::new(registry), config);
//!
//! let declaration = Declaration::key_value("https://store.azconfig.io", Label::None, "k1", "v1");
//! let managed = reconciler.create(&declaration)?;
//! assert_eq!(managed.id.encode(), "store.azconfig.io//k1");
//!
//! let managed = reconciler.update(&managed.id, &Payload::plain("v2"))?;
//! assert_eq!(managed.value(), "v2");
//!
//! reconciler.delete(&managed.id)?;
//! assert!(reconciler.read(&managed.id, PayloadKind::Plain)?.is_absent());
//! # Ok::<(), appconf_core::AppConfigError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod declaration;
mod lookup;
mod reconciler;

pub use config::ReconcilerConfig;
pub use declaration::Declaration;
pub use reconciler::{ManagedEntry, ReadOutcome, Reconciler};
