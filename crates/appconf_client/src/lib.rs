//! # appconf client
//!
//! Blocking transport for an App Configuration store's `/kv/{key}`
//! endpoint.
//!
//! This crate provides:
//! - [`Transport`]: typed get/set/delete against one endpoint, with
//!   status classification and read retries
//! - [`ClientRegistry`]: one memoized transport per endpoint
//! - [`HttpClient`] and [`Authorizer`] seams, with a `reqwest` client and
//!   bearer-token authorization
//! - [`InMemoryStore`]: an in-process store speaking the same protocol,
//!   able to simulate visibility lag and error statuses
//!
//! ## Example
//!
//! ```
//! use appconf_client::{AnonymousAuthorizer, ClientConfig, InMemoryStore, Transport};
//! use appconf_core::{ContentType, Label};
//! use std::sync::Arc;
//!
//! let transport = Transport::new(
//!     "https://store.example.io",
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(AnonymousAuthorizer),
//!     ClientConfig::default(),
//! );
//!
//! transport.set(&Label::None, "color", "blue", &ContentType::KeyValue)?;
//! let entry = transport.get(&Label::None, "color")?;
//! assert_eq!(entry.value, "blue");
//! # Ok::<(), appconf_core::AppConfigError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod http;
mod loopback;
mod registry;
mod transport;

pub use auth::{AnonymousAuthorizer, Authorizer, BearerTokenAuthorizer};
pub use config::{ClientConfig, RetryCondition, RetryPolicy};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, ReqwestClient};
pub use loopback::{InMemoryStore, RecordedRequest};
pub use registry::ClientRegistry;
pub use transport::Transport;
