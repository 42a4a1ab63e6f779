//! Request authorization.
//!
//! Credential acquisition (service principal, CLI session, managed
//! identity) lives outside this crate. The transport only needs something
//! that can stamp proof of identity onto an outgoing request.

use crate::http::HttpRequest;
use appconf_core::AppConfigResult;
use std::fmt;

/// Decorates outgoing requests with proof of identity.
pub trait Authorizer: Send + Sync {
    /// Adds credentials to `request`.
    fn authorize(&self, request: &mut HttpRequest) -> AppConfigResult<()>;
}

/// Sends a fixed bearer token.
#[derive(Clone)]
pub struct BearerTokenAuthorizer {
    token: String,
}

impl BearerTokenAuthorizer {
    /// Creates an authorizer for an already-acquired access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerTokenAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenAuthorizer")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Authorizer for BearerTokenAuthorizer {
    fn authorize(&self, request: &mut HttpRequest) -> AppConfigResult<()> {
        request.set_header("Authorization", format!("Bearer {}", self.token));
        Ok(())
    }
}

/// Leaves requests untouched (emulators, loopback stores).
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthorizer;

impl Authorizer for AnonymousAuthorizer {
    fn authorize(&self, _request: &mut HttpRequest) -> AppConfigResult<()> {
        Ok(())
    }
}
