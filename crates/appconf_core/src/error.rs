//! Error types shared by the transport and the reconciler.

use thiserror::Error;

/// Result type for App Configuration operations.
pub type AppConfigResult<T> = Result<T, AppConfigError>;

/// Boxed cause attached to unexpected failures.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse taxonomy bucket an error belongs to.
///
/// Callers that only need to branch on the outcome class should match on
/// this rather than on individual [`AppConfigError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote entry does not exist.
    NotFound,
    /// Transport, authorization or decoding failure.
    Unexpected,
    /// The entry already exists remotely and must be imported first.
    NeedsImport,
    /// The caller supplied malformed input (identifier, endpoint, locator).
    InvalidInput,
}

/// Errors that can occur while talking to the remote store.
#[derive(Error, Debug)]
pub enum AppConfigError {
    /// The key-value was not found for the requested label.
    #[error("KV not found ({key})")]
    NotFound {
        /// Wire key that was requested.
        key: String,
    },

    /// The store rejected the call with 403.
    #[error("unexpected error (Forbidden)")]
    Forbidden,

    /// The store rejected the credentials with 401.
    #[error("unexpected error (Unauthorized)")]
    Unauthorized,

    /// The store throttled the call with 429.
    #[error("unexpected error (Requests are throttled)")]
    Throttled,

    /// Any other non-success status.
    #[error("unexpected error (status {status}): {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Connection failure, malformed body or serialization failure.
    #[error("unexpected error ({message})")]
    Unexpected {
        /// What was being attempted.
        message: String,
        /// Underlying cause, when there is one.
        #[source]
        source: Option<BoxedCause>,
    },

    /// Create found an existing remote entry.
    #[error("the resource needs to be imported: {resource} {id}")]
    NeedsImport {
        /// Resource kind (`key_value`, `key_secret`, `feature`).
        resource: &'static str,
        /// Identifier the entry would have once imported.
        id: String,
    },

    /// A persisted identifier could not be decoded.
    #[error("invalid resource identifier: {0}")]
    InvalidIdentifier(String),

    /// The endpoint URL could not be parsed.
    #[error("unable to parse the given endpoint {0}")]
    InvalidEndpoint(String),

    /// A Key Vault secret locator could not be parsed.
    #[error("invalid secret locator: {0}")]
    InvalidSecretLocator(String),
}

impl AppConfigError {
    /// Creates a not-found error for a wire key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates an unexpected error without an underlying cause.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an underlying cause as an unexpected error.
    pub fn wrap<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unexpected {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppConfigError::NotFound { .. } => ErrorKind::NotFound,
            AppConfigError::NeedsImport { .. } => ErrorKind::NeedsImport,
            AppConfigError::InvalidIdentifier(_)
            | AppConfigError::InvalidEndpoint(_)
            | AppConfigError::InvalidSecretLocator(_) => ErrorKind::InvalidInput,
            AppConfigError::Forbidden
            | AppConfigError::Unauthorized
            | AppConfigError::Throttled
            | AppConfigError::UnexpectedStatus { .. }
            | AppConfigError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Returns true if the remote entry was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppConfigError::NotFound { .. })
    }

    /// Returns true if the store throttled the request.
    pub fn is_throttled(&self) -> bool {
        matches!(self, AppConfigError::Throttled)
    }

    /// Returns true if the error is a credentials or permission problem.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AppConfigError::Forbidden | AppConfigError::Unauthorized
        )
    }
}

impl From<serde_json::Error> for AppConfigError {
    fn from(err: serde_json::Error) -> Self {
        AppConfigError::wrap("malformed JSON payload", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn taxonomy_buckets() {
        assert_eq!(AppConfigError::not_found("k").kind(), ErrorKind::NotFound);
        assert_eq!(AppConfigError::Forbidden.kind(), ErrorKind::Unexpected);
        assert_eq!(AppConfigError::Unauthorized.kind(), ErrorKind::Unexpected);
        assert_eq!(AppConfigError::Throttled.kind(), ErrorKind::Unexpected);
        assert_eq!(
            AppConfigError::InvalidIdentifier("x".into()).kind(),
            ErrorKind::InvalidInput
        );
        let err = AppConfigError::NeedsImport {
            resource: "key_value",
            id: "host//k".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NeedsImport);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            AppConfigError::not_found("k1").to_string(),
            "KV not found (k1)"
        );
        assert_eq!(
            AppConfigError::Throttled.to_string(),
            "unexpected error (Requests are throttled)"
        );

        let err = AppConfigError::UnexpectedStatus {
            status: 500,
            body: "boom".into(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn wrapped_cause_is_exposed() {
        let cause = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = AppConfigError::from(cause);
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(err.source().is_some());
        assert!(AppConfigError::unexpected("x").source().is_none());
    }

    #[test]
    fn classification_helpers() {
        assert!(AppConfigError::not_found("k").is_not_found());
        assert!(AppConfigError::Throttled.is_throttled());
        assert!(AppConfigError::Forbidden.is_auth_failure());
        assert!(AppConfigError::Unauthorized.is_auth_failure());
        assert!(!AppConfigError::Throttled.is_auth_failure());
        assert!(!AppConfigError::Forbidden.is_throttled());
    }
}
