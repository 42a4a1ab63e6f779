//! Reconciler configuration.

use appconf_client::RetryPolicy;

/// Configuration for a [`Reconciler`](crate::Reconciler).
#[derive(Debug, Clone, Default)]
pub struct ReconcilerConfig {
    /// Policy for every read the reconciler issues: the existence check
    /// before a create, the confirmatory read after a write, plain reads
    /// and lookups.
    pub read_retry: RetryPolicy,
}

impl ReconcilerConfig {
    /// Creates a configuration with the eventual-consistency read policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the read retry policy.
    pub fn with_read_retry(mut self, policy: RetryPolicy) -> Self {
        self.read_retry = policy;
        self
    }
}
