//! Endpoint-keyed transport cache.

use crate::auth::Authorizer;
use crate::config::ClientConfig;
use crate::transport::Transport;
use appconf_core::AppConfigResult;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type TransportFactory = dyn Fn(&str) -> AppConfigResult<Transport> + Send + Sync;

/// Memoizes one [`Transport`] per endpoint.
///
/// Concurrent [`get_or_create`](Self::get_or_create) calls for the same
/// endpoint always observe the same transport; the factory may run more
/// than once under a race but only one result is kept.
pub struct ClientRegistry {
    factory: Box<TransportFactory>,
    transports: RwLock<HashMap<String, Arc<Transport>>>,
}

impl ClientRegistry {
    /// Creates a registry that builds transports with `factory`.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&str) -> AppConfigResult<Transport> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            transports: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry of `reqwest`-backed transports sharing one
    /// authorizer and configuration.
    pub fn with_authorizer(authorizer: Arc<dyn Authorizer>, config: ClientConfig) -> Self {
        Self::new(move |endpoint| {
            Transport::connect(endpoint, Arc::clone(&authorizer), config.clone())
        })
    }

    /// Returns the transport for `endpoint`, creating it on first use.
    pub fn get_or_create(&self, endpoint: &str) -> AppConfigResult<Arc<Transport>> {
        if let Some(transport) = self.transports.read().get(endpoint) {
            return Ok(Arc::clone(transport));
        }

        let created = Arc::new((self.factory)(endpoint)?);

        let mut transports = self.transports.write();
        let transport = transports
            .entry(endpoint.to_string())
            .or_insert_with(|| {
                debug!("Created transport for {}", endpoint);
                created
            });
        Ok(Arc::clone(transport))
    }

    /// Returns true if a transport exists for `endpoint`.
    pub fn contains(&self, endpoint: &str) -> bool {
        self.transports.read().contains_key(endpoint)
    }

    /// Number of cached transports.
    pub fn len(&self) -> usize {
        self.transports.read().len()
    }

    /// Returns true if no transport has been created yet.
    pub fn is_empty(&self) -> bool {
        self.transports.read().is_empty()
    }

    /// Drops every cached transport.
    pub fn clear(&self) {
        self.transports.write().clear();
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transports = self.transports.read();
        let mut endpoints: Vec<&String> = transports.keys().collect();
        endpoints.sort();
        f.debug_struct("ClientRegistry")
            .field("endpoints", &endpoints)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AnonymousAuthorizer;
    use crate::loopback::InMemoryStore;
    use appconf_core::AppConfigError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn loopback_registry(calls: Arc<AtomicUsize>) -> ClientRegistry {
        ClientRegistry::new(move |endpoint| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Transport::new(
                endpoint,
                Arc::new(InMemoryStore::new()),
                Arc::new(AnonymousAuthorizer),
                ClientConfig::default(),
            ))
        })
    }

    #[test]
    fn transports_are_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = loopback_registry(calls.clone());

        let a = registry.get_or_create("https://a.example.io").unwrap();
        let b = registry.get_or_create("https://a.example.io").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        registry.get_or_create("https://b.example.io").unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("https://b.example.io"));
    }

    #[test]
    fn concurrent_callers_share_one_transport() {
        let registry = loopback_registry(Arc::new(AtomicUsize::new(0)));

        let transports: Vec<Arc<Transport>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.get_or_create("https://a.example.io").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(registry.len(), 1);
        for transport in &transports[1..] {
            assert!(Arc::ptr_eq(&transports[0], transport));
        }
    }

    #[test]
    fn factory_errors_are_not_cached() {
        let registry = ClientRegistry::new(|_| Err(AppConfigError::unexpected("no credentials")));
        assert!(registry.get_or_create("https://a.example.io").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_drops_transports() {
        let registry = loopback_registry(Arc::new(AtomicUsize::new(0)));
        registry.get_or_create("https://a.example.io").unwrap();
        registry.clear();
        assert!(!registry.contains("https://a.example.io"));
    }
}
