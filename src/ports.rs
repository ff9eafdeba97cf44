//! Collaborator ports: rack resolution and the two named token
//! master-key stores. Both token stores are backed by the same
//! [`crate::types::KeyStore`] machinery but are kept as distinct named
//! traits since container-token and NM-token rotation are independently
//! rollable.

use crate::types::{KeyStore, MasterKey, NodeId};

/// Resolves a reporting host to its rack path. The
/// default implementation below never fails; a production deployment
/// would consult topology scripts or a DNS-based table instead.
pub trait RackResolver: Send + Sync {
    fn resolve(&self, host: &str) -> String;
}

#[derive(Debug, Default)]
pub struct DefaultRackResolver;

impl RackResolver for DefaultRackResolver {
    fn resolve(&self, _host: &str) -> String {
        "/default-rack".to_string()
    }
}

/// Rotatable key material handed back to nodes in every
/// register/heartbeat response.
pub trait ContainerTokenSecretManager: Send + Sync {
    fn current_key(&self) -> MasterKey;
    fn next_key(&self) -> Option<MasterKey>;
    fn is_known_key_id(&self, key_id: i32) -> bool;
}

/// Same shape as `ContainerTokenSecretManager`, independent rotation cadence.
pub trait NMTokenSecretManager: Send + Sync {
    fn current_key(&self) -> MasterKey;
    fn next_key(&self) -> Option<MasterKey>;
    fn is_known_key_id(&self, key_id: i32) -> bool;
    /// Drop any cached key entry held for this node, called on every
    /// register so a reconnecting node can't be served a stale mapping.
    fn remove_node_key(&self, node_id: &NodeId);
}

/// Adapts any [`KeyStore`] into a named token-manager port.
pub struct KeyStoreTokenManager<K> {
    store: K,
}

impl<K: KeyStore> KeyStoreTokenManager<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    fn known(&self, key_id: i32) -> bool {
        self.store.current_key().key_id == key_id
            || self.store.next_key().map(|k| k.key_id) == Some(key_id)
    }
}

impl<K: KeyStore> ContainerTokenSecretManager for KeyStoreTokenManager<K> {
    fn current_key(&self) -> MasterKey {
        self.store.current_key()
    }

    fn next_key(&self) -> Option<MasterKey> {
        self.store.next_key()
    }

    fn is_known_key_id(&self, key_id: i32) -> bool {
        self.known(key_id)
    }
}

impl<K: KeyStore> NMTokenSecretManager for KeyStoreTokenManager<K> {
    fn current_key(&self) -> MasterKey {
        self.store.current_key()
    }

    fn next_key(&self) -> Option<MasterKey> {
        self.store.next_key()
    }

    fn is_known_key_id(&self, key_id: i32) -> bool {
        self.known(key_id)
    }

    fn remove_node_key(&self, _node_id: &NodeId) {
        // The master-key store is a global two-slot rotation with no
        // per-node cache; nothing to drop here.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StaticKeyStore;

    #[test]
    fn test_default_rack_resolver() {
        let resolver = DefaultRackResolver;
        assert_eq!(resolver.resolve("any-host"), "/default-rack");
    }

    #[test]
    fn test_known_key_id_matches_current_and_next() {
        let store = StaticKeyStore::new(MasterKey {
            key_id: 1,
            bytes: vec![1, 2, 3],
        });
        store.stage_next(MasterKey {
            key_id: 2,
            bytes: vec![4, 5, 6],
        });
        let manager = KeyStoreTokenManager::new(store);
        assert!(ContainerTokenSecretManager::is_known_key_id(&manager, 1));
        assert!(ContainerTokenSecretManager::is_known_key_id(&manager, 2));
        assert!(!ContainerTokenSecretManager::is_known_key_id(&manager, 3));
    }
}
