use serde::{Deserialize, Serialize};

/// An opaque rotating shared secret. NTS ships the bytes to agents but
/// never inspects them - see the `KeyStore` capability in `ports.rs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterKey {
    pub key_id: i32,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

impl MasterKey {
    pub fn new(key_id: i32, bytes: Vec<u8>) -> Self {
        Self { key_id, bytes }
    }
}

/// `current`/`next` are the only two slots NTS ever reads; rotation
/// itself is driven externally.
pub trait KeyStore: Send + Sync {
    fn current_key(&self) -> MasterKey;
    fn next_key(&self) -> Option<MasterKey>;
}

/// In-memory `KeyStore` suitable for tests and single-process deployments.
/// Rotation is performed by replacing the `next` slot and later promoting
/// it to `current` via `roll`.
pub struct StaticKeyStore {
    inner: std::sync::RwLock<StaticKeyStoreInner>,
}

struct StaticKeyStoreInner {
    current: MasterKey,
    next: Option<MasterKey>,
}

impl StaticKeyStore {
    pub fn new(current: MasterKey) -> Self {
        Self {
            inner: std::sync::RwLock::new(StaticKeyStoreInner {
                current,
                next: None,
            }),
        }
    }

    /// Stage a new key as `next` without yet promoting it.
    pub fn stage_next(&self, key: MasterKey) {
        self.inner.write().unwrap().next = Some(key);
    }

    /// Promote the staged `next` key to `current`, clearing `next`.
    pub fn roll(&self) {
        let mut inner = self.inner.write().unwrap();
        if let Some(next) = inner.next.take() {
            inner.current = next;
        }
    }
}

impl KeyStore for StaticKeyStore {
    fn current_key(&self) -> MasterKey {
        self.inner.read().unwrap().current.clone()
    }

    fn next_key(&self) -> Option<MasterKey> {
        self.inner.read().unwrap().next.clone()
    }
}

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex_encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex_decode(&s).map_err(serde::de::Error::custom)
    }

    fn hex_encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn hex_decode(s: &str) -> Result<Vec<u8>, String> {
        if s.len() % 2 != 0 {
            return Err("odd-length hex string".to_string());
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| e.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_promotes_staged_key() {
        let store = StaticKeyStore::new(MasterKey::new(1, vec![0xaa]));
        assert_eq!(store.current_key().key_id, 1);
        assert!(store.next_key().is_none());

        store.stage_next(MasterKey::new(2, vec![0xbb]));
        assert_eq!(store.next_key().unwrap().key_id, 2);
        assert_eq!(store.current_key().key_id, 1);

        store.roll();
        assert_eq!(store.current_key().key_id, 2);
        assert!(store.next_key().is_none());
    }

    #[test]
    fn test_hex_roundtrip() {
        let key = MasterKey::new(9, vec![1, 2, 3, 255]);
        let json = serde_json::to_string(&key).unwrap();
        let back: MasterKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }
}
