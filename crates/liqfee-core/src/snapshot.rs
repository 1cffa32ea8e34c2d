//! # Snapshot Registry
//!
//! Components holding replicated state implement [`StatefulComponent`] and
//! are registered once at node start-up. A [`Checkpoint`] holds every
//! registered component's payloads ordered by `(namespace, key)`, so two
//! replicas with the same state produce the same bytes and the same hash.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use liqfee_types::{LiquidityError, LiquidityResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// State that must survive a node restart
pub trait StatefulComponent {
    fn namespace(&self) -> &str;

    fn keys(&self) -> Vec<String>;

    fn get_state(&mut self, key: &str) -> LiquidityResult<Vec<u8>>;

    fn load_state(&mut self, key: &str, payload: &[u8]) -> LiquidityResult<()>;
}

/// Component handle shared between the registry and its owner
pub type SharedComponent = Rc<RefCell<dyn StatefulComponent>>;

/// Encode a payload
pub fn encode<T: Serialize>(value: &T) -> LiquidityResult<Vec<u8>> {
    bincode::serialize(value).map_err(LiquidityError::snapshot)
}

/// Decode a payload
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> LiquidityResult<T> {
    bincode::deserialize(payload).map_err(LiquidityError::snapshot)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub namespace: String,
    pub key: String,
    pub payload: Vec<u8>,
}

/// Ordered payloads of every registered component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub entries: Vec<SnapshotEntry>,
}

impl Checkpoint {
    /// SHA-256 over the encoded entries
    pub fn state_hash(&self) -> LiquidityResult<[u8; 32]> {
        let bytes = encode(&self.entries)?;
        let digest = Sha256::digest(&bytes);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);
        Ok(hash)
    }

    pub fn to_bytes(&self) -> LiquidityResult<Vec<u8>> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> LiquidityResult<Self> {
        decode(bytes)
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<&SnapshotEntry> {
        self.entries
            .iter()
            .find(|e| e.namespace == namespace && e.key == key)
    }
}

#[derive(Default)]
pub struct SnapshotRegistry {
    components: Vec<SharedComponent>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component; a `(namespace, key)` pair may be owned only once
    pub fn register(&mut self, component: SharedComponent) -> LiquidityResult<()> {
        let (namespace, keys) = {
            let c = component.borrow();
            (c.namespace().to_string(), c.keys())
        };

        for existing in &self.components {
            let existing = existing.borrow();
            if existing.namespace() != namespace {
                continue;
            }
            if let Some(key) = existing.keys().into_iter().find(|k| keys.contains(k)) {
                return Err(LiquidityError::snapshot(format!(
                    "duplicate registration for {}/{}",
                    namespace, key
                )));
            }
        }

        tracing::debug!(namespace = %namespace, keys = ?keys, "registered stateful component");
        self.components.push(component);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Capture every registered component
    pub fn capture(&self) -> LiquidityResult<Checkpoint> {
        let mut entries = BTreeMap::new();
        for component in &self.components {
            let mut component = component.borrow_mut();
            let namespace = component.namespace().to_string();
            for key in component.keys() {
                let payload = component.get_state(&key)?;
                let slot = (namespace.clone(), key.clone());
                if entries.insert(slot, payload).is_some() {
                    return Err(LiquidityError::snapshot(format!(
                        "duplicate state for {}/{}",
                        namespace, key
                    )));
                }
            }
        }

        Ok(Checkpoint {
            entries: entries
                .into_iter()
                .map(|((namespace, key), payload)| SnapshotEntry {
                    namespace,
                    key,
                    payload,
                })
                .collect(),
        })
    }

    /// Load every entry into the component that owns it
    pub fn restore(&self, checkpoint: &Checkpoint) -> LiquidityResult<()> {
        for entry in &checkpoint.entries {
            let owner = self.components.iter().find(|c| {
                let c = c.borrow();
                c.namespace() == entry.namespace && c.keys().contains(&entry.key)
            });

            match owner {
                Some(component) => component.borrow_mut().load_state(&entry.key, &entry.payload)?,
                None => {
                    return Err(LiquidityError::snapshot(format!(
                        "no component registered for {}/{}",
                        entry.namespace, entry.key
                    )))
                }
            }
        }
        Ok(())
    }
}
