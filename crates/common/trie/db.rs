use crate::error::TrieError;
use ethereum_types::H256;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Backend for trie node storage: RLP-encoded nodes keyed by their keccak-256 hash.
pub trait TrieDB: Send + Sync {
    fn get(&self, key: H256) -> Result<Option<Vec<u8>>, TrieError>;
    fn put(&self, key: H256, value: Vec<u8>) -> Result<(), TrieError>;
}

/// Reference in-memory backend, shared between tries via `Arc`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTrieDB {
    inner: Arc<Mutex<HashMap<H256, Vec<u8>>>>,
}

impl InMemoryTrieDB {
    pub fn new(inner: Arc<Mutex<HashMap<H256, Vec<u8>>>>) -> Self {
        Self { inner }
    }

    pub fn new_empty() -> Self {
        Self::default()
    }
}

impl TrieDB for InMemoryTrieDB {
    fn get(&self, key: H256) -> Result<Option<Vec<u8>>, TrieError> {
        Ok(self
            .inner
            .lock()
            .map_err(|_| TrieError::LockError)?
            .get(&key)
            .cloned())
    }

    fn put(&self, key: H256, value: Vec<u8>) -> Result<(), TrieError> {
        self.inner
            .lock()
            .map_err(|_| TrieError::LockError)?
            .insert(key, value);
        Ok(())
    }
}
