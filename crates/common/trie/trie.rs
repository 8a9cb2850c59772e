pub mod db;
pub mod error;
pub mod nibbles;
pub mod node;
pub mod node_hash;

use ethereum_types::H256;
use hearth_rlp::constants::RLP_NULL;
use hearth_rlp::encode::RLPEncode;
use lazy_static::lazy_static;
use sha3::{Digest, Keccak256};

pub use self::db::{InMemoryTrieDB, TrieDB};
pub use self::error::TrieError;
pub use self::nibbles::Nibbles;
pub use self::node::{Node, NodeRef};
pub use self::node_hash::NodeHash;

lazy_static! {
    /// Hash of an empty trie, equal to keccak(rlp("")).
    pub static ref EMPTY_TRIE_HASH: H256 =
        H256::from_slice(&Keccak256::digest([RLP_NULL]));
}

/// RLP-encoded trie path
pub type PathRLP = Vec<u8>;
/// RLP-encoded trie value
pub type ValueRLP = Vec<u8>;

/// Ethereum-compatible Merkle Patricia Trie.
///
/// Mutations load the affected path into memory and leave the rest of the
/// tree untouched behind hash references, so each write allocates
/// `O(log n)` nodes. [`hash`](Trie::hash) persists the loaded nodes back
/// into the backend and is idempotent.
pub struct Trie {
    db: Box<dyn TrieDB>,
    root: NodeRef,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new_temp()
    }
}

impl Trie {
    /// Creates a new empty trie on top of a clean backend.
    pub fn new(db: Box<dyn TrieDB>) -> Self {
        Self {
            db,
            root: NodeRef::None,
        }
    }

    /// Opens a trie whose root node is already stored in the backend.
    pub fn open(db: Box<dyn TrieDB>, root: H256) -> Self {
        Self {
            db,
            root: if root != *EMPTY_TRIE_HASH {
                NodeRef::Hash(NodeHash::Hashed(root))
            } else {
                NodeRef::None
            },
        }
    }

    /// Creates a trie backed by a private in-memory store, used for
    /// computing standalone roots and in tests.
    pub fn new_temp() -> Self {
        Self::new(Box::new(InMemoryTrieDB::new_empty()))
    }

    pub fn db(&self) -> &dyn TrieDB {
        self.db.as_ref()
    }

    /// Retrieves an RLP-encoded value from the trie given its path.
    pub fn get(&self, path: &[u8]) -> Result<Option<ValueRLP>, TrieError> {
        self.root.get(self.db.as_ref(), Nibbles::from_bytes(path))
    }

    /// Inserts an RLP-encoded value into the trie.
    pub fn insert(&mut self, path: PathRLP, value: ValueRLP) -> Result<(), TrieError> {
        let path = Nibbles::from_bytes(&path);
        self.root = match self.root.take_node(self.db.as_ref())? {
            Some(node) => node.insert(self.db.as_ref(), path, value)?.into(),
            None => Node::leaf(path, value).into(),
        };
        Ok(())
    }

    /// Removes a value from the trie, returning it if it was present.
    pub fn remove(&mut self, path: &[u8]) -> Result<Option<ValueRLP>, TrieError> {
        let Some(node) = self.root.take_node(self.db.as_ref())? else {
            return Ok(None);
        };
        let (new_root, removed) = node.remove(self.db.as_ref(), Nibbles::from_bytes(path))?;
        self.root = match new_root {
            Some(node) => node.into(),
            None => NodeRef::None,
        };
        Ok(removed)
    }

    /// Commits pending nodes to the backend and returns the root hash.
    ///
    /// Calling this twice without intervening mutations yields the same
    /// root; the root node is always stored under its digest, even when
    /// its encoding is shorter than 32 bytes.
    pub fn hash(&mut self) -> Result<H256, TrieError> {
        let hash = match &mut self.root {
            NodeRef::None => return Ok(*EMPTY_TRIE_HASH),
            NodeRef::Hash(hash) => return Ok(hash.finalize()),
            NodeRef::Node(node) => match node.commit(self.db.as_ref())? {
                NodeHash::Hashed(hash) => hash,
                NodeHash::Inline(encoded) => {
                    let hash = H256::from_slice(&Keccak256::digest(&encoded));
                    self.db.put(hash, encoded)?;
                    hash
                }
            },
        };
        self.root = NodeRef::Hash(NodeHash::Hashed(hash));
        Ok(hash)
    }

    /// Computes the root hash without a backing store for an ordered list
    /// of values keyed by their RLP-encoded index, the form used for
    /// transaction and receipt roots.
    pub fn compute_root_from_ordered(values: &[Vec<u8>]) -> H256 {
        let mut trie = Trie::new_temp();
        for (index, value) in values.iter().enumerate() {
            let _ = trie.insert(index.encode_to_vec(), value.clone());
        }
        trie.hash().unwrap_or(*EMPTY_TRIE_HASH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[test]
    fn empty_trie_root() {
        let mut trie = Trie::new_temp();
        assert_eq!(
            hex::encode(trie.hash().unwrap()),
            "56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421"
        );
    }

    #[test]
    fn canonical_branching_root() {
        // Classic vector from the ethereum/tests trie suite.
        let mut trie = Trie::new_temp();
        for (key, value) in [
            ("do", "verb"),
            ("dog", "puppy"),
            ("doge", "coin"),
            ("horse", "stallion"),
        ] {
            trie.insert(key.as_bytes().to_vec(), value.as_bytes().to_vec())
                .unwrap();
        }
        assert_eq!(
            hex::encode(trie.hash().unwrap()),
            "5991bb8c6514148a29db676a14ac506cd2cd5775ace63c30a4fe457715e9ac84"
        );
    }

    #[test]
    fn insert_get_roundtrip() {
        let mut trie = Trie::new_temp();
        trie.insert(b"foo".to_vec(), b"value-a".to_vec()).unwrap();
        trie.insert(b"food".to_vec(), b"value-b".to_vec()).unwrap();
        trie.insert(b"fob".to_vec(), b"value-c".to_vec()).unwrap();
        assert_eq!(trie.get(b"foo").unwrap(), Some(b"value-a".to_vec()));
        assert_eq!(trie.get(b"food").unwrap(), Some(b"value-b".to_vec()));
        assert_eq!(trie.get(b"fob").unwrap(), Some(b"value-c".to_vec()));
        assert_eq!(trie.get(b"f").unwrap(), None);
    }

    #[test]
    fn overwrite_value() {
        let mut trie = Trie::new_temp();
        trie.insert(b"key".to_vec(), b"one".to_vec()).unwrap();
        trie.insert(b"key".to_vec(), b"two".to_vec()).unwrap();
        assert_eq!(trie.get(b"key").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn remove_restores_previous_root() {
        let mut trie = Trie::new_temp();
        trie.insert(b"do".to_vec(), b"verb".to_vec()).unwrap();
        trie.insert(b"dog".to_vec(), b"puppy".to_vec()).unwrap();
        let root_before = trie.hash().unwrap();

        trie.insert(b"doge".to_vec(), b"coin".to_vec()).unwrap();
        assert_ne!(trie.hash().unwrap(), root_before);

        let removed = trie.remove(b"doge").unwrap();
        assert_eq!(removed, Some(b"coin".to_vec()));
        assert_eq!(trie.hash().unwrap(), root_before);
    }

    #[test]
    fn remove_all_yields_empty_root() {
        let mut trie = Trie::new_temp();
        let keys: Vec<Vec<u8>> = (0u64..32).map(|i| i.encode_to_vec()).collect();
        for key in &keys {
            trie.insert(key.clone(), b"payload".to_vec()).unwrap();
        }
        for key in &keys {
            assert!(trie.remove(key).unwrap().is_some());
        }
        assert_eq!(trie.hash().unwrap(), *EMPTY_TRIE_HASH);
    }

    #[test]
    fn hash_is_idempotent() {
        let mut trie = Trie::new_temp();
        trie.insert(b"stable".to_vec(), b"value".to_vec()).unwrap();
        let first = trie.hash().unwrap();
        let second = trie.hash().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn reopen_from_committed_root() {
        let backend = Arc::new(Mutex::new(HashMap::new()));
        let root = {
            let db = InMemoryTrieDB::new(backend.clone());
            let mut trie = Trie::new(Box::new(db));
            trie.insert(b"alpha".to_vec(), b"1".to_vec()).unwrap();
            trie.insert(b"beta".to_vec(), b"2".to_vec()).unwrap();
            trie.hash().unwrap()
        };
        let reopened = Trie::open(Box::new(InMemoryTrieDB::new(backend)), root);
        assert_eq!(reopened.get(b"alpha").unwrap(), Some(b"1".to_vec()));
        assert_eq!(reopened.get(b"beta").unwrap(), Some(b"2".to_vec()));
        assert_eq!(reopened.get(b"gamma").unwrap(), None);
    }

    #[test]
    fn mutation_after_reopen() {
        let backend = Arc::new(Mutex::new(HashMap::new()));
        let root = {
            let mut trie = Trie::new(Box::new(InMemoryTrieDB::new(backend.clone())));
            for i in 0u64..16 {
                trie.insert(i.encode_to_vec(), vec![i as u8; 4]).unwrap();
            }
            trie.hash().unwrap()
        };
        let mut trie = Trie::open(Box::new(InMemoryTrieDB::new(backend)), root);
        trie.insert(99u64.encode_to_vec(), b"late".to_vec()).unwrap();
        assert_eq!(trie.get(&99u64.encode_to_vec()).unwrap(), Some(b"late".to_vec()));
        assert_eq!(trie.get(&3u64.encode_to_vec()).unwrap(), Some(vec![3u8; 4]));
    }
}
