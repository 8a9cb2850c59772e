use ethereum_types::H256;
use sha3::{Digest, Keccak256};

/// Reference to an already-encoded node.
///
/// Nodes whose encoding is shorter than 32 bytes are inlined into their
/// parent instead of being stored separately (Yellow Paper Appendix D).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeHash {
    Hashed(H256),
    Inline(Vec<u8>),
}

impl NodeHash {
    /// Computes the reference for a node encoding: inline when short,
    /// keccak digest otherwise.
    pub fn from_encoded(encoded: &[u8]) -> NodeHash {
        if encoded.len() < 32 {
            NodeHash::Inline(encoded.to_vec())
        } else {
            NodeHash::Hashed(H256::from_slice(&Keccak256::digest(encoded)))
        }
    }

    /// The digest for this reference; inline nodes hash their own encoding.
    pub fn finalize(&self) -> H256 {
        match self {
            NodeHash::Hashed(hash) => *hash,
            NodeHash::Inline(encoded) => H256::from_slice(&Keccak256::digest(encoded)),
        }
    }
}

impl From<H256> for NodeHash {
    fn from(value: H256) -> Self {
        NodeHash::Hashed(value)
    }
}
