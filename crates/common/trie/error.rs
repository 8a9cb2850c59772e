use ethereum_types::H256;
use hearth_rlp::error::RLPDecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrieError {
    #[error("RLP decode error: {0}")]
    RLPDecode(#[from] RLPDecodeError),
    #[error("Missing trie node: {0:#x}")]
    MissingNode(H256),
    #[error("Lock error: poisoned trie db lock")]
    LockError,
    #[error("DB error: {0}")]
    DbError(String),
}
