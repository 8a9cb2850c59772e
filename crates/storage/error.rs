use hearth_rlp::error::RLPDecodeError;
use hearth_trie::TrieError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Trie error: {0}")]
    Trie(#[from] TrieError),
    #[error("RLP decode error: {0}")]
    RLPDecode(#[from] RLPDecodeError),
    #[error("Lock error: poisoned store lock")]
    LockError,
    #[error("Missing store data: {0}")]
    MissingData(String),
}
