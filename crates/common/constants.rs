use crate::crypto::keccak;
use ethereum_types::H256;
use hearth_rlp::constants::RLP_EMPTY_LIST;
use lazy_static::lazy_static;

pub use hearth_trie::EMPTY_TRIE_HASH;

lazy_static! {
    /// keccak256 of the empty byte string, the code hash of accounts without code.
    pub static ref EMPTY_KECCACK_HASH: H256 = keccak([]);
    /// keccak256 of the RLP encoding of an empty list, the ommers hash of
    /// blocks without uncles.
    pub static ref DEFAULT_OMMERS_HASH: H256 = keccak([RLP_EMPTY_LIST]);
}

/// Bounds how much the gas limit may move between consecutive blocks.
pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1024;
pub const MIN_GAS_LIMIT: u64 = 5000;
/// Maximum length of a header's extra data field.
pub const MAX_EXTRA_DATA_SIZE: usize = 32;

/// Maximum generation depth of an ommer relative to the including block.
pub const MAX_OMMER_DEPTH: u64 = 6;

pub const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;
