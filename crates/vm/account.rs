use bytes::Bytes;
use ethereum_types::{H256, U256};
use hearth_common::types::AccountInfo;
use rustc_hash::FxHashMap;

/// A storage slot as seen during a transaction: the value at the start of
/// the transaction and the value now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageSlot {
    pub original_value: U256,
    pub current_value: U256,
}

impl StorageSlot {
    pub fn is_dirty(&self) -> bool {
        self.original_value != self.current_value
    }
}

/// An account as held in the world-state cache, code loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub info: AccountInfo,
    pub code: Bytes,
    pub storage: FxHashMap<H256, StorageSlot>,
}

impl Account {
    pub fn new(info: AccountInfo, code: Bytes) -> Self {
        Self {
            info,
            code,
            storage: FxHashMap::default(),
        }
    }

    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    /// EIP-161 emptiness: no nonce, no balance, no code.
    pub fn is_empty(&self) -> bool {
        self.info.nonce == 0 && self.info.balance.is_zero() && !self.has_code()
    }

    /// A CREATE targeting this account collides when it already carries
    /// code or a nonce.
    pub fn create_would_collide(&self) -> bool {
        self.has_code() || self.info.nonce != 0
    }
}
