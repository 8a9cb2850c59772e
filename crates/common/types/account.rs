use crate::constants::{EMPTY_KECCACK_HASH, EMPTY_TRIE_HASH};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use hearth_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use std::collections::HashMap;

/// Account record as committed to the state trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
}

impl Default for AccountState {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            storage_root: *EMPTY_TRIE_HASH,
            code_hash: *EMPTY_KECCACK_HASH,
        }
    }
}

impl AccountState {
    pub fn has_code(&self) -> bool {
        self.code_hash != *EMPTY_KECCACK_HASH
    }

    /// An account is empty when it has zero nonce, zero balance and no
    /// code (EIP-161 definition, used for state clearing).
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && !self.has_code()
    }
}

impl RLPEncode for AccountState {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.nonce)
            .encode_field(&self.balance)
            .encode_field(&self.storage_root)
            .encode_field(&self.code_hash)
            .finish();
    }
}

impl RLPDecode for AccountState {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (balance, decoder) = decoder.decode_field("balance")?;
        let (storage_root, decoder) = decoder.decode_field("storage_root")?;
        let (code_hash, decoder) = decoder.decode_field("code_hash")?;
        Ok((
            Self {
                nonce,
                balance,
                storage_root,
                code_hash,
            },
            decoder.finish()?,
        ))
    }
}

/// Mirror of `AccountState` without the storage commitment, used while an
/// account's storage writes have not been folded into its trie yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub code_hash: H256,
    pub balance: U256,
    pub nonce: u64,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            code_hash: *EMPTY_KECCACK_HASH,
            balance: U256::zero(),
            nonce: 0,
        }
    }
}

/// The net effect of a transaction on one account, applied to the state
/// trie by the store.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub address: Address,
    /// Whether the account was destroyed (SUICIDE or EIP-158 clearing).
    pub removed: bool,
    pub info: Option<AccountInfo>,
    pub code: Option<Bytes>,
    pub added_storage: HashMap<H256, U256>,
}

impl AccountUpdate {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    pub fn removed(address: Address) -> Self {
        Self {
            address,
            removed: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_account_is_empty() {
        let account = AccountState::default();
        assert!(account.is_empty());
        assert!(!account.has_code());
    }

    #[test]
    fn account_rlp_roundtrip() {
        let account = AccountState {
            nonce: 7,
            balance: U256::from(1_000_000u64),
            storage_root: *EMPTY_TRIE_HASH,
            code_hash: *EMPTY_KECCACK_HASH,
        };
        let encoded = account.encode_to_vec();
        assert_eq!(AccountState::decode(&encoded).unwrap(), account);
    }
}
