use crate::error::StoreError;
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use hearth_common::{
    crypto::keccak,
    types::{
        AccountState, AccountUpdate, Block, BlockBody, BlockHash, BlockHeader, BlockNumber,
        ChainConfig, Genesis, Receipt,
    },
};
use hearth_rlp::{decode::RLPDecode, encode::RLPEncode};
use hearth_trie::{InMemoryTrieDB, Trie, EMPTY_TRIE_HASH};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug, Default)]
struct ChainData {
    headers: HashMap<BlockHash, BlockHeader>,
    bodies: HashMap<BlockHash, BlockBody>,
    canonical_hashes: HashMap<BlockNumber, BlockHash>,
    receipts: HashMap<BlockHash, Vec<Receipt>>,
    account_codes: HashMap<H256, Bytes>,
}

/// The chain database: headers, bodies, receipts, contract code and the
/// trie node store. Cheaply clonable; clones share the same backing maps.
///
/// This is the in-memory reference backend. All reads and writes are
/// synchronous, matching the engine's execution model.
#[derive(Debug, Clone, Default)]
pub struct Store {
    chain: Arc<Mutex<ChainData>>,
    trie_nodes: Arc<Mutex<HashMap<H256, Vec<u8>>>>,
    config: Arc<Mutex<ChainConfig>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store seeded with the genesis allocation. The resulting
    /// genesis block is canonical at height zero.
    pub fn from_genesis(genesis: &Genesis) -> Result<Self, StoreError> {
        let store = Self::new();
        store.setup_genesis(genesis)?;
        Ok(store)
    }

    pub fn set_chain_config(&self, config: ChainConfig) -> Result<(), StoreError> {
        *self.config.lock().map_err(|_| StoreError::LockError)? = config;
        Ok(())
    }

    pub fn get_chain_config(&self) -> Result<ChainConfig, StoreError> {
        Ok(*self.config.lock().map_err(|_| StoreError::LockError)?)
    }

    fn setup_genesis(&self, genesis: &Genesis) -> Result<(), StoreError> {
        self.set_chain_config(genesis.config)?;
        let updates: Vec<AccountUpdate> = genesis
            .alloc
            .iter()
            .map(|(address, account)| {
                let code = account.code.clone().unwrap_or_default();
                AccountUpdate {
                    address: *address,
                    removed: false,
                    info: Some(hearth_common::types::AccountInfo {
                        code_hash: keccak(&code),
                        balance: account.balance,
                        nonce: account.nonce.unwrap_or_default(),
                    }),
                    code: (!code.is_empty()).then_some(code),
                    added_storage: account
                        .storage
                        .iter()
                        .map(|(key, value)| (*key, *value))
                        .collect(),
                }
            })
            .collect();
        let state_root = self.apply_account_updates(*EMPTY_TRIE_HASH, &updates)?;

        let header = genesis.get_block_header(state_root);
        let hash = header.compute_block_hash();
        info!(state_root = ?state_root, hash = ?hash, "genesis state initialized");

        self.add_block(Block::new(header, BlockBody::default()))?;
        self.set_canonical_block(0, hash)?;
        Ok(())
    }

    // -- Block storage -------------------------------------------------

    pub fn add_block(&self, block: Block) -> Result<(), StoreError> {
        let hash = block.hash();
        let mut chain = self.chain.lock().map_err(|_| StoreError::LockError)?;
        chain.headers.insert(hash, block.header);
        chain.bodies.insert(hash, block.body);
        Ok(())
    }

    pub fn set_canonical_block(
        &self,
        number: BlockNumber,
        hash: BlockHash,
    ) -> Result<(), StoreError> {
        self.chain
            .lock()
            .map_err(|_| StoreError::LockError)?
            .canonical_hashes
            .insert(number, hash);
        Ok(())
    }

    pub fn get_block_header(&self, hash: BlockHash) -> Result<Option<BlockHeader>, StoreError> {
        Ok(self
            .chain
            .lock()
            .map_err(|_| StoreError::LockError)?
            .headers
            .get(&hash)
            .cloned())
    }

    pub fn get_block_body(&self, hash: BlockHash) -> Result<Option<BlockBody>, StoreError> {
        Ok(self
            .chain
            .lock()
            .map_err(|_| StoreError::LockError)?
            .bodies
            .get(&hash)
            .cloned())
    }

    pub fn get_canonical_block_hash(
        &self,
        number: BlockNumber,
    ) -> Result<Option<BlockHash>, StoreError> {
        Ok(self
            .chain
            .lock()
            .map_err(|_| StoreError::LockError)?
            .canonical_hashes
            .get(&number)
            .copied())
    }

    pub fn get_block_header_by_number(
        &self,
        number: BlockNumber,
    ) -> Result<Option<BlockHeader>, StoreError> {
        let chain = self.chain.lock().map_err(|_| StoreError::LockError)?;
        Ok(chain
            .canonical_hashes
            .get(&number)
            .and_then(|hash| chain.headers.get(hash))
            .cloned())
    }

    pub fn add_receipts(
        &self,
        block_hash: BlockHash,
        receipts: Vec<Receipt>,
    ) -> Result<(), StoreError> {
        self.chain
            .lock()
            .map_err(|_| StoreError::LockError)?
            .receipts
            .insert(block_hash, receipts);
        Ok(())
    }

    pub fn get_receipts(&self, block_hash: BlockHash) -> Result<Option<Vec<Receipt>>, StoreError> {
        Ok(self
            .chain
            .lock()
            .map_err(|_| StoreError::LockError)?
            .receipts
            .get(&block_hash)
            .cloned())
    }

    // -- Code storage --------------------------------------------------

    pub fn add_account_code(&self, code_hash: H256, code: Bytes) -> Result<(), StoreError> {
        self.chain
            .lock()
            .map_err(|_| StoreError::LockError)?
            .account_codes
            .insert(code_hash, code);
        Ok(())
    }

    pub fn get_account_code(&self, code_hash: H256) -> Result<Option<Bytes>, StoreError> {
        Ok(self
            .chain
            .lock()
            .map_err(|_| StoreError::LockError)?
            .account_codes
            .get(&code_hash)
            .cloned())
    }

    // -- State tries ---------------------------------------------------

    /// Opens the account trie at a given state root. Addresses are hashed
    /// before lookup (secure-trie layout).
    pub fn open_state_trie(&self, state_root: H256) -> Trie {
        Trie::open(
            Box::new(InMemoryTrieDB::new(self.trie_nodes.clone())),
            state_root,
        )
    }

    /// Opens an account's storage trie. Storage shares the node store with
    /// the account trie; nodes are disambiguated by hash.
    pub fn open_storage_trie(&self, storage_root: H256) -> Trie {
        self.open_state_trie(storage_root)
    }

    pub fn get_account_state(
        &self,
        state_root: H256,
        address: Address,
    ) -> Result<Option<AccountState>, StoreError> {
        let trie = self.open_state_trie(state_root);
        let Some(encoded) = trie.get(keccak(address).as_bytes())? else {
            return Ok(None);
        };
        Ok(Some(AccountState::decode(&encoded)?))
    }

    pub fn get_storage_value(
        &self,
        state_root: H256,
        address: Address,
        key: H256,
    ) -> Result<Option<U256>, StoreError> {
        let Some(account) = self.get_account_state(state_root, address)? else {
            return Ok(None);
        };
        let trie = self.open_storage_trie(account.storage_root);
        let Some(encoded) = trie.get(keccak(key).as_bytes())? else {
            return Ok(None);
        };
        Ok(Some(U256::decode(&encoded)?))
    }

    /// Materializes a batch of account updates on top of `state_root`,
    /// folding storage writes into each account's storage trie, and
    /// returns the new state root. The world-state proxy's `persist`
    /// operation; applying the same batch twice yields the same root.
    pub fn apply_account_updates(
        &self,
        state_root: H256,
        updates: &[AccountUpdate],
    ) -> Result<H256, StoreError> {
        let mut state_trie = self.open_state_trie(state_root);
        for update in updates {
            let hashed_address = keccak(update.address).as_bytes().to_vec();
            if update.removed {
                state_trie.remove(&hashed_address)?;
                continue;
            }

            let mut account = match state_trie.get(&hashed_address)? {
                Some(encoded) => AccountState::decode(&encoded)?,
                None => AccountState::default(),
            };
            if let Some(info) = &update.info {
                account.nonce = info.nonce;
                account.balance = info.balance;
                account.code_hash = info.code_hash;
            }
            if let Some(code) = &update.code {
                self.add_account_code(account.code_hash, code.clone())?;
            }
            if !update.added_storage.is_empty() {
                let mut storage_trie = self.open_storage_trie(account.storage_root);
                for (key, value) in &update.added_storage {
                    let hashed_key = keccak(key).as_bytes().to_vec();
                    if value.is_zero() {
                        // Zero-valued slots are absent from the trie.
                        storage_trie.remove(&hashed_key)?;
                    } else {
                        storage_trie.insert(hashed_key, value.encode_to_vec())?;
                    }
                }
                account.storage_root = storage_trie.hash()?;
            }
            state_trie.insert(hashed_address, account.encode_to_vec())?;
        }
        Ok(state_trie.hash()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_common::types::{AccountInfo, ChainConfig, GenesisAccount};
    use std::collections::BTreeMap;

    fn test_genesis() -> Genesis {
        let mut alloc = BTreeMap::new();
        alloc.insert(
            Address::from_low_u64_be(0x1000),
            GenesisAccount {
                balance: U256::from(1_000_000u64),
                ..Default::default()
            },
        );
        Genesis {
            config: ChainConfig {
                chain_id: 99,
                ..Default::default()
            },
            alloc,
            difficulty: U256::from(0x20000),
            gas_limit: 5_000_000,
            timestamp: 0,
            ..Default::default()
        }
    }

    #[test]
    fn genesis_account_is_reachable_by_state_root() {
        let store = Store::from_genesis(&test_genesis()).unwrap();
        let genesis_header = store.get_block_header_by_number(0).unwrap().unwrap();
        let account = store
            .get_account_state(genesis_header.state_root, Address::from_low_u64_be(0x1000))
            .unwrap()
            .unwrap();
        assert_eq!(account.balance, U256::from(1_000_000u64));
        assert_eq!(account.nonce, 0);
    }

    #[test]
    fn apply_account_updates_is_idempotent() {
        let store = Store::new();
        let update = AccountUpdate {
            address: Address::from_low_u64_be(0xbeef),
            removed: false,
            info: Some(AccountInfo {
                balance: U256::from(500u64),
                nonce: 3,
                code_hash: *hearth_common::constants::EMPTY_KECCACK_HASH,
            }),
            code: None,
            added_storage: HashMap::from([(H256::from_low_u64_be(1), U256::from(7))]),
        };
        let root_a = store
            .apply_account_updates(*EMPTY_TRIE_HASH, std::slice::from_ref(&update))
            .unwrap();
        let root_b = store
            .apply_account_updates(*EMPTY_TRIE_HASH, std::slice::from_ref(&update))
            .unwrap();
        assert_eq!(root_a, root_b);

        let value = store
            .get_storage_value(root_a, update.address, H256::from_low_u64_be(1))
            .unwrap();
        assert_eq!(value, Some(U256::from(7)));
    }

    #[test]
    fn removing_an_account_restores_the_previous_root() {
        let store = Store::new();
        let base = AccountUpdate {
            address: Address::from_low_u64_be(0xaaaa),
            info: Some(AccountInfo {
                balance: U256::from(1u64),
                ..Default::default()
            }),
            ..Default::default()
        };
        let root_base = store
            .apply_account_updates(*EMPTY_TRIE_HASH, &[base])
            .unwrap();

        let extra = AccountUpdate {
            address: Address::from_low_u64_be(0xbbbb),
            info: Some(AccountInfo {
                balance: U256::from(2u64),
                ..Default::default()
            }),
            ..Default::default()
        };
        let root_two = store.apply_account_updates(root_base, &[extra]).unwrap();
        assert_ne!(root_two, root_base);

        let removal = AccountUpdate::removed(Address::from_low_u64_be(0xbbbb));
        let root_after = store.apply_account_updates(root_two, &[removal]).unwrap();
        assert_eq!(root_after, root_base);
    }

    #[test]
    fn zero_storage_writes_leave_no_trace() {
        let store = Store::new();
        let address = Address::from_low_u64_be(0xcccc);
        let with_slot = AccountUpdate {
            address,
            info: Some(AccountInfo::default()),
            added_storage: HashMap::from([(H256::from_low_u64_be(5), U256::from(9))]),
            ..Default::default()
        };
        let no_slot = AccountUpdate {
            address,
            info: Some(AccountInfo::default()),
            ..Default::default()
        };
        let root_clean = store
            .apply_account_updates(*EMPTY_TRIE_HASH, &[no_slot])
            .unwrap();

        let root_with = store
            .apply_account_updates(*EMPTY_TRIE_HASH, &[with_slot])
            .unwrap();
        let clearing = AccountUpdate {
            address,
            info: Some(AccountInfo::default()),
            added_storage: HashMap::from([(H256::from_low_u64_be(5), U256::zero())]),
            ..Default::default()
        };
        let root_cleared = store.apply_account_updates(root_with, &[clearing]).unwrap();
        assert_eq!(root_cleared, root_clean);
    }
}
