use crate::{
    account::{Account, StorageSlot},
    errors::{InternalError, TxValidationError, VMError},
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use hearth_common::{
    crypto::keccak,
    types::{AccountInfo, AccountState, AccountUpdate},
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DatabaseError(pub String);

impl From<DatabaseError> for VMError {
    fn from(err: DatabaseError) -> Self {
        VMError::Internal(InternalError::Database(err.0))
    }
}

/// Read access to the persistent world state a transaction executes on
/// top of. Implemented over the chain store; tests plug in mocks.
pub trait VmDatabase: Send + Sync {
    fn get_account_state(&self, address: Address) -> Result<Option<AccountState>, DatabaseError>;
    fn get_storage_value(&self, address: Address, key: H256)
        -> Result<Option<U256>, DatabaseError>;
    fn get_code(&self, code_hash: H256) -> Result<Option<Bytes>, DatabaseError>;
    fn get_block_hash(&self, block_number: u64) -> Result<Option<H256>, DatabaseError>;
}

pub type CacheDB = FxHashMap<Address, Account>;

/// Snapshot of the transactional view, the rollback target for failing
/// frames and transactions.
#[derive(Debug, Clone)]
pub struct DbCheckpoint {
    cache: CacheDB,
    dirty: FxHashSet<Address>,
    destroyed: FxHashSet<Address>,
    known_absent: FxHashSet<Address>,
    cleared_storage: FxHashSet<Address>,
}

/// The transactional world-state proxy: a copy-on-read account cache over
/// the backing store. Reads fault accounts in, writes stay in the cache
/// until [`extract_account_updates`](Self::extract_account_updates) turns
/// them into a batch for the state trie.
pub struct GeneralizedDatabase {
    pub store: Arc<dyn VmDatabase>,
    pub cache: CacheDB,
    dirty: FxHashSet<Address>,
    destroyed: FxHashSet<Address>,
    /// Addresses the store had no record of, to distinguish absent
    /// accounts from existing-but-empty ones (pre-EIP-158 CALL charge).
    known_absent: FxHashSet<Address>,
    /// Accounts destroyed earlier in the block. Their pre-block storage
    /// must not be readable again if the address is recreated, so slot
    /// reads for them never fall through to the store.
    cleared_storage: FxHashSet<Address>,
}

impl GeneralizedDatabase {
    pub fn new(store: Arc<dyn VmDatabase>) -> Self {
        Self {
            store,
            cache: CacheDB::default(),
            dirty: FxHashSet::default(),
            destroyed: FxHashSet::default(),
            known_absent: FxHashSet::default(),
            cleared_storage: FxHashSet::default(),
        }
    }

    fn load_account(&mut self, address: Address) -> Result<(), VMError> {
        if self.cache.contains_key(&address) {
            return Ok(());
        }
        let account = match self.store.get_account_state(address)? {
            Some(state) => {
                let code = if state.has_code() {
                    self.store
                        .get_code(state.code_hash)?
                        .ok_or_else(|| missing_code(state.code_hash))?
                } else {
                    Bytes::new()
                };
                Account::new(
                    AccountInfo {
                        code_hash: state.code_hash,
                        balance: state.balance,
                        nonce: state.nonce,
                    },
                    code,
                )
            }
            None => {
                self.known_absent.insert(address);
                Account::default()
            }
        };
        self.cache.insert(address, account);
        Ok(())
    }

    pub fn get_account(&mut self, address: Address) -> Result<&Account, VMError> {
        self.load_account(address)?;
        self.cache
            .get(&address)
            .ok_or(VMError::Internal(InternalError::TypeConversion))
    }

    /// Mutable account access; marks the account dirty and existing.
    pub fn get_account_mut(&mut self, address: Address) -> Result<&mut Account, VMError> {
        self.load_account(address)?;
        self.dirty.insert(address);
        self.known_absent.remove(&address);
        self.cache
            .get_mut(&address)
            .ok_or(VMError::Internal(InternalError::TypeConversion))
    }

    /// Whether the state trie has no record of this address.
    pub fn account_is_absent(&mut self, address: Address) -> Result<bool, VMError> {
        self.load_account(address)?;
        Ok(self.known_absent.contains(&address))
    }

    pub fn get_storage_slot(
        &mut self,
        address: Address,
        key: H256,
    ) -> Result<StorageSlot, VMError> {
        self.load_account(address)?;
        if let Some(slot) = self
            .cache
            .get(&address)
            .and_then(|account| account.storage.get(&key))
        {
            return Ok(*slot);
        }
        let value = if self.cleared_storage.contains(&address) {
            U256::zero()
        } else {
            self.store
                .get_storage_value(address, key)?
                .unwrap_or_default()
        };
        let slot = StorageSlot {
            original_value: value,
            current_value: value,
        };
        // Cache the read without marking the account dirty.
        if let Some(account) = self.cache.get_mut(&address) {
            account.storage.insert(key, slot);
        }
        Ok(slot)
    }

    pub fn update_storage_slot(
        &mut self,
        address: Address,
        key: H256,
        new_value: U256,
    ) -> Result<(), VMError> {
        // Fault the slot in first so the original value is preserved.
        let slot = self.get_storage_slot(address, key)?;
        let account = self.get_account_mut(address)?;
        account.storage.insert(
            key,
            StorageSlot {
                original_value: slot.original_value,
                current_value: new_value,
            },
        );
        Ok(())
    }

    pub fn increase_account_balance(
        &mut self,
        address: Address,
        amount: U256,
    ) -> Result<(), VMError> {
        let account = self.get_account_mut(address)?;
        account.info.balance = account
            .info
            .balance
            .checked_add(amount)
            .ok_or(InternalError::Overflow)?;
        Ok(())
    }

    pub fn decrease_account_balance(
        &mut self,
        address: Address,
        amount: U256,
    ) -> Result<(), VMError> {
        let account = self.get_account_mut(address)?;
        account.info.balance = account
            .info
            .balance
            .checked_sub(amount)
            .ok_or(InternalError::Underflow)?;
        Ok(())
    }

    /// Moves value between accounts, creating the receiver if absent.
    /// Balance sufficiency is the caller's check.
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), VMError> {
        self.decrease_account_balance(from, value)?;
        self.increase_account_balance(to, value)
    }

    /// Bumps the sender nonce, returning the previous value.
    pub fn increment_account_nonce(&mut self, address: Address) -> Result<u64, VMError> {
        let account = self.get_account_mut(address)?;
        let previous = account.info.nonce;
        account.info.nonce = previous
            .checked_add(1)
            .ok_or(TxValidationError::NonceIsMax)?;
        Ok(previous)
    }

    /// Installs deployed code on an account, updating its code hash.
    pub fn set_account_code(&mut self, address: Address, code: Bytes) -> Result<(), VMError> {
        let code_hash = keccak(&code);
        let account = self.get_account_mut(address)?;
        account.code = code;
        account.info.code_hash = code_hash;
        Ok(())
    }

    /// Marks an account for removal at the end of the transaction.
    pub fn destroy_account(&mut self, address: Address) {
        self.cache.insert(address, Account::default());
        self.dirty.remove(&address);
        self.destroyed.insert(address);
        self.cleared_storage.insert(address);
    }

    pub fn checkpoint(&self) -> DbCheckpoint {
        DbCheckpoint {
            cache: self.cache.clone(),
            dirty: self.dirty.clone(),
            destroyed: self.destroyed.clone(),
            known_absent: self.known_absent.clone(),
            cleared_storage: self.cleared_storage.clone(),
        }
    }

    pub fn restore_checkpoint(&mut self, checkpoint: DbCheckpoint) {
        self.cache = checkpoint.cache;
        self.dirty = checkpoint.dirty;
        self.destroyed = checkpoint.destroyed;
        self.known_absent = checkpoint.known_absent;
        self.cleared_storage = checkpoint.cleared_storage;
    }

    /// Drains the transaction's net state changes as a batch of account
    /// updates, leaving the cache clean for the next transaction in the
    /// block.
    pub fn extract_account_updates(&mut self) -> Vec<AccountUpdate> {
        let mut updates = Vec::with_capacity(self.dirty.len() + self.destroyed.len());

        let mut destroyed: Vec<Address> = self.destroyed.drain().collect();
        destroyed.sort();
        for address in destroyed {
            updates.push(AccountUpdate::removed(address));
            self.cache.insert(address, Account::default());
            self.known_absent.insert(address);
        }

        let mut dirty: Vec<Address> = self.dirty.drain().collect();
        dirty.sort();
        for address in dirty {
            let Some(account) = self.cache.get_mut(&address) else {
                continue;
            };
            let mut update = AccountUpdate::new(address);
            update.info = Some(account.info.clone());
            if account.has_code() {
                update.code = Some(account.code.clone());
            }
            for (key, slot) in account.storage.iter_mut() {
                if slot.is_dirty() {
                    update.added_storage.insert(*key, slot.current_value);
                    slot.original_value = slot.current_value;
                }
            }
            updates.push(update);
        }
        updates
    }
}

fn missing_code(code_hash: H256) -> DatabaseError {
    DatabaseError(format!("missing code for hash {code_hash:#x}"))
}
