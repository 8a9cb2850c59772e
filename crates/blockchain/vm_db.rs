use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use hearth_common::types::{AccountState, BlockHash};
use hearth_storage::Store;
use hearth_vm::db::{DatabaseError, VmDatabase};

/// Read adapter from the chain store to the VM: all account and storage
/// reads resolve against the parent block's state root; the per-block
/// cache inside the VM layers the in-flight changes on top.
pub struct StoreVmDatabase {
    store: Store,
    state_root: H256,
    parent_hash: BlockHash,
}

impl StoreVmDatabase {
    pub fn new(store: Store, state_root: H256, parent_hash: BlockHash) -> Self {
        Self {
            store,
            state_root,
            parent_hash,
        }
    }
}

fn store_error(err: hearth_storage::StoreError) -> DatabaseError {
    DatabaseError(err.to_string())
}

impl VmDatabase for StoreVmDatabase {
    fn get_account_state(&self, address: Address) -> Result<Option<AccountState>, DatabaseError> {
        self.store
            .get_account_state(self.state_root, address)
            .map_err(store_error)
    }

    fn get_storage_value(
        &self,
        address: Address,
        key: H256,
    ) -> Result<Option<U256>, DatabaseError> {
        self.store
            .get_storage_value(self.state_root, address, key)
            .map_err(store_error)
    }

    fn get_code(&self, code_hash: H256) -> Result<Option<Bytes>, DatabaseError> {
        self.store.get_account_code(code_hash).map_err(store_error)
    }

    /// Resolves BLOCKHASH by walking the parent chain, so the answer is
    /// correct on any branch, not just the canonical one.
    fn get_block_hash(&self, block_number: u64) -> Result<Option<H256>, DatabaseError> {
        let mut hash = self.parent_hash;
        loop {
            let Some(header) = self.store.get_block_header(hash).map_err(store_error)? else {
                return Ok(None);
            };
            if header.number == block_number {
                return Ok(Some(hash));
            }
            if header.number < block_number || header.number == 0 {
                return Ok(None);
            }
            hash = header.parent_hash;
        }
    }
}
