pub mod error;
mod smoke_test;
pub mod validators;
pub mod vm_db;

use crate::{
    error::{BlockExecutionError, InvalidTransactionError, PostExecutionError},
    validators::Validators,
    vm_db::StoreVmDatabase,
};
use ethereum_types::{Bloom, H256, U256};
use hearth_common::types::{
    compute_receipts_root, AccountState, Block, BlockHeader, ChainConfig, Receipt,
};
use hearth_storage::Store;
use hearth_vm::{Environment, GeneralizedDatabase, VM};
use std::sync::Arc;
use tracing::{debug, info};

/// Everything block execution computes, before it is checked against the
/// header and persisted.
#[derive(Debug)]
pub struct BlockExecutionResult {
    pub receipts: Vec<Receipt>,
    pub gas_used: u64,
    pub state_root: H256,
    pub logs_bloom: Bloom,
}

/// The block execution engine: applies blocks on top of their parent
/// state and persists the outcome when every consensus check passes.
pub struct Blockchain {
    pub storage: Store,
    pub validators: Validators,
}

impl Blockchain {
    pub fn new(storage: Store) -> Self {
        Self {
            storage,
            validators: Validators::default(),
        }
    }

    pub fn new_with_validators(storage: Store, validators: Validators) -> Self {
        Self {
            storage,
            validators,
        }
    }

    /// Validates and executes a block, persisting the post-state.
    ///
    /// The sequence is: pre-validation against the parent, the ordered
    /// transaction loop, reward payment, then post-validation of the
    /// header's gas, state root, receipts root and logs bloom. A failure
    /// at any stage leaves the chain untouched; only a fully validated
    /// block (and its receipts) is written, after which the post-state is
    /// reachable through `block.header.state_root`.
    pub fn add_block(&self, block: &Block) -> Result<(), BlockExecutionError> {
        let config = self.storage.get_chain_config()?;
        let parent_header = self
            .storage
            .get_block_header(block.header.parent_hash)?
            .ok_or(BlockExecutionError::ParentNotFound)?;

        // Pre-validation: header rules, header/body consistency, ommers.
        self.validators
            .block_header_validator
            .validate(&block.header, &parent_header, &config)?;
        self.validators.block_validator.validate(block)?;
        self.validators
            .ommers_validator
            .validate(block, &self.storage, &config)?;

        let result = self.execute_block(block, &parent_header)?;

        // Post-validation: the header must claim exactly what execution
        // produced.
        if result.gas_used != block.header.gas_used {
            return Err(PostExecutionError::GasUsedMismatch {
                computed: result.gas_used,
                header: block.header.gas_used,
            }
            .into());
        }
        if result.state_root != block.header.state_root {
            return Err(PostExecutionError::StateRootMismatch.into());
        }
        if compute_receipts_root(&result.receipts) != block.header.receipts_root {
            return Err(PostExecutionError::ReceiptsRootMismatch.into());
        }
        if result.logs_bloom != block.header.logs_bloom {
            return Err(PostExecutionError::LogsBloomMismatch.into());
        }

        let block_hash = block.hash();
        self.storage.add_block(block.clone())?;
        self.storage.add_receipts(block_hash, result.receipts)?;
        self.storage
            .set_canonical_block(block.header.number, block_hash)?;
        info!(
            number = block.header.number,
            hash = ?block_hash,
            gas_used = result.gas_used,
            "block executed and stored"
        );
        Ok(())
    }

    /// Runs the block's transactions in order on top of the parent state
    /// and pays out the mining rewards. No header checks happen here; the
    /// caller compares the result against the header.
    pub fn execute_block(
        &self,
        block: &Block,
        parent_header: &BlockHeader,
    ) -> Result<BlockExecutionResult, BlockExecutionError> {
        let config = self.storage.get_chain_config()?;
        let vm_db = StoreVmDatabase::new(
            self.storage.clone(),
            parent_header.state_root,
            block.header.parent_hash,
        );
        let mut db = GeneralizedDatabase::new(Arc::new(vm_db));

        let mut state_root = parent_header.state_root;
        let mut accumulated_gas = 0u64;
        let mut receipts = Vec::with_capacity(block.body.transactions.len());
        let mut logs_bloom = Bloom::zero();

        for (index, tx) in block.body.transactions.iter().enumerate() {
            let sender = tx
                .recover_sender()
                .map_err(|_| InvalidTransactionError::SenderRecovery)?;
            let sender_account = {
                let account = db.get_account(sender).map_err(BlockExecutionError::Evm)?;
                AccountState {
                    nonce: account.info.nonce,
                    balance: account.info.balance,
                    ..Default::default()
                }
            };
            self.validators.signed_transaction_validator.validate(
                tx,
                sender,
                &sender_account,
                &block.header,
                &config,
                accumulated_gas,
            )?;

            let env = Environment::new(sender, tx.gas_price, tx.gas, config, &block.header);
            let report = VM::new(env, &mut db, tx).execute()?;
            debug!(
                index,
                gas_used = report.gas_used,
                success = report.is_success(),
                "transaction executed"
            );

            // A failing transaction still lands in the block: it consumed
            // gas and paid the miner, and its receipt commits to the
            // post-rollback state.
            let updates = db.extract_account_updates();
            state_root = self.storage.apply_account_updates(state_root, &updates)?;
            accumulated_gas = accumulated_gas.saturating_add(report.gas_used);

            let receipt = Receipt::new(state_root, accumulated_gas, report.logs);
            logs_bloom.accrue_bloom(&receipt.logs_bloom);
            receipts.push(receipt);
        }

        self.apply_rewards(&mut db, block, &config)?;
        let reward_updates = db.extract_account_updates();
        state_root = self
            .storage
            .apply_account_updates(state_root, &reward_updates)?;

        Ok(BlockExecutionResult {
            receipts,
            gas_used: accumulated_gas,
            state_root,
            logs_bloom,
        })
    }

    /// Mining rewards (YP §11.3): the beneficiary earns the base reward
    /// plus 1/32 of it per ommer; each ommer's beneficiary earns the base
    /// reward scaled down by its distance from the block.
    ///
    /// Credits create absent accounts, and an ommer sharing the block's
    /// beneficiary accrues both rewards.
    fn apply_rewards(
        &self,
        db: &mut GeneralizedDatabase,
        block: &Block,
        config: &ChainConfig,
    ) -> Result<(), BlockExecutionError> {
        let base_reward = config.block_reward(block.header.number);
        if base_reward.is_zero() {
            return Ok(());
        }

        let nephew_bonus = base_reward / 32 * U256::from(block.body.ommers.len());
        let miner_reward = base_reward + nephew_bonus;
        db.increase_account_balance(block.header.coinbase, miner_reward)
            .map_err(BlockExecutionError::Evm)?;

        for ommer in &block.body.ommers {
            // Depth is 1..=6, enforced by the ommers validator.
            let depth = block.header.number.saturating_sub(ommer.number);
            let ommer_reward = base_reward * U256::from(8u64.saturating_sub(depth)) / 8;
            db.increase_account_balance(ommer.coinbase, ommer_reward)
                .map_err(BlockExecutionError::Evm)?;
        }
        Ok(())
    }
}
