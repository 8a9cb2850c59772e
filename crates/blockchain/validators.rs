//! The consensus-rule predicate bundle consumed by the block executor.
//!
//! Each validator is a pure check: it either passes or names the rule
//! that failed. The defaults implement the Yellow Paper rules; callers
//! can swap in their own (e.g. to add full proof-of-work seal checks,
//! which are outside the execution engine).

use crate::error::InvalidTransactionError;
use ethereum_types::Address;
use hearth_common::{
    constants::MAX_OMMER_DEPTH,
    errors::InvalidBlockError,
    types::{
        compute_ommers_hash, compute_transactions_root, validate_block_header, AccountState,
        Block, BlockHeader, ChainConfig, Transaction,
    },
};
use hearth_storage::Store;
use std::collections::HashSet;

pub trait BlockHeaderValidator: Send + Sync {
    fn validate(
        &self,
        header: &BlockHeader,
        parent: &BlockHeader,
        config: &ChainConfig,
    ) -> Result<(), InvalidBlockError>;
}

pub trait BlockValidator: Send + Sync {
    /// Header/body consistency: the header commits to exactly this body.
    fn validate(&self, block: &Block) -> Result<(), InvalidBlockError>;
}

pub trait OmmersValidator: Send + Sync {
    fn validate(
        &self,
        block: &Block,
        store: &Store,
        config: &ChainConfig,
    ) -> Result<(), InvalidBlockError>;
}

pub trait SignedTransactionValidator: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn validate(
        &self,
        tx: &Transaction,
        sender: Address,
        sender_account: &AccountState,
        header: &BlockHeader,
        config: &ChainConfig,
        accumulated_gas: u64,
    ) -> Result<(), InvalidTransactionError>;
}

pub struct Validators {
    pub block_header_validator: Box<dyn BlockHeaderValidator>,
    pub block_validator: Box<dyn BlockValidator>,
    pub ommers_validator: Box<dyn OmmersValidator>,
    pub signed_transaction_validator: Box<dyn SignedTransactionValidator>,
}

impl Default for Validators {
    fn default() -> Self {
        Self {
            block_header_validator: Box::new(DefaultBlockHeaderValidator),
            block_validator: Box::new(DefaultBlockValidator),
            ommers_validator: Box::new(DefaultOmmersValidator),
            signed_transaction_validator: Box::new(DefaultSignedTransactionValidator),
        }
    }
}

pub struct DefaultBlockHeaderValidator;

impl BlockHeaderValidator for DefaultBlockHeaderValidator {
    fn validate(
        &self,
        header: &BlockHeader,
        parent: &BlockHeader,
        config: &ChainConfig,
    ) -> Result<(), InvalidBlockError> {
        validate_block_header(header, parent, config)
    }
}

pub struct DefaultBlockValidator;

impl BlockValidator for DefaultBlockValidator {
    fn validate(&self, block: &Block) -> Result<(), InvalidBlockError> {
        if compute_transactions_root(&block.body.transactions) != block.header.transactions_root {
            return Err(InvalidBlockError::TransactionsRootMismatch);
        }
        if compute_ommers_hash(&block.body.ommers) != block.header.ommers_hash {
            return Err(InvalidBlockError::OmmersHashMismatch);
        }
        Ok(())
    }
}

pub struct DefaultOmmersValidator;

impl OmmersValidator for DefaultOmmersValidator {
    /// YP §11.1: at most two ommers, each the child of one of the six
    /// most recent ancestors, itself a valid header, not an ancestor and
    /// not already included.
    fn validate(
        &self,
        block: &Block,
        store: &Store,
        config: &ChainConfig,
    ) -> Result<(), InvalidBlockError> {
        if block.body.ommers.is_empty() {
            return Ok(());
        }
        if block.body.ommers.len() > 2 {
            return Err(InvalidBlockError::TooManyOmmers);
        }

        // Collect up to six ancestors, their headers, and every ommer
        // those ancestors already included.
        let mut ancestors = Vec::new();
        let mut included = HashSet::new();
        let mut cursor = block.header.parent_hash;
        for _ in 0..MAX_OMMER_DEPTH {
            let Ok(Some(header)) = store.get_block_header(cursor) else {
                break;
            };
            if let Ok(Some(body)) = store.get_block_body(cursor) {
                for ommer in &body.ommers {
                    included.insert(ommer.compute_block_hash());
                }
            }
            let parent = header.parent_hash;
            ancestors.push((cursor, header));
            if parent.is_zero() {
                break;
            }
            cursor = parent;
        }
        let ancestor_hashes: HashSet<_> = ancestors.iter().map(|(hash, _)| *hash).collect();

        let mut seen = HashSet::new();
        for ommer in &block.body.ommers {
            let ommer_hash = ommer.compute_block_hash();
            if ancestor_hashes.contains(&ommer_hash) {
                return Err(InvalidBlockError::OmmerIsAncestor);
            }
            if included.contains(&ommer_hash) || !seen.insert(ommer_hash) {
                return Err(InvalidBlockError::OmmerAlreadyIncluded);
            }

            // The ommer's parent must be one of the ancestors (so the
            // ommer sits at depth 1..=6), and the ommer header must be
            // valid against it.
            let Some((_, ommer_parent)) = ancestors
                .iter()
                .find(|(hash, _)| *hash == ommer.parent_hash)
            else {
                return Err(InvalidBlockError::OmmerUnrelated);
            };
            validate_block_header(ommer, ommer_parent, config)
                .map_err(|err| InvalidBlockError::InvalidOmmerHeader(err.to_string()))?;
        }
        Ok(())
    }
}

pub struct DefaultSignedTransactionValidator;

impl SignedTransactionValidator for DefaultSignedTransactionValidator {
    fn validate(
        &self,
        tx: &Transaction,
        _sender: Address,
        sender_account: &AccountState,
        header: &BlockHeader,
        config: &ChainConfig,
        accumulated_gas: u64,
    ) -> Result<(), InvalidTransactionError> {
        // Chain binding: a chain-bound signature must match our chain id
        // and is only acceptable once EIP-155 is active.
        if let Some(chain_id) = tx.chain_id() {
            if !config.is_eip155_activated(header.number) {
                return Err(InvalidTransactionError::PrematureChainBinding);
            }
            if chain_id != config.chain_id {
                return Err(InvalidTransactionError::WrongChainId);
            }
        }

        if tx.nonce != sender_account.nonce {
            return Err(InvalidTransactionError::NonceMismatch {
                expected: sender_account.nonce,
                got: tx.nonce,
            });
        }

        let fork = config.fork(header.number);
        if tx.gas < tx.intrinsic_gas(fork) {
            return Err(InvalidTransactionError::IntrinsicGasTooLow);
        }

        let upfront_cost = tx
            .upfront_cost()
            .ok_or(InvalidTransactionError::UpfrontCostOverflow)?;
        if sender_account.balance < upfront_cost {
            return Err(InvalidTransactionError::InsufficientBalance);
        }

        let block_gas_left = header.gas_limit.saturating_sub(accumulated_gas);
        if tx.gas > block_gas_left {
            return Err(InvalidTransactionError::BlockGasLimitExceeded);
        }
        Ok(())
    }
}
