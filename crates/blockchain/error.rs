use hearth_common::errors::InvalidBlockError;
use hearth_storage::StoreError;
use hearth_vm::errors::VMError;
use thiserror::Error;

/// Reasons a transaction cannot even be attempted. Distinct from VM-level
/// failures, which are recorded in receipts and keep the block valid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidTransactionError {
    #[error("Signature recovery failed")]
    SenderRecovery,
    #[error("Signature bound to the wrong chain id")]
    WrongChainId,
    #[error("Chain-bound signature before EIP-155 activation")]
    PrematureChainBinding,
    #[error("Nonce mismatch: expected {expected}, got {got}")]
    NonceMismatch { expected: u64, got: u64 },
    #[error("Gas limit below the intrinsic gas")]
    IntrinsicGasTooLow,
    #[error("Sender balance does not cover the upfront cost")]
    InsufficientBalance,
    #[error("Transaction does not fit in the block gas limit")]
    BlockGasLimitExceeded,
    #[error("Gas limit times gas price overflows")]
    UpfrontCostOverflow,
}

/// The executed block does not match what its header claims.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PostExecutionError {
    #[error("Gas used mismatch: computed {computed}, header {header}")]
    GasUsedMismatch { computed: u64, header: u64 },
    #[error("State root mismatch")]
    StateRootMismatch,
    #[error("Receipts root mismatch")]
    ReceiptsRootMismatch,
    #[error("Logs bloom mismatch")]
    LogsBloomMismatch,
}

/// Block-level failure taxonomy: a malformed block is rejected, at one of
/// three stages. Any of these leaves the chain state untouched.
#[derive(Debug, Error)]
pub enum BlockExecutionError {
    #[error("Validation before execution failed: {0}")]
    ValidationBeforeExec(#[from] InvalidBlockError),
    #[error("Transaction execution rejected: {0}")]
    TxsExecution(#[from] InvalidTransactionError),
    #[error("Validation after execution failed: {0}")]
    ValidationAfterExec(#[from] PostExecutionError),
    #[error("Parent block not found")]
    ParentNotFound,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Trie error: {0}")]
    Trie(#[from] hearth_trie::TrieError),
    #[error("EVM error: {0}")]
    Evm(VMError),
}

impl From<VMError> for BlockExecutionError {
    fn from(err: VMError) -> Self {
        match err {
            // The VM's own upfront checks mirror the transaction
            // validator; surface them as transaction rejections.
            VMError::TxValidation(validation) => {
                BlockExecutionError::TxsExecution(match validation {
                    hearth_vm::errors::TxValidationError::InsufficientAccountFunds => {
                        InvalidTransactionError::InsufficientBalance
                    }
                    hearth_vm::errors::TxValidationError::IntrinsicGasTooLow => {
                        InvalidTransactionError::IntrinsicGasTooLow
                    }
                    hearth_vm::errors::TxValidationError::GasLimitPriceProductOverflow => {
                        InvalidTransactionError::UpfrontCostOverflow
                    }
                    hearth_vm::errors::TxValidationError::NonceMismatch { expected, got } => {
                        InvalidTransactionError::NonceMismatch { expected, got }
                    }
                    hearth_vm::errors::TxValidationError::NonceIsMax => {
                        InvalidTransactionError::NonceMismatch {
                            expected: u64::MAX,
                            got: u64::MAX,
                        }
                    }
                })
            }
            other => BlockExecutionError::Evm(other),
        }
    }
}
