use bytes::Bytes;
use hearth_common::types::TxLogEntry;
use thiserror::Error;

/// Faults that halt the current frame and consume its remaining gas.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExceptionalHalt {
    #[error("Out of gas")]
    OutOfGas,
    #[error("Invalid opcode")]
    InvalidOpcode,
    #[error("Stack overflow")]
    StackOverflow,
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Invalid jump destination")]
    InvalidJump,
    #[error("Offset out of bounds")]
    OutOfBounds,
    #[error("Operand too large for an offset")]
    VeryLargeNumber,
    #[error("Opcode not allowed in a static context")]
    OpcodeNotAllowedInStaticContext,
    #[error("Deployed code exceeds the maximum size")]
    ContractOutputTooBig,
    #[error("Contract address already occupied")]
    AddressAlreadyOccupied,
    #[error("Precompile error: {0}")]
    Precompile(#[from] PrecompileError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    #[error("Not enough gas")]
    NotEnoughGas,
    #[error("Malformed input")]
    ParsingInputError,
}

/// Bugs and environment failures. These abort execution instead of
/// reverting the transaction; a consensus-correct run never produces one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InternalError {
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Arithmetic underflow")]
    Underflow,
    #[error("Type conversion failed")]
    TypeConversion,
    #[error("Call frame stack is empty")]
    EmptyCallFrames,
    #[error("Database error: {0}")]
    Database(String),
}

/// Reasons a transaction is rejected before the VM starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxValidationError {
    #[error("Sender balance does not cover the upfront cost")]
    InsufficientAccountFunds,
    #[error("Nonce mismatch: expected {expected}, got {got}")]
    NonceMismatch { expected: u64, got: u64 },
    #[error("Gas limit below the intrinsic gas")]
    IntrinsicGasTooLow,
    #[error("Gas limit times gas price overflows")]
    GasLimitPriceProductOverflow,
    #[error("Sender nonce is at its maximum")]
    NonceIsMax,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VMError {
    #[error("Exceptional halt: {0}")]
    ExceptionalHalt(#[from] ExceptionalHalt),
    /// The REVERT opcode: rolls the frame back but keeps unspent gas.
    #[error("Revert opcode")]
    RevertOpcode,
    #[error("Transaction validation error: {0}")]
    TxValidation(#[from] TxValidationError),
    #[error("Internal error: {0}")]
    Internal(#[from] InternalError),
}

impl VMError {
    /// Internal and validation errors propagate to the caller; everything
    /// else reverts the current frame.
    pub fn should_propagate(&self) -> bool {
        matches!(self, VMError::Internal(_) | VMError::TxValidation(_))
    }
}

impl From<PrecompileError> for VMError {
    fn from(err: PrecompileError) -> Self {
        VMError::ExceptionalHalt(ExceptionalHalt::Precompile(err))
    }
}

/// Outcome of a single opcode dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeResult {
    Continue { pc_increment: usize },
    Halt,
}

/// How a frame (or the whole transaction) ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxResult {
    Success,
    Revert(VMError),
}

/// Outcome of one completed call frame.
#[derive(Debug, Clone)]
pub struct ContextResult {
    pub result: TxResult,
    /// Gas consumed inside the frame, from the frame's own budget.
    pub gas_used: u64,
    pub output: Bytes,
}

impl ContextResult {
    pub fn is_success(&self) -> bool {
        matches!(self.result, TxResult::Success)
    }
}

/// Outcome of a full external transaction.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub result: TxResult,
    /// Total gas charged to the sender, intrinsic gas included and
    /// refunds already deducted.
    pub gas_used: u64,
    pub gas_refunded: u64,
    pub output: Bytes,
    pub logs: Vec<TxLogEntry>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        matches!(self.result, TxResult::Success)
    }
}
