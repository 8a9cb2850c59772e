use thiserror::Error;

/// Reasons a block can be rejected before any transaction runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidBlockError {
    #[error("Block number is not parent number + 1")]
    NonConsecutiveNumber,
    #[error("Timestamp is not later than the parent's")]
    TimestampNotMonotonic,
    #[error("Gas limit moved more than allowed from the parent's")]
    GasLimitOutOfBounds,
    #[error("Gas limit below the protocol minimum")]
    GasLimitTooLow,
    #[error("Gas used exceeds the gas limit")]
    GasUsedExceedsLimit,
    #[error("Extra data longer than 32 bytes")]
    ExtraDataTooLong,
    #[error("Difficulty does not match the adjustment formula")]
    DifficultyMismatch,
    #[error("Transactions root does not match the block body")]
    TransactionsRootMismatch,
    #[error("Ommers hash does not match the block body")]
    OmmersHashMismatch,
    #[error("Too many ommers")]
    TooManyOmmers,
    #[error("Ommer is not a child of a recent ancestor")]
    OmmerUnrelated,
    #[error("Ommer was already included")]
    OmmerAlreadyIncluded,
    #[error("Ommer is an ancestor of the block")]
    OmmerIsAncestor,
    #[error("Ommer header is invalid: {0}")]
    InvalidOmmerHeader(String),
}
