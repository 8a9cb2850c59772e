pub const WORD_SIZE_IN_BYTES_USIZE: usize = 32;
pub const WORD_SIZE_IN_BYTES_U64: u64 = 32;

/// Quadratic coefficient divisor of the memory cost function.
pub const MEMORY_EXPANSION_QUOTIENT: usize = 512;

pub const STACK_LIMIT: usize = 1024;
pub const MAX_CALL_DEPTH: usize = 1024;

/// Deployed bytecode size cap (EIP-170, Spurious Dragon on).
pub const MAX_CODE_SIZE: usize = 24576;

/// Stack values pushed by the CALL family to signal the child's outcome.
pub const SUCCESS: u8 = 1;
pub const FAIL: u8 = 0;

/// Number of ancestor hashes addressable by BLOCKHASH.
pub const BLOCKHASH_WINDOW_SIZE: u64 = 256;
