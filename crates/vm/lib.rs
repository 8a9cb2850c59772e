pub mod account;
pub mod call_frame;
pub mod constants;
pub mod db;
pub mod environment;
pub mod errors;
pub mod gas_cost;
pub mod gas_schedule;
pub mod memory;
pub mod opcode_handlers;
pub mod opcodes;
pub mod precompiles;
pub mod utils;
pub mod vm;

pub use account::{Account, StorageSlot};
pub use db::{CacheDB, GeneralizedDatabase, VmDatabase};
pub use environment::Environment;
pub use errors::{ExecutionReport, TxResult, VMError};
pub use vm::{Substate, VM};
