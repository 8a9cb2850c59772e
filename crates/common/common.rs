pub mod constants;
pub mod crypto;
pub mod difficulty;
pub mod errors;
pub mod serde_utils;
pub mod types;

pub use ethereum_types::{Address, Bloom, BloomInput, H160, H256, H64, U256, U512};
