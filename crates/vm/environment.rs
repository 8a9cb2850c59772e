use crate::gas_schedule::GasSchedule;
use ethereum_types::{Address, U256};
use hearth_common::types::{BlockHeader, ChainConfig, Fork};

/// Immutable context for one transaction: the sender, the gas terms and
/// the enclosing block's fields, snapshotted before execution starts.
#[derive(Debug, Clone)]
pub struct Environment {
    /// The external transaction's sender, as recovered from its signature.
    pub origin: Address,
    pub gas_price: U256,
    /// The transaction's gas limit.
    pub gas_limit: u64,
    pub config: ChainConfig,
    pub fork: Fork,
    pub block_number: u64,
    pub coinbase: Address,
    pub timestamp: u64,
    pub difficulty: U256,
    pub block_gas_limit: u64,
}

impl Environment {
    pub fn new(
        origin: Address,
        gas_price: U256,
        gas_limit: u64,
        config: ChainConfig,
        header: &BlockHeader,
    ) -> Self {
        Self {
            origin,
            gas_price,
            gas_limit,
            fork: config.fork(header.number),
            config,
            block_number: header.number,
            coinbase: header.coinbase,
            timestamp: header.timestamp,
            difficulty: header.difficulty,
            block_gas_limit: header.gas_limit,
        }
    }

    pub fn gas_schedule(&self) -> &'static GasSchedule {
        GasSchedule::for_fork(self.fork)
    }
}
