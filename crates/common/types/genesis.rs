use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, io::BufReader, path::Path};
use tracing::info;

/// Protocol revisions relevant to execution semantics, in activation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Fork {
    #[default]
    Frontier,
    Homestead,
    /// EIP-150: IO repricing and the 63/64 call-gas rule.
    Tangerine,
    /// EIP-155/158/160/170: replay protection, state clearing, EXP
    /// repricing, deployed-code size cap.
    SpuriousDragon,
    Byzantium,
    Constantinople,
}

/// Per-fork block reward schedule (Yellow Paper §11.3 plus the EIP-649 and
/// EIP-1234 reductions).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonetaryPolicy {
    #[serde(with = "crate::serde_utils::u256")]
    pub frontier_reward: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub byzantium_reward: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub constantinople_reward: U256,
}

impl Default for MonetaryPolicy {
    fn default() -> Self {
        let ether = U256::from(crate::constants::WEI_PER_ETHER);
        Self {
            frontier_reward: ether * 5,
            byzantium_reward: ether * 3,
            constantinople_reward: ether * 2,
        }
    }
}

impl MonetaryPolicy {
    pub fn block_reward(&self, fork: Fork) -> U256 {
        match fork {
            Fork::Constantinople => self.constantinople_reward,
            Fork::Byzantium => self.byzantium_reward,
            _ => self.frontier_reward,
        }
    }
}

/// Chain parameters: identity plus the block numbers at which each fork
/// activates (`None` = never).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    pub homestead_block: Option<u64>,
    /// EIP-150 (Tangerine Whistle) activation.
    pub eip150_block: Option<u64>,
    /// EIP-155 activation; signatures are chain-bound from here on.
    pub eip155_block: Option<u64>,
    /// EIP-158/160/170 (Spurious Dragon) activation.
    pub eip158_block: Option<u64>,
    pub byzantium_block: Option<u64>,
    pub constantinople_block: Option<u64>,
    #[serde(default)]
    pub monetary_policy: MonetaryPolicy,
}

impl ChainConfig {
    /// Resolves the active fork for a block number.
    pub fn fork(&self, block_number: u64) -> Fork {
        let activated = |activation: Option<u64>| activation.is_some_and(|at| block_number >= at);
        if activated(self.constantinople_block) {
            Fork::Constantinople
        } else if activated(self.byzantium_block) {
            Fork::Byzantium
        } else if activated(self.eip158_block) {
            Fork::SpuriousDragon
        } else if activated(self.eip150_block) {
            Fork::Tangerine
        } else if activated(self.homestead_block) {
            Fork::Homestead
        } else {
            Fork::Frontier
        }
    }

    /// Whether transaction signatures are bound to the chain id (EIP-155).
    pub fn is_eip155_activated(&self, block_number: u64) -> bool {
        self.eip155_block.is_some_and(|at| block_number >= at)
    }

    pub fn block_reward(&self, block_number: u64) -> U256 {
        self.monetary_policy.block_reward(self.fork(block_number))
    }
}

/// Initial balance, and optionally code, nonce and storage, for one
/// genesis account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenesisAccount {
    #[serde(with = "crate::serde_utils::u256")]
    pub balance: U256,
    #[serde(default, with = "crate::serde_utils::bytes::option")]
    pub code: Option<Bytes>,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(default)]
    pub storage: BTreeMap<H256, U256>,
}

/// Genesis file contents: chain config, header fields and the initial
/// account allocation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Genesis {
    pub config: ChainConfig,
    pub alloc: BTreeMap<Address, GenesisAccount>,
    #[serde(default)]
    pub coinbase: Address,
    #[serde(with = "crate::serde_utils::u256")]
    pub difficulty: U256,
    #[serde(default, with = "crate::serde_utils::bytes")]
    pub extra_data: Bytes,
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub gas_limit: u64,
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub nonce: u64,
    #[serde(default, alias = "mixHash", alias = "mixhash")]
    pub mix_hash: H256,
    #[serde(with = "crate::serde_utils::u64::hex_or_dec_str")]
    pub timestamp: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    #[error("Failed to decode genesis file: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Failed to open genesis file: {0}")]
    File(#[from] std::io::Error),
}

impl TryFrom<&Path> for Genesis {
    type Error = GenesisError;

    fn try_from(genesis_file_path: &Path) -> Result<Self, Self::Error> {
        let file = std::fs::File::open(genesis_file_path)?;
        let genesis: Genesis = serde_json::from_reader(BufReader::new(file))?;
        info!(
            chain_id = genesis.config.chain_id,
            accounts = genesis.alloc.len(),
            "loaded genesis file"
        );
        Ok(genesis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_resolution_order() {
        let config = ChainConfig {
            chain_id: 1,
            homestead_block: Some(1_150_000),
            eip150_block: Some(2_463_000),
            eip155_block: Some(2_675_000),
            eip158_block: Some(2_675_000),
            byzantium_block: Some(4_370_000),
            constantinople_block: None,
            monetary_policy: MonetaryPolicy::default(),
        };
        assert_eq!(config.fork(0), Fork::Frontier);
        assert_eq!(config.fork(1_150_000), Fork::Homestead);
        assert_eq!(config.fork(2_463_000), Fork::Tangerine);
        assert_eq!(config.fork(2_675_000), Fork::SpuriousDragon);
        assert_eq!(config.fork(9_000_000), Fork::Byzantium);
        assert!(!config.is_eip155_activated(2_674_999));
        assert!(config.is_eip155_activated(2_675_000));
    }

    #[test]
    fn block_reward_schedule() {
        let policy = MonetaryPolicy::default();
        let ether = U256::from(crate::constants::WEI_PER_ETHER);
        assert_eq!(policy.block_reward(Fork::Frontier), ether * 5);
        assert_eq!(policy.block_reward(Fork::SpuriousDragon), ether * 5);
        assert_eq!(policy.block_reward(Fork::Byzantium), ether * 3);
        assert_eq!(policy.block_reward(Fork::Constantinople), ether * 2);
    }

    #[test]
    fn parse_genesis_json() {
        let raw = r#"{
            "config": {
                "chainId": 61,
                "homesteadBlock": 0,
                "eip150Block": 0,
                "eip155Block": 10,
                "eip158Block": 10
            },
            "alloc": {
                "0x3333333333333333333333333333333333333333": {
                    "balance": "0xde0b6b3a7640000"
                }
            },
            "coinbase": "0x0000000000000000000000000000000000000000",
            "difficulty": "0x20000",
            "extraData": "0x",
            "gasLimit": "0x2fefd8",
            "nonce": "0x42",
            "mixHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
            "timestamp": "0x00"
        }"#;
        let genesis: Genesis = serde_json::from_str(raw).unwrap();
        assert_eq!(genesis.config.chain_id, 61);
        assert_eq!(genesis.config.fork(0), Fork::Tangerine);
        assert_eq!(genesis.config.fork(10), Fork::SpuriousDragon);
        assert_eq!(genesis.gas_limit, 0x2fefd8);
        assert_eq!(genesis.nonce, 0x42);
        let account = genesis
            .alloc
            .values()
            .next()
            .expect("allocation should not be empty");
        assert_eq!(account.balance, U256::from(crate::constants::WEI_PER_ETHER));
    }
}
