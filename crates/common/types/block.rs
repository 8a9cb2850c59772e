use crate::{
    constants::{
        DEFAULT_OMMERS_HASH, EMPTY_TRIE_HASH, GAS_LIMIT_BOUND_DIVISOR, MAX_EXTRA_DATA_SIZE,
        MIN_GAS_LIMIT,
    },
    crypto::keccak,
    difficulty::calculate_difficulty,
    errors::InvalidBlockError,
    types::{ChainConfig, Genesis, Transaction},
};
use bytes::Bytes;
use ethereum_types::{Address, Bloom, H256, H64, U256};
use hearth_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use hearth_trie::Trie;

pub type BlockNumber = u64;
pub type BlockHash = H256;

/// Block header with the full pre-merge field set, including the proof of
/// work seal (`mix_hash`, `nonce`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub parent_hash: H256,
    pub ommers_hash: H256,
    /// The miner address credited with rewards and fees.
    pub coinbase: Address,
    pub state_root: H256,
    pub transactions_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: BlockNumber,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub mix_hash: H256,
    pub nonce: H64,
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self {
            parent_hash: H256::zero(),
            ommers_hash: *DEFAULT_OMMERS_HASH,
            coinbase: Address::zero(),
            state_root: *EMPTY_TRIE_HASH,
            transactions_root: *EMPTY_TRIE_HASH,
            receipts_root: *EMPTY_TRIE_HASH,
            logs_bloom: Bloom::zero(),
            difficulty: U256::zero(),
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Bytes::new(),
            mix_hash: H256::zero(),
            nonce: H64::zero(),
        }
    }
}

impl BlockHeader {
    pub fn compute_block_hash(&self) -> BlockHash {
        keccak(self.encode_to_vec())
    }

    pub fn has_ommers(&self) -> bool {
        self.ommers_hash != *DEFAULT_OMMERS_HASH
    }
}

impl RLPEncode for BlockHeader {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.parent_hash)
            .encode_field(&self.ommers_hash)
            .encode_field(&self.coinbase)
            .encode_field(&self.state_root)
            .encode_field(&self.transactions_root)
            .encode_field(&self.receipts_root)
            .encode_field(&self.logs_bloom)
            .encode_field(&self.difficulty)
            .encode_field(&self.number)
            .encode_field(&self.gas_limit)
            .encode_field(&self.gas_used)
            .encode_field(&self.timestamp)
            .encode_field(&self.extra_data)
            .encode_field(&self.mix_hash)
            .encode_field(&self.nonce)
            .finish();
    }
}

impl RLPDecode for BlockHeader {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (parent_hash, decoder) = decoder.decode_field("parent_hash")?;
        let (ommers_hash, decoder) = decoder.decode_field("ommers_hash")?;
        let (coinbase, decoder) = decoder.decode_field("coinbase")?;
        let (state_root, decoder) = decoder.decode_field("state_root")?;
        let (transactions_root, decoder) = decoder.decode_field("transactions_root")?;
        let (receipts_root, decoder) = decoder.decode_field("receipts_root")?;
        let (logs_bloom, decoder) = decoder.decode_field("logs_bloom")?;
        let (difficulty, decoder) = decoder.decode_field("difficulty")?;
        let (number, decoder) = decoder.decode_field("number")?;
        let (gas_limit, decoder) = decoder.decode_field("gas_limit")?;
        let (gas_used, decoder) = decoder.decode_field("gas_used")?;
        let (timestamp, decoder) = decoder.decode_field("timestamp")?;
        let (extra_data, decoder) = decoder.decode_field("extra_data")?;
        let (mix_hash, decoder) = decoder.decode_field("mix_hash")?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        Ok((
            Self {
                parent_hash,
                ommers_hash,
                coinbase,
                state_root,
                transactions_root,
                receipts_root,
                logs_bloom,
                difficulty,
                number,
                gas_limit,
                gas_used,
                timestamp,
                extra_data,
                mix_hash,
                nonce,
            },
            decoder.finish()?,
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockBody {
    pub transactions: Vec<Transaction>,
    pub ommers: Vec<BlockHeader>,
}

impl RLPEncode for BlockBody {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.transactions)
            .encode_field(&self.ommers)
            .finish();
    }
}

impl RLPDecode for BlockBody {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (transactions, decoder) = decoder.decode_field("transactions")?;
        let (ommers, decoder) = decoder.decode_field("ommers")?;
        Ok((
            Self {
                transactions,
                ommers,
            },
            decoder.finish()?,
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub body: BlockBody,
}

impl Block {
    pub fn new(header: BlockHeader, body: BlockBody) -> Self {
        Self { header, body }
    }

    pub fn hash(&self) -> BlockHash {
        self.header.compute_block_hash()
    }
}

impl RLPEncode for Block {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.header)
            .encode_field(&self.body.transactions)
            .encode_field(&self.body.ommers)
            .finish();
    }
}

impl RLPDecode for Block {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (header, decoder) = decoder.decode_field("header")?;
        let (transactions, decoder) = decoder.decode_field("transactions")?;
        let (ommers, decoder) = decoder.decode_field("ommers")?;
        Ok((
            Self {
                header,
                body: BlockBody {
                    transactions,
                    ommers,
                },
            },
            decoder.finish()?,
        ))
    }
}

/// Root of the ordered transaction trie committed to by the header.
pub fn compute_transactions_root(transactions: &[Transaction]) -> H256 {
    let encoded: Vec<Vec<u8>> = transactions.iter().map(|tx| tx.encode_to_vec()).collect();
    Trie::compute_root_from_ordered(&encoded)
}

/// Hash of the RLP-encoded ommer header list committed to by the header.
pub fn compute_ommers_hash(ommers: &[BlockHeader]) -> H256 {
    keccak(ommers.to_vec().encode_to_vec())
}

/// Pre-execution header checks against the parent (Yellow Paper §4.3.4):
/// consecutive number, monotonic timestamp, bounded gas-limit drift,
/// extra-data length and the difficulty adjustment formula.
pub fn validate_block_header(
    header: &BlockHeader,
    parent: &BlockHeader,
    config: &ChainConfig,
) -> Result<(), InvalidBlockError> {
    if header.number != parent.number + 1 {
        return Err(InvalidBlockError::NonConsecutiveNumber);
    }
    if header.timestamp <= parent.timestamp {
        return Err(InvalidBlockError::TimestampNotMonotonic);
    }
    if header.gas_used > header.gas_limit {
        return Err(InvalidBlockError::GasUsedExceedsLimit);
    }
    if header.gas_limit < MIN_GAS_LIMIT {
        return Err(InvalidBlockError::GasLimitTooLow);
    }
    let max_delta = parent.gas_limit / GAS_LIMIT_BOUND_DIVISOR;
    if header.gas_limit.abs_diff(parent.gas_limit) >= max_delta {
        return Err(InvalidBlockError::GasLimitOutOfBounds);
    }
    if header.extra_data.len() > MAX_EXTRA_DATA_SIZE {
        return Err(InvalidBlockError::ExtraDataTooLong);
    }
    let expected_difficulty = calculate_difficulty(
        parent.difficulty,
        parent.timestamp,
        parent.has_ommers(),
        header.timestamp,
        header.number,
        config.fork(header.number),
    );
    if header.difficulty != expected_difficulty {
        return Err(InvalidBlockError::DifficultyMismatch);
    }
    Ok(())
}

impl Genesis {
    /// The header of block zero; `state_root` is the root obtained from
    /// committing the allocation into a fresh state trie.
    pub fn get_block_header(&self, state_root: H256) -> BlockHeader {
        BlockHeader {
            state_root,
            coinbase: self.coinbase,
            difficulty: self.difficulty,
            extra_data: self.extra_data.clone(),
            gas_limit: self.gas_limit,
            timestamp: self.timestamp,
            mix_hash: self.mix_hash,
            nonce: H64::from(self.nonce.to_be_bytes()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent_and_child() -> (BlockHeader, BlockHeader) {
        let parent = BlockHeader {
            number: 10,
            timestamp: 1_000_000,
            gas_limit: 3_141_592,
            difficulty: U256::from(131_072u64),
            ..Default::default()
        };
        // 20 seconds after the parent: the downward adjustment clamps at
        // the minimum difficulty, so the child keeps the parent's value.
        let child = BlockHeader {
            number: 11,
            timestamp: 1_000_020,
            gas_limit: 3_141_592,
            difficulty: U256::from(131_072u64),
            parent_hash: parent.compute_block_hash(),
            ..Default::default()
        };
        (parent, child)
    }

    #[test]
    fn header_rlp_roundtrip() {
        let (_, header) = parent_and_child();
        let encoded = header.encode_to_vec();
        assert_eq!(BlockHeader::decode(&encoded).unwrap(), header);
    }

    #[test]
    fn header_validation_accepts_well_formed_child() {
        let (parent, child) = parent_and_child();
        let config = ChainConfig::default();
        validate_block_header(&child, &parent, &config).unwrap();
    }

    #[test]
    fn header_validation_rejects_bad_gas_limit() {
        let (parent, mut child) = parent_and_child();
        let config = ChainConfig::default();
        child.gas_limit = parent.gas_limit * 2;
        assert_eq!(
            validate_block_header(&child, &parent, &config),
            Err(InvalidBlockError::GasLimitOutOfBounds)
        );
    }

    #[test]
    fn header_validation_rejects_stale_timestamp() {
        let (parent, mut child) = parent_and_child();
        let config = ChainConfig::default();
        child.timestamp = parent.timestamp;
        assert_eq!(
            validate_block_header(&child, &parent, &config),
            Err(InvalidBlockError::TimestampNotMonotonic)
        );
    }

    #[test]
    fn empty_ommers_hash_matches_constant() {
        assert_eq!(compute_ommers_hash(&[]), *DEFAULT_OMMERS_HASH);
        assert_eq!(
            hex::encode(*DEFAULT_OMMERS_HASH),
            "1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347"
        );
    }

    #[test]
    fn transactions_root_of_empty_list() {
        assert_eq!(compute_transactions_root(&[]), *EMPTY_TRIE_HASH);
    }
}
