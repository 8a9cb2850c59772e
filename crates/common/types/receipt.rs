use crate::crypto::keccak;
use bytes::Bytes;
use ethereum_types::{Address, Bloom, BloomInput, H256};
use hearth_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use hearth_trie::Trie;

/// A log emitted by a LOG0..LOG4 opcode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxLogEntry {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

impl RLPEncode for TxLogEntry {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.topics)
            .encode_field(&self.data)
            .finish();
    }
}

impl RLPDecode for TxLogEntry {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (topics, decoder) = decoder.decode_field("topics")?;
        let (data, decoder) = decoder.decode_field("data")?;
        Ok((
            Self {
                address,
                topics,
                data,
            },
            decoder.finish()?,
        ))
    }
}

/// Per-transaction execution record, committing to the intermediate state
/// root, the running gas total and the logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    /// State root after this transaction was applied.
    pub post_state: H256,
    /// Gas used by this and all previous transactions in the block.
    pub cumulative_gas_used: u64,
    pub logs_bloom: Bloom,
    pub logs: Vec<TxLogEntry>,
}

impl Receipt {
    pub fn new(post_state: H256, cumulative_gas_used: u64, logs: Vec<TxLogEntry>) -> Self {
        Self {
            post_state,
            cumulative_gas_used,
            logs_bloom: bloom_from_logs(&logs),
            logs,
        }
    }
}

/// Accrues each log address and topic into a 2048-bit bloom
/// (Yellow Paper §4.3.1).
pub fn bloom_from_logs(logs: &[TxLogEntry]) -> Bloom {
    let mut bloom = Bloom::zero();
    for log in logs {
        bloom.accrue(BloomInput::Hash(&keccak(log.address).0));
        for topic in &log.topics {
            bloom.accrue(BloomInput::Hash(&keccak(topic).0));
        }
    }
    bloom
}

impl RLPEncode for Receipt {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.post_state)
            .encode_field(&self.cumulative_gas_used)
            .encode_field(&self.logs_bloom)
            .encode_field(&self.logs)
            .finish();
    }
}

impl RLPDecode for Receipt {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (post_state, decoder) = decoder.decode_field("post_state")?;
        let (cumulative_gas_used, decoder) = decoder.decode_field("cumulative_gas_used")?;
        let (logs_bloom, decoder) = decoder.decode_field("logs_bloom")?;
        let (logs, decoder) = decoder.decode_field("logs")?;
        Ok((
            Self {
                post_state,
                cumulative_gas_used,
                logs_bloom,
                logs,
            },
            decoder.finish()?,
        ))
    }
}

/// Root of the ordered receipt trie committed to by the header.
pub fn compute_receipts_root(receipts: &[Receipt]) -> H256 {
    let encoded: Vec<Vec<u8>> = receipts.iter().map(|r| r.encode_to_vec()).collect();
    Trie::compute_root_from_ordered(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::U256;
    use hearth_rlp::encode::RLPEncode;

    #[test]
    fn receipt_rlp_roundtrip() {
        let receipt = Receipt::new(
            H256::from_low_u64_be(0xabcd),
            53_000,
            vec![TxLogEntry {
                address: Address::from_low_u64_be(7),
                topics: vec![H256::from_low_u64_be(1), H256::from_low_u64_be(2)],
                data: Bytes::from(U256::from(99).to_big_endian().to_vec()),
            }],
        );
        let encoded = receipt.encode_to_vec();
        assert_eq!(Receipt::decode(&encoded).unwrap(), receipt);
    }

    #[test]
    fn bloom_covers_address_and_topics() {
        let log = TxLogEntry {
            address: Address::from_low_u64_be(0xcafe),
            topics: vec![H256::from_low_u64_be(42)],
            data: Bytes::new(),
        };
        let bloom = bloom_from_logs(std::slice::from_ref(&log));
        assert!(!bloom.is_zero());
        assert!(bloom.contains_input(BloomInput::Hash(&keccak(log.address).0)));
        assert!(bloom.contains_input(BloomInput::Hash(&keccak(log.topics[0]).0)));

        // A union of receipts' blooms must contain each individual bloom.
        let mut union = Bloom::zero();
        union.accrue_bloom(&bloom);
        assert!(union.contains_bloom(&bloom));
    }

    #[test]
    fn empty_bloom_for_no_logs() {
        assert!(bloom_from_logs(&[]).is_zero());
    }
}
