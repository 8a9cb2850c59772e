use crate::errors::{ExceptionalHalt, VMError};
use ethereum_types::{Address, H256, U256};
use hearth_common::crypto::keccak;
use hearth_rlp::structs::Encoder;

pub fn word_to_address(word: U256) -> Address {
    Address::from_slice(&word.to_big_endian()[12..])
}

pub fn address_to_word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

pub fn u256_to_h256(value: U256) -> H256 {
    H256(value.to_big_endian())
}

pub fn u256_to_usize(value: U256) -> Result<usize, VMError> {
    value
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber.into())
}

/// Converts a `(size, offset)` stack pair into native offsets. A zero size
/// never touches memory, so any offset is accepted for it.
pub fn size_offset_to_usize(size: U256, offset: U256) -> Result<(usize, usize), VMError> {
    let size = u256_to_usize(size)?;
    if size == 0 {
        return Ok((0, 0));
    }
    Ok((size, u256_to_usize(offset)?))
}

/// Contract address derivation for CREATE:
/// `keccak(rlp([sender, nonce]))[12..]`.
pub fn calculate_create_address(sender: Address, nonce: u64) -> Address {
    let mut buf = Vec::new();
    Encoder::new(&mut buf)
        .encode_field(&sender)
        .encode_field(&nonce)
        .finish();
    Address::from_slice(&keccak(buf).as_bytes()[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn create_address_derivation() {
        // keccak(rlp([0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0, 0]))[12..]
        let sender = Address::from(hex!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"));
        assert_eq!(
            calculate_create_address(sender, 0),
            Address::from(hex!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"))
        );
        assert_eq!(
            calculate_create_address(sender, 1),
            Address::from(hex!("343c43a37d37dff08ae8c4a11544c718abb4fcf8"))
        );
    }

    #[test]
    fn address_word_roundtrip() {
        let address = Address::from_low_u64_be(0xcafebabe);
        assert_eq!(word_to_address(address_to_word(address)), address);
    }

    #[test]
    fn zero_size_ignores_huge_offset() {
        let (size, offset) = size_offset_to_usize(U256::zero(), U256::MAX).unwrap();
        assert_eq!((size, offset), (0, 0));
        assert!(size_offset_to_usize(U256::one(), U256::MAX).is_err());
    }
}
