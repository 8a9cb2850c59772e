use super::{
    constants::{RLP_EMPTY_LIST, RLP_NULL},
    error::RLPDecodeError,
};
use bytes::Bytes;
use ethereum_types::{Address, Bloom, H256, H64, U256};

/// Trait for decoding RLP encoded slices of data.
///
/// [`decode_unfinished`](RLPDecode::decode_unfinished) returns the decoded
/// value along with the remaining bytes; [`decode`](RLPDecode::decode)
/// additionally requires the input to be fully consumed.
pub trait RLPDecode: Sized {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError>;

    fn decode(rlp: &[u8]) -> Result<Self, RLPDecodeError> {
        let (decoded, remaining) = Self::decode_unfinished(rlp)?;
        if !remaining.is_empty() {
            return Err(RLPDecodeError::InvalidLength);
        }
        Ok(decoded)
    }
}

/// Splits an RLP item into `(is_list, payload, remaining)`.
pub fn decode_rlp_item(rlp: &[u8]) -> Result<(bool, &[u8], &[u8]), RLPDecodeError> {
    let first = *rlp.first().ok_or(RLPDecodeError::InvalidLength)?;
    match first {
        // Single byte, its own encoding.
        0..=0x7f => Ok((false, &rlp[..1], &rlp[1..])),
        // Short string.
        RLP_NULL..=0xb7 => {
            let len = (first - RLP_NULL) as usize;
            split_payload(rlp, 1, len, false)
        }
        // Long string.
        0xb8..=0xbf => {
            let (len, header_len) = decode_long_length(rlp, first - 0xb7)?;
            split_payload(rlp, header_len, len, false)
        }
        // Short list.
        RLP_EMPTY_LIST..=0xf7 => {
            let len = (first - RLP_EMPTY_LIST) as usize;
            split_payload(rlp, 1, len, true)
        }
        // Long list.
        _ => {
            let (len, header_len) = decode_long_length(rlp, first - 0xf7)?;
            split_payload(rlp, header_len, len, true)
        }
    }
}

fn decode_long_length(rlp: &[u8], len_of_len: u8) -> Result<(usize, usize), RLPDecodeError> {
    let len_of_len = len_of_len as usize;
    let len_bytes = rlp
        .get(1..1 + len_of_len)
        .ok_or(RLPDecodeError::InvalidLength)?;
    if len_bytes.first() == Some(&0) || len_of_len > size_of::<usize>() {
        return Err(RLPDecodeError::MalformedData);
    }
    let mut len: usize = 0;
    for byte in len_bytes {
        len = (len << 8) | *byte as usize;
    }
    // A long form length must not fit in the short form.
    if len < 56 {
        return Err(RLPDecodeError::MalformedData);
    }
    Ok((len, 1 + len_of_len))
}

fn split_payload(
    rlp: &[u8],
    header_len: usize,
    payload_len: usize,
    is_list: bool,
) -> Result<(bool, &[u8], &[u8]), RLPDecodeError> {
    let end = header_len
        .checked_add(payload_len)
        .ok_or(RLPDecodeError::InvalidLength)?;
    let payload = rlp
        .get(header_len..end)
        .ok_or(RLPDecodeError::InvalidLength)?;
    Ok((is_list, payload, &rlp[end..]))
}

/// Decodes a byte-string item, rejecting lists.
pub fn decode_bytes(rlp: &[u8]) -> Result<(&[u8], &[u8]), RLPDecodeError> {
    let (is_list, payload, rest) = decode_rlp_item(rlp)?;
    if is_list {
        return Err(RLPDecodeError::UnexpectedList);
    }
    Ok((payload, rest))
}

/// Returns the next item including its prefix, without decoding it.
pub fn get_item_with_prefix(rlp: &[u8]) -> Result<(&[u8], &[u8]), RLPDecodeError> {
    let (_, payload, rest) = decode_rlp_item(rlp)?;
    let consumed = rlp.len() - rest.len();
    debug_assert!(consumed >= payload.len());
    Ok((&rlp[..consumed], rest))
}

/// Left-pads a decoded integer payload into a fixed-size buffer,
/// rejecting non-canonical (leading-zero or oversized) encodings.
fn static_left_pad<const N: usize>(bytes: &[u8]) -> Result<[u8; N], RLPDecodeError> {
    let mut padded = [0; N];
    if bytes.is_empty() {
        return Ok(padded);
    }
    if bytes[0] == 0 {
        return Err(RLPDecodeError::MalformedData);
    }
    let start = N
        .checked_sub(bytes.len())
        .ok_or(RLPDecodeError::InvalidLength)?;
    padded[start..].copy_from_slice(bytes);
    Ok(padded)
}

impl RLPDecode for bool {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let first = rlp.first().ok_or(RLPDecodeError::InvalidLength)?;
        let value = match first {
            &RLP_NULL => false,
            0x01 => true,
            _ => return Err(RLPDecodeError::MalformedBoolean),
        };
        Ok((value, &rlp[1..]))
    }
}

macro_rules! impl_decode_uint {
    ($($t:ty),*) => {
        $(impl RLPDecode for $t {
            fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
                let (bytes, rest) = decode_bytes(rlp)?;
                let padded = static_left_pad(bytes)?;
                Ok((<$t>::from_be_bytes(padded), rest))
            }
        })*
    };
}

impl_decode_uint!(u8, u16, u32, u64, usize, u128);

impl RLPDecode for U256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        let padded: [u8; 32] = static_left_pad(bytes)?;
        Ok((U256::from_big_endian(&padded), rest))
    }
}

impl<const N: usize> RLPDecode for [u8; N] {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        let value = bytes
            .try_into()
            .map_err(|_| RLPDecodeError::InvalidLength)?;
        Ok((value, rest))
    }
}

impl RLPDecode for Bytes {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        Ok((Bytes::copy_from_slice(bytes), rest))
    }
}

impl RLPDecode for String {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        let value = String::from_utf8(bytes.to_vec())
            .map_err(|_| RLPDecodeError::MalformedData)?;
        Ok((value, rest))
    }
}

impl RLPDecode for Address {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = <[u8; 20]>::decode_unfinished(rlp)?;
        Ok((Address::from(bytes), rest))
    }
}

impl RLPDecode for H256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = <[u8; 32]>::decode_unfinished(rlp)?;
        Ok((H256::from(bytes), rest))
    }
}

impl RLPDecode for H64 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = <[u8; 8]>::decode_unfinished(rlp)?;
        Ok((H64::from(bytes), rest))
    }
}

impl RLPDecode for Bloom {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = <[u8; 256]>::decode_unfinished(rlp)?;
        Ok((Bloom::from(bytes), rest))
    }
}

impl<T: RLPDecode> RLPDecode for Vec<T> {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, mut payload, rest) = decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::UnexpectedString);
        }
        let mut items = Vec::new();
        while !payload.is_empty() {
            let (item, remaining) = T::decode_unfinished(payload)?;
            items.push(item);
            payload = remaining;
        }
        Ok((items, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_integers() {
        assert_eq!(u64::decode(&[0x80]).unwrap(), 0);
        assert_eq!(u64::decode(&[0x0f]).unwrap(), 15);
        assert_eq!(u64::decode(&[0x82, 0x04, 0x00]).unwrap(), 1024);
        // Leading zeros are non-canonical.
        assert!(u64::decode(&[0x82, 0x00, 0x01]).is_err());
    }

    #[test]
    fn decode_strings() {
        let (s, rest) = String::decode_unfinished(&[0x83, b'd', b'o', b'g']).unwrap();
        assert_eq!(s, "dog");
        assert!(rest.is_empty());
    }

    #[test]
    fn decode_list_of_strings() {
        let encoded = [0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g'];
        let decoded: Vec<String> = Vec::decode(&encoded).unwrap();
        assert_eq!(decoded, vec!["cat".to_string(), "dog".to_string()]);
    }

    #[test]
    fn decode_rejects_trailing_garbage() {
        assert!(u64::decode(&[0x0f, 0x00]).is_err());
    }

    #[test]
    fn roundtrip_u256() {
        use crate::encode::RLPEncode;
        let value = U256::from(123456789u64);
        let encoded = value.encode_to_vec();
        assert_eq!(U256::decode(&encoded).unwrap(), value);
    }
}
