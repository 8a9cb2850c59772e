use bytes::BufMut;
use bytes::Bytes;
use ethereum_types::{Address, Bloom, H256, H64, U256};

use super::constants::{RLP_EMPTY_LIST, RLP_NULL};

/// Function for encoding a value to RLP.
/// For encoding the value into a buffer directly, use [`RLPEncode::encode`].
pub fn encode<T: RLPEncode>(value: T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode(&mut buf);
    buf
}

pub trait RLPEncode {
    fn encode(&self, buf: &mut dyn BufMut);

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

/// Writes the RLP prefix for a list payload of `total_len` bytes.
pub fn encode_length(total_len: usize, buf: &mut dyn BufMut) {
    if total_len < 56 {
        buf.put_u8(RLP_EMPTY_LIST + total_len as u8);
    } else {
        let be_len: Vec<u8> = total_len
            .to_be_bytes()
            .into_iter()
            .skip_while(|x| *x == 0)
            .collect();
        buf.put_u8(0xf7 + be_len.len() as u8);
        buf.put_slice(&be_len);
    }
}

/// Encodes a byte string with its RLP prefix.
pub fn encode_bytes(bytes: &[u8], buf: &mut dyn BufMut) {
    match bytes {
        [single] if *single < RLP_NULL => buf.put_u8(*single),
        _ if bytes.len() < 56 => {
            buf.put_u8(RLP_NULL + bytes.len() as u8);
            buf.put_slice(bytes);
        }
        _ => {
            let be_len: Vec<u8> = bytes
                .len()
                .to_be_bytes()
                .into_iter()
                .skip_while(|x| *x == 0)
                .collect();
            buf.put_u8(0xb7 + be_len.len() as u8);
            buf.put_slice(&be_len);
            buf.put_slice(bytes);
        }
    }
}

// Unsigned integers encode as their big-endian bytes with leading zeros stripped.
fn encode_unsigned(value_be: &[u8], buf: &mut dyn BufMut) {
    let first_nonzero = value_be.iter().position(|x| *x != 0);
    match first_nonzero {
        None => buf.put_u8(RLP_NULL),
        Some(i) => encode_bytes(&value_be[i..], buf),
    }
}

impl RLPEncode for bool {
    fn encode(&self, buf: &mut dyn BufMut) {
        if *self {
            buf.put_u8(0x01);
        } else {
            buf.put_u8(RLP_NULL);
        }
    }
}

macro_rules! impl_encode_uint {
    ($($t:ty),*) => {
        $(impl RLPEncode for $t {
            fn encode(&self, buf: &mut dyn BufMut) {
                encode_unsigned(&self.to_be_bytes(), buf);
            }
        })*
    };
}

impl_encode_uint!(u8, u16, u32, u64, usize, u128);

impl RLPEncode for U256 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_unsigned(&self.to_big_endian(), buf);
    }
}

impl RLPEncode for () {
    fn encode(&self, buf: &mut dyn BufMut) {
        buf.put_u8(RLP_NULL);
    }
}

impl RLPEncode for Bytes {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self, buf);
    }
}

impl RLPEncode for str {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl RLPEncode for String {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl<const N: usize> RLPEncode for [u8; N] {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self, buf);
    }
}

impl RLPEncode for Address {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl RLPEncode for H256 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl RLPEncode for H64 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl RLPEncode for Bloom {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl<T: RLPEncode> RLPEncode for Vec<T> {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_slice().encode(buf)
    }
}

impl<T: RLPEncode> RLPEncode for [T] {
    fn encode(&self, buf: &mut dyn BufMut) {
        let mut payload = Vec::new();
        for item in self {
            item.encode(&mut payload);
        }
        encode_length(payload.len(), buf);
        buf.put_slice(&payload);
    }
}

impl<T: RLPEncode + ?Sized> RLPEncode for &T {
    fn encode(&self, buf: &mut dyn BufMut) {
        (**self).encode(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn encode_integers() {
        assert_eq!(encode(0u64), vec![0x80]);
        assert_eq!(encode(15u64), vec![0x0f]);
        assert_eq!(encode(1024u64), vec![0x82, 0x04, 0x00]);
        assert_eq!(encode(U256::zero()), vec![0x80]);
        assert_eq!(encode(U256::from(127)), vec![0x7f]);
    }

    #[test]
    fn encode_strings() {
        assert_eq!(encode("dog"), vec![0x83, b'd', b'o', b'g']);
        assert_eq!(encode(""), vec![0x80]);
        let lorem = "Lorem ipsum dolor sit amet, consectetur adipisicing elit";
        let mut expected = vec![0xb8, 0x38];
        expected.extend_from_slice(lorem.as_bytes());
        assert_eq!(encode(lorem), expected);
    }

    #[test]
    fn encode_lists() {
        // [ "cat", "dog" ]
        let list = vec!["cat".to_string(), "dog".to_string()];
        assert_eq!(
            encode(list),
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
        let empty: Vec<String> = vec![];
        assert_eq!(encode(empty), vec![0xc0]);
    }

    #[test]
    fn encode_hashes() {
        let h = H256::from(hex!(
            "8ae0a0b9deea3e5399c0b21dae015e298b461050f1cb06c4f0016da84ca8cdf7"
        ));
        let encoded = encode(h);
        assert_eq!(encoded[0], 0xa0);
        assert_eq!(&encoded[1..], h.as_bytes());
    }
}
