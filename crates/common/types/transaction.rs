use crate::{
    crypto::{self, EcdsaError},
    types::Fork,
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use hearth_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};

/// Base cost charged to every transaction before execution.
pub const TX_GAS_COST: u64 = 21_000;
/// Additional base cost for contract-creating transactions (Homestead on).
pub const TX_CREATE_GAS_COST: u64 = 32_000;
pub const TX_DATA_ZERO_GAS_COST: u64 = 4;
pub const TX_DATA_NON_ZERO_GAS_COST: u64 = 68;

/// A transaction's destination: a contract creation or a message call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TxKind {
    #[default]
    Create,
    Call(Address),
}

impl RLPEncode for TxKind {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        match self {
            TxKind::Create => Bytes::new().encode(buf),
            TxKind::Call(address) => address.encode(buf),
        }
    }
}

impl RLPDecode for TxKind {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = Bytes::decode_unfinished(rlp)?;
        match bytes.len() {
            0 => Ok((TxKind::Create, rest)),
            20 => Ok((TxKind::Call(Address::from_slice(&bytes)), rest)),
            _ => Err(RLPDecodeError::InvalidLength),
        }
    }
}

/// An ECDSA-signed transaction (the pre-typed, legacy wire format).
///
/// The sender is not part of the encoding: it is recovered from the
/// signature over the unsigned payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas: u64,
    pub to: TxKind,
    pub value: U256,
    pub data: Bytes,
    pub v: U256,
    pub r: U256,
    pub s: U256,
}

impl Transaction {
    pub fn is_create(&self) -> bool {
        matches!(self.to, TxKind::Create)
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas
    }

    /// Hash of the signed wire encoding, the transaction's identity.
    pub fn compute_hash(&self) -> H256 {
        crypto::keccak(self.encode_to_vec())
    }

    /// The chain id bound into the signature, when the transaction uses
    /// EIP-155 encoding (`v = chain_id * 2 + 35 + parity`).
    pub fn chain_id(&self) -> Option<u64> {
        if self.v >= U256::from(35) && self.v.bits() <= 64 {
            Some((self.v.low_u64() - 35) / 2)
        } else {
            None
        }
    }

    /// Digest the sender signed: the unsigned fields, with the chain id
    /// appended for EIP-155 signatures.
    pub fn signature_payload(&self, chain_id: Option<u64>) -> H256 {
        let mut buf = vec![];
        let encoder = Encoder::new(&mut buf)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_field(&self.data);
        match chain_id {
            Some(chain_id) => encoder
                .encode_field(&chain_id)
                .encode_field(&0u8)
                .encode_field(&0u8)
                .finish(),
            None => encoder.finish(),
        }
        crypto::keccak(buf)
    }

    /// Recovers the sender address from the signature. Deterministic for a
    /// valid signature; callers cache the result per execution.
    pub fn recover_sender(&self) -> Result<Address, EcdsaError> {
        let (parity, payload) = match self.chain_id() {
            Some(chain_id) => {
                let parity = ((self.v.low_u64() - 35) % 2) as u8;
                (parity, self.signature_payload(Some(chain_id)))
            }
            None => {
                let v = self.v;
                if v != U256::from(27) && v != U256::from(28) {
                    return Err(EcdsaError::InvalidSignature);
                }
                ((v.low_u64() - 27) as u8, self.signature_payload(None))
            }
        };
        crypto::recover_address_from_scalars(self.r, self.s, parity, payload)
    }

    /// Fixed gas charged before the VM runs: the base transaction cost,
    /// the creation surcharge and the calldata byte costs.
    pub fn intrinsic_gas(&self, fork: Fork) -> u64 {
        let mut gas = TX_GAS_COST;
        if self.is_create() && fork >= Fork::Homestead {
            gas = gas.saturating_add(TX_CREATE_GAS_COST);
        }
        for byte in self.data.iter() {
            gas = gas.saturating_add(if *byte == 0 {
                TX_DATA_ZERO_GAS_COST
            } else {
                TX_DATA_NON_ZERO_GAS_COST
            });
        }
        gas
    }

    /// The wei debited from the sender before execution.
    pub fn upfront_cost(&self) -> Option<U256> {
        self.gas_price
            .checked_mul(U256::from(self.gas))?
            .checked_add(self.value)
    }

    /// Signs the transaction in place, binding it to `chain_id` when given.
    pub fn sign(mut self, secret_key: &secp256k1::SecretKey, chain_id: Option<u64>) -> Self {
        let payload = self.signature_payload(chain_id);
        let (parity, r, s) = crypto::sign_hash(payload, secret_key);
        self.v = match chain_id {
            Some(chain_id) => U256::from(chain_id * 2 + 35 + parity as u64),
            None => U256::from(27 + parity as u64),
        };
        self.r = r;
        self.s = s;
        self
    }
}

impl RLPEncode for Transaction {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_field(&self.data)
            .encode_field(&self.v)
            .encode_field(&self.r)
            .encode_field(&self.s)
            .finish();
    }
}

impl RLPDecode for Transaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (gas_price, decoder) = decoder.decode_field("gas_price")?;
        let (gas, decoder) = decoder.decode_field("gas")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let (v, decoder) = decoder.decode_field("v")?;
        let (r, decoder) = decoder.decode_field("r")?;
        let (s, decoder) = decoder.decode_field("s")?;
        Ok((
            Self {
                nonce,
                gas_price,
                gas,
                to,
                value,
                data,
                v,
                r,
                s,
            },
            decoder.finish()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    /// The worked example from EIP-155.
    fn eip155_example() -> Transaction {
        Transaction {
            nonce: 9,
            gas_price: U256::from(20_000_000_000u64),
            gas: 21_000,
            to: TxKind::Call(Address::from(hex!("3535353535353535353535353535353535353535"))),
            value: U256::from(10u64).pow(18.into()),
            data: Bytes::new(),
            v: U256::from(37),
            r: U256::from_dec_str(
                "18515461264373351373200002665853028612451056578545711640558177340181847433846",
            )
            .unwrap(),
            s: U256::from_dec_str(
                "46948507304638947509940763649030358759909902576025900602547168820602576006531",
            )
            .unwrap(),
        }
    }

    #[test]
    fn eip155_signing_payload() {
        let tx = eip155_example();
        assert_eq!(tx.chain_id(), Some(1));
        assert_eq!(
            tx.signature_payload(Some(1)),
            H256::from(hex!(
                "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
            ))
        );
    }

    #[test]
    fn eip155_sender_recovery() {
        let sender = eip155_example().recover_sender().unwrap();
        assert_eq!(
            sender,
            Address::from(hex!("9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"))
        );
    }

    #[test]
    fn sign_then_recover() {
        let secret = secp256k1::SecretKey::from_slice(&hex!(
            "4646464646464646464646464646464646464646464646464646464646464646"
        ))
        .unwrap();
        let tx = eip155_example();
        let unsigned = Transaction {
            v: U256::zero(),
            r: U256::zero(),
            s: U256::zero(),
            ..tx.clone()
        };
        let signed = unsigned.sign(&secret, Some(1));
        assert_eq!(signed.recover_sender().unwrap(), tx.recover_sender().unwrap());
    }

    #[test]
    fn rlp_roundtrip() {
        let tx = eip155_example();
        let encoded = tx.encode_to_vec();
        assert_eq!(Transaction::decode(&encoded).unwrap(), tx);
    }

    #[test]
    fn intrinsic_gas_costs() {
        let mut tx = eip155_example();
        assert_eq!(tx.intrinsic_gas(Fork::Frontier), 21_000);
        tx.data = Bytes::from(vec![0, 0, 1, 2]);
        assert_eq!(tx.intrinsic_gas(Fork::Frontier), 21_000 + 2 * 4 + 2 * 68);
        tx.to = TxKind::Create;
        assert_eq!(tx.intrinsic_gas(Fork::Frontier), 21_000 + 2 * 4 + 2 * 68);
        assert_eq!(
            tx.intrinsic_gas(Fork::Homestead),
            21_000 + 32_000 + 2 * 4 + 2 * 68
        );
    }
}
