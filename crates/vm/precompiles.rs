//! Precompiled contracts: fixed-address contracts whose behavior is
//! native code rather than interpreted bytecode.
//!
//! When the call target is a precompile the interpreter is bypassed: if
//! the forwarded gas covers the cost the output is produced and the cost
//! deducted; otherwise all forwarded gas is consumed and the call fails
//! with empty output.

use crate::errors::{InternalError, PrecompileError, VMError};
use bytes::Bytes;
use ethereum_types::{Address, H160, H256, U256};
use hearth_common::crypto;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub const ECRECOVER_COST: u64 = 3000;
pub const SHA2_256_STATIC_COST: u64 = 60;
pub const SHA2_256_DYNAMIC_BASE: u64 = 12;
pub const RIPEMD_160_STATIC_COST: u64 = 600;
pub const RIPEMD_160_DYNAMIC_BASE: u64 = 120;
pub const IDENTITY_STATIC_COST: u64 = 15;
pub const IDENTITY_DYNAMIC_BASE: u64 = 3;

pub struct Precompile {
    pub address: H160,
    pub name: &'static str,
}

pub const ECRECOVER: Precompile = Precompile {
    address: H160([
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x01,
    ]),
    name: "ECREC",
};

pub const SHA2_256: Precompile = Precompile {
    address: H160([
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x02,
    ]),
    name: "SHA256",
};

pub const RIPEMD_160: Precompile = Precompile {
    address: H160([
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x03,
    ]),
    name: "RIPEMD160",
};

pub const IDENTITY: Precompile = Precompile {
    address: H160([
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x04,
    ]),
    name: "ID",
};

pub const PRECOMPILES: [Precompile; 4] = [ECRECOVER, SHA2_256, RIPEMD_160, IDENTITY];

pub fn is_precompile(address: &Address) -> bool {
    PRECOMPILES
        .iter()
        .any(|precompile| precompile.address == *address)
}

/// Runs the precompile at `address`, returning its output and the gas it
/// consumed out of `gas_limit`.
pub fn execute_precompile(
    address: Address,
    calldata: &Bytes,
    gas_limit: u64,
) -> Result<(Bytes, u64), VMError> {
    let mut gas_remaining = gas_limit;
    let output = if address == ECRECOVER.address {
        ecrecover(calldata, &mut gas_remaining)?
    } else if address == SHA2_256.address {
        sha2_256(calldata, &mut gas_remaining)?
    } else if address == RIPEMD_160.address {
        ripemd_160(calldata, &mut gas_remaining)?
    } else if address == IDENTITY.address {
        identity(calldata, &mut gas_remaining)?
    } else {
        return Err(InternalError::TypeConversion.into());
    };
    Ok((output, gas_limit - gas_remaining))
}

/// Deducts the cost, or fails the whole call when the budget is short.
fn increase_precompile_consumed_gas(
    gas_cost: u64,
    gas_remaining: &mut u64,
) -> Result<(), VMError> {
    *gas_remaining = gas_remaining
        .checked_sub(gas_cost)
        .ok_or(PrecompileError::NotEnoughGas)?;
    Ok(())
}

/// Static plus per-word cost of the hashing precompiles.
fn linear_cost(input_len: usize, static_cost: u64, word_cost: u64) -> Result<u64, VMError> {
    let words = (input_len as u64).div_ceil(32);
    word_cost
        .checked_mul(words)
        .and_then(|dynamic| static_cost.checked_add(dynamic))
        .ok_or(PrecompileError::NotEnoughGas.into())
}

/// Pads the calldata with zeros up to `target_len`; longer inputs are
/// kept as-is.
fn fill_with_zeros(calldata: &Bytes, target_len: usize) -> Bytes {
    if calldata.len() >= target_len {
        return calldata.clone();
    }
    let mut padded = calldata.to_vec();
    padded.resize(target_len, 0);
    padded.into()
}

/// ## ECRECOVER precompile (0x01).
///
/// Input is 128 bytes (zero-padded if shorter):
///   [0..32)  : signed digest
///   [32..64) : v (27 or 28)
///   [64..128): r || s
///
/// Returns the recovered address left-padded to 32 bytes, or an empty
/// output for an invalid signature. Cost: flat 3000.
pub fn ecrecover(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    increase_precompile_consumed_gas(ECRECOVER_COST, gas_remaining)?;

    let input = fill_with_zeros(calldata, 128);

    let message_hash = H256::from_slice(&input[0..32]);
    let parity = match u8::try_from(U256::from_big_endian(&input[32..64])) {
        Ok(27) => 0,
        Ok(28) => 1,
        _ => return Ok(Bytes::new()),
    };
    let signature: [u8; 64] = input[64..128]
        .try_into()
        .map_err(|_| InternalError::TypeConversion)?;

    let Ok(address) = crypto::recover_address(&signature, parity, message_hash) else {
        return Ok(Bytes::new());
    };

    let mut output = [0u8; 32];
    output[12..].copy_from_slice(address.as_bytes());
    Ok(Bytes::copy_from_slice(&output))
}

/// ## SHA256 precompile (0x02). Cost: `60 + 12 * ceil(len / 32)`.
pub fn sha2_256(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    let cost = linear_cost(calldata.len(), SHA2_256_STATIC_COST, SHA2_256_DYNAMIC_BASE)?;
    increase_precompile_consumed_gas(cost, gas_remaining)?;

    let digest = Sha256::digest(calldata);
    Ok(Bytes::copy_from_slice(&digest))
}

/// ## RIPEMD160 precompile (0x03). The 20-byte digest is left-padded to
/// 32 bytes. Cost: `600 + 120 * ceil(len / 32)`.
pub fn ripemd_160(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    let cost = linear_cost(
        calldata.len(),
        RIPEMD_160_STATIC_COST,
        RIPEMD_160_DYNAMIC_BASE,
    )?;
    increase_precompile_consumed_gas(cost, gas_remaining)?;

    let digest = Ripemd160::digest(calldata);
    let mut output = [0u8; 32];
    output[12..].copy_from_slice(&digest);
    Ok(Bytes::copy_from_slice(&output))
}

/// ## IDENTITY precompile (0x04). Cost: `15 + 3 * ceil(len / 32)`.
pub fn identity(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    let cost = linear_cost(calldata.len(), IDENTITY_STATIC_COST, IDENTITY_DYNAMIC_BASE)?;
    increase_precompile_consumed_gas(cost, gas_remaining)?;
    Ok(calldata.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn identity_returns_input() {
        let input = Bytes::from(vec![1, 2, 3]);
        let (output, gas_used) =
            execute_precompile(IDENTITY.address.into(), &input, 100).unwrap();
        assert_eq!(output, input);
        assert_eq!(gas_used, 15 + 3);
    }

    #[test]
    fn precompile_without_budget_fails() {
        let input = Bytes::from(vec![0u8; 32]);
        let err = execute_precompile(SHA2_256.address.into(), &input, 10);
        assert!(err.is_err());
    }

    #[test]
    fn sha2_256_digest_and_cost() {
        let (output, gas_used) =
            execute_precompile(SHA2_256.address.into(), &Bytes::new(), 1_000).unwrap();
        assert_eq!(
            output.as_ref(),
            hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
        assert_eq!(gas_used, 60);
    }

    #[test]
    fn ripemd_160_left_pads_digest() {
        let (output, gas_used) =
            execute_precompile(RIPEMD_160.address.into(), &Bytes::new(), 1_000).unwrap();
        assert_eq!(&output[..12], &[0u8; 12]);
        assert_eq!(
            &output[12..],
            hex!("9c1185a5c5e9fc54612808977ee8f548b2258d31")
        );
        assert_eq!(gas_used, 600);
    }

    #[test]
    fn ecrecover_all_zero_input_is_empty_success() {
        let input = Bytes::from(vec![0u8; 128]);
        let (output, gas_used) =
            execute_precompile(ECRECOVER.address.into(), &input, 5_000).unwrap();
        assert!(output.is_empty());
        assert_eq!(gas_used, 3_000);
    }

    #[test]
    fn ecrecover_known_signature() {
        // Digest and signature from the EIP-155 example transaction.
        let tx = hearth_common::types::Transaction {
            nonce: 9,
            gas_price: U256::from(20_000_000_000u64),
            gas: 21_000,
            to: hearth_common::types::TxKind::Call(Address::from(hex!(
                "3535353535353535353535353535353535353535"
            ))),
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
        };
        let digest = tx.signature_payload(Some(1));

        let mut input = Vec::with_capacity(128);
        input.extend_from_slice(digest.as_bytes());
        let mut v = [0u8; 32];
        v[31] = 27 + ((tx.v.low_u64() - 35) % 2) as u8;
        input.extend_from_slice(&v);
        input.extend_from_slice(&tx.r.to_big_endian());
        input.extend_from_slice(&tx.s.to_big_endian());

        let (output, _) =
            execute_precompile(ECRECOVER.address.into(), &Bytes::from(input), 5_000).unwrap();
        assert_eq!(
            &output[12..],
            hex!("9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f")
        );
    }
}
