use ethereum_types::{Address, H256, U256};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, SecretKey, SECP256K1,
};
use sha3::{Digest, Keccak256};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EcdsaError {
    #[error("Invalid recovery id")]
    InvalidRecoveryId,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Signature recovery failed")]
    RecoveryFailed,
}

/// keccak-256 digest of arbitrary data.
pub fn keccak(data: impl AsRef<[u8]>) -> H256 {
    H256::from_slice(&Keccak256::digest(data.as_ref()))
}

/// Recovers the signer's address from a 64-byte compact signature, its
/// recovery parity bit and the signed 32-byte digest.
pub fn recover_address(
    signature: &[u8; 64],
    parity: u8,
    message_hash: H256,
) -> Result<Address, EcdsaError> {
    let recovery_id =
        RecoveryId::from_i32(parity as i32).map_err(|_| EcdsaError::InvalidRecoveryId)?;
    let signature = RecoverableSignature::from_compact(signature, recovery_id)
        .map_err(|_| EcdsaError::InvalidSignature)?;
    let public_key = SECP256K1
        .recover_ecdsa(&Message::from_digest(message_hash.0), &signature)
        .map_err(|_| EcdsaError::RecoveryFailed)?;

    // The address is the low 20 bytes of the keccak of the uncompressed
    // public key, without its 0x04 tag byte.
    let hash = keccak(&public_key.serialize_uncompressed()[1..]);
    Ok(Address::from_slice(&hash.as_bytes()[12..]))
}

/// Recovers a signer from `(r, s)` scalars as found in transactions.
pub fn recover_address_from_scalars(
    r: U256,
    s: U256,
    parity: u8,
    message_hash: H256,
) -> Result<Address, EcdsaError> {
    let mut signature = [0u8; 64];
    signature[..32].copy_from_slice(&r.to_big_endian());
    signature[32..].copy_from_slice(&s.to_big_endian());
    recover_address(&signature, parity, message_hash)
}

/// Signs a 32-byte digest, returning `(parity, r, s)`.
pub fn sign_hash(message_hash: H256, secret_key: &SecretKey) -> (u8, U256, U256) {
    let signature =
        SECP256K1.sign_ecdsa_recoverable(&Message::from_digest(message_hash.0), secret_key);
    let (recovery_id, compact) = signature.serialize_compact();
    (
        recovery_id.to_i32() as u8,
        U256::from_big_endian(&compact[..32]),
        U256::from_big_endian(&compact[32..]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_empty() {
        assert_eq!(
            hex::encode(keccak([])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn sign_and_recover() {
        let secret = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let digest = keccak(b"message");
        let (parity, r, s) = sign_hash(digest, &secret);
        let recovered = recover_address_from_scalars(r, s, parity, digest).unwrap();

        let public = secret.public_key(SECP256K1);
        let expected =
            Address::from_slice(&keccak(&public.serialize_uncompressed()[1..]).as_bytes()[12..]);
        assert_eq!(recovered, expected);
    }
}
