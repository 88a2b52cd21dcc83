//! Validator signature checks.
//!
//! Remote validators sign the 32-byte commitment hash with recoverable
//! secp256k1 ECDSA. A validator is identified by its Ethereum-style address,
//! so verification recovers the signing key and compares addresses.

use alloy_primitives::Address;
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, SecretKey, SECP256K1,
};
use thiserror::Error;

use crate::merkle::keccak256;
use crate::types::SIGNATURE_LEN;

/// Reasons a signature could not even be checked.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Signature must be 65 bytes, got {got}")]
    InvalidLength { got: usize },

    #[error("Invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    #[error("Signature bytes are not a valid secp256k1 signature")]
    Malformed,

    #[error("No public key recovers from this signature")]
    RecoveryFailed,
}

/// Checks that `signature` over `message_hash` was produced by `signer`.
///
/// Implementations hold no keys; the caller supplies a signer it has already
/// proved to be a member of the validator set.
pub trait SignatureVerifier {
    fn check(
        &self,
        message_hash: &[u8; 32],
        signature: &[u8],
        signer: &Address,
    ) -> Result<bool, SignatureError>;

    fn verify(&self, message_hash: &[u8; 32], signature: &[u8], signer: &Address) -> bool {
        self.check(message_hash, signature, signer).unwrap_or(false)
    }
}

/// Recoverable secp256k1 ECDSA, as used by the remote chain's validators.
#[derive(Clone, Copy, Debug, Default)]
pub struct EcdsaVerifier;

impl SignatureVerifier for EcdsaVerifier {
    fn check(
        &self,
        message_hash: &[u8; 32],
        signature: &[u8],
        signer: &Address,
    ) -> Result<bool, SignatureError> {
        let recovered = recover_signer(message_hash, signature)?;
        Ok(recovered == *signer)
    }
}

/// Recover the address that produced a `r || s || v` signature.
/// `v` may be given raw (0/1) or Ethereum-style (27/28).
pub fn recover_signer(message_hash: &[u8; 32], signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(SignatureError::InvalidLength {
            got: signature.len(),
        });
    }

    let v = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        other => return Err(SignatureError::InvalidRecoveryId(other)),
    };
    let recovery_id =
        RecoveryId::from_i32(v as i32).map_err(|_| SignatureError::InvalidRecoveryId(v))?;

    let recoverable = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(|_| SignatureError::Malformed)?;

    let message = Message::from_digest(*message_hash);
    let public_key = SECP256K1
        .recover_ecdsa(&message, &recoverable)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    Ok(public_key_to_address(&public_key))
}

/// Ethereum-style address: last 20 bytes of keccak256 over the uncompressed key.
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    Address::from_slice(&hash[12..])
}

/// Sign `message_hash` the way remote validators do, with `v` in 27/28 form.
pub fn sign_prehash(secret_key: &SecretKey, message_hash: &[u8; 32]) -> [u8; SIGNATURE_LEN] {
    let message = Message::from_digest(*message_hash);
    let signature = SECP256K1.sign_ecdsa_recoverable(&message, secret_key);
    let (recovery_id, compact) = signature.serialize_compact();

    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&compact);
    out[64] = recovery_id.to_i32() as u8 + 27;
    out
}
