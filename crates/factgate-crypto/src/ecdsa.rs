//! # Recoverable ECDSA (secp256k1)
//!
//! Keccak-256 hashing, address derivation and `r || s || v` signatures in
//! the layout wallets produce.
//!
//! - Uses k256 crate for curve operations
//! - `v` is accepted as 0, 1, 27 or 28 and emitted as 27 or 28
//! - High-S signatures are rejected by k256 during recovery

use crate::CryptoError;
use factgate_domain::{Address, SIGNATURE_LEN};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};

/// A 32-byte Keccak-256 digest
pub type Hash = [u8; 32];

/// Keccak256 hash function.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Derive the address of a public key.
///
/// The address is the last 20 bytes of keccak256 over the uncompressed
/// point without its `0x04` prefix.
pub fn address_from_verifying_key(public_key: &VerifyingKey) -> Address {
    let pubkey_bytes = public_key.to_encoded_point(false);
    let hash = keccak256(&pubkey_bytes.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Address::from_bytes(address)
}

/// Decode a hex signature (optional `0x` prefix) into its 65 raw bytes.
pub fn parse_signature_hex(text: &str) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    let mut bytes = [0u8; SIGNATURE_LEN];
    hex::decode_to_slice(digits, &mut bytes).map_err(|_| CryptoError::InvalidFormat)?;
    Ok(bytes)
}

/// Recover the signer's address from a prehashed message and signature.
pub fn recover_address(
    message_hash: &Hash,
    signature: &[u8; SIGNATURE_LEN],
) -> Result<Address, CryptoError> {
    let recovery_id = parse_recovery_id(signature[64])?;
    let sig = Signature::from_slice(&signature[..64]).map_err(|_| CryptoError::InvalidFormat)?;

    let recovered_key = VerifyingKey::recover_from_prehash(message_hash, &sig, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;

    Ok(address_from_verifying_key(&recovered_key))
}

/// Sign a prehashed message, producing `r || s || v` with `v` in {27, 28}.
pub fn sign_prehash(
    signing_key: &SigningKey,
    message_hash: &Hash,
) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
    let (sig, recid) = signing_key
        .sign_prehash_recoverable(message_hash)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&sig.to_bytes());
    out[64] = recid.to_byte() + 27;
    Ok(out)
}

/// Parse a hex private key (optional `0x` prefix).
pub fn signing_key_from_hex(text: &str) -> Result<SigningKey, CryptoError> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    let bytes = hex::decode(digits).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    SigningKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidKey("not a valid secp256k1 scalar".to_string()))
}

/// Normalize a wire recovery id (0, 1, 27, 28).
fn parse_recovery_id(v: u8) -> Result<RecoveryId, CryptoError> {
    let normalized = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return Err(CryptoError::InvalidRecoveryId(v)),
    };
    RecoveryId::from_byte(normalized).ok_or(CryptoError::InvalidRecoveryId(v))
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;

    /// Deterministic signing key from a single repeated byte.
    pub fn key(byte: u8) -> SigningKey {
        SigningKey::from_slice(&[byte; 32]).expect("valid scalar")
    }

    /// Address of the key built by [`key`].
    pub fn address(byte: u8) -> Address {
        address_from_verifying_key(key(byte).verifying_key())
    }
}
