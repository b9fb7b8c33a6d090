//! # Attestation Signing
//!
//! Binds an accepted record to its submitter so the minting contract can
//! check that the service approved the mint.
//!
//! Layout:
//!
//! ```text
//! encoded = abi.encode(address identity, uint256 record_id)   // 64 bytes
//! hash    = keccak256(encoded)
//! digest  = keccak256("\x19Ethereum Signed Message:\n32" || hash)
//! ```
//!
//! The signature is over `digest`, so on-chain `ecrecover` of the
//! personal-message hash yields the service's signing address.

use crate::ecdsa::{self, address_from_verifying_key, keccak256, Hash};
use crate::ownership::{address_word, uint256};
use crate::CryptoError;
use factgate_domain::traits::Attester;
use factgate_domain::{Address, Attestation, AttestationSignature, RecordId};
use k256::ecdsa::SigningKey;
use std::fmt;

const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// ABI encoding of `(address, uint256)`
pub fn encode(identity: &Address, record_id: RecordId) -> [u8; 64] {
    let mut encoded = [0u8; 64];
    encoded[..32].copy_from_slice(&address_word(identity));
    encoded[32..].copy_from_slice(&uint256(record_id.value()));
    encoded
}

/// keccak256 of the encoded pair
pub fn commitment_hash(identity: &Address, record_id: RecordId) -> Hash {
    keccak256(&encode(identity, record_id))
}

/// EIP-191 personal-message digest of a 32-byte hash
pub fn personal_message_digest(hash: &Hash) -> Hash {
    let mut message = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 32);
    message.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    message.extend_from_slice(hash);
    keccak256(&message)
}

/// Recover the address that produced an attestation signature
pub fn recover_signer(
    identity: &Address,
    record_id: RecordId,
    signature: &AttestationSignature,
) -> Result<Address, CryptoError> {
    let digest = personal_message_digest(&commitment_hash(identity, record_id));
    ecdsa::recover_address(&digest, signature.as_bytes())
}

/// Signs attestations with the service's private key
///
/// The key is injected at construction and owned for the signer's lifetime.
/// Signing is stateless and safe to share across tasks.
#[derive(Clone)]
pub struct AttestationSigner {
    key: SigningKey,
    address: Address,
}

impl AttestationSigner {
    /// Create a signer from a key
    pub fn new(key: SigningKey) -> Self {
        let address = address_from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    /// Create a signer from a hex private key
    pub fn from_hex(private_key: &str) -> Result<Self, CryptoError> {
        Ok(Self::new(ecdsa::signing_key_from_hex(private_key)?))
    }

    /// The service's signing identity
    pub fn signer_address(&self) -> Address {
        self.address
    }

    /// Sign the commitment for `(identity, record_id)`
    pub fn sign(
        &self,
        identity: &Address,
        record_id: RecordId,
    ) -> Result<AttestationSignature, CryptoError> {
        let digest = personal_message_digest(&commitment_hash(identity, record_id));
        let bytes = ecdsa::sign_prehash(&self.key, &digest)?;
        Ok(AttestationSignature::from_bytes(bytes))
    }

    /// Produce a full attestation
    pub fn attest(&self, identity: Address, record_id: RecordId) -> Result<Attestation, CryptoError> {
        Ok(Attestation {
            record_id,
            identity,
            signature: self.sign(&identity, record_id)?,
        })
    }
}

impl Attester for AttestationSigner {
    type Error = CryptoError;

    fn signer_address(&self) -> Address {
        self.address
    }

    fn attest(&self, identity: Address, record_id: RecordId) -> Result<Attestation, CryptoError> {
        AttestationSigner::attest(self, identity, record_id)
    }
}

impl fmt::Debug for AttestationSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttestationSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecdsa::test_helpers::{address, key};

    #[test]
    fn test_encoding_layout() {
        let identity = Address::from_bytes([0x11; 20]);
        let encoded = encode(&identity, RecordId::from_value(7));

        assert_eq!(&encoded[..12], &[0u8; 12]);
        assert_eq!(&encoded[12..32], identity.as_bytes());
        assert_eq!(&encoded[32..63], &[0u8; 31]);
        assert_eq!(encoded[63], 7);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let identity = address(0x05);
        let a = encode(&identity, RecordId::from_value(99));
        let b = encode(&identity, RecordId::from_value(99));
        assert_eq!(a, b);
        assert_eq!(
            commitment_hash(&identity, RecordId::from_value(99)),
            commitment_hash(&identity, RecordId::from_value(99))
        );
        assert_ne!(
            commitment_hash(&identity, RecordId::from_value(99)),
            commitment_hash(&identity, RecordId::from_value(100))
        );
    }

    #[test]
    fn test_recover_yields_service_identity() {
        let signer = AttestationSigner::new(key(0x77));
        let submitter = address(0x01);
        let record_id = RecordId::from_value(1);

        let sig = signer.sign(&submitter, record_id).unwrap();
        assert_eq!(sig.as_bytes().len(), 65);

        let recovered = recover_signer(&submitter, record_id, &sig).unwrap();
        assert_eq!(recovered, signer.signer_address());
        assert_eq!(recovered, address(0x77));
        assert_ne!(recovered, submitter);
    }

    #[test]
    fn test_signature_bound_to_pair() {
        let signer = AttestationSigner::new(key(0x77));
        let submitter = address(0x01);
        let sig = signer.sign(&submitter, RecordId::from_value(1)).unwrap();

        let other_id = recover_signer(&submitter, RecordId::from_value(2), &sig);
        assert_ne!(other_id.ok(), Some(signer.signer_address()));

        let other_identity = recover_signer(&address(0x02), RecordId::from_value(1), &sig);
        assert_ne!(other_identity.ok(), Some(signer.signer_address()));
    }

    #[test]
    fn test_attest() {
        let signer = AttestationSigner::new(key(0x77));
        let attestation = signer.attest(address(0x09), RecordId::from_value(3)).unwrap();
        assert_eq!(attestation.record_id.value(), 3);
        assert_eq!(attestation.identity, address(0x09));
    }

    #[test]
    fn test_from_hex() {
        let signer = AttestationSigner::from_hex(&format!("0x{}", "77".repeat(32))).unwrap();
        assert_eq!(signer.signer_address(), address(0x77));
        assert!(AttestationSigner::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let signer = AttestationSigner::new(key(0x77));
        let debug = format!("{:?}", signer);
        assert!(debug.contains("address"));
        assert!(!debug.contains(&"77".repeat(32)));
    }
}
