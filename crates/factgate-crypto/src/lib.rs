//! Factgate Crypto
//!
//! secp256k1 primitives for the submission core:
//!
//! - [`IdentityVerifier`]: checks a wallet's EIP-712 ownership proof and its
//!   freshness
//! - [`AttestationSigner`]: signs `(identity, record_id)` commitments that a
//!   minting contract can verify with `ecrecover`
//!
//! # Examples
//!
//! ```
//! use factgate_crypto::{attestation, AttestationSigner};
//! use factgate_domain::{Address, RecordId};
//!
//! let signer = AttestationSigner::from_hex(&"42".repeat(32)).unwrap();
//! let submitter = Address::from_bytes([1; 20]);
//! let sig = signer.sign(&submitter, RecordId::from_value(1)).unwrap();
//!
//! let recovered = attestation::recover_signer(&submitter, RecordId::from_value(1), &sig).unwrap();
//! assert_eq!(recovered, signer.signer_address());
//! ```

#![warn(missing_docs)]

pub mod attestation;
pub mod ecdsa;
mod error;
pub mod ownership;

pub use attestation::AttestationSigner;
pub use error::CryptoError;
pub use ownership::{IdentityVerifier, SigningDomain};

pub use k256::ecdsa::SigningKey;
