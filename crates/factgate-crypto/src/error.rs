//! Crypto error types

use thiserror::Error;

/// Errors that can occur during signing and recovery
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The private key is not valid hex or not a valid secp256k1 scalar
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    /// The signature is not 65 bytes of hex or its scalars are out of range
    #[error("Invalid signature format")]
    InvalidFormat,

    /// Recovery id (v) must be 0, 1, 27 or 28
    #[error("Invalid recovery ID: {0}")]
    InvalidRecoveryId(u8),

    /// Public key recovery failed
    #[error("Failed to recover public key")]
    RecoveryFailed,

    /// Producing a signature failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),
}
