//! Submission module - requests, outcomes and attestations

use crate::{Address, RecordId};
use std::fmt;

/// Length of a recoverable signature (`r || s || v`)
pub const SIGNATURE_LEN: usize = 65;

/// A fact submission as received from a client
///
/// Every field is optional so that absence can be reported as
/// [`Rejection::MissingFields`] instead of failing deserialization.
/// Values are kept in their textual wire form; parsing happens during
/// verification, where malformed input is an invalid proof.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionRequest {
    /// Claimed submitter address
    pub identity: Option<String>,

    /// The natural-language fact
    pub statement: Option<String>,

    /// Hex-encoded ownership signature
    pub ownership_proof: Option<String>,

    /// Unix seconds the ownership proof was produced at
    pub proof_timestamp: Option<String>,

    /// Opaque anti-bot challenge token
    pub abuse_check_token: Option<String>,
}

/// Request fields after the presence check
#[derive(Debug, Clone, Copy)]
pub struct CompleteRequest<'a> {
    /// Claimed submitter address
    pub identity: &'a str,
    /// The natural-language fact
    pub statement: &'a str,
    /// Hex-encoded ownership signature
    pub ownership_proof: &'a str,
    /// Unix seconds the ownership proof was produced at
    pub proof_timestamp: &'a str,
    /// Opaque anti-bot challenge token
    pub abuse_check_token: &'a str,
}

impl SubmissionRequest {
    /// Borrow every field, or `None` if any is absent or blank
    pub fn complete(&self) -> Option<CompleteRequest<'_>> {
        fn present(field: &Option<String>) -> Option<&str> {
            field.as_deref().filter(|value| !value.trim().is_empty())
        }

        Some(CompleteRequest {
            identity: present(&self.identity)?,
            statement: present(&self.statement)?,
            ownership_proof: present(&self.ownership_proof)?,
            proof_timestamp: present(&self.proof_timestamp)?,
            abuse_check_token: present(&self.abuse_check_token)?,
        })
    }
}

/// A recoverable secp256k1 signature in `r || s || v` layout
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AttestationSignature([u8; SIGNATURE_LEN]);

impl AttestationSignature {
    /// Wrap raw signature bytes
    pub fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AttestationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttestationSignature({})", self.to_hex())
    }
}

impl fmt::Display for AttestationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Service-signed commitment binding a record to its submitter
///
/// Handed to the caller once and never retained; the minting step is the
/// authority for replay protection at redemption time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attestation {
    /// The accepted record
    pub record_id: RecordId,
    /// The submitter the record is bound to
    pub identity: Address,
    /// Signature by the service's signing identity
    pub signature: AttestationSignature,
}

/// Machine-readable reason a submission was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// A required field was absent or blank
    MissingFields,

    /// The anti-bot challenge did not pass
    AbuseCheckFailed,

    /// The identity is still cooling down
    RateLimited {
        /// Unix seconds at which the identity may submit again
        retry_after: u64,
    },

    /// The ownership proof was malformed, stale, or signed by someone else
    InvalidProof,

    /// The judge did not accept the statement
    NotUniqueOrInaccurate,

    /// Another submission holds the admission gate
    Busy,
}

impl Rejection {
    /// Stable reason code for transport layers
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::MissingFields => "MissingFields",
            Rejection::AbuseCheckFailed => "AbuseCheckFailed",
            Rejection::RateLimited { .. } => "RateLimited",
            Rejection::InvalidProof => "InvalidProof",
            Rejection::NotUniqueOrInaccurate => "NotUniqueOrInaccurate",
            Rejection::Busy => "Busy",
        }
    }

    /// Retry time carried by rate-limit rejections
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Rejection::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingFields => write!(f, "Missing required fields"),
            Rejection::AbuseCheckFailed => write!(f, "Abuse check failed"),
            Rejection::RateLimited { retry_after } => {
                write!(f, "Rate limited until {}", retry_after)
            }
            Rejection::InvalidProof => write!(f, "Invalid ownership proof"),
            Rejection::NotUniqueOrInaccurate => write!(f, "Fact not correct or unique"),
            Rejection::Busy => write!(
                f,
                "Someone else is already adding a fact, please try again later"
            ),
        }
    }
}

/// Terminal result of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The fact was recorded and attested
    Accepted(Attestation),
    /// The submission was turned away
    Rejected(Rejection),
}

impl SubmissionOutcome {
    /// Whether the submission was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_request() -> SubmissionRequest {
        SubmissionRequest {
            identity: Some("0x0000000000000000000000000000000000000001".to_string()),
            statement: Some("Scroll is a zkEVM rollup.".to_string()),
            ownership_proof: Some("0xabcdef".to_string()),
            proof_timestamp: Some("1700000000".to_string()),
            abuse_check_token: Some("token".to_string()),
        }
    }

    #[test]
    fn test_complete_request() {
        let request = full_request();
        let complete = request.complete().unwrap();
        assert_eq!(complete.statement, "Scroll is a zkEVM rollup.");
        assert_eq!(complete.proof_timestamp, "1700000000");
    }

    #[test]
    fn test_missing_field_is_incomplete() {
        let mut request = full_request();
        request.abuse_check_token = None;
        assert!(request.complete().is_none());
    }

    #[test]
    fn test_blank_statement_is_incomplete() {
        let mut request = full_request();
        request.statement = Some("   \n".to_string());
        assert!(request.complete().is_none());
    }

    #[test]
    fn test_rejection_codes() {
        assert_eq!(Rejection::Busy.code(), "Busy");
        let limited = Rejection::RateLimited { retry_after: 42 };
        assert_eq!(limited.code(), "RateLimited");
        assert_eq!(limited.retry_after(), Some(42));
        assert_eq!(Rejection::InvalidProof.retry_after(), None);
    }

    #[test]
    fn test_signature_hex() {
        let sig = AttestationSignature::from_bytes([0x1b; SIGNATURE_LEN]);
        let hex = sig.to_hex();
        assert_eq!(hex.len(), 2 + SIGNATURE_LEN * 2);
        assert!(hex.starts_with("0x1b1b"));
    }
}
