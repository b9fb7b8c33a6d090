//! Gatekeeper error types
//!
//! Rejections are ordinary outcomes; these errors are downstream failures
//! the caller may retry.

use factgate_domain::{Address, RecordId};
use thiserror::Error;

/// Errors that can occur while coordinating a submission
#[derive(Error, Debug)]
pub enum GatekeeperError {
    /// The abuse-check oracle could not be reached
    #[error("Abuse check unavailable: {0}")]
    AbuseCheckUnavailable(String),

    /// Store or ledger error
    #[error("Store error: {0}")]
    Store(String),

    /// The judge oracle failed before producing a reply
    #[error("Judge error: {0}")]
    Judge(String),

    /// The fact was recorded but no attestation could be produced
    #[error("Record {record_id} for {identity} exists but is unattested: {reason}")]
    Unattested {
        /// The recorded fact
        record_id: RecordId,
        /// Its submitter
        identity: Address,
        /// Why signing failed
        reason: String,
    },

    /// No fact with this id exists
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    /// Signing an attestation for an existing record failed
    #[error("Signing error: {0}")]
    Signing(String),
}
