//! Factgate Domain Layer
//!
//! This crate contains the value objects and trait interfaces shared by every
//! other layer of Factgate. It holds no I/O: storage, judging, signing and
//! transport all live in infrastructure crates that implement these traits.
//!
//! ## Key Concepts
//!
//! - **Address**: the wallet identity a submitter controls
//! - **FactRecord**: an accepted statement with a store-assigned id
//! - **CooldownEntry**: the earliest time an identity may submit again
//! - **Attestation**: a service signature binding a record to its submitter
//! - **Rejection**: the machine-readable reason a submission was turned away

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod conversation;
pub mod cooldown;
pub mod fact;
pub mod submission;
pub mod time;
pub mod traits;

// Re-exports for convenience
pub use address::Address;
pub use conversation::{ChatMessage, ChatRole, Verdict};
pub use cooldown::CooldownEntry;
pub use fact::{FactRecord, LeaderboardEntry, RecordId};
pub use submission::{
    Attestation, AttestationSignature, CompleteRequest, Rejection, SubmissionOutcome,
    SubmissionRequest, SIGNATURE_LEN,
};
pub use time::{Clock, ManualClock, SystemClock};
