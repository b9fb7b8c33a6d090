//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the submission core and
//! infrastructure. Implementations live in other crates.

use crate::{Address, Attestation, ChatMessage, FactRecord, LeaderboardEntry, RecordId};
use async_trait::async_trait;

/// Append-only collection of accepted facts
///
/// Implemented by the infrastructure layer (factgate-store)
pub trait FactStore {
    /// Error type for store operations
    type Error;

    /// All accepted facts, ascending by id
    fn list_all(&self) -> Result<Vec<FactRecord>, Self::Error>;

    /// The `limit` most recent facts, ascending by id
    fn list_recent(&self, limit: usize) -> Result<Vec<FactRecord>, Self::Error>;

    /// Get a fact by id
    fn get_fact(&self, id: RecordId) -> Result<Option<FactRecord>, Self::Error>;

    /// Record a new fact; the store assigns a fresh, strictly larger id
    fn append(
        &mut self,
        identity: Address,
        statement: &str,
        accepted_at: u64,
    ) -> Result<FactRecord, Self::Error>;

    /// Number of accepted facts
    fn count(&self) -> Result<u64, Self::Error>;

    /// Per-identity fact count and id sum, ordered by id sum descending
    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, Self::Error>;
}

/// Per-identity "earliest next submission" record
///
/// Implemented by the infrastructure layer (factgate-store)
pub trait CooldownLedger {
    /// Error type for ledger operations
    type Error;

    /// The stored retry time for `identity`, if any
    fn get_retry_after(&self, identity: &Address) -> Result<Option<u64>, Self::Error>;

    /// Replace the retry time for `identity` (last write wins)
    fn upsert_retry_after(&mut self, identity: Address, retry_after: u64)
        -> Result<(), Self::Error>;
}

/// External oracle that judges a transcript
///
/// Implemented by the infrastructure layer (factgate-llm). The oracle's
/// reasoning is opaque; callers only interpret its literal reply.
#[async_trait]
pub trait JudgeOracle: Send + Sync {
    /// Error type for oracle calls
    type Error: std::fmt::Display + Send;

    /// Reply to the conversation
    async fn complete(&self, conversation: &[ChatMessage]) -> Result<String, Self::Error>;
}

/// External anti-bot challenge verification
#[async_trait]
pub trait AbuseCheck: Send + Sync {
    /// Error type for verification calls
    type Error: std::fmt::Display + Send;

    /// Whether the challenge token proves a human submitter
    async fn verify(&self, token: &str) -> Result<bool, Self::Error>;
}

/// Signs attestations for recorded facts
///
/// Implemented by factgate-crypto
pub trait Attester: Send + Sync {
    /// Error type for signing
    type Error: std::fmt::Display;

    /// The address attestations recover to
    fn signer_address(&self) -> Address;

    /// Attest that `identity` owns record `record_id`
    fn attest(&self, identity: Address, record_id: RecordId) -> Result<Attestation, Self::Error>;
}
