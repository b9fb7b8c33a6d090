//! Fact module - accepted statements and their identifiers

use crate::Address;
use std::fmt;

/// Store-assigned identifier for an accepted fact
///
/// Identifiers are strictly increasing and never reused, so ordering by
/// `RecordId` is the canonical chronological order of the fact history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(u64);

impl RecordId {
    /// Create a RecordId from its raw value
    pub fn from_value(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An accepted fact
///
/// Created only when the judge accepts a submission. Records are immutable
/// and never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRecord {
    /// Store-assigned identifier
    pub id: RecordId,

    /// Submitting identity
    pub identity: Address,

    /// The statement as submitted
    pub statement: String,

    /// When the fact was accepted (Unix seconds)
    pub accepted_at: u64,
}

/// Per-identity summary of accepted facts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// The identity being summarized
    pub identity: Address,

    /// Number of accepted facts
    pub fact_count: u64,

    /// Sum of the record ids of those facts
    pub id_sum: u64,
}
