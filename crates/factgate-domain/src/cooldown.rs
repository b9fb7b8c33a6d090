//! Cooldown module - per-identity rate limit entries

use crate::Address;

/// Earliest time an identity may submit again
///
/// There is one logical entry per identity; a new write replaces the old one.
/// Entries whose `retry_after` lies in the past are inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownEntry {
    /// The rate-limited identity
    pub identity: Address,

    /// Unix seconds before which submissions are inadmissible
    pub retry_after: u64,
}

impl CooldownEntry {
    /// Whether the entry still blocks submissions at `now`
    pub fn is_active(&self, now: u64) -> bool {
        now < self.retry_after
    }
}
