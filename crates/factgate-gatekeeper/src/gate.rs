//! Admission gate - the single critical section around `submit`

use crate::GatePolicy;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::timeout;

/// A single-permit gate
///
/// Holding the returned permit is what entitles a submission to run; the
/// permit is released when dropped, on every exit path.
#[derive(Debug)]
pub struct AdmissionGate {
    permits: Semaphore,
    policy: GatePolicy,
}

impl AdmissionGate {
    /// Create an open gate with the given busy policy
    pub fn new(policy: GatePolicy) -> Self {
        Self {
            permits: Semaphore::new(1),
            policy,
        }
    }

    /// Try to enter the gate according to the policy
    ///
    /// Returns `None` if the gate stayed busy.
    pub async fn enter(&self) -> Option<SemaphorePermit<'_>> {
        match self.policy {
            GatePolicy::Reject => self.permits.try_acquire().ok(),
            GatePolicy::Wait { max_wait_ms } => {
                match timeout(Duration::from_millis(max_wait_ms), self.permits.acquire()).await {
                    Ok(Ok(permit)) => Some(permit),
                    _ => None,
                }
            }
        }
    }

    /// Whether a submission currently holds the gate
    pub fn is_held(&self) -> bool {
        self.permits.available_permits() == 0
    }

    /// The configured busy policy
    pub fn policy(&self) -> GatePolicy {
        self.policy
    }
}
