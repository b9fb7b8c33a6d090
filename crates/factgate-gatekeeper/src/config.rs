//! Gatekeeper configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a submission does when another one holds the admission gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GatePolicy {
    /// Reject immediately with `Busy`
    Reject,

    /// Wait up to `max_wait_ms` for the gate, then reject with `Busy`
    Wait {
        /// Longest time to wait for the gate (milliseconds)
        max_wait_ms: u64,
    },
}

impl Default for GatePolicy {
    fn default() -> Self {
        GatePolicy::Reject
    }
}

/// Configuration for the submission coordinator
///
/// # Examples
///
/// ```
/// use factgate_gatekeeper::GateConfig;
///
/// let config = GateConfig::default();
/// assert_eq!(config.cooldown_secs, 86_400);
/// assert_eq!(config.proof_max_age_secs, 300);
/// assert!(config.replay_window.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Interval an identity must wait after any judged submission (seconds)
    /// Default: 24 hours
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Maximum age of an ownership proof (seconds)
    /// Default: 300
    #[serde(default = "default_proof_max_age_secs")]
    pub proof_max_age_secs: u64,

    /// Hard bound on a single judge call (milliseconds); expiry rejects
    /// Default: 30 seconds
    #[serde(default = "default_judge_timeout_ms")]
    pub judge_timeout_ms: u64,

    /// Replay only the most recent N facts to the judge
    ///
    /// Uniqueness is then only checked against that window.
    /// Default: unbounded (entire history)
    #[serde(default)]
    pub replay_window: Option<usize>,

    /// Behavior when the gate is held
    /// Default: reject immediately
    #[serde(default)]
    pub policy: GatePolicy,
}

fn default_cooldown_secs() -> u64 {
    24 * 60 * 60
}

fn default_proof_max_age_secs() -> u64 {
    300
}

fn default_judge_timeout_ms() -> u64 {
    30_000
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            proof_max_age_secs: default_proof_max_age_secs(),
            judge_timeout_ms: default_judge_timeout_ms(),
            replay_window: None,
            policy: GatePolicy::default(),
        }
    }
}

impl GateConfig {
    /// Get the judge timeout as a Duration
    pub fn judge_timeout(&self) -> Duration {
        Duration::from_millis(self.judge_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.judge_timeout_ms == 0 {
            return Err("judge_timeout_ms must be greater than 0".to_string());
        }
        if self.replay_window == Some(0) {
            return Err("replay_window must be greater than 0 when set".to_string());
        }
        Ok(())
    }
}
