//! Factgate Gatekeeper
//!
//! The submission core: decides whether a submitted fact is recorded and
//! attested.
//!
//! A submission passes, in order:
//! - the admission gate (one submission at a time)
//! - presence of every required field
//! - the abuse check
//! - the identity's cooldown
//! - the ownership proof and its freshness
//! - the uniqueness judge, after which the cooldown is renewed
//!
//! Accepted facts are appended to the store and signed.
//!
//! # Examples
//!
//! ```no_run
//! use factgate_gatekeeper::{Coordinator, GateConfig};
//! use factgate_crypto::{AttestationSigner, IdentityVerifier};
//! # async fn run<S, J, A>(store: S, judge: J, abuse_check: A) -> Result<(), Box<dyn std::error::Error>>
//! # where
//! #     S: factgate_domain::traits::FactStore + factgate_domain::traits::CooldownLedger + Send,
//! #     <S as factgate_domain::traits::FactStore>::Error: std::fmt::Display,
//! #     <S as factgate_domain::traits::CooldownLedger>::Error: std::fmt::Display,
//! #     J: factgate_domain::traits::JudgeOracle,
//! #     A: factgate_domain::traits::AbuseCheck,
//! # {
//! let signer = AttestationSigner::from_hex(&"42".repeat(32))?;
//! let coordinator = Coordinator::new(
//!     store,
//!     judge,
//!     abuse_check,
//!     IdentityVerifier::default(),
//!     signer,
//!     GateConfig::default(),
//! );
//!
//! let outcome = coordinator.submit(&Default::default()).await?;
//! assert!(!outcome.is_accepted());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod coordinator;
mod error;
pub mod gate;
pub mod judge;

pub use config::{GateConfig, GatePolicy};
pub use coordinator::Coordinator;
pub use error::GatekeeperError;
pub use judge::UniquenessJudge;
