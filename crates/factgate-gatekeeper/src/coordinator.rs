//! Submission coordinator
//!
//! Runs a submission through the admission gate, the abuse check, the
//! cooldown ledger, ownership verification and the judge, then records and
//! attests accepted facts.

use crate::gate::AdmissionGate;
use crate::judge::UniquenessJudge;
use crate::{GateConfig, GatekeeperError};
use factgate_crypto::{AttestationSigner, IdentityVerifier};
use factgate_domain::traits::{AbuseCheck, Attester, CooldownLedger, FactStore, JudgeOracle};
use factgate_domain::{
    Address, Attestation, Clock, CooldownEntry, FactRecord, LeaderboardEntry, RecordId, Rejection,
    SubmissionOutcome, SubmissionRequest, SystemClock, Verdict,
};
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Coordinates fact submissions against shared state
///
/// At most one submission is inside [`Coordinator::submit`] at a time. The
/// store is shared behind a mutex that is never held across an await.
pub struct Coordinator<S, J, A, G = AttestationSigner, C = SystemClock> {
    store: Arc<Mutex<S>>,
    judge: UniquenessJudge<J>,
    abuse_check: A,
    verifier: IdentityVerifier,
    signer: G,
    gate: AdmissionGate,
    config: GateConfig,
    clock: C,
}

impl<S, J, A, G> Coordinator<S, J, A, G, SystemClock>
where
    S: FactStore + CooldownLedger + Send,
    <S as FactStore>::Error: Display,
    <S as CooldownLedger>::Error: Display,
    J: JudgeOracle,
    A: AbuseCheck,
    G: Attester,
{
    /// Create a coordinator using the system clock
    pub fn new(
        store: S,
        judge: J,
        abuse_check: A,
        verifier: IdentityVerifier,
        signer: G,
        config: GateConfig,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            judge: UniquenessJudge::new(judge, config.judge_timeout()),
            abuse_check,
            verifier,
            signer,
            gate: AdmissionGate::new(config.policy),
            config,
            clock: SystemClock,
        }
    }
}

impl<S, J, A, G, C> Coordinator<S, J, A, G, C>
where
    S: FactStore + CooldownLedger + Send,
    <S as FactStore>::Error: Display,
    <S as CooldownLedger>::Error: Display,
    J: JudgeOracle,
    A: AbuseCheck,
    G: Attester,
    C: Clock,
{
    /// Replace the clock
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Coordinator<S, J, A, G, C2> {
        Coordinator {
            store: self.store,
            judge: self.judge,
            abuse_check: self.abuse_check,
            verifier: self.verifier,
            signer: self.signer,
            gate: self.gate,
            config: self.config,
            clock,
        }
    }

    /// Shared handle to the underlying store
    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    /// The judge oracle
    pub fn judge_oracle(&self) -> &J {
        self.judge.oracle()
    }

    /// The coordinator configuration
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The service's attestation identity
    pub fn signer_address(&self) -> Address {
        self.signer.signer_address()
    }

    /// Whether a submission is currently in flight
    pub fn is_busy(&self) -> bool {
        self.gate.is_held()
    }

    /// Process a fact submission
    ///
    /// Rejections are returned as `Ok(SubmissionOutcome::Rejected(_))`.
    /// `Err` is reserved for downstream failures; after
    /// [`GatekeeperError::Unattested`] the record exists and
    /// [`Coordinator::attest`] can re-issue its signature.
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionOutcome, GatekeeperError> {
        let Some(_permit) = self.gate.enter().await else {
            debug!("Admission gate busy, rejecting submission");
            return Ok(SubmissionOutcome::Rejected(Rejection::Busy));
        };

        self.submit_exclusive(request).await
    }

    async fn submit_exclusive(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionOutcome, GatekeeperError> {
        let Some(fields) = request.complete() else {
            return Ok(rejected(Rejection::MissingFields));
        };

        match self.abuse_check.verify(fields.abuse_check_token).await {
            Ok(true) => {}
            Ok(false) => return Ok(rejected(Rejection::AbuseCheckFailed)),
            Err(e) => {
                warn!("Abuse check unavailable: {}", e);
                return Err(GatekeeperError::AbuseCheckUnavailable(e.to_string()));
            }
        }

        let Ok(identity) = fields.identity.parse::<Address>() else {
            return Ok(rejected(Rejection::InvalidProof));
        };

        let now = self.clock.now();
        let retry_after = self.with_store(|store| store.get_retry_after(&identity))?;
        if let Some(retry_after) = retry_after {
            let cooldown = CooldownEntry {
                identity,
                retry_after,
            };
            if cooldown.is_active(now) {
                info!("Submission from {} rate limited until {}", identity, retry_after);
                return Ok(rejected(Rejection::RateLimited { retry_after }));
            }
        }

        if !self.verifier.verify(
            fields.identity,
            fields.ownership_proof,
            fields.proof_timestamp,
            now,
        ) {
            info!("Ownership proof for {} rejected", identity);
            return Ok(rejected(Rejection::InvalidProof));
        }

        let prior = self.replay_history()?;
        let verdict = self.judge.judge(&prior, fields.statement).await?;

        let judged_at = self.clock.now();
        let retry_after = judged_at.saturating_add(self.config.cooldown_secs);
        self.with_store(|store| store.upsert_retry_after(identity, retry_after))?;

        if verdict == Verdict::Reject {
            info!("Judge rejected submission from {}", identity);
            return Ok(rejected(Rejection::NotUniqueOrInaccurate));
        }

        let record = self.with_store(|store| store.append(identity, fields.statement, judged_at))?;
        info!("Accepted fact {} from {}", record.id, identity);

        match self.signer.attest(identity, record.id) {
            Ok(attestation) => Ok(SubmissionOutcome::Accepted(attestation)),
            Err(e) => {
                error!("Fact {} recorded but signing failed: {}", record.id, e);
                Err(GatekeeperError::Unattested {
                    record_id: record.id,
                    identity,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Re-issue the attestation for an existing record
    ///
    /// Does not take the admission gate.
    pub fn attest(&self, record_id: RecordId) -> Result<Attestation, GatekeeperError> {
        let record = self
            .with_store(|store| store.get_fact(record_id))?
            .ok_or(GatekeeperError::RecordNotFound(record_id))?;

        self.signer
            .attest(record.identity, record.id)
            .map_err(|e| GatekeeperError::Signing(e.to_string()))
    }

    /// Per-identity accepted fact counts, highest id sum first
    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, GatekeeperError> {
        self.with_store(|store| store.leaderboard())
    }

    /// Number of accepted facts
    pub fn fact_count(&self) -> Result<u64, GatekeeperError> {
        self.with_store(|store| store.count())
    }

    fn replay_history(&self) -> Result<Vec<FactRecord>, GatekeeperError> {
        match self.config.replay_window {
            Some(limit) => self.with_store(|store| store.list_recent(limit)),
            None => self.with_store(|store| store.list_all()),
        }
    }

    fn with_store<T, E: Display>(
        &self,
        f: impl FnOnce(&mut S) -> Result<T, E>,
    ) -> Result<T, GatekeeperError> {
        let mut store = self
            .store
            .lock()
            .map_err(|_| GatekeeperError::Store("store lock poisoned".to_string()))?;
        f(&mut store).map_err(|e| GatekeeperError::Store(e.to_string()))
    }
}

fn rejected(reason: Rejection) -> SubmissionOutcome {
    SubmissionOutcome::Rejected(reason)
}
