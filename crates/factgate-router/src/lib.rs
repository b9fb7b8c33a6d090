//! Factgate Router
//!
//! HTTP front end for the submission core: wires configuration into a
//! [`Coordinator`] over SQLite, a judge provider and a captcha check, and
//! serves it with axum.

#![warn(missing_docs)]

pub mod captcha;
pub mod config;
pub mod handlers;

use captcha::{AbuseChecker, RecaptchaVerifier};
use config::{CaptchaConfig, JudgeConfig, JudgeProvider, RouterConfig};
use factgate_crypto::{AttestationSigner, CryptoError, IdentityVerifier};
use factgate_gatekeeper::Coordinator;
use factgate_llm::{ollama, openai, JudgeBackend, LlmError, MockProvider, OllamaProvider, OpenAiProvider};
use factgate_store::{SqliteStore, StoreError};
use handlers::{create_router, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// The coordinator the server runs
pub type FactCoordinator = Coordinator<SqliteStore, JudgeBackend, AbuseChecker>;

/// Router error
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Database could not be opened
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Signing key could not be loaded
    #[error("Signing key error: {0}")]
    SigningKey(#[from] CryptoError),

    /// Judge provider could not be built
    #[error("Judge provider error: {0}")]
    Judge(#[from] LlmError),

    /// Captcha verifier could not be built
    #[error("Captcha error: {0}")]
    Captcha(#[from] captcha::CaptchaError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Build the judge provider named in the configuration
pub fn build_judge(config: &JudgeConfig) -> Result<JudgeBackend, RouterError> {
    let backend = match config.provider {
        JudgeProvider::Mock => {
            warn!(
                "Mock judge active, every statement gets the reply {:?}",
                config.mock_reply
            );
            JudgeBackend::Mock(MockProvider::new(config.mock_reply.clone()))
        }
        JudgeProvider::Ollama => JudgeBackend::Ollama(
            OllamaProvider::new(
                config
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| ollama::DEFAULT_ENDPOINT.to_string()),
                config
                    .model
                    .clone()
                    .unwrap_or_else(|| ollama::DEFAULT_MODEL.to_string()),
            )?
            .with_max_retries(config.max_retries)
            .with_request_timeout(config.request_timeout())?,
        ),
        JudgeProvider::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| config::ConfigError::MissingField("judge.api_key".to_string()))?;
            JudgeBackend::OpenAi(
                OpenAiProvider::new(
                    config
                        .endpoint
                        .clone()
                        .unwrap_or_else(|| openai::DEFAULT_ENDPOINT.to_string()),
                    config
                        .model
                        .clone()
                        .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
                    api_key,
                )?
                .with_max_retries(config.max_retries)
                .with_request_timeout(config.request_timeout())?,
            )
        }
    };
    Ok(backend)
}

/// Build the abuse check; no secret means every token passes
pub fn build_abuse_check(config: &CaptchaConfig) -> Result<AbuseChecker, RouterError> {
    match config.secret.as_deref().filter(|secret| !secret.is_empty()) {
        Some(secret) => Ok(AbuseChecker::Recaptcha(RecaptchaVerifier::new(
            secret,
            config.verify_url.clone(),
        )?)),
        None => Ok(AbuseChecker::AllowAll),
    }
}

/// Build the coordinator from configuration
pub fn build_coordinator(config: &RouterConfig) -> Result<FactCoordinator, RouterError> {
    config.validate()?;

    let store = SqliteStore::new(&config.database_path)?;
    let signer = AttestationSigner::from_hex(config.require_signing_key()?)?;
    let verifier = IdentityVerifier::new(
        config.domain.to_signing_domain(),
        config.gate.proof_max_age_secs,
    );

    Ok(Coordinator::new(
        store,
        build_judge(&config.judge)?,
        build_abuse_check(&config.captcha)?,
        verifier,
        signer,
        config.gate.clone(),
    ))
}

/// Install the global tracing subscriber, honoring `RUST_LOG`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Already installed (e.g. by a test harness) is fine
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Start the HTTP server
///
/// Builds the coordinator from configuration and serves until the listener
/// fails.
pub async fn start_server(config: RouterConfig) -> Result<(), RouterError> {
    init_tracing();

    info!("Starting Factgate");
    info!("Bind address: {}", config.bind_addr());
    info!("Database: {}", config.database_path.display());
    info!("Judge provider: {:?}", config.judge.provider);
    info!("Gate policy: {:?}", config.gate.policy);

    let coordinator = build_coordinator(&config)?;
    info!("Attestation signer: {}", coordinator.signer_address());
    if config.captcha.secret.as_deref().map_or(true, str::is_empty) {
        warn!("No captcha secret configured, accepting all captcha tokens");
    }

    let state = AppState {
        coordinator: Arc::new(coordinator),
    };
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| RouterError::Server(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use factgate_domain::Verdict;
    use factgate_gatekeeper::{GateConfig, UniquenessJudge};
    use std::time::Duration;

    #[test]
    fn test_build_coordinator_from_test_config() {
        let config = RouterConfig::default_test_config();
        let coordinator = build_coordinator(&config).unwrap();
        assert_eq!(coordinator.fact_count().unwrap(), 0);
    }

    #[test]
    fn test_missing_signing_key() {
        let mut config = RouterConfig::default_test_config();
        config.signing_key = None;
        assert!(matches!(
            build_coordinator(&config),
            Err(RouterError::Config(config::ConfigError::MissingField(_)))
        ));
    }

    #[test]
    fn test_bad_signing_key() {
        let mut config = RouterConfig::default_test_config();
        config.signing_key = Some("zz".to_string());
        assert!(matches!(build_coordinator(&config), Err(RouterError::SigningKey(_))));
    }

    #[test]
    fn test_build_judge_providers() {
        let mut judge = JudgeConfig::default();
        assert_eq!(build_judge(&judge).unwrap().name(), "mock");

        judge.provider = JudgeProvider::Ollama;
        let backend = build_judge(&judge).unwrap();
        assert_eq!(backend.name(), "ollama");
        assert!(backend.worst_case_latency().unwrap() < GateConfig::default().judge_timeout());

        judge.provider = JudgeProvider::OpenAi;
        assert!(build_judge(&judge).is_err());
        judge.api_key = Some("sk-test".to_string());
        assert_eq!(build_judge(&judge).unwrap().name(), "openai");
    }

    #[tokio::test]
    async fn test_default_config_rejects_statements() {
        let config: RouterConfig = toml::from_str("").unwrap();
        let judge = build_judge(&config.judge).unwrap();
        let uniqueness = UniquenessJudge::new(judge, Duration::from_secs(1));

        let verdict = uniqueness
            .judge(&[], "Is Scroll fast? Buy my token!")
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Reject);
    }

    #[test]
    fn test_build_abuse_check() {
        let mut captcha = CaptchaConfig::default();
        assert!(matches!(build_abuse_check(&captcha).unwrap(), AbuseChecker::AllowAll));

        captcha.secret = Some("secret".to_string());
        assert!(matches!(
            build_abuse_check(&captcha).unwrap(),
            AbuseChecker::Recaptcha(_)
        ));
    }
}
