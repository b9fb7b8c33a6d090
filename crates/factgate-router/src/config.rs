//! Configuration file parsing for the server.
//!
//! Loads settings from TOML files: bind address, database path, signing key,
//! gate tuning, proof domain, judge provider and captcha settings.

use factgate_crypto::ownership::{DEFAULT_CHAIN_ID, DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION};
use factgate_crypto::SigningDomain;
use factgate_gatekeeper::GateConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// Field present but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// Bind address (e.g., "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (e.g., 3000)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Hex private key used to sign attestations
    #[serde(default)]
    pub signing_key: Option<String>,

    /// Submission gate settings
    #[serde(default)]
    pub gate: GateConfig,

    /// Ownership proof domain
    #[serde(default)]
    pub domain: DomainConfig,

    /// Judge provider
    #[serde(default)]
    pub judge: JudgeConfig,

    /// Captcha verification
    #[serde(default)]
    pub captcha: CaptchaConfig,
}

/// EIP-712 domain the ownership proofs are signed under
#[derive(Debug, Clone, Deserialize)]
pub struct DomainConfig {
    /// Domain name
    #[serde(default = "default_domain_name")]
    pub name: String,

    /// Domain version
    #[serde(default = "default_domain_version")]
    pub version: String,

    /// Chain id
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            name: default_domain_name(),
            version: default_domain_version(),
            chain_id: default_chain_id(),
        }
    }
}

impl DomainConfig {
    /// Convert to a signing domain
    pub fn to_signing_domain(&self) -> SigningDomain {
        SigningDomain {
            name: self.name.clone(),
            version: self.version.clone(),
            chain_id: self.chain_id,
        }
    }
}

/// Judge provider kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeProvider {
    /// Fixed replies, for local development
    Mock,
    /// Local Ollama
    Ollama,
    /// OpenAI-compatible API
    OpenAi,
}

/// Judge provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct JudgeConfig {
    /// Which provider to use
    #[serde(default = "default_judge_provider")]
    pub provider: JudgeProvider,

    /// Provider endpoint (provider default when unset)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Model name (provider default when unset)
    #[serde(default)]
    pub model: Option<String>,

    /// API key (required for `openai`)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Reply given by the mock provider; the default rejects every fact
    #[serde(default = "default_mock_reply")]
    pub mock_reply: String,

    /// Timeout for a single provider request in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Attempts per judge call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl JudgeConfig {
    /// Per-request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            provider: default_judge_provider(),
            endpoint: None,
            model: None,
            api_key: None,
            mock_reply: default_mock_reply(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

/// Captcha settings
///
/// With no secret every token is accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    /// reCAPTCHA secret key
    #[serde(default)]
    pub secret: Option<String>,

    /// Verification endpoint
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            secret: None,
            verify_url: default_verify_url(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    3000
}

fn default_database_path() -> PathBuf {
    PathBuf::from("factgate.db")
}

fn default_domain_name() -> String {
    DEFAULT_DOMAIN_NAME.to_string()
}

fn default_domain_version() -> String {
    DEFAULT_DOMAIN_VERSION.to_string()
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_judge_provider() -> JudgeProvider {
    JudgeProvider::Mock
}

fn default_mock_reply() -> String {
    "NO.".to_string()
}

fn default_request_timeout_ms() -> u64 {
    factgate_llm::DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
}

fn default_max_retries() -> u32 {
    factgate_llm::DEFAULT_MAX_RETRIES
}

fn default_verify_url() -> String {
    crate::captcha::DEFAULT_VERIFY_URL.to_string()
}

impl RouterConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: RouterConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field requirements
    ///
    /// The signing key is not checked here since it may come from the
    /// environment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gate.validate().map_err(ConfigError::Invalid)?;

        if self.judge.provider == JudgeProvider::OpenAi && self.judge.api_key.is_none() {
            return Err(ConfigError::MissingField("judge.api_key".to_string()));
        }

        if self.judge.provider != JudgeProvider::Mock {
            let latency =
                factgate_llm::worst_case_latency(self.judge.max_retries, self.judge.request_timeout());
            if latency >= self.gate.judge_timeout() {
                return Err(ConfigError::Invalid(format!(
                    "judge requests may take {:?}, which reaches gate.judge_timeout_ms ({:?})",
                    latency,
                    self.gate.judge_timeout()
                )));
            }
        }

        Ok(())
    }

    /// The signing key, or an error if none was configured
    pub fn require_signing_key(&self) -> Result<&str, ConfigError> {
        self.signing_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField("signing_key".to_string()))
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        RouterConfig {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            database_path: PathBuf::from(":memory:"),
            signing_key: Some("42".repeat(32)),
            gate: GateConfig::default(),
            domain: DomainConfig::default(),
            judge: JudgeConfig::default(),
            captcha: CaptchaConfig::default(),
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factgate_gatekeeper::GatePolicy;

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default_test_config();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.bind_port, 3000);
        assert_eq!(config.judge.provider, JudgeProvider::Mock);
        assert!(config.captcha.secret.is_none());
        assert!(config.validate().is_ok());
        assert!(config.require_signing_key().is_ok());
    }

    #[test]
    fn test_bind_addr() {
        let config = RouterConfig::default_test_config();
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: RouterConfig = toml::from_str("").unwrap();
        assert_eq!(config.database_path, PathBuf::from("factgate.db"));
        assert_eq!(config.gate.cooldown_secs, 86_400);
        assert_eq!(config.domain.chain_id, 534351);
        assert_eq!(config.judge.provider, JudgeProvider::Mock);
        assert_eq!(config.judge.mock_reply, "NO.");
        assert!(config.require_signing_key().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            bind_address = "0.0.0.0"
            bind_port = 9000
            database_path = "/var/lib/factgate/facts.db"
            signing_key = "0x0101010101010101010101010101010101010101010101010101010101010101"

            [gate]
            cooldown_secs = 3600
            judge_timeout_ms = 10000
            replay_window = 200
            policy = { mode = "wait", max_wait_ms = 1500 }

            [domain]
            name = "Scroll"
            version = "1"
            chain_id = 534352

            [judge]
            provider = "openai"
            model = "gpt-4o-mini"
            api_key = "sk-test"
            request_timeout_ms = 3000
            max_retries = 2

            [captcha]
            secret = "captcha-secret"
        "#;

        let config: RouterConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.gate.cooldown_secs, 3600);
        assert_eq!(config.gate.replay_window, Some(200));
        assert_eq!(config.gate.policy, GatePolicy::Wait { max_wait_ms: 1500 });
        assert_eq!(config.domain.to_signing_domain().chain_id, 534352);
        assert_eq!(config.judge.provider, JudgeProvider::OpenAi);
        assert_eq!(config.judge.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.judge.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.judge.max_retries, 2);
        assert_eq!(config.captcha.secret.as_deref(), Some("captcha-secret"));
        assert_eq!(config.captcha.verify_url, crate::captcha::DEFAULT_VERIFY_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_requests_fit_judge_deadline() {
        let config: RouterConfig = toml::from_str(
            r#"
            [gate]
            judge_timeout_ms = 5000

            [judge]
            provider = "ollama"
            "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config: RouterConfig = toml::from_str(
            r#"
            [gate]
            judge_timeout_ms = 5000

            [judge]
            provider = "ollama"
            request_timeout_ms = 1500
            max_retries = 2
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());

        let default_ollama = RouterConfig {
            judge: JudgeConfig {
                provider: JudgeProvider::Ollama,
                ..JudgeConfig::default()
            },
            ..RouterConfig::default_test_config()
        };
        assert!(default_ollama.validate().is_ok());
    }

    #[test]
    fn test_openai_requires_api_key() {
        let config: RouterConfig = toml::from_str(
            r#"
            [judge]
            provider = "openai"
            "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factgate.toml");
        std::fs::write(&path, "bind_port = 8081\n[judge]\nprovider = \"ollama\"\n").unwrap();

        let config = RouterConfig::from_file(&path).unwrap();
        assert_eq!(config.bind_port, 8081);
        assert_eq!(config.judge.provider, JudgeProvider::Ollama);

        assert!(matches!(
            RouterConfig::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::FileRead(_))
        ));
    }
}
