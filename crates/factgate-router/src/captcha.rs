//! Captcha verification for submissions.

use async_trait::async_trait;
use factgate_domain::traits::AbuseCheck;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Google reCAPTCHA verification endpoint
pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Captcha verification error
#[derive(Debug, Error)]
pub enum CaptchaError {
    /// Could not reach the verification endpoint
    #[error("Captcha verification request failed: {0}")]
    Communication(String),

    /// Unexpected response body
    #[error("Invalid captcha verification response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Verifies tokens against a reCAPTCHA `siteverify` endpoint
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret: String,
    verify_url: String,
}

impl RecaptchaVerifier {
    /// Create a verifier posting to `verify_url` with `secret`
    pub fn new(secret: impl Into<String>, verify_url: impl Into<String>) -> Result<Self, CaptchaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CaptchaError::Communication(e.to_string()))?;

        Ok(Self {
            client,
            secret: secret.into(),
            verify_url: verify_url.into(),
        })
    }

    /// Ask the endpoint whether `token` is a solved challenge
    pub async fn check(&self, token: &str) -> Result<bool, CaptchaError> {
        let response = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await
            .map_err(|e| CaptchaError::Communication(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CaptchaError::Communication(format!("HTTP {}", response.status())));
        }

        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|e| CaptchaError::InvalidResponse(e.to_string()))?;

        if !body.success {
            debug!("Captcha rejected: {:?}", body.error_codes);
        }
        Ok(body.success)
    }
}

/// The abuse check used by the server
pub enum AbuseChecker {
    /// Accept every token (no captcha secret configured)
    AllowAll,
    /// Verify with reCAPTCHA
    Recaptcha(RecaptchaVerifier),
}

#[async_trait]
impl AbuseCheck for AbuseChecker {
    type Error = CaptchaError;

    async fn verify(&self, token: &str) -> Result<bool, Self::Error> {
        match self {
            AbuseChecker::AllowAll => Ok(true),
            AbuseChecker::Recaptcha(verifier) => verifier.check(token).await,
        }
    }
}
