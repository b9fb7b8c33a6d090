//! Factgate Judge Providers
//!
//! Pluggable chat-model backends implementing the `JudgeOracle` trait from
//! `factgate-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama chat API
//! - `OpenAiProvider`: OpenAI-compatible chat completions API
//!
//! `JudgeBackend` selects one of these at runtime.
//!
//! # Examples
//!
//! ```
//! use factgate_llm::MockProvider;
//! use factgate_domain::ChatMessage;
//! use factgate_domain::traits::JudgeOracle;
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new("YES.");
//! let reply = provider.complete(&[ChatMessage::user("Scroll is an L2.")]).await.unwrap();
//! assert_eq!(reply, "YES.");
//! # });
//! ```

#![warn(missing_docs)]

pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use factgate_domain::traits::JudgeOracle;
use factgate_domain::{ChatMessage, ChatRole};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Errors that can occur during judge calls
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the model
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// A chat turn in the wire format shared by Ollama and OpenAI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    /// Turn text
    pub content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

/// Convert a conversation to wire messages
pub fn to_wire(conversation: &[ChatMessage]) -> Vec<WireMessage> {
    conversation.iter().map(WireMessage::from).collect()
}

/// Default timeout for a single HTTP request
///
/// Three attempts plus backoff stay under the gatekeeper's default 30 s judge
/// deadline, so an unreachable provider surfaces as an error rather than a
/// timed-out verdict.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Default number of attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay before the retry following failed attempt `attempt` (1s, 2s, 4s, ...)
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Longest a provider call can run: every attempt timing out plus backoff
pub fn worst_case_latency(max_retries: u32, request_timeout: Duration) -> Duration {
    let attempts = max_retries.max(1);
    let backoff: Duration = (1..attempts).map(backoff_delay).sum();
    request_timeout * attempts + backoff
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))
}

/// POST a request built by `build` and parse the JSON reply, retrying with
/// exponential backoff
///
/// A 404 means the model is missing and is not retried. Server errors,
/// rate limiting and transport failures are retried up to `max_retries`
/// attempts.
pub(crate) async fn send_with_retry<T, F>(
    provider: &str,
    model: &str,
    max_retries: u32,
    build: F,
) -> Result<T, LlmError>
where
    T: DeserializeOwned,
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempts = 0;
    let mut last_error = None;

    while attempts < max_retries {
        match build().send().await {
            Ok(response) if response.status().is_success() => {
                return response.json::<T>().await.map_err(|e| {
                    LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                });
            }
            Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                return Err(LlmError::ModelNotAvailable(model.to_string()));
            }
            Ok(response) if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                last_error = Some(LlmError::RateLimitExceeded);
            }
            Ok(response) => {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                last_error = Some(LlmError::Communication(format!(
                    "HTTP {}: {}",
                    status, error_text
                )));
            }
            Err(e) => {
                last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
            }
        }

        attempts += 1;
        if attempts < max_retries {
            let delay = backoff_delay(attempts);
            warn!("{} call failed, retrying in {:?}", provider, delay);
            tokio::time::sleep(delay).await;
        }
    }

    Err(last_error.unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
}

/// A judge provider chosen at runtime
pub enum JudgeBackend {
    /// Deterministic mock
    Mock(MockProvider),
    /// Local Ollama model
    Ollama(OllamaProvider),
    /// OpenAI-compatible API
    OpenAi(OpenAiProvider),
}

impl JudgeBackend {
    /// Short provider name for logging
    pub fn name(&self) -> &'static str {
        match self {
            JudgeBackend::Mock(_) => "mock",
            JudgeBackend::Ollama(_) => "ollama",
            JudgeBackend::OpenAi(_) => "openai",
        }
    }

    /// Longest a call can take before failing, `None` for the mock
    pub fn worst_case_latency(&self) -> Option<Duration> {
        match self {
            JudgeBackend::Mock(_) => None,
            JudgeBackend::Ollama(provider) => Some(provider.worst_case_latency()),
            JudgeBackend::OpenAi(provider) => Some(provider.worst_case_latency()),
        }
    }
}

#[async_trait]
impl JudgeOracle for JudgeBackend {
    type Error = LlmError;

    async fn complete(&self, conversation: &[ChatMessage]) -> Result<String, Self::Error> {
        match self {
            JudgeBackend::Mock(provider) => provider.complete(conversation).await,
            JudgeBackend::Ollama(provider) => provider.chat(conversation).await,
            JudgeBackend::OpenAi(provider) => provider.chat(conversation).await,
        }
    }
}

/// Mock judge for deterministic testing
///
/// Replies are keyed by the content of the conversation's final user turn
/// (the candidate claim). Unknown candidates get the default reply.
///
/// # Examples
///
/// ```
/// use factgate_llm::MockProvider;
/// use factgate_domain::ChatMessage;
/// use factgate_domain::traits::JudgeOracle;
///
/// # tokio_test::block_on(async {
/// let mut provider = MockProvider::new("NO.");
/// provider.add_response("Scroll is a zkEVM.", "YES.");
///
/// let accepted = provider.complete(&[ChatMessage::user("Scroll is a zkEVM.")]).await.unwrap();
/// let rejected = provider.complete(&[ChatMessage::user("Is Scroll fast?")]).await.unwrap();
/// assert_eq!(accepted, "YES.");
/// assert_eq!(rejected, "NO.");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<HashMap<String, String>>>,
    errors: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
    last_conversation: Arc<Mutex<Option<Vec<ChatMessage>>>>,
    delay: Option<Duration>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed reply for all candidates
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            last_conversation: Arc::new(Mutex::new(None)),
            delay: None,
        }
    }

    /// Add a specific reply for a given candidate claim
    pub fn add_response(&mut self, candidate: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).insert(candidate.into(), response.into());
    }

    /// Configure to fail for a specific candidate claim
    pub fn add_error(&mut self, candidate: impl Into<String>) {
        lock(&self.errors).push(candidate.into());
    }

    /// Wait this long before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of times the judge was called
    pub fn call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        *lock(&self.call_count) = 0;
    }

    /// The most recent conversation received
    pub fn last_conversation(&self) -> Option<Vec<ChatMessage>> {
        lock(&self.last_conversation).clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("NO.")
    }
}

/// Lock a mock's shared state, recovering from poisoning
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl JudgeOracle for MockProvider {
    type Error = LlmError;

    async fn complete(&self, conversation: &[ChatMessage]) -> Result<String, Self::Error> {
        *lock(&self.call_count) += 1;
        *lock(&self.last_conversation) = Some(conversation.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let candidate = conversation
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if lock(&self.errors).iter().any(|c| c == candidate) {
            return Err(LlmError::Other("Mock error".to_string()));
        }

        let reply = lock(&self.responses)
            .get(candidate)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(text: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::system("judge"), ChatMessage::user(text)]
    }

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("YES.");
        let result = provider.complete(&claim("anything")).await;
        assert_eq!(result.unwrap(), "YES.");
    }

    #[tokio::test]
    async fn test_mock_provider_specific_responses() {
        let mut provider = MockProvider::default();
        provider.add_response("hello", "YES.");
        provider.add_response("foo", "maybe");

        assert_eq!(provider.complete(&claim("hello")).await.unwrap(), "YES.");
        assert_eq!(provider.complete(&claim("foo")).await.unwrap(), "maybe");
        assert_eq!(provider.complete(&claim("unknown")).await.unwrap(), "NO.");
    }

    #[tokio::test]
    async fn test_mock_provider_keys_on_last_user_turn() {
        let mut provider = MockProvider::default();
        provider.add_response("candidate", "YES.");

        let conversation = vec![
            ChatMessage::system("judge"),
            ChatMessage::user("earlier fact"),
            ChatMessage::assistant("YES."),
            ChatMessage::user("candidate"),
        ];
        assert_eq!(provider.complete(&conversation).await.unwrap(), "YES.");
        assert_eq!(provider.last_conversation().unwrap(), conversation);
    }

    #[tokio::test]
    async fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");
        assert_eq!(provider.call_count(), 0);

        provider.complete(&claim("a")).await.unwrap();
        provider.complete(&claim("b")).await.unwrap();
        assert_eq!(provider.call_count(), 2);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_error() {
        let mut provider = MockProvider::default();
        provider.add_error("bad claim");

        let result = provider.complete(&claim("bad claim")).await;
        assert!(matches!(result, Err(LlmError::Other(_))));
    }

    #[tokio::test]
    async fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.complete(&claim("x")).await.unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }

    #[tokio::test]
    async fn test_backend_dispatches_to_mock() {
        let mock = MockProvider::new("YES.");
        let backend = JudgeBackend::Mock(mock.clone());

        assert_eq!(backend.name(), "mock");
        assert_eq!(backend.complete(&claim("x")).await.unwrap(), "YES.");
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn test_worst_case_latency() {
        assert_eq!(
            worst_case_latency(1, Duration::from_secs(5)),
            Duration::from_secs(5)
        );
        // 3 x 8s attempts plus 1s + 2s of backoff
        assert_eq!(
            worst_case_latency(DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT),
            Duration::from_secs(27)
        );
        assert_eq!(worst_case_latency(0, Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[test]
    fn test_wire_conversion() {
        let wire = to_wire(&[ChatMessage::system("s"), ChatMessage::assistant("YES.")]);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "assistant");
        assert_eq!(wire[1].content, "YES.");
    }
}
