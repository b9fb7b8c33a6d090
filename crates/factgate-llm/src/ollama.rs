//! Ollama Provider Implementation
//!
//! Sends judge transcripts to a local Ollama instance's chat API.
//!
//! # Features
//!
//! - Async HTTP communication with `/api/chat`
//! - Configurable endpoint and model
//! - Retry logic with exponential backoff
//! - Timeout handling
//!
//! # Examples
//!
//! ```no_run
//! use factgate_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3").unwrap();
//! ```

use crate::{
    http_client, send_with_retry, to_wire, worst_case_latency, LlmError, WireMessage,
    DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT,
};
use async_trait::async_trait;
use factgate_domain::traits::JudgeOracle;
use factgate_domain::ChatMessage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Ollama chat API provider
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    request_timeout: Duration,
    max_retries: u32,
}

/// Request body for the Ollama chat API
#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
}

/// Response from the Ollama chat API
#[derive(Deserialize)]
struct OllamaChatResponse {
    message: WireMessage,
    #[allow(dead_code)]
    done: bool,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: http_client(DEFAULT_REQUEST_TIMEOUT)?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Create a new Ollama provider against `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the timeout for a single HTTP request
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = http_client(timeout)?;
        self.request_timeout = timeout;
        Ok(self)
    }

    /// Longest [`OllamaProvider::chat`] can run before giving up
    pub fn worst_case_latency(&self) -> Duration {
        worst_case_latency(self.max_retries, self.request_timeout)
    }

    /// Send the conversation and return the model's reply text
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Ollama is not running
    /// - Model is not available
    /// - Network communication fails
    /// - Response format is invalid
    pub async fn chat(&self, conversation: &[ChatMessage]) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.endpoint);

        let request_body = OllamaChatRequest {
            model: self.model.clone(),
            messages: to_wire(conversation),
            stream: false,
        };

        let chat: OllamaChatResponse = send_with_retry("Ollama", &self.model, self.max_retries, || {
            self.client.post(&url).json(&request_body)
        })
        .await?;

        debug!("Ollama replied with {} chars", chat.message.content.len());
        Ok(chat.message.content)
    }
}

#[async_trait]
impl JudgeOracle for OllamaProvider {
    type Error = LlmError;

    async fn complete(&self, conversation: &[ChatMessage]) -> Result<String, Self::Error> {
        self.chat(conversation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3").unwrap();
        assert_eq!(provider.endpoint, "http://localhost:11434");
        assert_eq!(provider.model, "llama3");
        assert_eq!(provider.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_ollama_provider_default_endpoint() {
        let provider = OllamaProvider::default_endpoint("mistral").unwrap();
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(provider.model, "mistral");
    }

    #[test]
    fn test_ollama_provider_with_max_retries() {
        let provider = OllamaProvider::default_endpoint("llama3")
            .unwrap()
            .with_max_retries(5);
        assert_eq!(provider.max_retries, 5);

        let provider = provider.with_max_retries(0);
        assert_eq!(provider.max_retries, 1);
    }

    #[test]
    fn test_ollama_provider_request_timeout() {
        let provider = OllamaProvider::default_endpoint("llama3")
            .unwrap()
            .with_max_retries(2)
            .with_request_timeout(Duration::from_secs(4))
            .unwrap();
        assert_eq!(provider.request_timeout, Duration::from_secs(4));
        assert_eq!(provider.worst_case_latency(), Duration::from_secs(9));
    }

    #[test]
    fn test_request_serialization() {
        let body = OllamaChatRequest {
            model: "llama3".to_string(),
            messages: to_wire(&[ChatMessage::user("claim")]),
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"model":"llama3","message":{"role":"assistant","content":"YES."},"done":true}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.message.content, "YES.");
    }

    // Integration tests (requires running Ollama)
    #[tokio::test]
    #[ignore] // Only run when Ollama is available
    async fn test_ollama_chat_integration() {
        let provider = OllamaProvider::default_endpoint("llama3").unwrap();
        let result = provider
            .chat(&[ChatMessage::user("Say 'hello' and nothing else")])
            .await;

        if let Ok(response) = result {
            assert!(!response.is_empty());
        }
    }

    #[tokio::test]
    async fn test_ollama_error_handling() {
        // Unroutable port triggers a connection error
        let provider = OllamaProvider::new("http://127.0.0.1:1", "llama3")
            .unwrap()
            .with_max_retries(1);

        let result = provider.chat(&[ChatMessage::user("test")]).await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }
}
