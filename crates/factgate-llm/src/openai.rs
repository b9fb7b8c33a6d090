//! OpenAI-compatible chat completions provider
//!
//! Posts judge transcripts to `{endpoint}/v1/chat/completions` with a bearer
//! key and returns the first choice's message content.

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

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// OpenAI-compatible chat completions provider
pub struct OpenAiProvider {
    endpoint: String,
    model: String,
    api_key: String,
    organization: Option<String>,
    client: reqwest::Client,
    request_timeout: Duration,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

impl OpenAiProvider {
    /// Create a provider for `model` at `endpoint`
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            organization: None,
            client: http_client(DEFAULT_REQUEST_TIMEOUT)?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Send the `OpenAI-Organization` header
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
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

    /// Longest [`OpenAiProvider::chat`] can run before giving up
    pub fn worst_case_latency(&self) -> Duration {
        worst_case_latency(self.max_retries, self.request_timeout)
    }

    /// Send the conversation and return the first choice's content
    pub async fn chat(&self, conversation: &[ChatMessage]) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: to_wire(conversation),
            temperature: 0.0,
        };

        let parsed: ChatCompletionResponse =
            send_with_retry("Chat completion", &self.model, self.max_retries, || {
                let request = self.client.post(&url).bearer_auth(&self.api_key).json(&body);
                match &self.organization {
                    Some(org) => request.header("OpenAI-Organization", org),
                    None => request,
                }
            })
            .await?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("No choices returned".to_string()))?;
        debug!("Chat completion replied with {} chars", content.len());
        Ok(content)
    }
}

#[async_trait]
impl JudgeOracle for OpenAiProvider {
    type Error = LlmError;

    async fn complete(&self, conversation: &[ChatMessage]) -> Result<String, Self::Error> {
        self.chat(conversation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAiProvider::new(DEFAULT_ENDPOINT, DEFAULT_MODEL, "sk-test")
            .unwrap()
            .with_organization("org-1");
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(provider.model, DEFAULT_MODEL);
        assert_eq!(provider.organization.as_deref(), Some("org-1"));
        assert_eq!(provider.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(provider.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "NO."}, "finish_reason": "stop"}]
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "NO.");
    }

    #[tokio::test]
    async fn test_connection_error() {
        let provider = OpenAiProvider::new("http://127.0.0.1:1", DEFAULT_MODEL, "sk-test")
            .unwrap()
            .with_max_retries(1);
        let result = provider.chat(&[ChatMessage::user("test")]).await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }
}
