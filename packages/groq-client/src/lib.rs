//! Pure Groq REST API client
//!
//! A clean, minimal client for the Groq API with no domain-specific logic.
//! Groq serves an OpenAI-compatible chat-completions endpoint, which is the
//! only surface this client wraps.
//!
//! # Example
//!
//! ```rust,ignore
//! use groq_client::{GroqClient, ChatRequest, Message};
//!
//! let client = GroqClient::from_env()?;
//!
//! let response = client.chat_completion(ChatRequest {
//!     model: "llama-3.1-8b-instant".into(),
//!     messages: vec![
//!         Message::system("You are a helpful assistant"),
//!         Message::user("Hello!"),
//!     ],
//!     ..Default::default()
//! }).await?;
//!
//! println!("{}", response.content);
//! ```

pub mod error;
pub mod types;

pub use error::{GroqError, Result};
pub use types::*;

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::types::ChatResponseRaw;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pure Groq API client.
#[derive(Clone)]
pub struct GroqClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl GroqClient {
    /// Create a new Groq client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable `GROQ_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| GroqError::Config("GROQ_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for proxies, self-hosted gateways, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a chat completion request.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        debug!(model = %request.model, messages = request.messages.len(), "Groq chat completion");

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GroqError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GroqError::Api(format!("{status}: {body}")));
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| GroqError::Parse(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(GroqError::EmptyCompletion)?;

        Ok(ChatResponse {
            content,
            usage: raw.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_builder_sets_fields() {
        let request = ChatRequest::new("llama-3.1-8b-instant")
            .message(Message::system("sys"))
            .message(Message::user("hi"))
            .temperature(0.1)
            .max_tokens(500);

        assert_eq!(request.model, "llama-3.1-8b-instant");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.max_tokens, Some(500));
    }

    #[test]
    fn request_serialization_skips_unset_options() {
        let request = ChatRequest::new("llama-3.1-8b-instant");
        let json = serde_json::to_value(&request).unwrap();

        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn raw_response_parses_choices() {
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"mods\":[]}" } }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        });

        let raw: ChatResponseRaw = serde_json::from_value(body).unwrap();
        assert_eq!(raw.choices.len(), 1);
        assert_eq!(
            raw.choices[0].message.content.as_deref(),
            Some("{\"mods\":[]}")
        );
        assert_eq!(raw.usage.unwrap().total_tokens, 15);
    }
}
