//! Groq-backed analyzer with a bounded retry policy.

use async_trait::async_trait;
use groq_client::{ChatRequest, ChatResponse, GroqClient, Message};
use tracing::{error, info, warn};

use crate::ai::{parse_analysis_response, prompts};
use crate::error::AnalysisError;
use crate::traits::ai::{AnalysisOutcome, PostAnalyzer};
use crate::types::config::AnalyzerConfig;

/// Seam over the completion transport so retry behavior is testable without
/// a live endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> groq_client::Result<ChatResponse>;
}

#[async_trait]
impl ChatBackend for GroqClient {
    async fn complete(&self, request: ChatRequest) -> groq_client::Result<ChatResponse> {
        self.chat_completion(request).await
    }
}

/// Analyzer over a chat-completion backend.
///
/// Attempts are retried with linearly increasing backoff; once the budget is
/// exhausted the analyzer degrades to [`AnalysisOutcome::empty`] rather than
/// propagating, so extraction failure never blocks the pipeline.
pub struct GroqAnalyzer<B = GroqClient> {
    backend: B,
    config: AnalyzerConfig,
}

impl GroqAnalyzer<GroqClient> {
    /// Build an analyzer over the real Groq client, reading `GROQ_API_KEY`.
    pub fn from_env(config: AnalyzerConfig) -> groq_client::Result<Self> {
        Ok(Self {
            backend: GroqClient::from_env()?,
            config,
        })
    }
}

impl<B: ChatBackend> GroqAnalyzer<B> {
    pub fn new(backend: B, config: AnalyzerConfig) -> Self {
        Self { backend, config }
    }

    async fn attempt(&self, prompt: &str) -> Result<AnalysisOutcome, AnalysisError> {
        let request = ChatRequest::new(&self.config.model)
            .message(Message::system(prompts::EXTRACTION_SYSTEM_PROMPT))
            .message(Message::user(prompt))
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens);

        let response = self.backend.complete(request).await?;
        let (mods, raw) = parse_analysis_response(&response.content)?;

        let confidence = if mods.is_empty() { 0.0 } else { 0.8 };
        Ok(AnalysisOutcome {
            mods,
            confidence,
            raw: Some(raw),
        })
    }
}

#[async_trait]
impl<B: ChatBackend> PostAnalyzer for GroqAnalyzer<B> {
    async fn analyze(
        &self,
        title: &str,
        content: &str,
        known_mods: &[String],
    ) -> AnalysisOutcome {
        let truncated: String = content.chars().take(self.config.content_cap).collect();
        let prompt = prompts::build_extraction_prompt(title, &truncated, known_mods);

        for attempt in 1..=self.config.max_attempts {
            match self.attempt(&prompt).await {
                Ok(outcome) => {
                    info!(mods = outcome.mods.len(), "post analyzed");
                    return outcome;
                }
                Err(err) => {
                    warn!(
                        attempt,
                        max = self.config.max_attempts,
                        %err,
                        "extraction attempt failed"
                    );
                    if attempt == self.config.max_attempts {
                        error!("all extraction attempts failed, degrading to empty result");
                        return AnalysisOutcome::empty();
                    }
                    tokio::time::sleep(self.config.backoff_for(attempt)).await;
                }
            }
        }

        AnalysisOutcome::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Backend that fails a configured number of times before succeeding.
    struct FlakyBackend {
        failures: u32,
        calls: AtomicU32,
        body: String,
    }

    impl FlakyBackend {
        fn new(failures: u32, body: &str) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                body: body.to_string(),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for &FlakyBackend {
        async fn complete(&self, _request: ChatRequest) -> groq_client::Result<ChatResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(groq_client::GroqError::Network("connection reset".into()))
            } else {
                Ok(ChatResponse {
                    content: self.body.clone(),
                    usage: None,
                })
            }
        }
    }

    fn fast_config() -> AnalyzerConfig {
        AnalyzerConfig::default().with_retry(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let backend = FlakyBackend::new(
            2,
            r#"{"mods":[{"name":"Mod X","version":"2.1","isUpdate":true,"isNewMod":false,"downloadUrl":null}]}"#,
        );
        let analyzer = GroqAnalyzer::new(&backend, fast_config());

        let outcome = analyzer.analyze("Mod X Update", "v2.1 released", &[]).await;
        assert_eq!(outcome.mods.len(), 1);
        assert_eq!(outcome.confidence, 0.8);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn three_consecutive_failures_degrade_to_empty() {
        let backend = FlakyBackend::new(3, r#"{"mods":[]}"#);
        let analyzer = GroqAnalyzer::new(&backend, fast_config());

        let outcome = analyzer.analyze("title", "content", &[]).await;
        assert!(outcome.mods.is_empty());
        assert_eq!(outcome.confidence, 0.0);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn malformed_json_counts_as_a_failed_attempt() {
        let backend = FlakyBackend::new(0, "not json at all");
        let analyzer = GroqAnalyzer::new(&backend, fast_config());

        let outcome = analyzer.analyze("title", "content", &[]).await;
        assert!(outcome.mods.is_empty());
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn empty_extraction_has_zero_confidence() {
        let backend = FlakyBackend::new(0, r#"{"mods":[]}"#);
        let analyzer = GroqAnalyzer::new(&backend, fast_config());

        let outcome = analyzer.analyze("title", "content", &[]).await;
        assert!(outcome.mods.is_empty());
        assert_eq!(outcome.confidence, 0.0);
        assert!(outcome.raw.is_some());
    }
}
