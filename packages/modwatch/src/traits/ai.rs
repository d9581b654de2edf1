//! Analyzer trait for LLM-assisted mod extraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One mod mention extracted from a post.
///
/// Field names follow the JSON contract the extraction prompt demands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedMod {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub is_update: bool,
    pub is_new_mod: bool,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Result of analyzing one post.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub mods: Vec<DetectedMod>,

    /// 0.8 for any non-empty extraction, 0 otherwise (inherited constant).
    pub confidence: f64,

    /// Raw response payload, persisted for diagnosis.
    pub raw: Option<serde_json::Value>,
}

impl AnalysisOutcome {
    /// The degraded "nothing detected" outcome.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Extracts structured mod-update facts from unstructured post text.
///
/// Implementations own their retry budget and NEVER propagate extraction
/// failure: after retries are exhausted they return [`AnalysisOutcome::empty`]
/// so the pipeline degrades to "nothing detected" instead of blocking.
#[async_trait]
pub trait PostAnalyzer: Send + Sync {
    /// Analyze a post. `known_mods` biases extraction toward canonical names.
    async fn analyze(&self, title: &str, content: &str, known_mods: &[String])
        -> AnalysisOutcome;
}
