//! Ingested content items and the upstream items they come from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An item as returned by an upstream content source, before ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    /// External identifier, globally unique per source.
    pub id: String,

    pub title: String,

    pub url: String,

    /// Body text; may be empty for attachment-only posts.
    pub content: String,

    pub published_at: DateTime<Utc>,

    pub post_type: Option<String>,

    /// Patreon-style pledge gate, if any.
    pub min_cents_pledged: Option<u32>,
}

/// An immutable ingested content unit.
///
/// `post_id` is globally unique; re-ingestion of the same external id is a
/// no-op at the store layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPost {
    pub post_id: String,

    /// Owning feed's source id.
    pub feed_source_id: String,

    pub title: String,

    pub url: String,

    pub content: String,

    pub published_at: DateTime<Utc>,

    /// Set once extraction has run (or been skipped by the keyword gate).
    pub analyzed: bool,

    /// Whether any detection on this post still awaits a human decision.
    pub needs_review: bool,

    /// Whether the plain new-post notification went out.
    pub is_notified: bool,

    /// Opaque extraction payload, kept for diagnosis.
    pub raw_ai_response: Option<serde_json::Value>,

    /// Error captured when analysis failed; the post is still marked
    /// analyzed so it is never reprocessed.
    pub processing_error: Option<String>,
}

impl ContentPost {
    /// Build a fresh, unanalyzed post from an upstream item.
    pub fn from_item(item: &FeedItem, feed_source_id: impl Into<String>) -> Self {
        Self {
            post_id: item.id.clone(),
            feed_source_id: feed_source_id.into(),
            title: item.title.clone(),
            url: item.url.clone(),
            content: item.content.clone(),
            published_at: item.published_at,
            analyzed: false,
            needs_review: false,
            is_notified: false,
            raw_ai_response: None,
            processing_error: None,
        }
    }
}
