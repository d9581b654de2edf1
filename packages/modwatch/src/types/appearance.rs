//! Detected mod appearances and the append-only review audit log.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How long a fresh appearance is considered actionable before the review
/// surface treats it as stale.
pub const REVIEW_EXPIRY_MINS: i64 = 15;

/// One detected mention of a mod within one content post.
///
/// Created at detection time; mutated exactly once by a terminal operator
/// decision (confirm / link / create / ignore), which clears `needs_review`.
/// Never deleted — appearances are the audit trail of what was detected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModAppearance {
    pub id: Uuid,

    /// Owning post's external id.
    pub post_id: String,

    /// Resolved registry mod; `None` while unresolved.
    pub mod_id: Option<Uuid>,

    pub detected_name: String,
    pub normalized_name: String,

    pub detected_version: Option<String>,
    pub normalized_version: String,

    pub is_update: bool,
    pub is_new_mod: bool,

    /// Derived at detection time, only when resolution produced a concrete
    /// mod: the detected version means a translation is owed.
    pub needs_update: bool,

    pub download_url: Option<String>,

    /// Match certainty in [0, 1].
    pub confidence: f64,

    /// Fuzzy suggestion below the auto-link bands; a human must confirm.
    pub suggested_mod_id: Option<Uuid>,
    pub suggested_mod_name: Option<String>,

    pub verified: bool,
    pub needs_review: bool,

    /// Handles into the notification sink, set once the review surface has
    /// been rendered.
    pub message_id: Option<String>,
    pub thread_id: Option<String>,

    pub expires_at: DateTime<Utc>,
}

impl ModAppearance {
    /// Create a pending appearance for a post.
    pub fn new(post_id: impl Into<String>, detected_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id: post_id.into(),
            mod_id: None,
            detected_name: detected_name.into(),
            normalized_name: String::new(),
            detected_version: None,
            normalized_version: String::new(),
            is_update: false,
            is_new_mod: false,
            needs_update: false,
            download_url: None,
            confidence: 0.0,
            suggested_mod_id: None,
            suggested_mod_name: None,
            verified: false,
            needs_review: true,
            message_id: None,
            thread_id: None,
            expires_at: Utc::now() + Duration::minutes(REVIEW_EXPIRY_MINS),
        }
    }
}

/// Terminal operator action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Verified,
    Linked,
    Created,
}

/// Append-only audit record for a state-changing review action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModLinkHistory {
    pub id: Uuid,
    pub mod_id: Uuid,
    pub appearance_id: Uuid,
    pub action: AuditAction,
    /// Operator who took the action.
    pub actor: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ModLinkHistory {
    pub fn new(
        mod_id: Uuid,
        appearance_id: Uuid,
        action: AuditAction,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            mod_id,
            appearance_id,
            action,
            actor: actor.into(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
