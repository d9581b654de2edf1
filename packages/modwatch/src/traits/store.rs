//! Repository traits over the relational store.
//!
//! The storage layer is split into focused traits, one per aggregate, with a
//! composite `PipelineStore` for components that touch several:
//! - `FeedStore`: polled feed definitions
//! - `PostStore`: ingested content items
//! - `RegistryStore`: authors, mods, aliases
//! - `AppearanceStore`: detections pending or past review
//! - `SnapshotStore`: sheet diff baselines
//! - `AuditStore`: the append-only review audit log

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{
    appearance::{ModAppearance, ModLinkHistory},
    feed::ContentFeed,
    post::ContentPost,
    registry::{Mod, ModAlias, ModAuthor, RegistryEntry},
    sheet::SheetSnapshot,
};

/// Store for polled feed definitions.
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn list_feeds(&self) -> Result<Vec<ContentFeed>>;

    async fn list_active_feeds(&self) -> Result<Vec<ContentFeed>>;

    async fn get_feed(&self, source_id: &str) -> Result<Option<ContentFeed>>;

    /// Insert or replace a feed keyed by its source id.
    async fn upsert_feed(&self, feed: &ContentFeed) -> Result<()>;

    /// Advance `last_checked_at`. Called after every check, success or not.
    async fn touch_feed(&self, source_id: &str, at: DateTime<Utc>) -> Result<()>;

    async fn set_feed_active(&self, source_id: &str, active: bool) -> Result<()>;

    /// Hard delete; cascades the feed's posts and snapshots.
    async fn delete_feed(&self, source_id: &str) -> Result<()>;
}

/// Store for ingested content items.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn get_post(&self, post_id: &str) -> Result<Option<ContentPost>>;

    /// Idempotent insert keyed by external post id.
    ///
    /// Returns `true` if the post was newly inserted, `false` if the id was
    /// already stored (in which case nothing changes).
    async fn insert_post_if_absent(&self, post: &ContentPost) -> Result<bool>;

    /// Mark a post analyzed, recording the raw extraction payload and any
    /// processing error. An analyzed post is never reprocessed.
    async fn mark_post_analyzed(
        &self,
        post_id: &str,
        needs_review: bool,
        raw: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Result<()>;

    async fn mark_post_notified(&self, post_id: &str) -> Result<()>;

    /// Analyzed posts still awaiting review, newest first.
    async fn posts_needing_review(&self, limit: usize) -> Result<Vec<ContentPost>>;
}

/// Store for the curated registry.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn create_author(&self, author: &ModAuthor) -> Result<()>;

    async fn list_authors(&self) -> Result<Vec<ModAuthor>>;

    async fn get_author(&self, id: Uuid) -> Result<Option<ModAuthor>>;

    /// The author linked to a feed, if any.
    async fn author_for_feed(&self, source_id: &str) -> Result<Option<ModAuthor>>;

    async fn link_author_feed(&self, author_id: Uuid, source_id: &str) -> Result<()>;

    async fn insert_mod(&self, mod_record: &Mod) -> Result<()>;

    /// Whole-row update keyed by mod id.
    async fn update_mod(&self, mod_record: &Mod) -> Result<()>;

    async fn get_mod(&self, id: Uuid) -> Result<Option<Mod>>;

    /// Resolve an operator-supplied identifier: exact id, exact normalized
    /// slug, or case-insensitive name substring. Scoped to an author when
    /// one is given.
    async fn find_mod(&self, author_id: Option<Uuid>, identifier: &str) -> Result<Option<Mod>>;

    /// Active mods for an author.
    async fn mods_for_author(&self, author_id: Uuid) -> Result<Vec<Mod>>;

    /// Active mods plus their aliases, ready for the match engine.
    async fn registry_for_author(&self, author_id: Uuid) -> Result<Vec<RegistryEntry>>;

    async fn add_alias(&self, alias: &ModAlias) -> Result<()>;

    async fn aliases_for_mod(&self, mod_id: Uuid) -> Result<Vec<ModAlias>>;
}

/// Store for detections pending or past review.
#[async_trait]
pub trait AppearanceStore: Send + Sync {
    async fn insert_appearance(&self, appearance: &ModAppearance) -> Result<()>;

    async fn get_appearance(&self, id: Uuid) -> Result<Option<ModAppearance>>;

    /// Whole-row update keyed by appearance id.
    async fn update_appearance(&self, appearance: &ModAppearance) -> Result<()>;

    /// Atomically claim a pending appearance for a review decision.
    ///
    /// If the appearance exists and still has `needs_review` set, clears the
    /// flag and returns the row as it was at claim time. Returns `None` when
    /// the appearance is unknown or already terminal — the guard that makes
    /// duplicate operator submissions no-ops.
    async fn claim_for_review(&self, id: Uuid) -> Result<Option<ModAppearance>>;

    async fn appearances_for_post(&self, post_id: &str) -> Result<Vec<ModAppearance>>;

    async fn pending_for_post(&self, post_id: &str) -> Result<Vec<ModAppearance>>;

    /// Pending appearances rendered into a given notification message.
    async fn pending_for_message(&self, message_id: &str) -> Result<Vec<ModAppearance>>;

    /// Attach notification handles to every appearance of a post.
    async fn set_message_handles(
        &self,
        post_id: &str,
        message_id: &str,
        thread_id: Option<&str>,
    ) -> Result<()>;
}

/// Store for sheet diff baselines.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// The active baseline: latest snapshot by creation time.
    async fn latest_snapshot(&self, feed_source_id: &str) -> Result<Option<SheetSnapshot>>;

    async fn insert_snapshot(&self, snapshot: &SheetSnapshot) -> Result<()>;
}

/// Append-only audit log of state-changing review actions.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_history(&self, entry: &ModLinkHistory) -> Result<()>;

    async fn history_for_mod(&self, mod_id: Uuid) -> Result<Vec<ModLinkHistory>>;

    async fn history_for_appearance(&self, appearance_id: Uuid) -> Result<Vec<ModLinkHistory>>;
}

/// Composite store trait combining every repository concern.
pub trait PipelineStore:
    FeedStore + PostStore + RegistryStore + AppearanceStore + SnapshotStore + AuditStore
{
}

impl<T> PipelineStore for T where
    T: FeedStore + PostStore + RegistryStore + AppearanceStore + SnapshotStore + AuditStore
{
}
