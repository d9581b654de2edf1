//! In-memory store for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::matching::normalize_mod_name;
use crate::traits::store::{
    AppearanceStore, AuditStore, FeedStore, PostStore, RegistryStore, SnapshotStore,
};
use crate::types::{
    appearance::{ModAppearance, ModLinkHistory},
    feed::ContentFeed,
    post::ContentPost,
    registry::{Mod, ModAlias, ModAuthor, RegistryEntry},
    sheet::SheetSnapshot,
};

/// In-memory implementation of every store trait.
///
/// Backed by `tokio::sync::RwLock`-guarded maps. Atomicity guarantees that a
/// relational backend gets from the database (claim-for-review, idempotent
/// insert) are provided here by doing the check and the mutation under one
/// write lock.
#[derive(Default)]
pub struct MemoryStore {
    feeds: RwLock<HashMap<String, ContentFeed>>,
    posts: RwLock<HashMap<String, ContentPost>>,
    authors: RwLock<HashMap<Uuid, ModAuthor>>,
    mods: RwLock<HashMap<Uuid, Mod>>,
    aliases: RwLock<HashMap<Uuid, Vec<ModAlias>>>,
    appearances: RwLock<HashMap<Uuid, ModAppearance>>,
    snapshots: RwLock<Vec<SheetSnapshot>>,
    history: RwLock<Vec<ModLinkHistory>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored posts. Test helper.
    pub async fn post_count(&self) -> usize {
        self.posts.read().await.len()
    }

    /// Number of stored appearances. Test helper.
    pub async fn appearance_count(&self) -> usize {
        self.appearances.read().await.len()
    }

    /// Full audit log, oldest first. Test helper.
    pub async fn full_history(&self) -> Vec<ModLinkHistory> {
        self.history.read().await.clone()
    }
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn list_feeds(&self) -> Result<Vec<ContentFeed>> {
        let mut feeds: Vec<ContentFeed> = self.feeds.read().await.values().cloned().collect();
        feeds.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Ok(feeds)
    }

    async fn list_active_feeds(&self) -> Result<Vec<ContentFeed>> {
        let mut feeds: Vec<ContentFeed> = self
            .feeds
            .read()
            .await
            .values()
            .filter(|f| f.is_active)
            .cloned()
            .collect();
        feeds.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Ok(feeds)
    }

    async fn get_feed(&self, source_id: &str) -> Result<Option<ContentFeed>> {
        Ok(self.feeds.read().await.get(source_id).cloned())
    }

    async fn upsert_feed(&self, feed: &ContentFeed) -> Result<()> {
        self.feeds
            .write()
            .await
            .insert(feed.source_id.clone(), feed.clone());
        Ok(())
    }

    async fn touch_feed(&self, source_id: &str, at: DateTime<Utc>) -> Result<()> {
        if let Some(feed) = self.feeds.write().await.get_mut(source_id) {
            feed.last_checked_at = Some(at);
        }
        Ok(())
    }

    async fn set_feed_active(&self, source_id: &str, active: bool) -> Result<()> {
        if let Some(feed) = self.feeds.write().await.get_mut(source_id) {
            feed.is_active = active;
        }
        Ok(())
    }

    async fn delete_feed(&self, source_id: &str) -> Result<()> {
        self.feeds.write().await.remove(source_id);

        let removed_posts: Vec<String> = {
            let mut posts = self.posts.write().await;
            let ids: Vec<String> = posts
                .values()
                .filter(|p| p.feed_source_id == source_id)
                .map(|p| p.post_id.clone())
                .collect();
            for id in &ids {
                posts.remove(id);
            }
            ids
        };

        self.appearances
            .write()
            .await
            .retain(|_, a| !removed_posts.contains(&a.post_id));
        self.snapshots
            .write()
            .await
            .retain(|s| s.feed_source_id != source_id);

        for author in self.authors.write().await.values_mut() {
            if author.feed_source_id.as_deref() == Some(source_id) {
                author.feed_source_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn get_post(&self, post_id: &str) -> Result<Option<ContentPost>> {
        Ok(self.posts.read().await.get(post_id).cloned())
    }

    async fn insert_post_if_absent(&self, post: &ContentPost) -> Result<bool> {
        let mut posts = self.posts.write().await;
        if posts.contains_key(&post.post_id) {
            return Ok(false);
        }
        posts.insert(post.post_id.clone(), post.clone());
        Ok(true)
    }

    async fn mark_post_analyzed(
        &self,
        post_id: &str,
        needs_review: bool,
        raw: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Result<()> {
        if let Some(post) = self.posts.write().await.get_mut(post_id) {
            post.analyzed = true;
            post.needs_review = needs_review;
            post.raw_ai_response = raw;
            post.processing_error = error;
        }
        Ok(())
    }

    async fn mark_post_notified(&self, post_id: &str) -> Result<()> {
        if let Some(post) = self.posts.write().await.get_mut(post_id) {
            post.is_notified = true;
        }
        Ok(())
    }

    async fn posts_needing_review(&self, limit: usize) -> Result<Vec<ContentPost>> {
        let mut pending: Vec<ContentPost> = self
            .posts
            .read()
            .await
            .values()
            .filter(|p| p.analyzed && p.needs_review)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        pending.truncate(limit);
        Ok(pending)
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn create_author(&self, author: &ModAuthor) -> Result<()> {
        self.authors
            .write()
            .await
            .insert(author.id, author.clone());
        Ok(())
    }

    async fn list_authors(&self) -> Result<Vec<ModAuthor>> {
        let mut authors: Vec<ModAuthor> = self.authors.read().await.values().cloned().collect();
        authors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(authors)
    }

    async fn get_author(&self, id: Uuid) -> Result<Option<ModAuthor>> {
        Ok(self.authors.read().await.get(&id).cloned())
    }

    async fn author_for_feed(&self, source_id: &str) -> Result<Option<ModAuthor>> {
        Ok(self
            .authors
            .read()
            .await
            .values()
            .find(|a| a.feed_source_id.as_deref() == Some(source_id))
            .cloned())
    }

    async fn link_author_feed(&self, author_id: Uuid, source_id: &str) -> Result<()> {
        if let Some(author) = self.authors.write().await.get_mut(&author_id) {
            author.feed_source_id = Some(source_id.to_string());
        }
        Ok(())
    }

    async fn insert_mod(&self, mod_record: &Mod) -> Result<()> {
        self.mods
            .write()
            .await
            .insert(mod_record.id, mod_record.clone());
        Ok(())
    }

    async fn update_mod(&self, mod_record: &Mod) -> Result<()> {
        self.mods
            .write()
            .await
            .insert(mod_record.id, mod_record.clone());
        Ok(())
    }

    async fn get_mod(&self, id: Uuid) -> Result<Option<Mod>> {
        Ok(self.mods.read().await.get(&id).cloned())
    }

    async fn find_mod(&self, author_id: Option<Uuid>, identifier: &str) -> Result<Option<Mod>> {
        let mods = self.mods.read().await;
        let in_scope = |m: &&Mod| {
            m.is_active && author_id.is_none_or(|author| m.author_id == author)
        };

        if let Ok(id) = identifier.parse::<Uuid>() {
            return Ok(mods.values().filter(in_scope).find(|m| m.id == id).cloned());
        }

        let normalized = normalize_mod_name(identifier);
        if let Some(exact) = mods
            .values()
            .filter(in_scope)
            .find(|m| m.normalized_name == normalized)
        {
            return Ok(Some(exact.clone()));
        }

        let lowered = identifier.to_lowercase();
        Ok(mods
            .values()
            .filter(in_scope)
            .find(|m| m.primary_name.to_lowercase().contains(&lowered))
            .cloned())
    }

    async fn mods_for_author(&self, author_id: Uuid) -> Result<Vec<Mod>> {
        let mut mods: Vec<Mod> = self
            .mods
            .read()
            .await
            .values()
            .filter(|m| m.author_id == author_id && m.is_active)
            .cloned()
            .collect();
        mods.sort_by(|a, b| a.primary_name.cmp(&b.primary_name));
        Ok(mods)
    }

    async fn registry_for_author(&self, author_id: Uuid) -> Result<Vec<RegistryEntry>> {
        let mods = self.mods_for_author(author_id).await?;
        let aliases = self.aliases.read().await;
        Ok(mods
            .into_iter()
            .map(|mod_record| {
                let mod_aliases = aliases.get(&mod_record.id).cloned().unwrap_or_default();
                RegistryEntry {
                    mod_record,
                    aliases: mod_aliases,
                }
            })
            .collect())
    }

    async fn add_alias(&self, alias: &ModAlias) -> Result<()> {
        self.aliases
            .write()
            .await
            .entry(alias.mod_id)
            .or_default()
            .push(alias.clone());
        Ok(())
    }

    async fn aliases_for_mod(&self, mod_id: Uuid) -> Result<Vec<ModAlias>> {
        Ok(self
            .aliases
            .read()
            .await
            .get(&mod_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl AppearanceStore for MemoryStore {
    async fn insert_appearance(&self, appearance: &ModAppearance) -> Result<()> {
        self.appearances
            .write()
            .await
            .insert(appearance.id, appearance.clone());
        Ok(())
    }

    async fn get_appearance(&self, id: Uuid) -> Result<Option<ModAppearance>> {
        Ok(self.appearances.read().await.get(&id).cloned())
    }

    async fn update_appearance(&self, appearance: &ModAppearance) -> Result<()> {
        self.appearances
            .write()
            .await
            .insert(appearance.id, appearance.clone());
        Ok(())
    }

    async fn claim_for_review(&self, id: Uuid) -> Result<Option<ModAppearance>> {
        // Check and clear under one write lock: two concurrent claims on the
        // same appearance resolve to exactly one winner.
        let mut appearances = self.appearances.write().await;
        match appearances.get_mut(&id) {
            Some(appearance) if appearance.needs_review => {
                let claimed = appearance.clone();
                appearance.needs_review = false;
                Ok(Some(claimed))
            }
            _ => Ok(None),
        }
    }

    async fn appearances_for_post(&self, post_id: &str) -> Result<Vec<ModAppearance>> {
        let mut result: Vec<ModAppearance> = self
            .appearances
            .read()
            .await
            .values()
            .filter(|a| a.post_id == post_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.detected_name.cmp(&b.detected_name));
        Ok(result)
    }

    async fn pending_for_post(&self, post_id: &str) -> Result<Vec<ModAppearance>> {
        Ok(self
            .appearances_for_post(post_id)
            .await?
            .into_iter()
            .filter(|a| a.needs_review)
            .collect())
    }

    async fn pending_for_message(&self, message_id: &str) -> Result<Vec<ModAppearance>> {
        let mut result: Vec<ModAppearance> = self
            .appearances
            .read()
            .await
            .values()
            .filter(|a| a.needs_review && a.message_id.as_deref() == Some(message_id))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.detected_name.cmp(&b.detected_name));
        Ok(result)
    }

    async fn set_message_handles(
        &self,
        post_id: &str,
        message_id: &str,
        thread_id: Option<&str>,
    ) -> Result<()> {
        for appearance in self.appearances.write().await.values_mut() {
            if appearance.post_id == post_id {
                appearance.message_id = Some(message_id.to_string());
                appearance.thread_id = thread_id.map(str::to_string);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn latest_snapshot(&self, feed_source_id: &str) -> Result<Option<SheetSnapshot>> {
        Ok(self
            .snapshots
            .read()
            .await
            .iter()
            .filter(|s| s.feed_source_id == feed_source_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn insert_snapshot(&self, snapshot: &SheetSnapshot) -> Result<()> {
        self.snapshots.write().await.push(snapshot.clone());
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append_history(&self, entry: &ModLinkHistory) -> Result<()> {
        self.history.write().await.push(entry.clone());
        Ok(())
    }

    async fn history_for_mod(&self, mod_id: Uuid) -> Result<Vec<ModLinkHistory>> {
        Ok(self
            .history
            .read()
            .await
            .iter()
            .filter(|h| h.mod_id == mod_id)
            .cloned()
            .collect())
    }

    async fn history_for_appearance(&self, appearance_id: Uuid) -> Result<Vec<ModLinkHistory>> {
        Ok(self
            .history
            .read()
            .await
            .iter()
            .filter(|h| h.appearance_id == appearance_id)
            .cloned()
            .collect())
    }
}
