//! Operator-facing registry management.
//!
//! Thin service over the store for the commands operators run outside the
//! review flow: managing authors, mods, aliases, and feed definitions, and
//! recording translation progress.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::matching::{compare_versions, normalize_version};
use crate::traits::store::PipelineStore;
use crate::types::{
    feed::{ContentFeed, FeedPlatform, DEFAULT_CHECK_INTERVAL_MINS},
    post::ContentPost,
    registry::{Mod, ModAlias, ModAuthor},
};

/// Registry and feed management operations.
pub struct RegistryService<S> {
    store: Arc<S>,
}

impl<S> RegistryService<S>
where
    S: PipelineStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn register_author(
        &self,
        name: impl Into<String>,
        patreon_url: Option<String>,
    ) -> Result<ModAuthor> {
        let mut author = ModAuthor::new(name);
        if let Some(url) = patreon_url {
            author = author.with_patreon_url(url);
        }
        self.store.create_author(&author).await?;
        info!(author_id = %author.id, name = %author.name, "author registered");
        Ok(author)
    }

    pub async fn list_authors(&self) -> Result<Vec<ModAuthor>> {
        self.store.list_authors().await
    }

    /// Attach an author to the feed their content arrives through.
    ///
    /// Detection only consults the registry for posts whose feed has an
    /// author; an unlinked feed analyzes against an empty registry.
    pub async fn link_author_feed(&self, author_id: Uuid, source_id: &str) -> Result<()> {
        if self.store.get_author(author_id).await?.is_none() {
            return Err(PipelineError::not_found("author", author_id.to_string()));
        }
        if self.store.get_feed(source_id).await?.is_none() {
            return Err(PipelineError::not_found("feed", source_id));
        }
        self.store.link_author_feed(author_id, source_id).await
    }

    /// Create a feed definition. Fails if the source id is already tracked.
    pub async fn create_feed(
        &self,
        source_id: impl Into<String>,
        platform: FeedPlatform,
        creator_name: impl Into<String>,
        notification_channel_id: impl Into<String>,
        check_interval_mins: Option<i64>,
    ) -> Result<ContentFeed> {
        let source_id = source_id.into();
        if self.store.get_feed(&source_id).await?.is_some() {
            return Err(PipelineError::already_exists("feed", source_id));
        }

        let feed = ContentFeed::new(source_id, platform, creator_name, notification_channel_id)
            .with_check_interval(check_interval_mins.unwrap_or(DEFAULT_CHECK_INTERVAL_MINS));
        self.store.upsert_feed(&feed).await?;
        info!(source_id = %feed.source_id, ?platform, "feed created");
        Ok(feed)
    }

    pub async fn list_feeds(&self) -> Result<Vec<ContentFeed>> {
        self.store.list_feeds().await
    }

    pub async fn set_feed_interval(&self, source_id: &str, mins: i64) -> Result<ContentFeed> {
        let feed = self
            .store
            .get_feed(source_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("feed", source_id))?
            .with_check_interval(mins);
        self.store.upsert_feed(&feed).await?;
        Ok(feed)
    }

    /// Soft-disable or re-enable a feed without losing its history.
    pub async fn set_feed_active(&self, source_id: &str, active: bool) -> Result<()> {
        if self.store.get_feed(source_id).await?.is_none() {
            return Err(PipelineError::not_found("feed", source_id));
        }
        self.store.set_feed_active(source_id, active).await?;
        info!(source_id, active, "feed active flag changed");
        Ok(())
    }

    /// Hard-delete a feed and everything hanging off it.
    pub async fn delete_feed(&self, source_id: &str) -> Result<()> {
        if self.store.get_feed(source_id).await?.is_none() {
            return Err(PipelineError::not_found("feed", source_id));
        }
        self.store.delete_feed(source_id).await?;
        info!(source_id, "feed deleted");
        Ok(())
    }

    pub async fn create_mod(
        &self,
        author_id: Uuid,
        name: impl Into<String>,
        curseforge_url: Option<String>,
    ) -> Result<Mod> {
        if self.store.get_author(author_id).await?.is_none() {
            return Err(PipelineError::not_found("author", author_id.to_string()));
        }

        let mut mod_record = Mod::new(author_id, name);
        if let Some(url) = curseforge_url {
            mod_record = mod_record.with_curseforge_url(url);
        }
        self.store.insert_mod(&mod_record).await?;
        info!(mod_id = %mod_record.id, name = %mod_record.primary_name, "mod created");
        Ok(mod_record)
    }

    /// Bulk-import mods as (name, translated version) pairs, skipping names
    /// that already resolve within the author's set. Returns how many were
    /// created.
    pub async fn import_mods(
        &self,
        author_id: Uuid,
        entries: &[(String, Option<String>)],
    ) -> Result<usize> {
        if self.store.get_author(author_id).await?.is_none() {
            return Err(PipelineError::not_found("author", author_id.to_string()));
        }

        let mut created = 0;
        for (name, version) in entries {
            if name.trim().is_empty() {
                continue;
            }
            if self
                .store
                .find_mod(Some(author_id), name)
                .await?
                .is_some()
            {
                continue;
            }

            let mut mod_record = Mod::new(author_id, name.clone());
            if let Some(version) = version {
                let now = Utc::now();
                mod_record.translated_version_normalized =
                    Some(normalize_version(Some(version), now));
                mod_record.translated_version = Some(version.clone());
                mod_record.translation_date = Some(now);
            }
            self.store.insert_mod(&mod_record).await?;
            created += 1;
        }
        info!(%author_id, created, total = entries.len(), "mods imported");
        Ok(created)
    }

    pub async fn get_mod(&self, id: Uuid) -> Result<Option<Mod>> {
        self.store.get_mod(id).await
    }

    pub async fn find_mod(
        &self,
        author_id: Option<Uuid>,
        identifier: &str,
    ) -> Result<Option<Mod>> {
        self.store.find_mod(author_id, identifier).await
    }

    pub async fn mods_for_author(&self, author_id: Uuid) -> Result<Vec<Mod>> {
        self.store.mods_for_author(author_id).await
    }

    /// Record that a translation shipped for a mod.
    ///
    /// Recomputes `is_up_to_date` by comparing the normalized translated
    /// version against the latest detected one; translating at or past the
    /// latest detection counts as caught up.
    pub async fn set_translated_version(
        &self,
        mod_id: Uuid,
        version: impl Into<String>,
    ) -> Result<Mod> {
        let mut mod_record = self
            .store
            .get_mod(mod_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("mod", mod_id.to_string()))?;

        let version = version.into();
        let now = Utc::now();
        let normalized = normalize_version(Some(&version), now);

        mod_record.is_up_to_date = match mod_record.latest_version_normalized.as_deref() {
            None => true,
            Some(latest) => compare_versions(&normalized, latest) != std::cmp::Ordering::Less,
        };
        mod_record.translated_version = Some(version);
        mod_record.translated_version_normalized = Some(normalized);
        mod_record.translation_date = Some(now);

        self.store.update_mod(&mod_record).await?;
        info!(
            %mod_id,
            version = mod_record.translated_version.as_deref().unwrap_or(""),
            up_to_date = mod_record.is_up_to_date,
            "translated version recorded"
        );
        Ok(mod_record)
    }

    pub async fn add_alias(&self, mod_id: Uuid, name: impl Into<String>) -> Result<ModAlias> {
        if self.store.get_mod(mod_id).await?.is_none() {
            return Err(PipelineError::not_found("mod", mod_id.to_string()));
        }
        let alias = ModAlias::new(mod_id, name);
        self.store.add_alias(&alias).await?;
        Ok(alias)
    }

    /// Analyzed posts still awaiting a review decision, newest first.
    pub async fn pending_reviews(&self, limit: usize) -> Result<Vec<ContentPost>> {
        self.store.posts_needing_review(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryStore;
    use crate::traits::store::RegistryStore;

    fn service() -> RegistryService<MemoryStore> {
        RegistryService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn duplicate_feed_creation_is_rejected() {
        let service = service();
        service
            .create_feed("c-1", FeedPlatform::Patreon, "Creator", "chan", None)
            .await
            .unwrap();

        let err = service
            .create_feed("c-1", FeedPlatform::Patreon, "Creator", "chan", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn feed_interval_is_clamped_on_creation() {
        let service = service();
        let feed = service
            .create_feed("c-2", FeedPlatform::Patreon, "Creator", "chan", Some(1))
            .await
            .unwrap();
        assert_eq!(feed.check_interval_mins, 5);
    }

    #[tokio::test]
    async fn translating_the_latest_version_marks_the_mod_caught_up() {
        let service = service();
        let author = service.register_author("Author", None).await.unwrap();
        let mod_record = service
            .create_mod(author.id, "Mod X", None)
            .await
            .unwrap();

        // Simulate a confirmed detection promoting the latest version.
        let mut behind = mod_record.clone();
        behind.latest_version = Some("1.2".to_string());
        behind.latest_version_normalized = Some("1.2.0".to_string());
        behind.latest_version_date = Some(Utc::now());
        behind.is_up_to_date = false;
        service.store.update_mod(&behind).await.unwrap();

        let translated = service
            .set_translated_version(mod_record.id, "1.2")
            .await
            .unwrap();
        assert!(translated.is_up_to_date);
        assert_eq!(translated.translated_version_normalized.as_deref(), Some("1.2.0"));

        let stale = service
            .set_translated_version(mod_record.id, "1.1")
            .await
            .unwrap();
        assert!(!stale.is_up_to_date);
    }

    #[tokio::test]
    async fn import_skips_names_that_already_resolve() {
        let service = service();
        let author = service.register_author("Author", None).await.unwrap();
        service.create_mod(author.id, "Mod X", None).await.unwrap();

        let created = service
            .import_mods(
                author.id,
                &[
                    ("Mod X".to_string(), None),
                    ("Mod Y".to_string(), Some("1.4".to_string())),
                    ("  ".to_string(), None),
                ],
            )
            .await
            .unwrap();
        assert_eq!(created, 1);

        let mods = service.mods_for_author(author.id).await.unwrap();
        assert_eq!(mods.len(), 2);
        let imported = mods.iter().find(|m| m.primary_name == "Mod Y").unwrap();
        assert_eq!(
            imported.translated_version_normalized.as_deref(),
            Some("1.4.0")
        );
    }
}
