//! Postgres-backed store.
//!
//! Enabled by the `postgres` cargo feature. JSON payloads (raw extraction
//! responses, audit metadata, snapshot entries) are stored as TEXT and
//! (de)serialized at the edge.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::matching::normalize_mod_name;
use crate::traits::store::{
    AppearanceStore, AuditStore, FeedStore, PostStore, RegistryStore, SnapshotStore,
};
use crate::types::{
    appearance::{AuditAction, ModAppearance, ModLinkHistory},
    feed::{ContentFeed, FeedPlatform},
    post::ContentPost,
    registry::{Mod, ModAlias, ModAuthor, RegistryEntry},
    sheet::SheetSnapshot,
};

/// Postgres-backed implementation of every store trait.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and create the schema if it does not exist yet.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(PipelineError::storage)?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS content_feeds (
                source_id TEXT PRIMARY KEY,
                platform TEXT NOT NULL,
                creator_name TEXT NOT NULL,
                notification_channel_id TEXT NOT NULL,
                check_interval_mins BIGINT NOT NULL,
                is_active BOOLEAN NOT NULL,
                last_checked_at TIMESTAMPTZ,
                sheet_range TEXT
            )",
            "CREATE TABLE IF NOT EXISTS content_posts (
                post_id TEXT PRIMARY KEY,
                feed_source_id TEXT NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                content TEXT NOT NULL,
                published_at TIMESTAMPTZ NOT NULL,
                analyzed BOOLEAN NOT NULL,
                needs_review BOOLEAN NOT NULL,
                is_notified BOOLEAN NOT NULL,
                raw_ai_response TEXT,
                processing_error TEXT
            )",
            "CREATE TABLE IF NOT EXISTS mod_authors (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                patreon_url TEXT,
                feed_source_id TEXT
            )",
            "CREATE TABLE IF NOT EXISTS mods (
                id UUID PRIMARY KEY,
                author_id UUID NOT NULL,
                primary_name TEXT NOT NULL,
                normalized_name TEXT NOT NULL,
                curseforge_url TEXT,
                translated_version TEXT,
                translated_version_normalized TEXT,
                translation_date TIMESTAMPTZ,
                latest_version TEXT,
                latest_version_normalized TEXT,
                latest_version_date TIMESTAMPTZ,
                is_up_to_date BOOLEAN NOT NULL,
                is_active BOOLEAN NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS mod_aliases (
                id UUID PRIMARY KEY,
                mod_id UUID NOT NULL,
                name TEXT NOT NULL,
                normalized TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS mod_appearances (
                id UUID PRIMARY KEY,
                post_id TEXT NOT NULL,
                mod_id UUID,
                detected_name TEXT NOT NULL,
                normalized_name TEXT NOT NULL,
                detected_version TEXT,
                normalized_version TEXT NOT NULL,
                is_update BOOLEAN NOT NULL,
                is_new_mod BOOLEAN NOT NULL,
                needs_update BOOLEAN NOT NULL,
                download_url TEXT,
                confidence DOUBLE PRECISION NOT NULL,
                suggested_mod_id UUID,
                suggested_mod_name TEXT,
                verified BOOLEAN NOT NULL,
                needs_review BOOLEAN NOT NULL,
                message_id TEXT,
                thread_id TEXT,
                expires_at TIMESTAMPTZ NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS sheet_snapshots (
                id UUID PRIMARY KEY,
                feed_source_id TEXT NOT NULL,
                entries TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS mod_link_history (
                id UUID PRIMARY KEY,
                mod_id UUID NOT NULL,
                appearance_id UUID NOT NULL,
                action TEXT NOT NULL,
                actor TEXT NOT NULL,
                metadata TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )",
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(PipelineError::storage)?;
        }
        Ok(())
    }
}

fn platform_to_str(platform: FeedPlatform) -> &'static str {
    match platform {
        FeedPlatform::Patreon => "PATREON",
        FeedPlatform::GoogleSheets => "GOOGLE_SHEETS",
        FeedPlatform::Rss => "RSS",
        FeedPlatform::GitHub => "GIT_HUB",
    }
}

fn platform_from_str(value: &str) -> FeedPlatform {
    match value {
        "GOOGLE_SHEETS" => FeedPlatform::GoogleSheets,
        "RSS" => FeedPlatform::Rss,
        "GIT_HUB" => FeedPlatform::GitHub,
        _ => FeedPlatform::Patreon,
    }
}

fn action_to_str(action: AuditAction) -> &'static str {
    match action {
        AuditAction::Verified => "verified",
        AuditAction::Linked => "linked",
        AuditAction::Created => "created",
    }
}

fn action_from_str(value: &str) -> AuditAction {
    match value {
        "linked" => AuditAction::Linked,
        "created" => AuditAction::Created,
        _ => AuditAction::Verified,
    }
}

fn feed_from_row(row: &sqlx::postgres::PgRow) -> sqlx::Result<ContentFeed> {
    Ok(ContentFeed {
        source_id: row.try_get("source_id")?,
        platform: platform_from_str(row.try_get::<String, _>("platform")?.as_str()),
        creator_name: row.try_get("creator_name")?,
        notification_channel_id: row.try_get("notification_channel_id")?,
        check_interval_mins: row.try_get("check_interval_mins")?,
        is_active: row.try_get("is_active")?,
        last_checked_at: row.try_get("last_checked_at")?,
        sheet_range: row.try_get("sheet_range")?,
    })
}

fn post_from_row(row: &sqlx::postgres::PgRow) -> Result<ContentPost> {
    let raw: Option<String> = row.try_get("raw_ai_response").map_err(PipelineError::storage)?;
    let raw_ai_response = raw.map(|s| serde_json::from_str(&s)).transpose()?;
    Ok(ContentPost {
        post_id: row.try_get("post_id").map_err(PipelineError::storage)?,
        feed_source_id: row
            .try_get("feed_source_id")
            .map_err(PipelineError::storage)?,
        title: row.try_get("title").map_err(PipelineError::storage)?,
        url: row.try_get("url").map_err(PipelineError::storage)?,
        content: row.try_get("content").map_err(PipelineError::storage)?,
        published_at: row
            .try_get("published_at")
            .map_err(PipelineError::storage)?,
        analyzed: row.try_get("analyzed").map_err(PipelineError::storage)?,
        needs_review: row
            .try_get("needs_review")
            .map_err(PipelineError::storage)?,
        is_notified: row.try_get("is_notified").map_err(PipelineError::storage)?,
        raw_ai_response,
        processing_error: row
            .try_get("processing_error")
            .map_err(PipelineError::storage)?,
    })
}

fn mod_from_row(row: &sqlx::postgres::PgRow) -> sqlx::Result<Mod> {
    Ok(Mod {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        primary_name: row.try_get("primary_name")?,
        normalized_name: row.try_get("normalized_name")?,
        curseforge_url: row.try_get("curseforge_url")?,
        translated_version: row.try_get("translated_version")?,
        translated_version_normalized: row.try_get("translated_version_normalized")?,
        translation_date: row.try_get("translation_date")?,
        latest_version: row.try_get("latest_version")?,
        latest_version_normalized: row.try_get("latest_version_normalized")?,
        latest_version_date: row.try_get("latest_version_date")?,
        is_up_to_date: row.try_get("is_up_to_date")?,
        is_active: row.try_get("is_active")?,
    })
}

fn appearance_from_row(row: &sqlx::postgres::PgRow) -> sqlx::Result<ModAppearance> {
    Ok(ModAppearance {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        mod_id: row.try_get("mod_id")?,
        detected_name: row.try_get("detected_name")?,
        normalized_name: row.try_get("normalized_name")?,
        detected_version: row.try_get("detected_version")?,
        normalized_version: row.try_get("normalized_version")?,
        is_update: row.try_get("is_update")?,
        is_new_mod: row.try_get("is_new_mod")?,
        needs_update: row.try_get("needs_update")?,
        download_url: row.try_get("download_url")?,
        confidence: row.try_get("confidence")?,
        suggested_mod_id: row.try_get("suggested_mod_id")?,
        suggested_mod_name: row.try_get("suggested_mod_name")?,
        verified: row.try_get("verified")?,
        needs_review: row.try_get("needs_review")?,
        message_id: row.try_get("message_id")?,
        thread_id: row.try_get("thread_id")?,
        expires_at: row.try_get("expires_at")?,
    })
}

fn author_from_row(row: &sqlx::postgres::PgRow) -> sqlx::Result<ModAuthor> {
    Ok(ModAuthor {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        patreon_url: row.try_get("patreon_url")?,
        feed_source_id: row.try_get("feed_source_id")?,
    })
}

fn alias_from_row(row: &sqlx::postgres::PgRow) -> sqlx::Result<ModAlias> {
    Ok(ModAlias {
        id: row.try_get("id")?,
        mod_id: row.try_get("mod_id")?,
        name: row.try_get("name")?,
        normalized: row.try_get("normalized")?,
    })
}

fn history_from_row(row: &sqlx::postgres::PgRow) -> Result<ModLinkHistory> {
    let metadata: Option<String> = row.try_get("metadata").map_err(PipelineError::storage)?;
    let metadata = metadata.map(|s| serde_json::from_str(&s)).transpose()?;
    Ok(ModLinkHistory {
        id: row.try_get("id").map_err(PipelineError::storage)?,
        mod_id: row.try_get("mod_id").map_err(PipelineError::storage)?,
        appearance_id: row
            .try_get("appearance_id")
            .map_err(PipelineError::storage)?,
        action: action_from_str(
            row.try_get::<String, _>("action")
                .map_err(PipelineError::storage)?
                .as_str(),
        ),
        actor: row.try_get("actor").map_err(PipelineError::storage)?,
        metadata,
        created_at: row.try_get("created_at").map_err(PipelineError::storage)?,
    })
}

#[async_trait]
impl FeedStore for PostgresStore {
    async fn list_feeds(&self) -> Result<Vec<ContentFeed>> {
        let rows = sqlx::query("SELECT * FROM content_feeds ORDER BY source_id")
            .fetch_all(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        rows.iter()
            .map(|r| feed_from_row(r).map_err(PipelineError::storage))
            .collect()
    }

    async fn list_active_feeds(&self) -> Result<Vec<ContentFeed>> {
        let rows =
            sqlx::query("SELECT * FROM content_feeds WHERE is_active ORDER BY source_id")
                .fetch_all(&self.pool)
                .await
                .map_err(PipelineError::storage)?;
        rows.iter()
            .map(|r| feed_from_row(r).map_err(PipelineError::storage))
            .collect()
    }

    async fn get_feed(&self, source_id: &str) -> Result<Option<ContentFeed>> {
        let row = sqlx::query("SELECT * FROM content_feeds WHERE source_id = $1")
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        row.as_ref()
            .map(|r| feed_from_row(r).map_err(PipelineError::storage))
            .transpose()
    }

    async fn upsert_feed(&self, feed: &ContentFeed) -> Result<()> {
        sqlx::query(
            "INSERT INTO content_feeds
                (source_id, platform, creator_name, notification_channel_id,
                 check_interval_mins, is_active, last_checked_at, sheet_range)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (source_id) DO UPDATE SET
                platform = EXCLUDED.platform,
                creator_name = EXCLUDED.creator_name,
                notification_channel_id = EXCLUDED.notification_channel_id,
                check_interval_mins = EXCLUDED.check_interval_mins,
                is_active = EXCLUDED.is_active,
                last_checked_at = EXCLUDED.last_checked_at,
                sheet_range = EXCLUDED.sheet_range",
        )
        .bind(&feed.source_id)
        .bind(platform_to_str(feed.platform))
        .bind(&feed.creator_name)
        .bind(&feed.notification_channel_id)
        .bind(feed.check_interval_mins)
        .bind(feed.is_active)
        .bind(feed.last_checked_at)
        .bind(&feed.sheet_range)
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        Ok(())
    }

    async fn touch_feed(&self, source_id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE content_feeds SET last_checked_at = $2 WHERE source_id = $1")
            .bind(source_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        Ok(())
    }

    async fn set_feed_active(&self, source_id: &str, active: bool) -> Result<()> {
        sqlx::query("UPDATE content_feeds SET is_active = $2 WHERE source_id = $1")
            .bind(source_id)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        Ok(())
    }

    async fn delete_feed(&self, source_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(PipelineError::storage)?;
        sqlx::query(
            "DELETE FROM mod_appearances WHERE post_id IN
                (SELECT post_id FROM content_posts WHERE feed_source_id = $1)",
        )
        .bind(source_id)
        .execute(&mut *tx)
        .await
        .map_err(PipelineError::storage)?;
        sqlx::query("DELETE FROM content_posts WHERE feed_source_id = $1")
            .bind(source_id)
            .execute(&mut *tx)
            .await
            .map_err(PipelineError::storage)?;
        sqlx::query("DELETE FROM sheet_snapshots WHERE feed_source_id = $1")
            .bind(source_id)
            .execute(&mut *tx)
            .await
            .map_err(PipelineError::storage)?;
        sqlx::query("UPDATE mod_authors SET feed_source_id = NULL WHERE feed_source_id = $1")
            .bind(source_id)
            .execute(&mut *tx)
            .await
            .map_err(PipelineError::storage)?;
        sqlx::query("DELETE FROM content_feeds WHERE source_id = $1")
            .bind(source_id)
            .execute(&mut *tx)
            .await
            .map_err(PipelineError::storage)?;
        tx.commit().await.map_err(PipelineError::storage)?;
        Ok(())
    }
}

#[async_trait]
impl PostStore for PostgresStore {
    async fn get_post(&self, post_id: &str) -> Result<Option<ContentPost>> {
        let row = sqlx::query("SELECT * FROM content_posts WHERE post_id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        row.as_ref().map(post_from_row).transpose()
    }

    async fn insert_post_if_absent(&self, post: &ContentPost) -> Result<bool> {
        let raw = post
            .raw_ai_response
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let result = sqlx::query(
            "INSERT INTO content_posts
                (post_id, feed_source_id, title, url, content, published_at,
                 analyzed, needs_review, is_notified, raw_ai_response, processing_error)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (post_id) DO NOTHING",
        )
        .bind(&post.post_id)
        .bind(&post.feed_source_id)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.content)
        .bind(post.published_at)
        .bind(post.analyzed)
        .bind(post.needs_review)
        .bind(post.is_notified)
        .bind(raw)
        .bind(&post.processing_error)
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_post_analyzed(
        &self,
        post_id: &str,
        needs_review: bool,
        raw: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Result<()> {
        let raw = raw.as_ref().map(serde_json::to_string).transpose()?;
        sqlx::query(
            "UPDATE content_posts SET analyzed = TRUE, needs_review = $2,
                raw_ai_response = $3, processing_error = $4
             WHERE post_id = $1",
        )
        .bind(post_id)
        .bind(needs_review)
        .bind(raw)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        Ok(())
    }

    async fn mark_post_notified(&self, post_id: &str) -> Result<()> {
        sqlx::query("UPDATE content_posts SET is_notified = TRUE WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        Ok(())
    }

    async fn posts_needing_review(&self, limit: usize) -> Result<Vec<ContentPost>> {
        let rows = sqlx::query(
            "SELECT * FROM content_posts WHERE analyzed AND needs_review
             ORDER BY published_at DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        rows.iter().map(post_from_row).collect()
    }
}

#[async_trait]
impl RegistryStore for PostgresStore {
    async fn create_author(&self, author: &ModAuthor) -> Result<()> {
        sqlx::query(
            "INSERT INTO mod_authors (id, name, slug, patreon_url, feed_source_id)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(author.id)
        .bind(&author.name)
        .bind(&author.slug)
        .bind(&author.patreon_url)
        .bind(&author.feed_source_id)
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        Ok(())
    }

    async fn list_authors(&self) -> Result<Vec<ModAuthor>> {
        let rows = sqlx::query("SELECT * FROM mod_authors ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        rows.iter()
            .map(|r| author_from_row(r).map_err(PipelineError::storage))
            .collect()
    }

    async fn get_author(&self, id: Uuid) -> Result<Option<ModAuthor>> {
        let row = sqlx::query("SELECT * FROM mod_authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        row.as_ref()
            .map(|r| author_from_row(r).map_err(PipelineError::storage))
            .transpose()
    }

    async fn author_for_feed(&self, source_id: &str) -> Result<Option<ModAuthor>> {
        let row = sqlx::query("SELECT * FROM mod_authors WHERE feed_source_id = $1")
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        row.as_ref()
            .map(|r| author_from_row(r).map_err(PipelineError::storage))
            .transpose()
    }

    async fn link_author_feed(&self, author_id: Uuid, source_id: &str) -> Result<()> {
        sqlx::query("UPDATE mod_authors SET feed_source_id = $2 WHERE id = $1")
            .bind(author_id)
            .bind(source_id)
            .execute(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        Ok(())
    }

    async fn insert_mod(&self, mod_record: &Mod) -> Result<()> {
        self.write_mod(mod_record).await
    }

    async fn update_mod(&self, mod_record: &Mod) -> Result<()> {
        self.write_mod(mod_record).await
    }

    async fn get_mod(&self, id: Uuid) -> Result<Option<Mod>> {
        let row = sqlx::query("SELECT * FROM mods WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        row.as_ref()
            .map(|r| mod_from_row(r).map_err(PipelineError::storage))
            .transpose()
    }

    async fn find_mod(&self, author_id: Option<Uuid>, identifier: &str) -> Result<Option<Mod>> {
        if let Ok(id) = identifier.parse::<Uuid>() {
            return self.get_mod(id).await;
        }

        let normalized = normalize_mod_name(identifier);
        let pattern = format!("%{}%", identifier.to_lowercase());
        let row = sqlx::query(
            "SELECT * FROM mods
             WHERE is_active
               AND ($1::uuid IS NULL OR author_id = $1)
               AND (normalized_name = $2 OR LOWER(primary_name) LIKE $3)
             ORDER BY (normalized_name = $2) DESC
             LIMIT 1",
        )
        .bind(author_id)
        .bind(&normalized)
        .bind(&pattern)
        .fetch_optional(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        row.as_ref()
            .map(|r| mod_from_row(r).map_err(PipelineError::storage))
            .transpose()
    }

    async fn mods_for_author(&self, author_id: Uuid) -> Result<Vec<Mod>> {
        let rows = sqlx::query(
            "SELECT * FROM mods WHERE author_id = $1 AND is_active ORDER BY primary_name",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        rows.iter()
            .map(|r| mod_from_row(r).map_err(PipelineError::storage))
            .collect()
    }

    async fn registry_for_author(&self, author_id: Uuid) -> Result<Vec<RegistryEntry>> {
        let mods = self.mods_for_author(author_id).await?;
        let mut entries = Vec::with_capacity(mods.len());
        for mod_record in mods {
            let aliases = self.aliases_for_mod(mod_record.id).await?;
            entries.push(RegistryEntry {
                mod_record,
                aliases,
            });
        }
        Ok(entries)
    }

    async fn add_alias(&self, alias: &ModAlias) -> Result<()> {
        sqlx::query(
            "INSERT INTO mod_aliases (id, mod_id, name, normalized) VALUES ($1, $2, $3, $4)",
        )
        .bind(alias.id)
        .bind(alias.mod_id)
        .bind(&alias.name)
        .bind(&alias.normalized)
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        Ok(())
    }

    async fn aliases_for_mod(&self, mod_id: Uuid) -> Result<Vec<ModAlias>> {
        let rows = sqlx::query("SELECT * FROM mod_aliases WHERE mod_id = $1")
            .bind(mod_id)
            .fetch_all(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        rows.iter()
            .map(|r| alias_from_row(r).map_err(PipelineError::storage))
            .collect()
    }
}

impl PostgresStore {
    async fn write_mod(&self, mod_record: &Mod) -> Result<()> {
        sqlx::query(
            "INSERT INTO mods
                (id, author_id, primary_name, normalized_name, curseforge_url,
                 translated_version, translated_version_normalized, translation_date,
                 latest_version, latest_version_normalized, latest_version_date,
                 is_up_to_date, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT (id) DO UPDATE SET
                primary_name = EXCLUDED.primary_name,
                normalized_name = EXCLUDED.normalized_name,
                curseforge_url = EXCLUDED.curseforge_url,
                translated_version = EXCLUDED.translated_version,
                translated_version_normalized = EXCLUDED.translated_version_normalized,
                translation_date = EXCLUDED.translation_date,
                latest_version = EXCLUDED.latest_version,
                latest_version_normalized = EXCLUDED.latest_version_normalized,
                latest_version_date = EXCLUDED.latest_version_date,
                is_up_to_date = EXCLUDED.is_up_to_date,
                is_active = EXCLUDED.is_active",
        )
        .bind(mod_record.id)
        .bind(mod_record.author_id)
        .bind(&mod_record.primary_name)
        .bind(&mod_record.normalized_name)
        .bind(&mod_record.curseforge_url)
        .bind(&mod_record.translated_version)
        .bind(&mod_record.translated_version_normalized)
        .bind(mod_record.translation_date)
        .bind(&mod_record.latest_version)
        .bind(&mod_record.latest_version_normalized)
        .bind(mod_record.latest_version_date)
        .bind(mod_record.is_up_to_date)
        .bind(mod_record.is_active)
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        Ok(())
    }

    async fn write_appearance(&self, appearance: &ModAppearance) -> Result<()> {
        sqlx::query(
            "INSERT INTO mod_appearances
                (id, post_id, mod_id, detected_name, normalized_name,
                 detected_version, normalized_version, is_update, is_new_mod,
                 needs_update, download_url, confidence, suggested_mod_id,
                 suggested_mod_name, verified, needs_review, message_id,
                 thread_id, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                     $14, $15, $16, $17, $18, $19)
             ON CONFLICT (id) DO UPDATE SET
                mod_id = EXCLUDED.mod_id,
                needs_update = EXCLUDED.needs_update,
                confidence = EXCLUDED.confidence,
                suggested_mod_id = EXCLUDED.suggested_mod_id,
                suggested_mod_name = EXCLUDED.suggested_mod_name,
                verified = EXCLUDED.verified,
                needs_review = EXCLUDED.needs_review,
                message_id = EXCLUDED.message_id,
                thread_id = EXCLUDED.thread_id",
        )
        .bind(appearance.id)
        .bind(&appearance.post_id)
        .bind(appearance.mod_id)
        .bind(&appearance.detected_name)
        .bind(&appearance.normalized_name)
        .bind(&appearance.detected_version)
        .bind(&appearance.normalized_version)
        .bind(appearance.is_update)
        .bind(appearance.is_new_mod)
        .bind(appearance.needs_update)
        .bind(&appearance.download_url)
        .bind(appearance.confidence)
        .bind(appearance.suggested_mod_id)
        .bind(&appearance.suggested_mod_name)
        .bind(appearance.verified)
        .bind(appearance.needs_review)
        .bind(&appearance.message_id)
        .bind(&appearance.thread_id)
        .bind(appearance.expires_at)
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        Ok(())
    }
}

#[async_trait]
impl AppearanceStore for PostgresStore {
    async fn insert_appearance(&self, appearance: &ModAppearance) -> Result<()> {
        self.write_appearance(appearance).await
    }

    async fn get_appearance(&self, id: Uuid) -> Result<Option<ModAppearance>> {
        let row = sqlx::query("SELECT * FROM mod_appearances WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PipelineError::storage)?;
        row.as_ref()
            .map(|r| appearance_from_row(r).map_err(PipelineError::storage))
            .transpose()
    }

    async fn update_appearance(&self, appearance: &ModAppearance) -> Result<()> {
        self.write_appearance(appearance).await
    }

    async fn claim_for_review(&self, id: Uuid) -> Result<Option<ModAppearance>> {
        // The WHERE clause makes the claim atomic: a concurrent duplicate
        // sees needs_review already FALSE and gets no row back.
        let row = sqlx::query(
            "UPDATE mod_appearances SET needs_review = FALSE
             WHERE id = $1 AND needs_review = TRUE
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(PipelineError::storage)?;

        row.as_ref()
            .map(|r| {
                appearance_from_row(r)
                    .map(|mut a| {
                        // Restore the pre-claim flag in the returned copy.
                        a.needs_review = true;
                        a
                    })
                    .map_err(PipelineError::storage)
            })
            .transpose()
    }

    async fn appearances_for_post(&self, post_id: &str) -> Result<Vec<ModAppearance>> {
        let rows = sqlx::query(
            "SELECT * FROM mod_appearances WHERE post_id = $1 ORDER BY detected_name",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        rows.iter()
            .map(|r| appearance_from_row(r).map_err(PipelineError::storage))
            .collect()
    }

    async fn pending_for_post(&self, post_id: &str) -> Result<Vec<ModAppearance>> {
        let rows = sqlx::query(
            "SELECT * FROM mod_appearances
             WHERE post_id = $1 AND needs_review ORDER BY detected_name",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        rows.iter()
            .map(|r| appearance_from_row(r).map_err(PipelineError::storage))
            .collect()
    }

    async fn pending_for_message(&self, message_id: &str) -> Result<Vec<ModAppearance>> {
        let rows = sqlx::query(
            "SELECT * FROM mod_appearances
             WHERE message_id = $1 AND needs_review ORDER BY detected_name",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        rows.iter()
            .map(|r| appearance_from_row(r).map_err(PipelineError::storage))
            .collect()
    }

    async fn set_message_handles(
        &self,
        post_id: &str,
        message_id: &str,
        thread_id: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE mod_appearances SET message_id = $2, thread_id = $3 WHERE post_id = $1",
        )
        .bind(post_id)
        .bind(message_id)
        .bind(thread_id)
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for PostgresStore {
    async fn latest_snapshot(&self, feed_source_id: &str) -> Result<Option<SheetSnapshot>> {
        let row = sqlx::query(
            "SELECT * FROM sheet_snapshots WHERE feed_source_id = $1
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(feed_source_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(PipelineError::storage)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let entries: String = row.try_get("entries").map_err(PipelineError::storage)?;
        Ok(Some(SheetSnapshot {
            id: row.try_get("id").map_err(PipelineError::storage)?,
            feed_source_id: row
                .try_get("feed_source_id")
                .map_err(PipelineError::storage)?,
            entries: serde_json::from_str(&entries)?,
            created_at: row.try_get("created_at").map_err(PipelineError::storage)?,
        }))
    }

    async fn insert_snapshot(&self, snapshot: &SheetSnapshot) -> Result<()> {
        let entries = serde_json::to_string(&snapshot.entries)?;
        sqlx::query(
            "INSERT INTO sheet_snapshots (id, feed_source_id, entries, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(snapshot.id)
        .bind(&snapshot.feed_source_id)
        .bind(entries)
        .bind(snapshot.created_at)
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        Ok(())
    }
}

#[async_trait]
impl AuditStore for PostgresStore {
    async fn append_history(&self, entry: &ModLinkHistory) -> Result<()> {
        let metadata = entry
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        sqlx::query(
            "INSERT INTO mod_link_history
                (id, mod_id, appearance_id, action, actor, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(entry.mod_id)
        .bind(entry.appearance_id)
        .bind(action_to_str(entry.action))
        .bind(&entry.actor)
        .bind(metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        Ok(())
    }

    async fn history_for_mod(&self, mod_id: Uuid) -> Result<Vec<ModLinkHistory>> {
        let rows = sqlx::query(
            "SELECT * FROM mod_link_history WHERE mod_id = $1 ORDER BY created_at",
        )
        .bind(mod_id)
        .fetch_all(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        rows.iter().map(history_from_row).collect()
    }

    async fn history_for_appearance(&self, appearance_id: Uuid) -> Result<Vec<ModLinkHistory>> {
        let rows = sqlx::query(
            "SELECT * FROM mod_link_history WHERE appearance_id = $1 ORDER BY created_at",
        )
        .bind(appearance_id)
        .fetch_all(&self.pool)
        .await
        .map_err(PipelineError::storage)?;
        rows.iter().map(history_from_row).collect()
    }
}
