//! Per-post mod detection: keyword gate, extraction, registry matching,
//! appearance creation.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, error, info};

use crate::ai::has_mod_keywords;
use crate::error::Result;
use crate::matching::{engine, normalize_mod_name, normalize_version};
use crate::traits::{ai::PostAnalyzer, store::PipelineStore};
use crate::types::{
    appearance::ModAppearance,
    post::ContentPost,
    registry::RegistryEntry,
};

/// Runs the detection flow for one ingested post.
pub struct ModDetector<S, A> {
    store: Arc<S>,
    analyzer: Arc<A>,
}

impl<S, A> ModDetector<S, A>
where
    S: PipelineStore,
    A: PostAnalyzer,
{
    pub fn new(store: Arc<S>, analyzer: Arc<A>) -> Self {
        Self { store, analyzer }
    }

    /// Analyze a post and persist its detections.
    ///
    /// Failures are captured at this unit's boundary: the post is marked
    /// analyzed with the error recorded and flagged for review, and the
    /// error does not propagate to the sweep over sibling posts.
    pub async fn analyze_post(&self, post: &ContentPost) -> Result<()> {
        if let Err(err) = self.analyze_post_inner(post).await {
            error!(post_id = %post.post_id, %err, "post analysis failed");
            self.store
                .mark_post_analyzed(&post.post_id, true, None, Some(err.to_string()))
                .await?;
        }
        Ok(())
    }

    async fn analyze_post_inner(&self, post: &ContentPost) -> Result<()> {
        if !has_mod_keywords(&post.title, &post.content) {
            debug!(post_id = %post.post_id, "no mod keywords, skipping extraction");
            self.store
                .mark_post_analyzed(&post.post_id, false, None, None)
                .await?;
            return Ok(());
        }

        let registry = match self.store.author_for_feed(&post.feed_source_id).await? {
            Some(author) => self.store.registry_for_author(author.id).await?,
            None => Vec::new(),
        };
        let known_names: Vec<String> = registry
            .iter()
            .map(|e| e.mod_record.primary_name.clone())
            .collect();

        let analysis = self
            .analyzer
            .analyze(&post.title, &post.content, &known_names)
            .await;

        if analysis.mods.is_empty() {
            self.store
                .mark_post_analyzed(&post.post_id, false, analysis.raw, None)
                .await?;
            return Ok(());
        }

        // Appearances of one post have no ordering dependency; persist them
        // concurrently.
        let inserts = analysis
            .mods
            .iter()
            .map(|detected| {
                let appearance = self.build_appearance(post, detected, &registry);
                let store = Arc::clone(&self.store);
                async move { store.insert_appearance(&appearance).await }
            })
            .collect::<Vec<_>>();
        try_join_all(inserts).await?;

        let needs_review = analysis.mods.iter().any(|m| !m.is_update && m.is_new_mod);
        self.store
            .mark_post_analyzed(&post.post_id, needs_review, analysis.raw, None)
            .await?;

        info!(
            post_id = %post.post_id,
            mods = analysis.mods.len(),
            "post analyzed"
        );
        Ok(())
    }

    fn build_appearance(
        &self,
        post: &ContentPost,
        detected: &crate::traits::ai::DetectedMod,
        registry: &[RegistryEntry],
    ) -> ModAppearance {
        let normalized_name = normalize_mod_name(&detected.name);
        let normalized_version =
            normalize_version(detected.version.as_deref(), post.published_at);

        let outcome = engine::find_match(&normalized_name, registry);

        let mut appearance = ModAppearance::new(post.post_id.as_str(), detected.name.as_str());
        appearance.normalized_name = normalized_name;
        appearance.detected_version = detected.version.clone();
        appearance.normalized_version = normalized_version;
        appearance.is_update = detected.is_update;
        appearance.is_new_mod = detected.is_new_mod;
        appearance.needs_update = outcome.mod_id.is_some_and(|mod_id| {
            registry
                .iter()
                .find(|e| e.mod_record.id == mod_id)
                .is_some_and(|e| {
                    engine::needs_update(
                        &e.mod_record,
                        &appearance.normalized_version,
                        post.published_at,
                    )
                })
        });
        appearance.download_url = detected.download_url.clone();
        appearance.confidence = outcome.confidence;
        appearance.mod_id = outcome.mod_id;
        appearance.suggested_mod_id = outcome.suggested_mod_id;
        appearance.suggested_mod_name = outcome.suggested_mod_name;
        appearance.verified = outcome.confidence >= 0.95;
        appearance.needs_review = outcome.confidence < 0.95 || outcome.mod_id.is_none();
        appearance
    }
}
