//! Applying operator review decisions.
//!
//! Every decision path starts by atomically claiming the appearance
//! ([`AppearanceStore::claim_for_review`]), so a double-submitted click
//! resolves to exactly one applied decision and one audit row. Registry
//! mutations commit before any notification refresh; a refresh failure is
//! logged and never rolls state back.
//!
//! [`AppearanceStore::claim_for_review`]: crate::traits::store::AppearanceStore::claim_for_review

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::review::render::ReviewNotifier;
use crate::traits::{notify::NotificationGateway, store::PipelineStore};
use crate::types::{
    appearance::{AuditAction, ModAppearance, ModLinkHistory},
    registry::Mod,
};

/// A terminal operator decision on one appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Accept the resolved link and promote the detected version.
    Confirm,
    /// Attach the appearance to an existing mod named by the operator.
    Link { target: String },
    /// Register a brand-new mod from this detection.
    Create {
        name: String,
        source_url: Option<String>,
    },
    /// Discard the detection without touching the registry.
    Ignore,
}

/// Decision over every pending appearance of one review message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkDecision {
    /// Confirm each pending appearance that already has a resolved link.
    ConfirmLinked,
    /// Ignore everything still pending.
    IgnoreAll,
}

/// What applying a decision did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    Applied,
    /// The appearance does not exist.
    NotFound,
    /// Another submission already decided this appearance.
    AlreadyReviewed,
    /// Confirm on an appearance with no resolved mod; left pending.
    NoLinkedMod,
    /// Link target did not resolve to a registry mod; left pending.
    TargetNotFound(String),
    /// Create requires the post's feed to be linked to an author; left
    /// pending.
    NoAuthor,
}

/// Applies review decisions against the store and refreshes the surface.
pub struct ReviewWorkflow<S, G> {
    store: Arc<S>,
    notifier: ReviewNotifier<S, G>,
}

impl<S, G> ReviewWorkflow<S, G>
where
    S: PipelineStore,
    G: NotificationGateway,
{
    pub fn new(store: Arc<S>, notifier: ReviewNotifier<S, G>) -> Self {
        Self { store, notifier }
    }

    /// Apply one decision to one appearance.
    pub async fn apply(
        &self,
        appearance_id: Uuid,
        actor: &str,
        decision: ReviewDecision,
    ) -> Result<DecisionOutcome> {
        let (outcome, message_id) = self.apply_claimed(appearance_id, actor, decision).await?;
        if outcome == DecisionOutcome::Applied {
            self.refresh(message_id.as_deref()).await;
        }
        Ok(outcome)
    }

    /// Apply a bulk decision to every appearance still pending on a message.
    ///
    /// Returns how many decisions were applied. The surface is refreshed once
    /// at the end rather than per appearance.
    pub async fn apply_bulk(
        &self,
        message_id: &str,
        actor: &str,
        decision: BulkDecision,
    ) -> Result<usize> {
        let pending = self.store.pending_for_message(message_id).await?;
        let mut applied = 0;

        for appearance in pending {
            let single = match decision {
                BulkDecision::ConfirmLinked => {
                    if appearance.mod_id.is_none() {
                        continue;
                    }
                    ReviewDecision::Confirm
                }
                BulkDecision::IgnoreAll => ReviewDecision::Ignore,
            };
            let (outcome, _) = self.apply_claimed(appearance.id, actor, single).await?;
            if outcome == DecisionOutcome::Applied {
                applied += 1;
            }
        }

        if applied > 0 {
            self.refresh(Some(message_id)).await;
        }
        Ok(applied)
    }

    /// Claim the appearance and run the decision; no notification refresh.
    ///
    /// Returns the outcome plus the message id the appearance was rendered
    /// into, for the caller's refresh.
    async fn apply_claimed(
        &self,
        appearance_id: Uuid,
        actor: &str,
        decision: ReviewDecision,
    ) -> Result<(DecisionOutcome, Option<String>)> {
        let Some(claimed) = self.store.claim_for_review(appearance_id).await? else {
            let outcome = if self.store.get_appearance(appearance_id).await?.is_some() {
                DecisionOutcome::AlreadyReviewed
            } else {
                DecisionOutcome::NotFound
            };
            return Ok((outcome, None));
        };

        let mut appearance = claimed;
        appearance.needs_review = false;
        let message_id = appearance.message_id.clone();

        let outcome = match decision {
            ReviewDecision::Confirm => self.confirm(&mut appearance, actor).await?,
            ReviewDecision::Link { target } => self.link(&mut appearance, actor, &target).await?,
            ReviewDecision::Create { name, source_url } => {
                self.create(&mut appearance, actor, name, source_url).await?
            }
            ReviewDecision::Ignore => {
                appearance.verified = false;
                self.store.update_appearance(&appearance).await?;
                info!(appearance_id = %appearance.id, actor, "detection ignored");
                DecisionOutcome::Applied
            }
        };

        if outcome != DecisionOutcome::Applied {
            // Precondition failed after the claim: put the appearance back
            // in the pending pool so the operator can retry differently.
            appearance.needs_review = true;
            self.store.update_appearance(&appearance).await?;
        }
        Ok((outcome, message_id))
    }

    async fn confirm(&self, appearance: &mut ModAppearance, actor: &str) -> Result<DecisionOutcome> {
        let Some(mod_id) = appearance.mod_id else {
            return Ok(DecisionOutcome::NoLinkedMod);
        };
        let Some(mut mod_record) = self.store.get_mod(mod_id).await? else {
            return Ok(DecisionOutcome::NoLinkedMod);
        };

        appearance.verified = true;
        self.store.update_appearance(appearance).await?;

        // Promote the detected version to the mod's latest when it moved.
        if mod_record.latest_version_normalized.as_deref()
            != Some(appearance.normalized_version.as_str())
        {
            let published_at = self
                .store
                .get_post(&appearance.post_id)
                .await?
                .map(|p| p.published_at)
                .unwrap_or_else(Utc::now);

            mod_record.latest_version = appearance.detected_version.clone();
            mod_record.latest_version_normalized = Some(appearance.normalized_version.clone());
            mod_record.latest_version_date = Some(published_at);
            mod_record.is_up_to_date = false;
            self.store.update_mod(&mod_record).await?;
        }

        self.store
            .append_history(
                &ModLinkHistory::new(mod_id, appearance.id, AuditAction::Verified, actor)
                    .with_metadata(json!({
                        "detectedVersion": appearance.detected_version,
                    })),
            )
            .await?;

        info!(appearance_id = %appearance.id, %mod_id, actor, "detection confirmed");
        Ok(DecisionOutcome::Applied)
    }

    async fn link(
        &self,
        appearance: &mut ModAppearance,
        actor: &str,
        target: &str,
    ) -> Result<DecisionOutcome> {
        // Scope the lookup to the post's author when the feed has one.
        let author_id = match self.store.get_post(&appearance.post_id).await? {
            Some(post) => self
                .store
                .author_for_feed(&post.feed_source_id)
                .await?
                .map(|a| a.id),
            None => None,
        };

        let Some(mod_record) = self.store.find_mod(author_id, target).await? else {
            return Ok(DecisionOutcome::TargetNotFound(target.to_string()));
        };

        appearance.mod_id = Some(mod_record.id);
        appearance.verified = true;
        self.store.update_appearance(appearance).await?;

        self.store
            .append_history(
                &ModLinkHistory::new(mod_record.id, appearance.id, AuditAction::Linked, actor)
                    .with_metadata(json!({
                        "detectedName": appearance.detected_name,
                        "linkedTo": mod_record.primary_name,
                    })),
            )
            .await?;

        info!(
            appearance_id = %appearance.id,
            mod_id = %mod_record.id,
            actor,
            "detection linked"
        );
        Ok(DecisionOutcome::Applied)
    }

    async fn create(
        &self,
        appearance: &mut ModAppearance,
        actor: &str,
        name: String,
        source_url: Option<String>,
    ) -> Result<DecisionOutcome> {
        let Some(post) = self.store.get_post(&appearance.post_id).await? else {
            return Ok(DecisionOutcome::NoAuthor);
        };
        let Some(author) = self.store.author_for_feed(&post.feed_source_id).await? else {
            return Ok(DecisionOutcome::NoAuthor);
        };

        let mut mod_record = Mod::new(author.id, name).with_latest_version(
            appearance.detected_version.clone(),
            appearance.normalized_version.clone(),
            post.published_at,
        );
        if let Some(url) = source_url {
            mod_record = mod_record.with_curseforge_url(url);
        }
        self.store.insert_mod(&mod_record).await?;

        appearance.mod_id = Some(mod_record.id);
        appearance.verified = true;
        self.store.update_appearance(appearance).await?;

        self.store
            .append_history(
                &ModLinkHistory::new(mod_record.id, appearance.id, AuditAction::Created, actor)
                    .with_metadata(json!({
                        "name": mod_record.primary_name,
                        "detectedVersion": appearance.detected_version,
                    })),
            )
            .await?;

        info!(
            appearance_id = %appearance.id,
            mod_id = %mod_record.id,
            actor,
            "mod created from detection"
        );
        Ok(DecisionOutcome::Applied)
    }

    async fn refresh(&self, message_id: Option<&str>) {
        let Some(message_id) = message_id else {
            return;
        };
        if let Err(err) = self.notifier.refresh_message(message_id).await {
            warn!(message_id, %err, "review message refresh failed");
        }
    }
}
