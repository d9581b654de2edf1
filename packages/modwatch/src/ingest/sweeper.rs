//! The sweep scheduler.
//!
//! One sweep walks every active, due feed in sequence: post feeds are pulled,
//! filtered to the lookback window, ingested idempotently, analyzed, and
//! notified; sheet feeds are diffed against their latest snapshot. A feed's
//! `last_checked_at` advances after every attempt, success or failure, so a
//! persistently broken feed cannot pin the sweep to itself.
//!
//! At most one sweep runs at a time. The guard is a compare-and-swap on an
//! `AtomicBool` owned by the sweeper, released when the sweep ends however it
//! ends; an overlapping tick observes the swap failing and is dropped with a
//! log line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::detect::ModDetector;
use crate::error::{PipelineError, Result};
use crate::ingest::sheets::{build_row_map, detect_changes, DEFAULT_SHEET_RANGE};
use crate::review::render::ReviewNotifier;
use crate::traits::{
    ai::PostAnalyzer,
    feed::{PostSource, SheetSource},
    notify::NotificationGateway,
    store::PipelineStore,
};
use crate::types::{
    config::SweepConfig,
    feed::{ContentFeed, FeedPlatform},
    message::{MessageBody, MessageField, RenderableMessage},
    post::ContentPost,
    sheet::SheetSnapshot,
};

/// Tally of one completed sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Feeds actually checked this sweep.
    pub feeds_checked: usize,
    /// Active feeds skipped because their interval had not elapsed.
    pub feeds_skipped: usize,
    /// Posts newly ingested across all checked feeds.
    pub new_posts: usize,
    /// Sheet rows added or version-changed across all checked feeds.
    pub sheet_changes: usize,
    /// Per-feed failure descriptions; the sweep continued past each.
    pub failures: Vec<String>,
}

/// Releases the sweep guard when the sweep ends, on every path.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Polls feeds on a schedule and drives ingestion, analysis, and
/// notification for what they yield.
pub struct FeedSweeper<S, A, P, H, G> {
    store: Arc<S>,
    posts: P,
    sheets: H,
    gateway: Arc<G>,
    detector: ModDetector<S, A>,
    notifier: ReviewNotifier<S, G>,
    config: SweepConfig,
    running: AtomicBool,
}

impl<S, A, P, H, G> FeedSweeper<S, A, P, H, G>
where
    S: PipelineStore,
    A: PostAnalyzer,
    P: PostSource,
    H: SheetSource,
    G: NotificationGateway,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<S>,
        analyzer: Arc<A>,
        posts: P,
        sheets: H,
        gateway: Arc<G>,
        review_channel_id: Option<String>,
        config: SweepConfig,
    ) -> Self {
        let detector = ModDetector::new(Arc::clone(&store), analyzer);
        let notifier = ReviewNotifier::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            review_channel_id,
        );
        Self {
            store,
            posts,
            sheets,
            gateway,
            detector,
            notifier,
            config,
            running: AtomicBool::new(false),
        }
    }

    /// Run sweeps on the configured tick until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            tick_secs = self.config.tick_interval.as_secs(),
            "feed sweeper started"
        );
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("feed sweeper stopping");
                    return;
                }
                _ = interval.tick() => {
                    match self.try_sweep().await {
                        Ok(Some(outcome)) => {
                            debug!(
                                checked = outcome.feeds_checked,
                                skipped = outcome.feeds_skipped,
                                new_posts = outcome.new_posts,
                                sheet_changes = outcome.sheet_changes,
                                failures = outcome.failures.len(),
                                "sweep finished"
                            );
                        }
                        Ok(None) => {}
                        Err(err) => error!(%err, "sweep failed"),
                    }
                }
            }
        }
    }

    /// Run one sweep unless another is already in flight.
    ///
    /// Returns `Ok(None)` when the tick was dropped because a sweep is still
    /// running.
    pub async fn try_sweep(&self) -> Result<Option<SweepOutcome>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("sweep already running, dropping tick");
            return Ok(None);
        }
        let _guard = SweepGuard(&self.running);

        self.sweep_feeds().await.map(Some)
    }

    async fn sweep_feeds(&self) -> Result<SweepOutcome> {
        let feeds = self.store.list_active_feeds().await?;
        let mut outcome = SweepOutcome::default();
        let now = Utc::now();

        for (i, feed) in feeds.iter().enumerate() {
            if !feed.is_due(now) {
                outcome.feeds_skipped += 1;
                continue;
            }

            if i > 0 {
                tokio::time::sleep(self.config.feed_delay).await;
            }

            self.check_and_touch(feed, &mut outcome).await;
        }

        Ok(outcome)
    }

    /// Check one feed by source id, regardless of its schedule.
    ///
    /// Manual trigger for operators; bypasses the due check but still
    /// advances `last_checked_at`.
    pub async fn check_single(&self, source_id: &str) -> Result<SweepOutcome> {
        let feed = self
            .store
            .get_feed(source_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("feed", source_id))?;

        let mut outcome = SweepOutcome::default();
        self.check_and_touch(&feed, &mut outcome).await;
        Ok(outcome)
    }

    /// Check a feed and unconditionally advance its `last_checked_at`.
    ///
    /// Errors from the check are recorded in the outcome, not propagated;
    /// one broken feed must not stall the others.
    async fn check_and_touch(&self, feed: &ContentFeed, outcome: &mut SweepOutcome) {
        outcome.feeds_checked += 1;

        let result = match feed.platform {
            FeedPlatform::GoogleSheets => self
                .check_sheet_feed(feed)
                .await
                .map(|changes| outcome.sheet_changes += changes),
            _ => self
                .check_post_feed(feed)
                .await
                .map(|new_posts| outcome.new_posts += new_posts),
        };
        if let Err(err) = result {
            warn!(source_id = %feed.source_id, %err, "feed check failed");
            outcome
                .failures
                .push(format!("{}: {err}", feed.source_id));
        }

        if let Err(err) = self.store.touch_feed(&feed.source_id, Utc::now()).await {
            error!(source_id = %feed.source_id, %err, "failed to advance last_checked_at");
            outcome
                .failures
                .push(format!("{}: touch failed: {err}", feed.source_id));
        }
    }

    /// Pull a post feed, ingest what is new, and run detection on it.
    ///
    /// Returns how many posts were newly ingested.
    async fn check_post_feed(&self, feed: &ContentFeed) -> Result<usize> {
        let items = self.posts.fetch_recent(&feed.source_id).await?;
        let cutoff = Utc::now() - ChronoDuration::days(self.config.lookback_days);

        let mut new_posts = Vec::new();
        for item in items {
            if item.published_at < cutoff {
                continue;
            }
            let post = ContentPost::from_item(&item, feed.source_id.as_str());
            if self.store.insert_post_if_absent(&post).await? {
                new_posts.push(post);
            }
        }

        if new_posts.is_empty() {
            debug!(source_id = %feed.source_id, "no new posts");
            return Ok(0);
        }
        info!(
            source_id = %feed.source_id,
            count = new_posts.len(),
            "ingested new posts"
        );

        for (i, post) in new_posts.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.item_delay).await;
            }
            // Per-post boundary: one bad post must not drop its siblings.
            if let Err(err) = self.process_new_post(feed, post).await {
                error!(post_id = %post.post_id, %err, "post processing failed");
            }
        }

        Ok(new_posts.len())
    }

    async fn process_new_post(&self, feed: &ContentFeed, post: &ContentPost) -> Result<()> {
        self.detector.analyze_post(post).await?;
        self.notifier.notify_detections(&post.post_id).await?;

        let announcement = render_new_post(feed, post);
        match self
            .gateway
            .send(&feed.notification_channel_id, announcement)
            .await
        {
            Ok(_) => self.store.mark_post_notified(&post.post_id).await?,
            Err(err) => {
                warn!(post_id = %post.post_id, %err, "new-post notification failed");
            }
        }
        Ok(())
    }

    /// Diff a sheet feed against its latest snapshot.
    ///
    /// Returns how many rows were added or version-changed. The drive
    /// modified-time probe short-circuits an unchanged sheet; when the probe
    /// is unavailable the full fetch-and-diff runs anyway.
    async fn check_sheet_feed(&self, feed: &ContentFeed) -> Result<usize> {
        if let (Some(modified), Some(last)) = (
            self.sheets.last_modified(&feed.source_id).await?,
            feed.last_checked_at,
        ) {
            if modified <= last {
                debug!(source_id = %feed.source_id, "sheet unchanged since last check");
                return Ok(0);
            }
        }

        let range = feed.sheet_range.as_deref().unwrap_or(DEFAULT_SHEET_RANGE);
        let rows = self.sheets.fetch_rows(&feed.source_id, range).await?;

        let baseline = self
            .store
            .latest_snapshot(&feed.source_id)
            .await?
            .map(|s| s.entries)
            .unwrap_or_default();

        let changes = detect_changes(&rows, &baseline);
        if changes.is_empty() {
            debug!(source_id = %feed.source_id, "sheet has no row changes");
            return Ok(0);
        }

        for change in &changes {
            info!(
                source_id = %feed.source_id,
                mod_name = %change.mod_name,
                old = change.old_version.as_deref().unwrap_or("-"),
                new = %change.new_version,
                "sheet row changed"
            );
        }

        self.store
            .insert_snapshot(&SheetSnapshot::new(
                feed.source_id.clone(),
                build_row_map(&rows),
            ))
            .await?;

        Ok(changes.len())
    }
}

fn render_new_post(feed: &ContentFeed, post: &ContentPost) -> RenderableMessage {
    RenderableMessage::WithFields {
        body: MessageBody::new(format!("📬 New post from {}", feed.creator_name))
            .with_url(post.url.clone())
            .with_field(MessageField::new(
                "Post",
                format!("[{}]({})", post.title, post.url),
            ))
            .with_field(
                MessageField::new(
                    "Published",
                    post.published_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                )
                .inline(),
            ),
    }
}
