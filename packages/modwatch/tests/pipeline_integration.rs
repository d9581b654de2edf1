//! End-to-end pipeline tests over the in-memory store and mock collaborators.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use modwatch::testing::{MockAnalyzer, MockGateway, MockPostSource, MockSheetSource};
use modwatch::traits::ai::{AnalysisOutcome, DetectedMod};
use modwatch::traits::store::{
    AppearanceStore, AuditStore, PostStore, RegistryStore, SnapshotStore,
};
use modwatch::types::appearance::{AuditAction, ModAppearance};
use modwatch::types::feed::FeedPlatform;
use modwatch::types::message::RenderableMessage;
use modwatch::types::post::{ContentPost, FeedItem};
use modwatch::types::registry::Mod;
use modwatch::types::sheet::SheetRow;
use modwatch::{
    BulkDecision, DecisionOutcome, FeedSweeper, MemoryStore, RegistryService, ReviewDecision,
    ReviewNotifier, ReviewWorkflow, SweepConfig,
};

const REVIEW_CHANNEL: &str = "review-chan";
const FEED_CHANNEL: &str = "feed-chan";

struct Pipeline {
    store: Arc<MemoryStore>,
    analyzer: Arc<MockAnalyzer>,
    gateway: Arc<MockGateway>,
    posts: Arc<MockPostSource>,
    sheets: Arc<MockSheetSource>,
    registry: RegistryService<MemoryStore>,
    sweeper: FeedSweeper<
        MemoryStore,
        MockAnalyzer,
        Arc<MockPostSource>,
        Arc<MockSheetSource>,
        MockGateway,
    >,
    workflow: ReviewWorkflow<MemoryStore, MockGateway>,
}

fn pipeline() -> Pipeline {
    let store = Arc::new(MemoryStore::new());
    let analyzer = Arc::new(MockAnalyzer::new());
    let gateway = Arc::new(MockGateway::new());
    let posts = Arc::new(MockPostSource::new());
    let sheets = Arc::new(MockSheetSource::new());

    let sweeper = FeedSweeper::new(
        Arc::clone(&store),
        Arc::clone(&analyzer),
        Arc::clone(&posts),
        Arc::clone(&sheets),
        Arc::clone(&gateway),
        Some(REVIEW_CHANNEL.to_string()),
        SweepConfig::new().with_delays(Duration::ZERO, Duration::ZERO),
    );
    let workflow = ReviewWorkflow::new(
        Arc::clone(&store),
        ReviewNotifier::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            Some(REVIEW_CHANNEL.to_string()),
        ),
    );

    Pipeline {
        registry: RegistryService::new(Arc::clone(&store)),
        store,
        analyzer,
        gateway,
        posts,
        sheets,
        sweeper,
        workflow,
    }
}

fn item(id: &str, title: &str, content: &str) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        title: title.to_string(),
        url: format!("https://example.com/posts/{id}"),
        content: content.to_string(),
        published_at: Utc::now(),
        post_type: Some("text_only".to_string()),
        min_cents_pledged: None,
    }
}

fn detected(name: &str, version: Option<&str>, is_update: bool, is_new_mod: bool) -> DetectedMod {
    DetectedMod {
        name: name.to_string(),
        version: version.map(str::to_string),
        is_update,
        is_new_mod,
        download_url: None,
    }
}

fn extraction(mods: Vec<DetectedMod>) -> AnalysisOutcome {
    AnalysisOutcome {
        confidence: if mods.is_empty() { 0.0 } else { 0.8 },
        mods,
        raw: None,
    }
}

fn sheet_row(name: &str, version: &str) -> SheetRow {
    SheetRow {
        mod_name: name.to_string(),
        version: version.to_string(),
        last_update: String::new(),
        download_url: None,
        status: None,
    }
}

#[tokio::test]
async fn exact_match_sweep_auto_verifies_and_is_idempotent() {
    let p = pipeline();

    let feed = p
        .registry
        .create_feed("camp-1", FeedPlatform::Patreon, "Creator", FEED_CHANNEL, None)
        .await
        .unwrap();
    let author = p.registry.register_author("Creator", None).await.unwrap();
    p.registry
        .link_author_feed(author.id, &feed.source_id)
        .await
        .unwrap();
    let mod_record = p
        .registry
        .create_mod(author.id, "Awesome Mod", None)
        .await
        .unwrap();

    let title = "Awesome Mod Update 1.2";
    p.posts
        .set_items("camp-1", vec![item("p1", title, "New version 1.2 is out")])
        .await;
    p.analyzer
        .script(
            title,
            extraction(vec![detected("Awesome Mod", Some("1.2"), true, false)]),
        )
        .await;

    let outcome = p.sweeper.try_sweep().await.unwrap().unwrap();
    assert_eq!(outcome.feeds_checked, 1);
    assert_eq!(outcome.new_posts, 1);
    assert!(outcome.failures.is_empty());

    let appearances = p.store.appearances_for_post("p1").await.unwrap();
    assert_eq!(appearances.len(), 1);
    let appearance = &appearances[0];
    assert_eq!(appearance.mod_id, Some(mod_record.id));
    assert_eq!(appearance.confidence, 1.0);
    assert_eq!(appearance.normalized_version, "1.2.0");
    assert!(appearance.verified);
    assert!(!appearance.needs_review);

    let post = p.store.get_post("p1").await.unwrap().unwrap();
    assert!(post.analyzed);
    assert!(post.is_notified);

    // Auto-verified detection: announcement only, no review traffic.
    assert_eq!(p.gateway.sent_to(FEED_CHANNEL).await.len(), 1);
    assert!(p.gateway.sent_to(REVIEW_CHANNEL).await.is_empty());

    // Same upstream payload again: nothing new happens.
    let again = p.sweeper.check_single("camp-1").await.unwrap();
    assert_eq!(again.new_posts, 0);
    assert_eq!(p.store.post_count().await, 1);
    assert_eq!(p.store.appearance_count().await, 1);
    assert_eq!(p.analyzer.call_count(), 1);
}

#[tokio::test]
async fn keyword_gate_skips_extraction_entirely() {
    let p = pipeline();
    p.registry
        .create_feed("camp-1", FeedPlatform::Patreon, "Creator", FEED_CHANNEL, None)
        .await
        .unwrap();
    p.posts
        .set_items(
            "camp-1",
            vec![item("p1", "Happy holidays!", "Thanks everyone for a great year")],
        )
        .await;

    p.sweeper.check_single("camp-1").await.unwrap();

    assert_eq!(p.analyzer.call_count(), 0);
    let post = p.store.get_post("p1").await.unwrap().unwrap();
    assert!(post.analyzed);
    assert!(!post.needs_review);
    assert_eq!(p.store.appearance_count().await, 0);
}

#[tokio::test]
async fn stale_posts_outside_the_lookback_window_are_ignored() {
    let p = pipeline();
    p.registry
        .create_feed("camp-1", FeedPlatform::Patreon, "Creator", FEED_CHANNEL, None)
        .await
        .unwrap();

    let mut old = item("p-old", "Mod X Update", "new version");
    old.published_at = Utc::now() - chrono::Duration::days(30);
    p.posts.set_items("camp-1", vec![old]).await;

    let outcome = p.sweeper.check_single("camp-1").await.unwrap();
    assert_eq!(outcome.new_posts, 0);
    assert_eq!(p.store.post_count().await, 0);
}

#[tokio::test]
async fn fuzzy_detection_goes_through_review_and_link() {
    let p = pipeline();
    let feed = p
        .registry
        .create_feed("camp-1", FeedPlatform::Patreon, "Creator", FEED_CHANNEL, None)
        .await
        .unwrap();
    let author = p.registry.register_author("Creator", None).await.unwrap();
    p.registry
        .link_author_feed(author.id, &feed.source_id)
        .await
        .unwrap();
    let mod_record = p
        .registry
        .create_mod(author.id, "Awesome Mod", None)
        .await
        .unwrap();

    let title = "Awsome Mod Update 2.0";
    p.posts
        .set_items("camp-1", vec![item("p1", title, "update is live")])
        .await;
    p.analyzer
        .script(
            title,
            extraction(vec![detected("Awsome Mod", Some("2.0"), true, false)]),
        )
        .await;

    p.sweeper.check_single("camp-1").await.unwrap();

    let pending = p.store.pending_for_post("p1").await.unwrap();
    assert_eq!(pending.len(), 1);
    let appearance = &pending[0];
    assert!(appearance.mod_id.is_none());
    assert_eq!(appearance.suggested_mod_id, Some(mod_record.id));
    assert!(appearance.confidence >= 0.80 && appearance.confidence < 0.95);

    // Single pending detection renders as a button row, confirm disabled
    // because nothing is linked yet.
    let review_messages = p.gateway.sent_to(REVIEW_CHANNEL).await;
    assert_eq!(review_messages.len(), 1);
    let RenderableMessage::WithButtons { buttons, .. } = &review_messages[0].message else {
        panic!("expected button row");
    };
    assert!(buttons[0].disabled);

    let message_id = appearance.message_id.clone().unwrap();
    let outcome = p
        .workflow
        .apply(
            appearance.id,
            "operator",
            ReviewDecision::Link {
                target: "Awesome Mod".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome, DecisionOutcome::Applied);

    let linked = p.store.get_appearance(appearance.id).await.unwrap().unwrap();
    assert_eq!(linked.mod_id, Some(mod_record.id));
    assert!(linked.verified);

    let history = p.store.history_for_appearance(appearance.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, AuditAction::Linked);

    // Last pending detection decided: the message collapses.
    let content = p.gateway.current_content(&message_id).await.unwrap();
    assert!(matches!(content, RenderableMessage::TextOnly { .. }));
}

#[tokio::test]
async fn duplicate_confirm_applies_once() {
    let p = pipeline();
    let author = p.registry.register_author("Creator", None).await.unwrap();
    let mod_record = p
        .registry
        .create_mod(author.id, "Awesome Mod", None)
        .await
        .unwrap();

    let post = ContentPost::from_item(&item("p1", "Awesome Mod Update 2.0", "update"), "camp-1");
    p.store.insert_post_if_absent(&post).await.unwrap();

    let mut appearance = ModAppearance::new("p1", "Awesome Mod");
    appearance.mod_id = Some(mod_record.id);
    appearance.detected_version = Some("2.0".to_string());
    appearance.normalized_version = "2.0.0".to_string();
    appearance.confidence = 0.9;
    p.store.insert_appearance(&appearance).await.unwrap();

    let (first, second) = tokio::join!(
        p.workflow
            .apply(appearance.id, "operator-a", ReviewDecision::Confirm),
        p.workflow
            .apply(appearance.id, "operator-b", ReviewDecision::Confirm),
    );
    let outcomes = [first.unwrap(), second.unwrap()];
    assert!(outcomes.contains(&DecisionOutcome::Applied));
    assert!(outcomes.contains(&DecisionOutcome::AlreadyReviewed));

    // One audit row, one promotion.
    let history = p.store.history_for_appearance(appearance.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, AuditAction::Verified);

    let promoted = p.store.get_mod(mod_record.id).await.unwrap().unwrap();
    assert_eq!(promoted.latest_version.as_deref(), Some("2.0"));
    assert_eq!(promoted.latest_version_normalized.as_deref(), Some("2.0.0"));
    assert!(!promoted.is_up_to_date);
}

#[tokio::test]
async fn ignored_detection_cannot_be_confirmed_afterwards() {
    let p = pipeline();
    let author = p.registry.register_author("Creator", None).await.unwrap();
    let mod_record = p
        .registry
        .create_mod(author.id, "Awesome Mod", None)
        .await
        .unwrap();

    let mut appearance = ModAppearance::new("p1", "Awesome Mod");
    appearance.mod_id = Some(mod_record.id);
    p.store.insert_appearance(&appearance).await.unwrap();

    let ignored = p
        .workflow
        .apply(appearance.id, "operator", ReviewDecision::Ignore)
        .await
        .unwrap();
    assert_eq!(ignored, DecisionOutcome::Applied);

    let late = p
        .workflow
        .apply(appearance.id, "operator", ReviewDecision::Confirm)
        .await
        .unwrap();
    assert_eq!(late, DecisionOutcome::AlreadyReviewed);

    let stored = p.store.get_appearance(appearance.id).await.unwrap().unwrap();
    assert!(!stored.verified);
    assert!(p
        .store
        .history_for_appearance(appearance.id)
        .await
        .unwrap()
        .is_empty());

    // Registry untouched.
    let untouched = p.store.get_mod(mod_record.id).await.unwrap().unwrap();
    assert!(untouched.latest_version.is_none());
}

#[tokio::test]
async fn unlinked_confirm_is_rejected_and_stays_pending() {
    let p = pipeline();
    let appearance = ModAppearance::new("p1", "Mystery Mod");
    p.store.insert_appearance(&appearance).await.unwrap();

    let outcome = p
        .workflow
        .apply(appearance.id, "operator", ReviewDecision::Confirm)
        .await
        .unwrap();
    assert_eq!(outcome, DecisionOutcome::NoLinkedMod);

    // Rejected precondition releases the claim.
    let stored = p.store.get_appearance(appearance.id).await.unwrap().unwrap();
    assert!(stored.needs_review);
}

#[tokio::test]
async fn create_from_detection_registers_the_mod() {
    let p = pipeline();
    let feed = p
        .registry
        .create_feed("camp-1", FeedPlatform::Patreon, "Creator", FEED_CHANNEL, None)
        .await
        .unwrap();
    let author = p.registry.register_author("Creator", None).await.unwrap();
    p.registry
        .link_author_feed(author.id, &feed.source_id)
        .await
        .unwrap();

    let post = ContentPost::from_item(&item("p1", "Brand New Mod released", "download"), "camp-1");
    p.store.insert_post_if_absent(&post).await.unwrap();

    let mut appearance = ModAppearance::new("p1", "Brand New Mod");
    appearance.detected_version = Some("1.0".to_string());
    appearance.normalized_version = "1.0.0".to_string();
    p.store.insert_appearance(&appearance).await.unwrap();

    let outcome = p
        .workflow
        .apply(
            appearance.id,
            "operator",
            ReviewDecision::Create {
                name: "Brand New Mod".to_string(),
                source_url: Some("https://curseforge.com/x".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome, DecisionOutcome::Applied);

    let stored = p.store.get_appearance(appearance.id).await.unwrap().unwrap();
    let created: Mod = p
        .store
        .get_mod(stored.mod_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.primary_name, "Brand New Mod");
    assert_eq!(created.author_id, author.id);
    assert_eq!(created.latest_version_normalized.as_deref(), Some("1.0.0"));
    assert!(!created.is_up_to_date);

    let history = p.store.history_for_appearance(appearance.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, AuditAction::Created);
}

#[tokio::test]
async fn multi_detection_post_gets_menu_thread_and_bulk_ignore() {
    let p = pipeline();
    p.registry
        .create_feed("camp-1", FeedPlatform::Patreon, "Creator", FEED_CHANNEL, None)
        .await
        .unwrap();

    let title = "Two mods updated";
    p.posts
        .set_items("camp-1", vec![item("p1", title, "updates for both")])
        .await;
    p.analyzer
        .script(
            title,
            extraction(vec![
                detected("First Mod", Some("1.1"), true, false),
                detected("Second Mod", None, true, false),
            ]),
        )
        .await;

    p.sweeper.check_single("camp-1").await.unwrap();

    let review_messages = p.gateway.sent_to(REVIEW_CHANNEL).await;
    assert_eq!(review_messages.len(), 1);
    let RenderableMessage::WithSelectMenu { menu, buttons, .. } = &review_messages[0].message
    else {
        panic!("expected select menu");
    };
    assert_eq!(menu.options.len(), 2);
    assert_eq!(buttons.len(), 2);
    assert_eq!(p.gateway.threads_created().await, 1);

    let pending = p.store.pending_for_post("p1").await.unwrap();
    let message_id = pending[0].message_id.clone().unwrap();

    let applied = p
        .workflow
        .apply_bulk(&message_id, "operator", BulkDecision::IgnoreAll)
        .await
        .unwrap();
    assert_eq!(applied, 2);

    assert!(p
        .store
        .pending_for_message(&message_id)
        .await
        .unwrap()
        .is_empty());
    let content = p.gateway.current_content(&message_id).await.unwrap();
    assert!(matches!(content, RenderableMessage::TextOnly { .. }));
}

#[tokio::test]
async fn sheet_feed_diffs_against_its_snapshot() {
    let p = pipeline();
    p.registry
        .create_feed(
            "sheet-1",
            FeedPlatform::GoogleSheets,
            "Tracker",
            FEED_CHANNEL,
            None,
        )
        .await
        .unwrap();

    p.sheets
        .set_rows("sheet-1", vec![sheet_row("Mod A", "1.0"), sheet_row("Mod B", "1.0")])
        .await;
    let first = p.sweeper.check_single("sheet-1").await.unwrap();
    assert_eq!(first.sheet_changes, 2);

    let snapshot = p.store.latest_snapshot("sheet-1").await.unwrap().unwrap();
    assert_eq!(snapshot.entries.len(), 2);

    // One version bump: one change, new baseline.
    p.sheets
        .set_rows("sheet-1", vec![sheet_row("Mod A", "1.1"), sheet_row("Mod B", "1.0")])
        .await;
    let second = p.sweeper.check_single("sheet-1").await.unwrap();
    assert_eq!(second.sheet_changes, 1);

    let snapshot = p.store.latest_snapshot("sheet-1").await.unwrap().unwrap();
    assert_eq!(snapshot.entries["Mod A"].version, "1.1");

    // No movement: no change, baseline untouched.
    let third = p.sweeper.check_single("sheet-1").await.unwrap();
    assert_eq!(third.sheet_changes, 0);
}

#[tokio::test]
async fn feed_failure_still_advances_last_checked_at() {
    let p = pipeline();
    p.registry
        .create_feed("camp-1", FeedPlatform::Patreon, "Creator", FEED_CHANNEL, None)
        .await
        .unwrap();
    p.posts
        .set_items("camp-1", vec![item("p1", "Mod X update", "new version")])
        .await;
    p.gateway.fail_sends(true);

    let outcome = p.sweeper.try_sweep().await.unwrap().unwrap();
    assert_eq!(outcome.feeds_checked, 1);

    let feeds = p.registry.list_feeds().await.unwrap();
    let feed = feeds.iter().find(|f| f.source_id == "camp-1").unwrap();
    assert!(feed.last_checked_at.is_some());

    // Announcement failed, so the post is not marked notified, but it stays
    // ingested and analyzed.
    let post = p.store.get_post("p1").await.unwrap().unwrap();
    assert!(post.analyzed);
    assert!(!post.is_notified);
}
