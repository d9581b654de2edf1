//! Mock implementations for tests.
//!
//! Each mock records its calls so tests can assert on interaction counts,
//! not just end state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{FeedResult, NotifyError, NotifyResult};
use crate::traits::{
    ai::{AnalysisOutcome, PostAnalyzer},
    feed::{PostSource, SheetSource},
    notify::NotificationGateway,
};
use crate::types::{
    message::{MessageHandle, RenderableMessage, ThreadHandle},
    post::FeedItem,
    sheet::SheetRow,
};

/// Analyzer returning scripted outcomes keyed by post title.
///
/// Unscripted titles yield an empty outcome. Tracks how many times it was
/// invoked, so tests can assert the keyword gate short-circuited.
#[derive(Default)]
pub struct MockAnalyzer {
    outcomes: RwLock<HashMap<String, AnalysisOutcome>>,
    calls: AtomicU32,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome returned for a given post title.
    pub async fn script(&self, title: impl Into<String>, outcome: AnalysisOutcome) {
        self.outcomes.write().await.insert(title.into(), outcome);
    }

    /// How many times `analyze` was called.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostAnalyzer for MockAnalyzer {
    async fn analyze(&self, title: &str, _content: &str, _known_mods: &[String]) -> AnalysisOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .read()
            .await
            .get(title)
            .cloned()
            .unwrap_or_else(AnalysisOutcome::empty)
    }
}

/// One message recorded by [`MockGateway`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel_id: String,
    pub message: RenderableMessage,
}

/// Gateway that records deliveries instead of transmitting them.
///
/// Message ids are sequential (`msg-1`, `msg-2`, ...) so tests can predict
/// handles. Sends can be made to fail to exercise the
/// log-and-continue paths.
#[derive(Default)]
pub struct MockGateway {
    sent: RwLock<Vec<SentMessage>>,
    edits: RwLock<Vec<(MessageHandle, RenderableMessage)>>,
    threads: RwLock<Vec<(MessageHandle, String)>>,
    next_id: AtomicU32,
    fail_sends: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `send` fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.read().await.clone()
    }

    pub async fn edits(&self) -> Vec<(MessageHandle, RenderableMessage)> {
        self.edits.read().await.clone()
    }

    pub async fn threads_created(&self) -> usize {
        self.threads.read().await.len()
    }

    /// Messages sent to one channel.
    pub async fn sent_to(&self, channel_id: &str) -> Vec<SentMessage> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect()
    }

    /// The latest content a message handle resolves to, edits included.
    pub async fn current_content(&self, message_id: &str) -> Option<RenderableMessage> {
        let edits = self.edits.read().await;
        if let Some((_, message)) = edits
            .iter()
            .rev()
            .find(|(handle, _)| handle.message_id == message_id)
        {
            return Some(message.clone());
        }
        drop(edits);

        let index: usize = message_id.strip_prefix("msg-")?.parse::<usize>().ok()?;
        self.sent.read().await.get(index - 1).map(|m| m.message.clone())
    }
}

#[async_trait]
impl NotificationGateway for MockGateway {
    async fn send(
        &self,
        channel_id: &str,
        message: RenderableMessage,
    ) -> NotifyResult<MessageHandle> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("mock send failure".to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.write().await.push(SentMessage {
            channel_id: channel_id.to_string(),
            message,
        });
        Ok(MessageHandle::new(channel_id, format!("msg-{id}")))
    }

    async fn edit(&self, handle: &MessageHandle, message: RenderableMessage) -> NotifyResult<()> {
        self.edits.write().await.push((handle.clone(), message));
        Ok(())
    }

    async fn create_thread(
        &self,
        handle: &MessageHandle,
        title: &str,
    ) -> NotifyResult<ThreadHandle> {
        let mut threads = self.threads.write().await;
        threads.push((handle.clone(), title.to_string()));
        Ok(ThreadHandle {
            thread_id: format!("thread-{}", threads.len()),
        })
    }
}

/// Post source serving preset items per source id.
#[derive(Default)]
pub struct MockPostSource {
    items: RwLock<HashMap<String, Vec<FeedItem>>>,
}

impl MockPostSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_items(&self, source_id: impl Into<String>, items: Vec<FeedItem>) {
        self.items.write().await.insert(source_id.into(), items);
    }
}

#[async_trait]
impl PostSource for MockPostSource {
    async fn fetch_recent(&self, source_id: &str) -> FeedResult<Vec<FeedItem>> {
        Ok(self
            .items
            .read()
            .await
            .get(source_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Sheet source serving preset rows per sheet id.
#[derive(Default)]
pub struct MockSheetSource {
    rows: RwLock<HashMap<String, Vec<SheetRow>>>,
    modified: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MockSheetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_rows(&self, sheet_id: impl Into<String>, rows: Vec<SheetRow>) {
        self.rows.write().await.insert(sheet_id.into(), rows);
    }

    pub async fn set_last_modified(&self, sheet_id: impl Into<String>, at: DateTime<Utc>) {
        self.modified.write().await.insert(sheet_id.into(), at);
    }
}

#[async_trait]
impl SheetSource for MockSheetSource {
    async fn last_modified(&self, sheet_id: &str) -> FeedResult<Option<DateTime<Utc>>> {
        Ok(self.modified.read().await.get(sheet_id).copied())
    }

    async fn fetch_rows(&self, sheet_id: &str, _range: &str) -> FeedResult<Vec<SheetRow>> {
        Ok(self
            .rows
            .read()
            .await
            .get(sheet_id)
            .cloned()
            .unwrap_or_default())
    }
}
