//! Feed source traits: post-style and spreadsheet-style upstreams.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FeedResult;
use crate::types::post::FeedItem;
use crate::types::sheet::SheetRow;

/// A paginated post upstream (Patreon-like).
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Fetch current non-draft items for a source, newest first.
    async fn fetch_recent(&self, source_id: &str) -> FeedResult<Vec<FeedItem>>;
}

/// A tabular upstream (spreadsheet-like).
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Cheap metadata probe: when was the resource last modified upstream?
    ///
    /// `None` means the upstream does not expose the information; callers
    /// fall back to a full fetch.
    async fn last_modified(&self, sheet_id: &str) -> FeedResult<Option<DateTime<Utc>>>;

    /// Fetch and header-map the row set for a range.
    async fn fetch_rows(&self, sheet_id: &str, range: &str) -> FeedResult<Vec<SheetRow>>;
}

#[async_trait]
impl<T: PostSource + ?Sized> PostSource for std::sync::Arc<T> {
    async fn fetch_recent(&self, source_id: &str) -> FeedResult<Vec<FeedItem>> {
        (**self).fetch_recent(source_id).await
    }
}

#[async_trait]
impl<T: SheetSource + ?Sized> SheetSource for std::sync::Arc<T> {
    async fn last_modified(&self, sheet_id: &str) -> FeedResult<Option<DateTime<Utc>>> {
        (**self).last_modified(sheet_id).await
    }

    async fn fetch_rows(&self, sheet_id: &str, range: &str) -> FeedResult<Vec<SheetRow>> {
        (**self).fetch_rows(sheet_id, range).await
    }
}
