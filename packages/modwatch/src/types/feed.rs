//! Polled content feeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum allowed per-feed check interval, in minutes.
pub const MIN_CHECK_INTERVAL_MINS: i64 = 5;

/// Default check interval assigned to newly created feeds, in minutes.
pub const DEFAULT_CHECK_INTERVAL_MINS: i64 = 30;

/// Platform a feed is polled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedPlatform {
    Patreon,
    GoogleSheets,
    Rss,
    GitHub,
}

/// A polled external content source (Patreon campaign, spreadsheet, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFeed {
    /// External source identifier (campaign id, spreadsheet id). Unique.
    pub source_id: String,

    pub platform: FeedPlatform,

    pub creator_name: String,

    /// Channel that receives plain new-post notifications for this feed.
    pub notification_channel_id: String,

    /// Minutes between checks; floored at [`MIN_CHECK_INTERVAL_MINS`].
    pub check_interval_mins: i64,

    /// Soft-disable flag; inactive feeds are skipped by the sweeper.
    pub is_active: bool,

    pub last_checked_at: Option<DateTime<Utc>>,

    /// For sheet feeds: the A1 range to read. `None` falls back to a
    /// whole-sheet default.
    pub sheet_range: Option<String>,
}

impl ContentFeed {
    /// Create an active feed with the default check interval.
    pub fn new(
        source_id: impl Into<String>,
        platform: FeedPlatform,
        creator_name: impl Into<String>,
        notification_channel_id: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            platform,
            creator_name: creator_name.into(),
            notification_channel_id: notification_channel_id.into(),
            check_interval_mins: DEFAULT_CHECK_INTERVAL_MINS,
            is_active: true,
            last_checked_at: None,
            sheet_range: None,
        }
    }

    /// Set the check interval, clamped to the 5-minute floor.
    pub fn with_check_interval(mut self, mins: i64) -> Self {
        self.check_interval_mins = mins.max(MIN_CHECK_INTERVAL_MINS);
        self
    }

    /// Set the sheet range for spreadsheet feeds.
    pub fn with_sheet_range(mut self, range: impl Into<String>) -> Self {
        self.sheet_range = Some(range.into());
        self
    }

    /// Effective check interval, never below the floor.
    pub fn effective_interval_mins(&self) -> i64 {
        self.check_interval_mins.max(MIN_CHECK_INTERVAL_MINS)
    }

    /// Whether this feed is due for a check at `now`.
    ///
    /// A feed that has never been checked is always due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_checked_at {
            None => true,
            Some(last) => {
                let elapsed_mins = (now - last).num_minutes();
                elapsed_mins >= self.effective_interval_mins()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn feed() -> ContentFeed {
        ContentFeed::new("campaign-1", FeedPlatform::Patreon, "Creator", "chan-1")
    }

    #[test]
    fn never_checked_feed_is_due() {
        assert!(feed().is_due(Utc::now()));
    }

    #[test]
    fn recently_checked_feed_is_not_due() {
        let now = Utc::now();
        let mut f = feed().with_check_interval(30);
        f.last_checked_at = Some(now - Duration::minutes(10));
        assert!(!f.is_due(now));

        f.last_checked_at = Some(now - Duration::minutes(30));
        assert!(f.is_due(now));
    }

    #[test]
    fn check_interval_is_floored_at_five_minutes() {
        let f = feed().with_check_interval(1);
        assert_eq!(f.effective_interval_mins(), MIN_CHECK_INTERVAL_MINS);
    }
}
