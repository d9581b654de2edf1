//! Spreadsheet-backed feed rows, diffs, and snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of a mod-tracking spreadsheet, after header mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    pub mod_name: String,
    pub version: String,
    pub last_update: String,
    pub download_url: Option<String>,
    pub status: Option<String>,
}

/// One added or updated row relative to the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetChange {
    pub mod_name: String,
    /// `None` for a newly appeared row.
    pub old_version: Option<String>,
    pub new_version: String,
    pub last_update: String,
    pub download_url: Option<String>,
}

/// Full name→row capture of a sheet at one check, used as the diff baseline.
///
/// Append-only; the latest snapshot by `created_at` is the active baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetSnapshot {
    pub id: Uuid,
    pub feed_source_id: String,
    pub entries: BTreeMap<String, SheetRow>,
    pub created_at: DateTime<Utc>,
}

impl SheetSnapshot {
    pub fn new(feed_source_id: impl Into<String>, entries: BTreeMap<String, SheetRow>) -> Self {
        Self {
            id: Uuid::new_v4(),
            feed_source_id: feed_source_id.into(),
            entries,
            created_at: Utc::now(),
        }
    }
}
