//! Spreadsheet-backed feed source and snapshot diffing.
//!
//! Header matching is positional but synonym-tolerant: column order can
//! change between checks as long as a recognizable header remains.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::{FeedError, FeedResult};
use crate::traits::feed::SheetSource;
use crate::types::sheet::{SheetChange, SheetRow};

const DEFAULT_SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DEFAULT_DRIVE_URL: &str = "https://www.googleapis.com/drive/v3/files";

/// Default range when a feed does not specify one.
pub const DEFAULT_SHEET_RANGE: &str = "Sheet1!A1:Z1000";

/// Client for a Google-Sheets-like tabular API.
pub struct GoogleSheetsSource {
    http_client: reqwest::Client,
    api_key: SecretString,
    sheets_url: String,
    drive_url: String,
}

impl GoogleSheetsSource {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key: SecretString::from(api_key.into()),
            sheets_url: DEFAULT_SHEETS_URL.to_string(),
            drive_url: DEFAULT_DRIVE_URL.to_string(),
        }
    }

    /// Create from environment variable `GOOGLE_SHEETS_API_KEY`.
    pub fn from_env() -> FeedResult<Self> {
        let key = std::env::var("GOOGLE_SHEETS_API_KEY")
            .map_err(|_| FeedError::NotConfigured("GOOGLE_SHEETS_API_KEY"))?;
        Ok(Self::new(key))
    }

    pub fn with_base_urls(
        mut self,
        sheets_url: impl Into<String>,
        drive_url: impl Into<String>,
    ) -> Self {
        self.sheets_url = sheets_url.into();
        self.drive_url = drive_url.into();
        self
    }

    /// Pull the spreadsheet id out of a share URL.
    pub fn extract_spreadsheet_id(url: &str) -> Option<&str> {
        let rest = url.split("/spreadsheets/d/").nth(1)?;
        let id: &str = rest
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .next()?;
        (!id.is_empty()).then_some(id)
    }
}

#[derive(Debug, Deserialize)]
struct FileMetadata {
    #[serde(rename = "modifiedTime")]
    modified_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[async_trait]
impl SheetSource for GoogleSheetsSource {
    async fn last_modified(&self, sheet_id: &str) -> FeedResult<Option<DateTime<Utc>>> {
        let response = self
            .http_client
            .get(format!("{}/{sheet_id}", self.drive_url))
            .query(&[
                ("key", self.api_key.expose_secret()),
                ("fields", "modifiedTime"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            // Metadata probe is an optimization only; callers fall back to a
            // full fetch when it is unavailable.
            debug!(sheet_id, status = %response.status(), "modified-time probe failed");
            return Ok(None);
        }

        let metadata: FileMetadata = response
            .json()
            .await
            .map_err(|e| FeedError::Malformed(e.to_string()))?;
        Ok(metadata.modified_time)
    }

    async fn fetch_rows(&self, sheet_id: &str, range: &str) -> FeedResult<Vec<SheetRow>> {
        debug!(sheet_id, range, "fetching sheet rows");

        let response = self
            .http_client
            .get(format!("{}/{sheet_id}/values/{range}", self.sheets_url))
            .query(&[("key", self.api_key.expose_secret())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Upstream(format!(
                "sheet fetch for {sheet_id} returned {status}"
            )));
        }

        let parsed: ValuesResponse = response
            .json()
            .await
            .map_err(|e| FeedError::Malformed(e.to_string()))?;

        map_grid_to_rows(&parsed.values)
    }
}

/// Header synonyms used to locate each logical column.
const NAME_HEADERS: &[&str] = &["mod name", "name", "mod"];
const VERSION_HEADERS: &[&str] = &["version", "ver", "latest version"];
const UPDATE_HEADERS: &[&str] = &["last update", "updated", "date"];
const URL_HEADERS: &[&str] = &["download", "url", "link"];
const STATUS_HEADERS: &[&str] = &["status", "state"];

fn find_column(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    let normalized: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    synonyms
        .iter()
        .find_map(|name| normalized.iter().position(|h| h.contains(name)))
}

/// Map a raw 2D grid (first row = headers) onto typed sheet rows.
///
/// Rows without a mod name are skipped; a sheet without a recognizable name
/// column is an error.
pub fn map_grid_to_rows(grid: &[Vec<String>]) -> FeedResult<Vec<SheetRow>> {
    let Some((headers, data_rows)) = grid.split_first() else {
        return Ok(Vec::new());
    };

    let name_idx =
        find_column(headers, NAME_HEADERS).ok_or(FeedError::MissingColumn("mod name"))?;
    let version_idx = find_column(headers, VERSION_HEADERS);
    let update_idx = find_column(headers, UPDATE_HEADERS);
    let url_idx = find_column(headers, URL_HEADERS);
    let status_idx = find_column(headers, STATUS_HEADERS);

    let cell = |row: &[String], idx: Option<usize>| -> String {
        idx.and_then(|i| row.get(i))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let mut rows = Vec::new();
    for row in data_rows {
        let mod_name = cell(row, Some(name_idx));
        if mod_name.is_empty() {
            continue;
        }

        let download_url = cell(row, url_idx);
        let status = cell(row, status_idx);
        rows.push(SheetRow {
            mod_name,
            version: cell(row, version_idx),
            last_update: cell(row, update_idx),
            download_url: (!download_url.is_empty()).then_some(download_url),
            status: (!status.is_empty()).then_some(status),
        });
    }

    Ok(rows)
}

/// Diff the current row set against the previous snapshot baseline.
///
/// Emits one change per added or version-changed row. Rows missing a name or
/// version are skipped; disappeared rows are not reported (the original never
/// tracked removals).
pub fn detect_changes(
    current: &[SheetRow],
    previous: &BTreeMap<String, SheetRow>,
) -> Vec<SheetChange> {
    let mut changes = Vec::new();

    for row in current {
        if row.mod_name.is_empty() || row.version.is_empty() {
            continue;
        }

        match previous.get(&row.mod_name) {
            None => changes.push(SheetChange {
                mod_name: row.mod_name.clone(),
                old_version: None,
                new_version: row.version.clone(),
                last_update: row.last_update.clone(),
                download_url: row.download_url.clone(),
            }),
            Some(prev) if prev.version != row.version => changes.push(SheetChange {
                mod_name: row.mod_name.clone(),
                old_version: Some(prev.version.clone()),
                new_version: row.version.clone(),
                last_update: row.last_update.clone(),
                download_url: row.download_url.clone(),
            }),
            Some(_) => {}
        }
    }

    changes
}

/// Key the current rows by mod name for the next snapshot.
pub fn build_row_map(rows: &[SheetRow]) -> BTreeMap<String, SheetRow> {
    rows.iter()
        .filter(|r| !r.mod_name.is_empty())
        .map(|r| (r.mod_name.clone(), r.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn row(name: &str, version: &str) -> SheetRow {
        SheetRow {
            mod_name: name.to_string(),
            version: version.to_string(),
            last_update: String::new(),
            download_url: None,
            status: None,
        }
    }

    #[test]
    fn header_matching_tolerates_reordering_and_synonyms() {
        let grid = grid(&[
            &["Latest Version", "Mod Name", "Link"],
            &["1.2", "Mod A", "https://example.com/a"],
        ]);

        let rows = map_grid_to_rows(&grid).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mod_name, "Mod A");
        assert_eq!(rows[0].version, "1.2");
        assert_eq!(rows[0].download_url.as_deref(), Some("https://example.com/a"));
    }

    #[test]
    fn rows_without_a_name_are_skipped() {
        let grid = grid(&[&["Name", "Version"], &["", "1.0"], &["Mod B", "2.0"]]);
        let rows = map_grid_to_rows(&grid).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mod_name, "Mod B");
    }

    #[test]
    fn missing_name_column_is_an_error() {
        let grid = grid(&[&["Version", "Link"], &["1.0", "x"]]);
        assert!(matches!(
            map_grid_to_rows(&grid),
            Err(FeedError::MissingColumn(_))
        ));
    }

    #[test]
    fn diff_reports_added_and_updated_rows() {
        let previous = BTreeMap::from([("ModA".to_string(), row("ModA", "1.0"))]);
        let current = vec![row("ModA", "1.1"), row("ModB", "1.0")];

        let changes = detect_changes(&current, &previous);
        assert_eq!(changes.len(), 2);

        assert_eq!(changes[0].mod_name, "ModA");
        assert_eq!(changes[0].old_version.as_deref(), Some("1.0"));
        assert_eq!(changes[0].new_version, "1.1");

        assert_eq!(changes[1].mod_name, "ModB");
        assert!(changes[1].old_version.is_none());
        assert_eq!(changes[1].new_version, "1.0");
    }

    #[test]
    fn unchanged_rows_produce_no_changes() {
        let previous = BTreeMap::from([("ModA".to_string(), row("ModA", "1.0"))]);
        let current = vec![row("ModA", "1.0")];
        assert!(detect_changes(&current, &previous).is_empty());
    }

    #[test]
    fn spreadsheet_id_extraction() {
        let url = "https://docs.google.com/spreadsheets/d/abc123-XY_z/edit#gid=0";
        assert_eq!(
            GoogleSheetsSource::extract_spreadsheet_id(url),
            Some("abc123-XY_z")
        );
        assert!(GoogleSheetsSource::extract_spreadsheet_id("https://example.com").is_none());
    }
}
