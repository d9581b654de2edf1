//! Feed ingestion: upstream sources and the sweep scheduler.

pub mod patreon;
pub mod sheets;
pub mod sweeper;

pub use patreon::PatreonSource;
pub use sheets::{
    build_row_map, detect_changes, map_grid_to_rows, GoogleSheetsSource, DEFAULT_SHEET_RANGE,
};
pub use sweeper::{FeedSweeper, SweepOutcome};
