//! Name and version matching: normalization, similarity, and the
//! registry resolution ladder.

pub mod engine;
pub mod fuzzy;
pub mod version;

pub use engine::{find_match, needs_update, MatchOutcome, FUZZY_THRESHOLD};
pub use fuzzy::{levenshtein, normalize_mod_name, similarity};
pub use version::{compare_versions, normalize_version};
