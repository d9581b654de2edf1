//! Resolution of a detected name against the registry.
//!
//! First hit wins: exact slug match (1.0), exact alias match (0.95), then
//! the best fuzzy candidate at or above [`FUZZY_THRESHOLD`] as a suggestion
//! only. Anything below the auto-link bands keeps `mod_id` unset; a human
//! must confirm.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::matching::fuzzy::similarity;
use crate::matching::version::compare_versions;
use crate::types::registry::{Mod, RegistryEntry};

/// Fuzzy similarity floor for producing a suggestion.
pub const FUZZY_THRESHOLD: f64 = 0.80;

/// Result of resolving one detected name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    /// Set only for exact slug/alias hits.
    pub mod_id: Option<Uuid>,
    pub confidence: f64,
    /// Best fuzzy candidate, when no exact hit cleared.
    pub suggested_mod_id: Option<Uuid>,
    pub suggested_mod_name: Option<String>,
}

impl MatchOutcome {
    fn exact(mod_id: Uuid, confidence: f64) -> Self {
        Self {
            mod_id: Some(mod_id),
            confidence,
            ..Default::default()
        }
    }

    /// No candidate cleared the threshold.
    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Resolve a normalized detected name against the author's registry entries.
pub fn find_match(normalized_name: &str, registry: &[RegistryEntry]) -> MatchOutcome {
    if let Some(entry) = registry
        .iter()
        .find(|e| e.mod_record.normalized_name == normalized_name)
    {
        return MatchOutcome::exact(entry.mod_record.id, 1.0);
    }

    if let Some(entry) = registry
        .iter()
        .find(|e| e.aliases.iter().any(|a| a.normalized == normalized_name))
    {
        return MatchOutcome::exact(entry.mod_record.id, 0.95);
    }

    let mut best = MatchOutcome::unknown();
    for entry in registry {
        let score = similarity(normalized_name, &entry.mod_record.normalized_name);
        if score >= FUZZY_THRESHOLD && score > best.confidence {
            best = MatchOutcome {
                mod_id: None,
                confidence: score,
                suggested_mod_id: Some(entry.mod_record.id),
                suggested_mod_name: Some(entry.mod_record.primary_name.clone()),
            };
        }
    }

    best
}

/// Whether a detected version means a translation is owed for `mod_record`.
///
/// True when no translated version is recorded; when the new version compares
/// greater; or, on exact version equality, when the post was published after
/// the last translation date (a re-release under the same number).
pub fn needs_update(
    mod_record: &Mod,
    normalized_version: &str,
    published_at: DateTime<Utc>,
) -> bool {
    let Some(recorded) = mod_record
        .translated_version_normalized
        .as_deref()
        .or(mod_record.translated_version.as_deref())
    else {
        return true;
    };

    match compare_versions(normalized_version, recorded) {
        Ordering::Greater => true,
        Ordering::Equal => mod_record
            .translation_date
            .is_some_and(|translated| published_at > translated),
        Ordering::Less => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn registry() -> Vec<RegistryEntry> {
        let author = Uuid::new_v4();
        vec![
            RegistryEntry::new(Mod::new(author, "Mod X")).with_alias("Project X"),
            RegistryEntry::new(Mod::new(author, "Seasons Overhaul")),
        ]
    }

    #[test]
    fn exact_slug_match_wins_with_full_confidence() {
        let registry = registry();
        let outcome = find_match("mod_x", &registry);
        assert_eq!(outcome.mod_id, Some(registry[0].mod_record.id));
        assert_eq!(outcome.confidence, 1.0);
        assert!(outcome.suggested_mod_id.is_none());
    }

    #[test]
    fn alias_match_scores_ninety_five() {
        let registry = registry();
        let outcome = find_match("project_x", &registry);
        assert_eq!(outcome.mod_id, Some(registry[0].mod_record.id));
        assert_eq!(outcome.confidence, 0.95);
    }

    #[test]
    fn fuzzy_hit_is_suggestion_only() {
        let registry = registry();
        // One edit away from "seasons_overhaul".
        let outcome = find_match("season_overhaul", &registry);
        assert!(outcome.mod_id.is_none());
        assert!(outcome.confidence >= FUZZY_THRESHOLD);
        assert_eq!(outcome.suggested_mod_id, Some(registry[1].mod_record.id));
        assert_eq!(
            outcome.suggested_mod_name.as_deref(),
            Some("Seasons Overhaul")
        );
    }

    #[test]
    fn below_threshold_is_unknown() {
        let registry = registry();
        let outcome = find_match("totally_different", &registry);
        assert!(outcome.mod_id.is_none());
        assert_eq!(outcome.confidence, 0.0);
        assert!(outcome.suggested_mod_id.is_none());
    }

    #[test]
    fn untranslated_mod_always_needs_update() {
        let m = Mod::new(Uuid::new_v4(), "Mod X");
        assert!(needs_update(&m, "1.0.0", Utc::now()));
    }

    #[test]
    fn newer_version_needs_update_older_does_not() {
        let mut m = Mod::new(Uuid::new_v4(), "Mod X");
        m.translated_version = Some("1.2".to_string());
        m.translated_version_normalized = Some("1.2.0".to_string());

        assert!(needs_update(&m, "1.3.0", Utc::now()));
        assert!(!needs_update(&m, "1.1.0", Utc::now()));
    }

    #[test]
    fn same_version_republished_later_needs_update() {
        let translated = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut m = Mod::new(Uuid::new_v4(), "Mod X");
        m.translated_version = Some("1.2".to_string());
        m.translated_version_normalized = Some("1.2.0".to_string());
        m.translation_date = Some(translated);

        assert!(needs_update(&m, "1.2.0", translated + Duration::days(2)));
        assert!(!needs_update(&m, "1.2.0", translated - Duration::days(2)));
    }
}
