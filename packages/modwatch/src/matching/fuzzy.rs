//! Token normalization and edit-distance similarity for mod names.

/// Normalize a mod name for matching.
///
/// Lowercases, drops characters that are not word / space / hyphen, and
/// collapses every run of spaces, hyphens, and underscores into a single
/// underscore.
pub fn normalize_mod_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.trim().to_lowercase().chars() {
        if c.is_whitespace() || c == '-' || c == '_' {
            pending_separator = !out.is_empty();
        } else if c.is_alphanumeric() {
            if pending_separator {
                out.push('_');
                pending_separator = false;
            }
            out.push(c);
        }
        // Everything else (punctuation, symbols) is dropped without
        // acting as a separator.
    }

    out
}

/// Classic dynamic-programming Levenshtein distance with unit costs.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Similarity score in [0, 1]: `(max_len - distance) / max_len`.
///
/// Symmetric; 1.0 for identical strings; 1.0 when both strings are empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = levenshtein(a, b);
    (max_len - distance) as f64 / max_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_separators() {
        assert_eq!(normalize_mod_name("Mod X"), "mod_x");
        assert_eq!(normalize_mod_name("  Better -- Sims_Pack  "), "better_sims_pack");
        assert_eq!(normalize_mod_name("UI Cheats Extension"), "ui_cheats_extension");
    }

    #[test]
    fn normalization_drops_punctuation_without_separating() {
        assert_eq!(normalize_mod_name("Mod's Pack!"), "mods_pack");
        assert_eq!(normalize_mod_name("v2.1 (beta)"), "v21_beta");
    }

    #[test]
    fn levenshtein_matches_known_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
    }

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity("mod_x", "mod_x"), 1.0);
    }

    #[test]
    fn both_empty_scores_one_but_half_empty_does_not() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("mod_x", ""), 0.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = "seasons_overhaul";
        let b = "season_overhaul";
        assert_eq!(similarity(a, b), similarity(b, a));
        assert!(similarity(a, b) > 0.9);
    }
}
