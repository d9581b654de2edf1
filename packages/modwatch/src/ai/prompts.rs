//! Prompt construction and the keyword pre-filter.

/// Terms that gate whether extraction is attempted at all. Posts containing
/// none of these are marked analyzed without an LLM call.
pub const MOD_KEYWORDS: &[&str] = &[
    "update",
    "mod",
    "download",
    ".package",
    "new version",
    "fixed",
    "released",
];

/// Cheap gate: does the post text mention anything mod-release-shaped?
pub fn has_mod_keywords(title: &str, content: &str) -> bool {
    let text = format!("{title} {content}").to_lowercase();
    MOD_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

/// System instruction demanding JSON-only output.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a JSON extraction bot. You MUST respond ONLY \
     with valid JSON. Do not include any explanatory text before or after the JSON.";

/// Build the user prompt for one post.
///
/// The known-mod list biases extraction toward canonical registry names.
pub fn build_extraction_prompt(title: &str, content: &str, known_mods: &[String]) -> String {
    let mods_context = if known_mods.is_empty() {
        String::new()
    } else {
        format!("\n\nKnown mods in database: {}", known_mods.join(", "))
    };

    format!(
        r#"Analyze this post and extract ONLY information about The Sims 4 mods that are being updated or released.

POST TITLE: {title}

POST CONTENT: {content}
{mods_context}

STRICT RULES:
1. Return ONLY a valid JSON object
2. Identify ONLY mods being updated/released (ignore mentions of other creators or thanks)
3. Extract exact mod name (prefer names from known mods list if similar)
4. Extract version as numbers and dots only (e.g., "1.2.3")
5. If no version found, use null
6. Determine if it's an update (existing mod) or new mod
7. Extract direct download URL if present

REQUIRED JSON FORMAT:
{{
  "mods": [
    {{
      "name": "Exact Mod Name",
      "version": "1.2.3" or null,
      "isUpdate": true/false,
      "isNewMod": true/false,
      "downloadUrl": "https://..." or null
    }}
  ]
}}

Return ONLY the JSON, no explanations."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_gate_matches_case_insensitively() {
        assert!(has_mod_keywords("Mod X Update v2.1 released", ""));
        assert!(has_mod_keywords("", "grab the .package file here"));
        assert!(has_mod_keywords("NEW VERSION out now", ""));
    }

    #[test]
    fn keyword_gate_rejects_chatter() {
        assert!(!has_mod_keywords("Happy holidays!", "Thanks for the support this year."));
    }

    #[test]
    fn prompt_embeds_known_mods_when_present() {
        let prompt = build_extraction_prompt("t", "c", &["Mod X".to_string()]);
        assert!(prompt.contains("Known mods in database: Mod X"));

        let bare = build_extraction_prompt("t", "c", &[]);
        assert!(!bare.contains("Known mods in database"));
    }
}
