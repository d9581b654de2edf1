//! LLM-assisted extraction of mod-update facts from post text.

pub mod groq;
pub mod prompts;

pub use groq::{ChatBackend, GroqAnalyzer};
pub use prompts::{build_extraction_prompt, has_mod_keywords, MOD_KEYWORDS};

use serde_json::Value;

use crate::error::{AnalysisError, AnalysisResult};
use crate::traits::ai::DetectedMod;

/// Parse and validate a raw completion against the extraction contract.
///
/// Strips Markdown code fences if present, parses JSON, requires a `mods`
/// array, and checks every element: non-empty string `name`, `version` that
/// is null or a string, boolean `isUpdate`/`isNewMod`. Any violation fails
/// the attempt.
pub fn parse_analysis_response(content: &str) -> AnalysisResult<(Vec<DetectedMod>, Value)> {
    let cleaned = strip_code_fences(content);

    let value: Value = serde_json::from_str(cleaned)?;

    let mods = value
        .get("mods")
        .and_then(Value::as_array)
        .ok_or_else(|| AnalysisError::Schema("missing mods array".into()))?;

    let mut detected = Vec::with_capacity(mods.len());
    for entry in mods {
        match entry.get("name") {
            Some(Value::String(name)) if !name.is_empty() => {}
            _ => return Err(AnalysisError::Schema("missing or invalid name".into())),
        }
        match entry.get("version") {
            Some(Value::Null) | Some(Value::String(_)) | None => {}
            _ => return Err(AnalysisError::Schema("invalid version type".into())),
        }
        if !entry.get("isUpdate").is_some_and(Value::is_boolean) {
            return Err(AnalysisError::Schema("missing isUpdate boolean".into()));
        }
        if !entry.get("isNewMod").is_some_and(Value::is_boolean) {
            return Err(AnalysisError::Schema("missing isNewMod boolean".into()));
        }

        let mod_entry: DetectedMod = serde_json::from_value(entry.clone())?;
        detected.push(mod_entry);
    }

    Ok((detected, value))
}

fn strip_code_fences(content: &str) -> &str {
    let mut cleaned = content.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_clean_response() {
        let body = r#"{"mods":[{"name":"Mod X","version":"2.1","isUpdate":true,"isNewMod":false,"downloadUrl":null}]}"#;
        let (mods, raw) = parse_analysis_response(body).unwrap();
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].name, "Mod X");
        assert_eq!(mods[0].version.as_deref(), Some("2.1"));
        assert!(mods[0].is_update);
        assert!(raw.get("mods").is_some());
    }

    #[test]
    fn strips_markdown_fences() {
        let body = "```json\n{\"mods\":[]}\n```";
        let (mods, _) = parse_analysis_response(body).unwrap();
        assert!(mods.is_empty());

        let bare_fence = "```\n{\"mods\":[]}\n```";
        assert!(parse_analysis_response(bare_fence).is_ok());
    }

    #[test]
    fn rejects_missing_mods_array() {
        let err = parse_analysis_response(r#"{"items":[]}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Schema(_)));
    }

    #[test]
    fn rejects_bad_element_shapes() {
        for body in [
            r#"{"mods":[{"name":"","isUpdate":true,"isNewMod":false}]}"#,
            r#"{"mods":[{"name":"X","version":5,"isUpdate":true,"isNewMod":false}]}"#,
            r#"{"mods":[{"name":"X","isUpdate":"yes","isNewMod":false}]}"#,
            r#"{"mods":[{"name":"X","isUpdate":true}]}"#,
        ] {
            assert!(
                parse_analysis_response(body).is_err(),
                "should reject: {body}"
            );
        }
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_analysis_response("Sure! Here are the mods..."),
            Err(AnalysisError::Json(_))
        ));
    }
}
