//! The curated mod registry: authors, mods, and aliases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matching::fuzzy::normalize_mod_name;

/// A content creator, mapped to at most one feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModAuthor {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub patreon_url: Option<String>,
    /// Link to the feed this author publishes through, if any.
    pub feed_source_id: Option<String>,
}

impl ModAuthor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = normalize_mod_name(&name);
        Self {
            id: Uuid::new_v4(),
            name,
            slug,
            patreon_url: None,
            feed_source_id: None,
        }
    }

    pub fn with_patreon_url(mut self, url: impl Into<String>) -> Self {
        self.patreon_url = Some(url.into());
        self
    }
}

/// The registry's canonical mod entity.
///
/// `normalized_name` is derived from `primary_name` and used for exact-match
/// lookup. It is NOT guaranteed unique across the registry; the fuzzy matcher
/// exists precisely because variants and duplicates occur upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mod {
    pub id: Uuid,
    pub author_id: Uuid,
    pub primary_name: String,
    pub normalized_name: String,
    pub curseforge_url: Option<String>,

    /// Version we have translated/shipped (operator-maintained).
    pub translated_version: Option<String>,
    pub translated_version_normalized: Option<String>,
    pub translation_date: Option<DateTime<Utc>>,

    /// Latest version detected upstream.
    pub latest_version: Option<String>,
    pub latest_version_normalized: Option<String>,
    pub latest_version_date: Option<DateTime<Utc>>,

    /// Derived: translated matches latest.
    pub is_up_to_date: bool,

    pub is_active: bool,
}

impl Mod {
    pub fn new(author_id: Uuid, primary_name: impl Into<String>) -> Self {
        let primary_name = primary_name.into();
        let normalized_name = normalize_mod_name(&primary_name);
        Self {
            id: Uuid::new_v4(),
            author_id,
            primary_name,
            normalized_name,
            curseforge_url: None,
            translated_version: None,
            translated_version_normalized: None,
            translation_date: None,
            latest_version: None,
            latest_version_normalized: None,
            latest_version_date: None,
            is_up_to_date: true,
            is_active: true,
        }
    }

    pub fn with_curseforge_url(mut self, url: impl Into<String>) -> Self {
        self.curseforge_url = Some(url.into());
        self
    }

    /// Seed the detected upstream version (used when a mod is created from a
    /// review decision).
    pub fn with_latest_version(
        mut self,
        version: Option<String>,
        normalized: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        self.latest_version = version;
        self.latest_version_normalized = Some(normalized.into());
        self.latest_version_date = Some(date);
        self.is_up_to_date = false;
        self
    }
}

/// Alternate name for a mod, with a normalized form for exact lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModAlias {
    pub id: Uuid,
    pub mod_id: Uuid,
    pub name: String,
    pub normalized: String,
}

impl ModAlias {
    pub fn new(mod_id: Uuid, name: impl Into<String>) -> Self {
        let name = name.into();
        let normalized = normalize_mod_name(&name);
        Self {
            id: Uuid::new_v4(),
            mod_id,
            name,
            normalized,
        }
    }
}

/// A mod together with its aliases, as handed to the match engine.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub mod_record: Mod,
    pub aliases: Vec<ModAlias>,
}

impl RegistryEntry {
    pub fn new(mod_record: Mod) -> Self {
        Self {
            mod_record,
            aliases: Vec::new(),
        }
    }

    pub fn with_alias(mut self, name: impl Into<String>) -> Self {
        self.aliases.push(ModAlias::new(self.mod_record.id, name));
        self
    }
}
