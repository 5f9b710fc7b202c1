//! Cultural context resolution keyed by language tag.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const FALLBACK_REGION: &str = "Unknown";
const FALLBACK_RESPECT: &str = "standard";
const FALLBACK_GREETING: &str = "Hello";

/// ISO 639-3 codes of the supported languages and their 639-1 form.
const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("eng", "en"),
    ("cmn", "zh"),
    ("spa", "es"),
    ("hin", "hi"),
    ("ara", "ar"),
    ("ben", "bn"),
    ("por", "pt"),
    ("rus", "ru"),
    ("jpn", "ja"),
    ("kor", "ko"),
    ("fra", "fr"),
    ("deu", "de"),
    ("ita", "it"),
    ("vie", "vi"),
    ("tha", "th"),
];

/// Normalize a language tag: primary subtag only, lowercase, and the
/// three-letter code of a supported language mapped to its two-letter one.
/// `"en-US"`, `"EN"` and `"eng"` all become `"en"`.
pub fn normalize_language_tag(tag: &str) -> String {
    let primary = tag
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(iso3, _)| *iso3 == primary)
        .map(|(_, iso1)| iso1.to_string())
        .unwrap_or(primary)
}

/// Static language-keyed lookup tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CulturalTables {
    pub greetings: BTreeMap<String, String>,
    pub respect: BTreeMap<String, String>,
    pub regions: BTreeMap<String, String>,
}

impl Default for CulturalTables {
    fn default() -> Self {
        let table = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        Self {
            greetings: table(&[
                ("en", "Hello"),
                ("es", "Hola"),
                ("fr", "Bonjour"),
                ("zh", "你好"),
                ("ja", "こんにちは"),
                ("ar", "مرحبا"),
            ]),
            respect: table(&[
                ("en", "formal"),
                ("ja", "highly-formal"),
                ("zh", "age-based"),
                ("ar", "gender-based"),
            ]),
            regions: table(&[
                ("en", "Global/Western"),
                ("es", "Hispanic"),
                ("zh", "Chinese"),
                ("ja", "Japanese"),
                ("ar", "Arabic"),
            ]),
        }
    }
}

impl CulturalTables {
    /// Fraction of the per-language etiquette tables (greeting, respect)
    /// holding an entry for `language`. Rewards breadth of cultural data.
    pub fn confidence(&self, language: &str) -> f64 {
        let tables = [&self.greetings, &self.respect];
        let covered = tables.iter().filter(|t| t.contains_key(language)).count();
        covered as f64 / tables.len() as f64
    }

    /// Whether any table has an entry for `language`.
    pub fn knows(&self, language: &str) -> bool {
        self.greetings.contains_key(language)
            || self.respect.contains_key(language)
            || self.regions.contains_key(language)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CulturalContext {
    pub language: String,
    pub region: String,
    pub confidence: f64,
    pub last_interaction: DateTime<Utc>,
    pub respect_level: String,
    pub greeting: String,
}

/// Resolves and caches cultural context per language tag.
#[derive(Debug, Default)]
pub struct CultureResolver {
    tables: CulturalTables,
    cache: HashMap<String, CulturalContext>,
}

impl CultureResolver {
    pub fn new(tables: CulturalTables) -> Self {
        Self {
            tables,
            cache: HashMap::new(),
        }
    }

    /// Swap the lookup tables. Cached contexts are dropped so confidence
    /// is recomputed against the new tables.
    pub fn set_tables(&mut self, tables: CulturalTables) {
        self.tables = tables;
        self.cache.clear();
    }

    pub fn confidence(&self, language: &str) -> f64 {
        self.tables.confidence(language)
    }

    pub fn resolve(&mut self, language: &str) -> CulturalContext {
        self.resolve_at(language, Utc::now())
    }

    /// Resolve `language`, stamping the interaction time. Tags with an entry
    /// in any table are cached; unknown tags get a fresh fallback context
    /// every time, so arbitrary tags cannot grow the cache.
    pub fn resolve_at(&mut self, language: &str, at: DateTime<Utc>) -> CulturalContext {
        if !self.tables.knows(language) {
            return build_context(&self.tables, language, at);
        }
        let tables = &self.tables;
        let context = self
            .cache
            .entry(language.to_string())
            .or_insert_with(|| build_context(tables, language, at));
        context.last_interaction = at;
        context.clone()
    }
}

fn build_context(tables: &CulturalTables, language: &str, at: DateTime<Utc>) -> CulturalContext {
    let lookup = |table: &BTreeMap<String, String>, fallback: &str| {
        table
            .get(language)
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    };
    CulturalContext {
        language: language.to_string(),
        region: lookup(&tables.regions, FALLBACK_REGION),
        confidence: tables.confidence(language),
        last_interaction: at,
        respect_level: lookup(&tables.respect, FALLBACK_RESPECT),
        greeting: lookup(&tables.greetings, FALLBACK_GREETING),
    }
}
