//! Engine configuration. Every field has a default, so a partial TOML file
//! (or none at all) is valid.

use serde::{Deserialize, Serialize};

use crate::affect::{EmotionalEngine, Lexicon, Personality};
use crate::consolidate::ConsolidationStrategy;
use crate::constants::{
    BASELINE_IMPORTANCE, CHARGED_IMPORTANCE, CONSOLIDATE_EVERY, IMPORTANT_THRESHOLD,
    MERGE_THRESHOLD,
};
use crate::culture::{CultureResolver, CulturalTables};
use crate::importance::ImportanceScorer;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LunaConfig {
    pub lexicon: LexiconConfig,
    pub personality: Personality,
    pub importance: ImportanceConfig,
    pub culture: CulturalTables,
    pub memory: MemoryConfig,
    pub consolidation: ConsolidationConfig,
}

impl LunaConfig {
    pub fn emotional_engine(&self) -> EmotionalEngine {
        EmotionalEngine::new(
            self.personality,
            Lexicon::new(&self.lexicon.positive, &self.lexicon.negative),
        )
    }

    pub fn culture_resolver(&self) -> CultureResolver {
        CultureResolver::new(self.culture.clone())
    }

    pub fn importance_scorer(&self) -> ImportanceScorer {
        ImportanceScorer::new(
            self.importance.baseline,
            self.importance.charged,
            &self.importance.keywords,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            positive: words(&["happy", "good", "great", "love", "wonderful", "excited"]),
            negative: words(&["sad", "bad", "awful", "hate", "terrible", "angry"]),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportanceConfig {
    pub baseline: f64,
    pub charged: f64,
    pub keywords: Vec<String>,
}

impl Default for ImportanceConfig {
    fn default() -> Self {
        Self {
            baseline: BASELINE_IMPORTANCE,
            charged: CHARGED_IMPORTANCE,
            keywords: words(&["love", "hate", "happy", "sad", "angry", "excited"]),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Importance strictly above this puts a record in the important index.
    pub important_threshold: f64,
    /// Similarity strictly above this merges two records.
    pub merge_threshold: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            important_threshold: IMPORTANT_THRESHOLD,
            merge_threshold: MERGE_THRESHOLD,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// Consolidate after this many processed inputs. 0 disables the schedule.
    pub every: u32,
    pub strategy: ConsolidationStrategy,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            every: CONSOLIDATE_EVERY,
            strategy: ConsolidationStrategy::default(),
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}
