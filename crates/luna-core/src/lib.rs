//! Associative memory and affect engine.
//!
//! Memory records carry an emotional snapshot and an importance score.
//! Retrieval is importance- and similarity-driven; near-duplicate records
//! are consolidated by token-set Jaccard similarity. A bounded affect state
//! evolves from lexical sentiment, scaled by static personality traits.
//!
//! Pure computation. Persistence lives in luna-store.

pub mod affect;
pub mod config;
pub mod consolidate;
pub mod constants;
pub mod culture;
pub mod importance;
pub mod memory;
pub mod serde_compat;
pub mod similarity;
pub mod tokenizer;

pub use affect::{AffectState, EmotionalEngine, Lexicon, Personality};
pub use config::{ConsolidationConfig, ImportanceConfig, LexiconConfig, LunaConfig, MemoryConfig};
pub use consolidate::{
    ConsolidationPlan, ConsolidationStrategy, RecordUpdate, SimilarPair, plan_consolidation,
};
pub use constants::{IMPORTANT_THRESHOLD, MERGE_THRESHOLD, clamp_signed, clamp01};
pub use culture::{CulturalContext, CulturalTables, CultureResolver, normalize_language_tag};
pub use importance::ImportanceScorer;
pub use memory::{MemoryId, MemoryKind, MemoryRecord, NewMemory};
pub use serde_compat::{CURRENT_VERSION, MemoryExport, export_json, import_json};
pub use similarity::{jaccard, similarity};
pub use tokenizer::{token_set, tokenize};
