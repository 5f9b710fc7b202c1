//! The coordinator. Owns the emotional engine, the culture resolver and the
//! memory store, and runs one input at a time through all of them.

use serde::Serialize;

use luna_core::{
    AffectState, CultureResolver, CulturalContext, EmotionalEngine, ImportanceScorer, LunaConfig,
    MemoryId, MemoryKind, MemoryRecord, NewMemory, normalize_language_tag, tokenize,
};

use crate::error::{Result, StoreError};
use crate::memory::{ConsolidationReport, MemoryStore, ScoredMemory};
use crate::store::Store;
use crate::table::RecordTable;

/// What one processed input produced.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub id: MemoryId,
    pub language: String,
    /// Keyword heuristic, as stored on the record.
    pub importance: f64,
    /// Lexical sentiment of the input. Reported only, never stored.
    pub sentiment: f64,
    pub mood: f64,
    pub culture: CulturalContext,
    /// Present when this input triggered scheduled consolidation.
    pub consolidation: Option<ConsolidationReport>,
}

pub struct Consciousness<T> {
    memory: MemoryStore<T>,
    engine: EmotionalEngine,
    culture: CultureResolver,
    scorer: ImportanceScorer,
    consolidate_every: u32,
    processed: u32,
}

impl<T: RecordTable> Consciousness<T> {
    pub fn new(
        memory: MemoryStore<T>,
        engine: EmotionalEngine,
        culture: CultureResolver,
        scorer: ImportanceScorer,
        consolidate_every: u32,
    ) -> Self {
        Self {
            memory,
            engine,
            culture,
            scorer,
            consolidate_every,
            processed: 0,
        }
    }

    pub fn from_config(table: T, config: &LunaConfig) -> Result<Self> {
        let memory = MemoryStore::open(table, config.memory, config.consolidation.strategy)?;
        Ok(Self::new(
            memory,
            config.emotional_engine(),
            config.culture_resolver(),
            config.importance_scorer(),
            config.consolidation.every,
        ))
    }

    /// Resolve culture, update affect, score and store the input as an
    /// experience, then consolidate if the schedule says so.
    ///
    /// If the store rejects the record the affect state is rolled back, so
    /// affect only ever reflects inputs that were remembered.
    pub fn process_input(&mut self, text: &str, language: &str) -> Result<ProcessOutcome> {
        if tokenize(text).is_empty() {
            return Err(StoreError::InvalidInput("text has no words".into()));
        }
        let language = normalize_language_tag(language);
        if language.is_empty() {
            return Err(StoreError::InvalidInput("language tag is empty".into()));
        }

        let before = self.engine.snapshot();
        let culture = self.culture.resolve(&language);
        let sentiment = self.engine.process_input(text);
        self.engine
            .update_language_fluency(&language, culture.confidence);
        self.engine.update_cultural_awareness();

        let importance = self.scorer.score(text);
        let memory = NewMemory::new(
            MemoryKind::Experience,
            text,
            language.as_str(),
            importance,
            self.engine.snapshot(),
        )
        .with_cultural_context(culture.clone());

        let id = match self.memory.store(memory) {
            Ok(id) => id,
            Err(e) => {
                self.engine.restore(before);
                return Err(e);
            }
        };

        self.processed = self.processed.wrapping_add(1);
        let consolidation = if self.consolidate_every > 0
            && self.processed % self.consolidate_every == 0
        {
            tracing::debug!(processed = self.processed, "scheduled consolidation");
            Some(self.memory.consolidate())
        } else {
            None
        };

        Ok(ProcessOutcome {
            id,
            language,
            importance,
            sentiment,
            mood: self.engine.state().mood,
            culture,
            consolidation,
        })
    }

    pub fn find_similar_memories(&self, text: &str, limit: usize) -> Vec<ScoredMemory<'_>> {
        self.memory.find_similar(text, limit)
    }

    pub fn search_memories(&self, query: &str) -> Vec<&MemoryRecord> {
        self.memory.search_by_text(query)
    }

    pub fn important_memories(&self) -> Vec<&MemoryRecord> {
        self.memory.important_records()
    }

    pub fn get_memory(&mut self, id: MemoryId) -> Result<Option<MemoryRecord>> {
        self.memory.get(id)
    }

    pub fn affect_state(&self) -> AffectState {
        self.engine.snapshot()
    }

    pub fn restore_affect(&mut self, state: AffectState) {
        self.engine.restore(state);
    }

    pub fn consolidate(&mut self) -> ConsolidationReport {
        self.memory.consolidate()
    }

    /// Inputs counted toward the consolidation schedule.
    pub fn processed(&self) -> u32 {
        self.processed
    }

    pub fn memory(&self) -> &MemoryStore<T> {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryStore<T> {
        &mut self.memory
    }
}

impl Consciousness<Store> {
    /// Restore affect saved by a previous run. Returns whether one existed.
    pub fn load_affect(&mut self) -> Result<bool> {
        match self.memory.table().load_affect()? {
            Some(state) => {
                self.engine.restore(state);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn save_affect(&self) -> Result<()> {
        self.memory.table().save_affect(self.engine.state())
    }

    /// Restore affect and the input counter, so the consolidation schedule
    /// spans process restarts.
    pub fn restore_session(&mut self) -> Result<bool> {
        self.processed = self.memory.table().load_processed()?;
        self.load_affect()
    }

    pub fn persist_session(&self) -> Result<()> {
        self.save_affect()?;
        self.memory.table().save_processed(self.processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::tests::FailingTable;
    use crate::table::MemoryTable;
    use luna_core::ConsolidationConfig;

    fn make_consciousness() -> Consciousness<MemoryTable> {
        Consciousness::from_config(MemoryTable::new(), &LunaConfig::default()).unwrap()
    }

    #[test]
    fn test_process_stores_experience_with_snapshot() {
        let mut c = make_consciousness();
        let outcome = c.process_input("I am so happy today", "en-US").unwrap();

        assert_eq!(outcome.language, "en");
        assert_eq!(outcome.importance, 0.8);
        assert!(outcome.sentiment > 0.0);
        assert_eq!(outcome.culture.region, "Global/Western");

        let record = c.memory().peek(outcome.id).unwrap();
        assert_eq!(record.kind, MemoryKind::Experience);
        assert_eq!(record.language, "en");
        assert_eq!(record.emotional_snapshot, c.affect_state());
        assert_eq!(record.cultural_context.as_ref(), Some(&outcome.culture));
        assert_eq!(c.important_memories().len(), 1);
    }

    #[test]
    fn test_neutral_text_gets_baseline() {
        let mut c = make_consciousness();
        let outcome = c.process_input("the train leaves at noon", "en").unwrap();
        assert_eq!(outcome.importance, 0.5);
        assert_eq!(outcome.sentiment, 0.0);
        assert!(c.important_memories().is_empty());
    }

    #[test]
    fn test_rejects_empty_input() {
        let mut c = make_consciousness();
        assert!(matches!(
            c.process_input("  ?! ", "en"),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            c.process_input("hello", ""),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(c.memory().is_empty());
        assert_eq!(c.affect_state(), AffectState::default());
    }

    #[test]
    fn test_fluency_and_awareness_grow() {
        let mut c = make_consciousness();
        c.process_input("hola amigo", "es").unwrap();
        let state = c.affect_state();
        assert!(state.fluency("es") > 0.0);
        assert!(state.cultural_awareness > 0.0);
    }

    #[test]
    fn test_unknown_language_falls_back() {
        let mut c = make_consciousness();
        let outcome = c.process_input("tere hommikust", "et").unwrap();
        assert_eq!(outcome.culture.region, "Unknown");
        assert_eq!(outcome.culture.greeting, "Hello");
        assert_eq!(outcome.culture.confidence, 0.0);
        assert_eq!(c.affect_state().fluency("et"), 0.0);
    }

    #[test]
    fn test_unknown_tags_do_not_enter_repertoire() {
        let mut c = make_consciousness();
        for i in 0..10 {
            c.process_input("just a note", &format!("zz{i}")).unwrap();
        }
        assert!(c.affect_state().language_fluency.is_empty());

        let before = c.affect_state().cultural_awareness;
        c.process_input("another note", "en").unwrap();
        let state = c.affect_state();
        assert_eq!(state.language_fluency.len(), 1);
        assert!((state.cultural_awareness - before - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_storage_failure_propagates_and_rolls_back_affect() {
        let table = FailingTable {
            fail_add: true,
            ..Default::default()
        };
        let mut c = Consciousness::from_config(table, &LunaConfig::default()).unwrap();
        let err = c.process_input("I love this", "en").unwrap_err();
        assert!(err.is_storage());
        assert_eq!(c.affect_state(), AffectState::default());
        assert_eq!(c.processed(), 0);
    }

    #[test]
    fn test_scheduled_consolidation() {
        let config = LunaConfig {
            consolidation: ConsolidationConfig {
                every: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut c = Consciousness::from_config(MemoryTable::new(), &config).unwrap();

        let first = c.process_input("the cat sat on the mat", "en").unwrap();
        assert!(first.consolidation.is_none());
        let second = c
            .process_input("the cat sat on the mat today", "en")
            .unwrap();
        let report = second.consolidation.unwrap();
        assert_eq!(report.similar_pairs, 1);
        assert!(c
            .memory()
            .peek(first.id)
            .unwrap()
            .associations
            .contains(&second.id));
    }

    #[test]
    fn test_schedule_disabled() {
        let config = LunaConfig {
            consolidation: ConsolidationConfig {
                every: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut c = Consciousness::from_config(MemoryTable::new(), &config).unwrap();
        for _ in 0..5 {
            assert!(c.process_input("same words", "en").unwrap().consolidation.is_none());
        }
    }

    #[test]
    fn test_affect_persists_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memories.db");
        let config = LunaConfig::default();

        let saved = {
            let mut c = Consciousness::from_config(Store::open(&path).unwrap(), &config).unwrap();
            assert!(!c.load_affect().unwrap());
            c.process_input("what a wonderful great day", "en").unwrap();
            c.save_affect().unwrap();
            c.affect_state()
        };

        let mut c = Consciousness::from_config(Store::open(&path).unwrap(), &config).unwrap();
        assert!(c.load_affect().unwrap());
        assert_eq!(c.affect_state(), saved);
        assert_eq!(c.memory().len(), 1);
    }

    #[test]
    fn test_schedule_spans_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memories.db");
        let config = LunaConfig {
            consolidation: ConsolidationConfig {
                every: 2,
                ..Default::default()
            },
            ..Default::default()
        };

        {
            let mut c = Consciousness::from_config(Store::open(&path).unwrap(), &config).unwrap();
            c.restore_session().unwrap();
            let first = c.process_input("first note", "en").unwrap();
            assert!(first.consolidation.is_none());
            c.persist_session().unwrap();
        }

        let mut c = Consciousness::from_config(Store::open(&path).unwrap(), &config).unwrap();
        assert!(c.restore_session().unwrap());
        assert_eq!(c.processed(), 1);
        let second = c.process_input("second note", "en").unwrap();
        assert!(second.consolidation.is_some());
    }

    #[test]
    fn test_find_similar_hello_there() {
        let mut c = make_consciousness();
        let hello = c.process_input("hello world", "en").unwrap();
        c.process_input("goodbye now", "en").unwrap();

        let top = c.find_similar_memories("hello there", 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].record.id, hello.id);
        assert!((top[0].score - 1.0 / 3.0).abs() < 1e-12);

        let all = c.find_similar_memories("hello there", 10);
        assert_eq!(all[1].record.content, "goodbye now");
        assert_eq!(all[1].score, 0.0);
    }

    #[test]
    fn test_similar_and_search() {
        let mut c = make_consciousness();
        c.process_input("hello there", "en").unwrap();
        c.process_input("the weather is cold", "en").unwrap();
        let top = c.find_similar_memories("hello there friend", 1);
        assert_eq!(top[0].record.content, "hello there");
        assert_eq!(c.search_memories("WEATHER").len(), 1);
    }
}
