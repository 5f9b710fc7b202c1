//! Integration tests exercising the core pipeline across modules:
//! culture → affect → importance → record → similarity → consolidation.

use chrono::Utc;
use luna_core::{
    AffectState, ConsolidationStrategy, CultureResolver, EmotionalEngine, ImportanceScorer,
    MemoryId, MemoryKind, MemoryRecord, NewMemory, normalize_language_tag, plan_consolidation,
    similarity,
};

/// Minimal stand-in for a store: ids in insertion order.
fn remember(
    records: &mut Vec<MemoryRecord>,
    engine: &mut EmotionalEngine,
    culture: &mut CultureResolver,
    scorer: &ImportanceScorer,
    text: &str,
    language: &str,
) {
    let language = normalize_language_tag(language);
    let context = culture.resolve(&language);
    let sentiment = engine.process_input(text);
    assert!((-1.0..=1.0).contains(&sentiment));
    engine.update_language_fluency(&language, context.confidence);
    engine.update_cultural_awareness();

    let id = MemoryId(records.len() as i64 + 1);
    let memory = NewMemory::new(
        MemoryKind::Experience,
        text,
        language,
        scorer.score(text),
        engine.snapshot(),
    )
    .with_cultural_context(context);
    records.push(memory.into_record(id, Utc::now()));
}

#[test]
fn snapshots_are_historical() {
    let mut engine = EmotionalEngine::default();
    let mut culture = CultureResolver::default();
    let scorer = ImportanceScorer::default();
    let mut records = Vec::new();

    remember(&mut records, &mut engine, &mut culture, &scorer, "a great day", "en");
    let first = records[0].emotional_snapshot.clone();

    for _ in 0..5 {
        remember(&mut records, &mut engine, &mut culture, &scorer, "awful terrible news", "en");
    }

    assert_eq!(records[0].emotional_snapshot, first);
    assert_ne!(records[0].emotional_snapshot, *engine.state());
    assert!(engine.state().mood < first.mood);
}

#[test]
fn language_tags_are_normalized_and_tracked() {
    let mut engine = EmotionalEngine::default();
    let mut culture = CultureResolver::default();
    let scorer = ImportanceScorer::default();
    let mut records = Vec::new();

    remember(&mut records, &mut engine, &mut culture, &scorer, "hola amigo", "es-MX");
    remember(&mut records, &mut engine, &mut culture, &scorer, "konnichiwa", "jpn");

    assert_eq!(records[0].language, "es");
    assert_eq!(records[1].language, "ja");
    let ja = records[1].cultural_context.as_ref().unwrap();
    assert_eq!(ja.region, "Japanese");
    assert!(engine.state().fluency("ja") > engine.state().fluency("es"));
    assert!(engine.state().cultural_awareness > 0.0);
}

#[test]
fn twenty_happy_inputs_stay_bounded() {
    let mut engine = EmotionalEngine::default();
    let mut culture = CultureResolver::default();
    let scorer = ImportanceScorer::default();
    let mut records = Vec::new();

    for i in 0..20 {
        remember(
            &mut records,
            &mut engine,
            &mut culture,
            &scorer,
            &format!("happy moment number {i}"),
            "en",
        );
        let s = engine.state();
        assert!(s.happiness <= 1.0, "happiness escaped at step {i}");
        assert!((-1.0..=1.0).contains(&s.mood), "mood escaped at step {i}");
    }
    assert!(records.iter().all(|r| r.importance == 0.8));
}

#[test]
fn consolidation_scenarios() {
    let mut engine = EmotionalEngine::default();
    let mut culture = CultureResolver::default();
    let scorer = ImportanceScorer::default();
    let mut records = Vec::new();

    for text in [
        "I love sunny mornings",
        "I love sunny days",
        "the cat sat on the mat",
        "the cat sat on the mat today",
    ] {
        remember(&mut records, &mut engine, &mut culture, &scorer, text, "en");
    }

    let plan = plan_consolidation(&records, 0.8, ConsolidationStrategy::AllPairs);
    let merged: Vec<_> = plan.updates.iter().map(|u| u.id).collect();
    assert_eq!(merged, vec![MemoryId(3), MemoryId(4)]);

    for update in &plan.updates {
        let r = records.iter_mut().find(|r| r.id == update.id).unwrap();
        update.apply_to(r);
    }
    assert!(records[2].associations.contains(&MemoryId(4)));
    assert!(records[3].associations.contains(&MemoryId(3)));
    assert!(records[0].associations.is_empty());
    assert_eq!(records[2].importance, records[3].importance);
}

#[test]
fn similarity_ranking_example() {
    let candidates = ["hello world", "goodbye now"];
    let mut scored: Vec<(f64, &str)> = candidates
        .iter()
        .map(|c| (similarity("hello there", c), *c))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    assert_eq!(scored[0].1, "hello world");
    assert!((scored[0].0 - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(scored[1].0, 0.0);
}

#[test]
fn default_state_matches_engine_start() {
    assert_eq!(*EmotionalEngine::default().state(), AffectState::default());
}
