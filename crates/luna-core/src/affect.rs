//! Emotional state engine.
//!
//! One live [`AffectState`] per assistant: four bounded dimensions in [0, 1]
//! (happiness, curiosity, empathy, creativity), a slow mood in [-1, 1],
//! cultural awareness and per-language fluency. Lexical sentiment drives the
//! updates; static [`Personality`] traits scale them. Every update clamps, so
//! arbitrarily long input sequences stay inside the bounds.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::constants::{
    AFFECT_RATE, AWARENESS_RATE, FLUENCY_RATE, MOOD_RATE, MOOD_WEIGHT, clamp_signed, clamp01,
};
use crate::tokenizer::tokenize;

/// Snapshot-able affect vector. Cloning yields an independent copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffectState {
    pub happiness: f64,
    pub curiosity: f64,
    pub empathy: f64,
    pub creativity: f64,
    /// Slow-moving valence, -1 to 1.
    pub mood: f64,
    /// Never decreases.
    pub cultural_awareness: f64,
    /// Language tag to fluency, each entry never decreases.
    #[serde(default)]
    pub language_fluency: BTreeMap<String, f64>,
}

impl Default for AffectState {
    fn default() -> Self {
        Self {
            happiness: 0.7,
            curiosity: 0.8,
            empathy: 0.9,
            creativity: 0.6,
            mood: 0.5,
            cultural_awareness: 0.0,
            language_fluency: BTreeMap::new(),
        }
    }
}

impl AffectState {
    /// Force every field back into its declared range.
    pub fn clamped(mut self) -> Self {
        self.happiness = clamp01(self.happiness);
        self.curiosity = clamp01(self.curiosity);
        self.empathy = clamp01(self.empathy);
        self.creativity = clamp01(self.creativity);
        self.mood = clamp_signed(self.mood);
        self.cultural_awareness = clamp01(self.cultural_awareness);
        for fluency in self.language_fluency.values_mut() {
            *fluency = clamp01(*fluency);
        }
        self
    }

    pub fn fluency(&self, language: &str) -> f64 {
        self.language_fluency.get(language).copied().unwrap_or(0.0)
    }
}

/// Big-five personality traits. Static for the engine's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Personality {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    /// Sensitivity of mood to sentiment.
    pub neuroticism: f64,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            openness: 0.8,
            conscientiousness: 0.7,
            extraversion: 0.6,
            agreeableness: 0.9,
            neuroticism: 0.3,
        }
    }
}

impl Personality {
    pub fn clamped(self) -> Self {
        Self {
            openness: clamp01(self.openness),
            conscientiousness: clamp01(self.conscientiousness),
            extraversion: clamp01(self.extraversion),
            agreeableness: clamp01(self.agreeableness),
            neuroticism: clamp01(self.neuroticism),
        }
    }
}

/// Positive and negative sentiment word lists.
#[derive(Clone, Debug)]
pub struct Lexicon {
    positive: HashSet<String>,
    negative: HashSet<String>,
}

impl Lexicon {
    /// Words are normalized through the tokenizer, so "Happy!" matches "happy".
    pub fn new<P, N>(positive: P, negative: N) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        let normalize = |w: &str| tokenize(w).into_iter().next();
        Self {
            positive: positive
                .into_iter()
                .filter_map(|w| normalize(w.as_ref()))
                .collect(),
            negative: negative
                .into_iter()
                .filter_map(|w| normalize(w.as_ref()))
                .collect(),
        }
    }

    pub fn is_positive(&self, token: &str) -> bool {
        self.positive.contains(token)
    }

    pub fn is_negative(&self, token: &str) -> bool {
        self.negative.contains(token)
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new(
            ["happy", "good", "great", "love", "wonderful", "excited"],
            ["sad", "bad", "awful", "hate", "terrible", "angry"],
        )
    }
}

/// Owner of the live affect state.
#[derive(Clone, Debug, Default)]
pub struct EmotionalEngine {
    state: AffectState,
    personality: Personality,
    lexicon: Lexicon,
}

impl EmotionalEngine {
    pub fn new(personality: Personality, lexicon: Lexicon) -> Self {
        Self {
            state: AffectState::default(),
            personality: personality.clamped(),
            lexicon,
        }
    }

    /// (positive - negative) / token count, so always in [-1, 1].
    /// Text without tokens is neutral.
    pub fn analyze_sentiment(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return 0.0;
        }
        let score: i64 = tokens
            .iter()
            .map(|t| {
                if self.lexicon.is_positive(t) {
                    1
                } else if self.lexicon.is_negative(t) {
                    -1
                } else {
                    0
                }
            })
            .sum();
        score as f64 / tokens.len() as f64
    }

    pub fn update_mood(&mut self, sentiment: f64) {
        let step = sanitize(sentiment) * self.personality.neuroticism * MOOD_RATE;
        self.state.mood = clamp_signed(self.state.mood + step);
    }

    /// One bounded step of every affect dimension. With |sentiment| <= 1 no
    /// single step moves a dimension by more than 0.2.
    pub fn adjust_state(&mut self, sentiment: f64) {
        let sentiment = sanitize(sentiment);
        let mood = self.state.mood;
        let p = self.personality;
        let s = &mut self.state;

        s.happiness = clamp01(s.happiness + sentiment * AFFECT_RATE + mood * MOOD_WEIGHT);
        s.curiosity = clamp01(s.curiosity + p.openness * AFFECT_RATE - mood.abs() * MOOD_WEIGHT);
        s.empathy = clamp01(s.empathy + p.agreeableness * AFFECT_RATE);
        s.creativity = clamp01(s.creativity + p.openness * AFFECT_RATE + mood.max(0.0) * AFFECT_RATE);
    }

    /// Languages only enter the repertoire once they gain fluency.
    pub fn update_language_fluency(&mut self, language: &str, confidence: f64) {
        let gain = clamp01(confidence) * FLUENCY_RATE;
        if gain <= 0.0 {
            return;
        }
        let fluency = self
            .state
            .language_fluency
            .entry(language.to_string())
            .or_insert(0.0);
        *fluency = clamp01(*fluency + gain);
    }

    /// Growth slows as the known-language repertoire widens.
    pub fn update_cultural_awareness(&mut self) {
        let languages = self
            .state
            .language_fluency
            .values()
            .filter(|f| **f > 0.0)
            .count()
            .max(1) as f64;
        self.state.cultural_awareness =
            clamp01(self.state.cultural_awareness + AWARENESS_RATE / languages);
    }

    /// Sentiment, mood, then dimensions. Returns the sentiment.
    pub fn process_input(&mut self, text: &str) -> f64 {
        let sentiment = self.analyze_sentiment(text);
        self.update_mood(sentiment);
        self.adjust_state(sentiment);
        sentiment
    }

    pub fn snapshot(&self) -> AffectState {
        self.state.clone()
    }

    pub fn state(&self) -> &AffectState {
        &self.state
    }

    pub fn personality(&self) -> Personality {
        self.personality
    }

    /// Replace the live state, e.g. with one persisted by a previous run.
    pub fn restore(&mut self, state: AffectState) {
        self.state = state.clamped();
    }
}

fn sanitize(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn in_bounds(s: &AffectState) -> bool {
        let unit = |x: f64| (0.0..=1.0).contains(&x);
        unit(s.happiness)
            && unit(s.curiosity)
            && unit(s.empathy)
            && unit(s.creativity)
            && unit(s.cultural_awareness)
            && (-1.0..=1.0).contains(&s.mood)
            && s.language_fluency.values().all(|f| unit(*f))
    }

    #[test]
    fn test_sentiment_counts() {
        let engine = EmotionalEngine::default();
        assert_relative_eq!(engine.analyze_sentiment("I am happy"), 1.0 / 3.0);
        assert_relative_eq!(engine.analyze_sentiment("sad and angry"), -2.0 / 3.0);
        assert_relative_eq!(engine.analyze_sentiment("good bad"), 0.0);
    }

    #[test]
    fn test_sentiment_ignores_punctuation_and_case() {
        let engine = EmotionalEngine::default();
        assert_relative_eq!(engine.analyze_sentiment("HAPPY!"), 1.0);
    }

    #[test]
    fn test_sentiment_empty_is_neutral() {
        let engine = EmotionalEngine::default();
        assert_eq!(engine.analyze_sentiment(""), 0.0);
        assert_eq!(engine.analyze_sentiment("?!"), 0.0);
    }

    #[test]
    fn test_custom_lexicon_normalized() {
        let engine =
            EmotionalEngine::new(Personality::default(), Lexicon::new(["Joyful!"], ["Grim"]));
        assert_relative_eq!(engine.analyze_sentiment("joyful day"), 0.5);
        assert_relative_eq!(engine.analyze_sentiment("grim"), -1.0);
        assert_eq!(engine.analyze_sentiment("happy"), 0.0);
    }

    #[test]
    fn test_mood_step_scaled_by_neuroticism() {
        let mut engine = EmotionalEngine::default();
        engine.update_mood(1.0);
        assert_relative_eq!(engine.state().mood, 0.5 + 0.3 * 0.1);
    }

    #[test]
    fn test_mood_saturates() {
        let mut engine = EmotionalEngine::default();
        for _ in 0..10_000 {
            engine.update_mood(-1.0);
        }
        assert_eq!(engine.state().mood, -1.0);
    }

    #[test]
    fn test_non_finite_sentiment_ignored() {
        let mut engine = EmotionalEngine::default();
        let before = engine.snapshot();
        engine.update_mood(f64::NAN);
        engine.update_mood(f64::INFINITY);
        assert_eq!(engine.state().mood, before.mood);
        engine.adjust_state(f64::NAN);
        assert!(in_bounds(engine.state()));
    }

    #[test]
    fn test_adjust_state_single_step_bounded() {
        let mut engine = EmotionalEngine::default();
        let before = engine.snapshot();
        engine.adjust_state(1.0);
        let after = engine.state();
        assert!((after.happiness - before.happiness).abs() <= 0.2);
        assert!((after.curiosity - before.curiosity).abs() <= 0.2);
        assert!((after.creativity - before.creativity).abs() <= 0.2);
    }

    #[test]
    fn test_happy_inputs_never_exceed_bounds() {
        let mut engine = EmotionalEngine::default();
        for _ in 0..20 {
            engine.process_input("so happy happy happy today");
            let s = engine.state();
            assert!(s.happiness <= 1.0);
            assert!((-1.0..=1.0).contains(&s.mood));
            assert!(in_bounds(s));
        }
        assert_eq!(engine.state().happiness, 1.0);
    }

    #[test]
    fn test_fluency_monotonic_and_bounded() {
        let mut engine = EmotionalEngine::default();
        let mut last = 0.0;
        for _ in 0..30 {
            engine.update_language_fluency("ja", 0.5);
            let f = engine.state().fluency("ja");
            assert!(f >= last);
            last = f;
        }
        assert_eq!(last, 1.0);
        assert_eq!(engine.state().fluency("fr"), 0.0);
    }

    #[test]
    fn test_fluency_ignores_out_of_range_confidence() {
        let mut engine = EmotionalEngine::default();
        engine.update_language_fluency("en", -5.0);
        assert_eq!(engine.state().fluency("en"), 0.0);
        engine.update_language_fluency("en", 50.0);
        assert_relative_eq!(engine.state().fluency("en"), 0.1);
    }

    #[test]
    fn test_awareness_slows_with_repertoire() {
        let mut one = EmotionalEngine::default();
        one.update_language_fluency("en", 1.0);
        one.update_cultural_awareness();

        let mut four = EmotionalEngine::default();
        for lang in ["en", "es", "ja", "zh"] {
            four.update_language_fluency(lang, 1.0);
        }
        four.update_cultural_awareness();

        assert_relative_eq!(one.state().cultural_awareness, 0.05);
        assert_relative_eq!(four.state().cultural_awareness, 0.0125);
    }

    #[test]
    fn test_zero_confidence_languages_not_known() {
        let mut engine = EmotionalEngine::default();
        for i in 0..50 {
            engine.update_language_fluency(&format!("zz{i}"), 0.0);
        }
        assert!(engine.state().language_fluency.is_empty());

        engine.update_language_fluency("en", 1.0);
        engine.update_cultural_awareness();
        assert_relative_eq!(engine.state().cultural_awareness, 0.05);
    }

    #[test]
    fn test_restored_zero_entries_do_not_slow_awareness() {
        let mut state = AffectState::default();
        state.language_fluency.insert("xx".into(), 0.0);
        state.language_fluency.insert("en".into(), 0.4);
        let mut engine = EmotionalEngine::default();
        engine.restore(state);
        engine.update_cultural_awareness();
        assert_relative_eq!(engine.state().cultural_awareness, 0.05);
    }

    #[test]
    fn test_awareness_saturates() {
        let mut engine = EmotionalEngine::default();
        for _ in 0..100 {
            engine.update_cultural_awareness();
        }
        assert_eq!(engine.state().cultural_awareness, 1.0);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut engine = EmotionalEngine::default();
        let snap = engine.snapshot();
        engine.process_input("terrible awful day");
        engine.update_language_fluency("en", 1.0);
        assert_eq!(snap, AffectState::default());
        assert_ne!(engine.snapshot(), snap);
    }

    #[test]
    fn test_restore_clamps() {
        let mut engine = EmotionalEngine::default();
        let mut wild = AffectState {
            happiness: 4.0,
            mood: -9.0,
            curiosity: f64::NAN,
            ..AffectState::default()
        };
        wild.language_fluency.insert("en".into(), 2.0);
        engine.restore(wild);
        let s = engine.state();
        assert_eq!(s.happiness, 1.0);
        assert_eq!(s.mood, -1.0);
        assert_eq!(s.curiosity, 0.0);
        assert_eq!(s.fluency("en"), 1.0);
    }

    #[test]
    fn test_personality_clamped_on_construction() {
        let wild = Personality {
            neuroticism: 3.0,
            openness: -1.0,
            ..Personality::default()
        };
        let engine = EmotionalEngine::new(wild, Lexicon::default());
        assert_eq!(engine.personality().neuroticism, 1.0);
        assert_eq!(engine.personality().openness, 0.0);
    }
}
