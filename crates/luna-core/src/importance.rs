use std::collections::HashSet;

use crate::constants::{BASELINE_IMPORTANCE, CHARGED_IMPORTANCE, clamp01};
use crate::tokenizer::tokenize;

/// Keyword importance heuristic: a fixed baseline, raised to a fixed higher
/// value when the text holds an emotionally charged keyword. Independent of
/// the continuous sentiment signal.
#[derive(Clone, Debug)]
pub struct ImportanceScorer {
    baseline: f64,
    charged: f64,
    keywords: HashSet<String>,
}

impl ImportanceScorer {
    pub fn new<I>(baseline: f64, charged: f64, keywords: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            baseline: clamp01(baseline),
            charged: clamp01(charged),
            keywords: keywords
                .into_iter()
                .filter_map(|k| tokenize(k.as_ref()).into_iter().next())
                .collect(),
        }
    }

    pub fn score(&self, text: &str) -> f64 {
        if tokenize(text).iter().any(|t| self.keywords.contains(t)) {
            self.charged
        } else {
            self.baseline
        }
    }
}

impl Default for ImportanceScorer {
    fn default() -> Self {
        Self::new(
            BASELINE_IMPORTANCE,
            CHARGED_IMPORTANCE,
            ["love", "hate", "happy", "sad", "angry", "excited"],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline() {
        let scorer = ImportanceScorer::default();
        assert_eq!(scorer.score("the weather is mild"), 0.5);
        assert_eq!(scorer.score(""), 0.5);
    }

    #[test]
    fn test_charged_keyword() {
        let scorer = ImportanceScorer::default();
        assert_eq!(scorer.score("I LOVE this!"), 0.8);
        assert_eq!(scorer.score("so angry, so sad"), 0.8);
    }

    #[test]
    fn test_whole_word_match() {
        let scorer = ImportanceScorer::default();
        assert_eq!(scorer.score("a glove and a shatter"), 0.5);
    }

    #[test]
    fn test_custom_values_clamped() {
        let scorer = ImportanceScorer::new(-1.0, 7.0, ["Urgent"]);
        assert_eq!(scorer.score("urgent"), 1.0);
        assert_eq!(scorer.score("calm"), 0.0);
    }
}
