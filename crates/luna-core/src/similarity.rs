//! Lexical similarity between memory contents.
//!
//! Token-set Jaccard index: `|A ∩ B| / |A ∪ B|` over unique tokens.
//! Symmetric, in [0, 1], and defined as 0 when both sides are empty.

use std::collections::HashSet;

use crate::tokenizer::token_set;

/// Jaccard index of two token sets.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|t| large.contains(*t)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Jaccard similarity of two texts after tokenization.
pub fn similarity(a: &str, b: &str) -> f64 {
    jaccard(&token_set(a), &token_set(b))
}
