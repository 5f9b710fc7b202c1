/// Records with importance strictly above this join the important index.
pub const IMPORTANT_THRESHOLD: f64 = 0.7;

/// Jaccard similarity strictly above this marks two records as near-duplicates.
pub const MERGE_THRESHOLD: f64 = 0.8;

/// Mood step per unit of sentiment, before personality scaling.
pub const MOOD_RATE: f64 = 0.1;

/// Weight of sentiment, and of personality traits, in one affect step.
pub const AFFECT_RATE: f64 = 0.1;

/// Weight of mood in one affect step.
pub const MOOD_WEIGHT: f64 = 0.05;

/// Fluency gained per unit of cultural confidence.
pub const FLUENCY_RATE: f64 = 0.1;

/// Cultural awareness gained per input, before repertoire scaling.
pub const AWARENESS_RATE: f64 = 0.05;

/// Importance assigned to ordinary input.
pub const BASELINE_IMPORTANCE: f64 = 0.5;

/// Importance assigned to input containing an emotionally charged keyword.
pub const CHARGED_IMPORTANCE: f64 = 0.8;

/// Default number of processed inputs between scheduled consolidations.
pub const CONSOLIDATE_EVERY: u32 = 10;

/// Clamp into [0, 1], mapping NaN to 0.
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// Clamp into [-1, 1], mapping NaN to 0.
pub fn clamp_signed(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(-1.0, 1.0) }
}
