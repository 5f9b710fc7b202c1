use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[[\p{P}\p{S}]--[']]").unwrap());
static APOSTROPHE_TRIM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^'+|'+$").unwrap());

/// Tokenize text into lowercase words.
/// Punctuation and symbols become whitespace; apostrophes inside a word
/// survive ("don't"), leading and trailing ones do not.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned = PUNCTUATION.replace_all(text, " ");
    cleaned
        .to_lowercase()
        .split_whitespace()
        .map(|t| APOSTROPHE_TRIM.replace_all(t, "").to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Unique tokens of `text`. Duplicates within one text count once.
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}
