use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::affect::AffectState;
use crate::constants::clamp01;
use crate::culture::CulturalContext;

/// Store-assigned record id. Ascending ids follow insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(pub i64);

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    #[default]
    Experience,
    Knowledge,
    Emotion,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Experience => "experience",
            Self::Knowledge => "knowledge",
            Self::Emotion => "emotion",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "knowledge" => Self::Knowledge,
            "emotion" => Self::Emotion,
            _ => Self::Experience,
        }
    }
}

/// A memory record before the store has assigned it an id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMemory {
    pub kind: MemoryKind,
    pub content: String,
    pub language: String,
    pub importance: f64,
    pub created_at: DateTime<Utc>,
    pub emotional_snapshot: AffectState,
    pub cultural_context: Option<CulturalContext>,
}

impl NewMemory {
    /// Importance is clamped into [0, 1].
    pub fn new(
        kind: MemoryKind,
        content: impl Into<String>,
        language: impl Into<String>,
        importance: f64,
        emotional_snapshot: AffectState,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            language: language.into(),
            importance: clamp01(importance),
            created_at: Utc::now(),
            emotional_snapshot,
            cultural_context: None,
        }
    }

    pub fn with_cultural_context(mut self, context: CulturalContext) -> Self {
        self.cultural_context = Some(context);
        self
    }

    pub fn into_record(self, id: MemoryId, accessed_at: DateTime<Utc>) -> MemoryRecord {
        MemoryRecord {
            id,
            kind: self.kind,
            content: self.content,
            language: self.language,
            importance: clamp01(self.importance),
            created_at: self.created_at,
            last_accessed_at: accessed_at,
            emotional_snapshot: self.emotional_snapshot,
            cultural_context: self.cultural_context,
            associations: BTreeSet::new(),
        }
    }
}

/// A stored memory. Only `importance` (raise-only), `last_accessed_at` and
/// `associations` (grow-only, never self) change after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: MemoryId,
    pub kind: MemoryKind,
    pub content: String,
    pub language: String,
    pub importance: f64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub emotional_snapshot: AffectState,
    #[serde(default)]
    pub cultural_context: Option<CulturalContext>,
    #[serde(default)]
    pub associations: BTreeSet<MemoryId>,
}

impl MemoryRecord {
    /// The record minus its store-assigned fields.
    pub fn to_new_memory(&self) -> NewMemory {
        NewMemory {
            kind: self.kind,
            content: self.content.clone(),
            language: self.language.clone(),
            importance: self.importance,
            created_at: self.created_at,
            emotional_snapshot: self.emotional_snapshot.clone(),
            cultural_context: self.cultural_context.clone(),
        }
    }

    /// Raise importance. Lower values are ignored.
    pub fn raise_importance(&mut self, importance: f64) {
        self.importance = self.importance.max(clamp01(importance));
    }

    /// Add an association. Self-links are ignored. Returns whether it was new.
    pub fn associate(&mut self, other: MemoryId) -> bool {
        other != self.id && self.associations.insert(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, importance: f64) -> MemoryRecord {
        NewMemory::new(
            MemoryKind::Experience,
            "hello world",
            "en",
            importance,
            AffectState::default(),
        )
        .into_record(MemoryId(id), Utc::now())
    }

    #[test]
    fn test_importance_clamped() {
        assert_eq!(record(1, 3.0).importance, 1.0);
        assert_eq!(record(1, -0.2).importance, 0.0);
    }

    #[test]
    fn test_raise_importance_never_lowers() {
        let mut r = record(1, 0.6);
        r.raise_importance(0.4);
        assert_eq!(r.importance, 0.6);
        r.raise_importance(0.9);
        assert_eq!(r.importance, 0.9);
    }

    #[test]
    fn test_associate_rejects_self() {
        let mut r = record(7, 0.5);
        assert!(!r.associate(MemoryId(7)));
        assert!(r.associate(MemoryId(8)));
        assert!(!r.associate(MemoryId(8)));
        assert_eq!(r.associations.len(), 1);
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [MemoryKind::Experience, MemoryKind::Knowledge, MemoryKind::Emotion] {
            assert_eq!(MemoryKind::from_str_lossy(kind.as_str()), kind);
        }
        assert_eq!(MemoryKind::from_str_lossy("junk"), MemoryKind::Experience);
    }

    #[test]
    fn test_to_new_memory_keeps_write_once_fields() {
        let r = record(3, 0.5);
        let n = r.to_new_memory();
        assert_eq!(n.content, r.content);
        assert_eq!(n.created_at, r.created_at);
        assert_eq!(n.emotional_snapshot, r.emotional_snapshot);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut r = record(2, 0.75);
        r.associate(MemoryId(5));
        let json = serde_json::to_string(&r).unwrap();
        let back: MemoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
