//! Versioned JSON export document.
//!
//! Holds the records, in id order, and optionally the live affect state.
//! Ids inside the document are only meaningful relative to each other; an
//! importer assigns fresh ids and remaps associations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::affect::AffectState;
use crate::memory::MemoryRecord;

pub const CURRENT_VERSION: &str = "1";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MemoryExport {
    pub version: String,
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub affect: Option<AffectState>,
    pub memories: Vec<MemoryRecord>,
}

impl MemoryExport {
    pub fn new(memories: Vec<MemoryRecord>, affect: Option<AffectState>) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            exported_at: Utc::now(),
            affect,
            memories,
        }
    }
}

pub fn export_json(
    memories: Vec<MemoryRecord>,
    affect: Option<AffectState>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&MemoryExport::new(memories, affect))
}

pub fn import_json(json: &str) -> serde_json::Result<MemoryExport> {
    serde_json::from_str(json)
}
