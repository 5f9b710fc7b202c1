use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Serialize;

use luna_core::{AffectState, MemoryExport, MemoryId, RecordUpdate, export_json, import_json};

use crate::consciousness::Consciousness;
use crate::error::{Result, StoreError};
use crate::memory::MemoryStore;
use crate::table::RecordTable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    /// Associations re-linked under the new ids.
    pub associations: usize,
    /// Associations that pointed outside the document.
    pub dropped: usize,
}

impl<T: RecordTable> MemoryStore<T> {
    pub fn export_json_string(&self, affect: Option<AffectState>) -> Result<String> {
        export_json(self.records().cloned().collect(), affect)
            .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }

    /// Append every record of `doc` under fresh ids and remap associations.
    pub fn import_document(&mut self, doc: &MemoryExport) -> Result<ImportReport> {
        let mut source = doc.memories.iter().collect::<Vec<_>>();
        source.sort_by_key(|r| r.id);

        let mut remap: BTreeMap<MemoryId, MemoryId> = BTreeMap::new();
        for record in &source {
            let id = self.store(record.to_new_memory())?;
            remap.insert(record.id, id);
        }

        let mut report = ImportReport {
            imported: source.len(),
            ..Default::default()
        };
        for record in &source {
            let id = remap[&record.id];
            let linked: BTreeSet<MemoryId> = record
                .associations
                .iter()
                .filter_map(|old| remap.get(old).copied())
                .filter(|new| *new != id)
                .collect();
            report.dropped += record.associations.len() - linked.len();
            if linked.is_empty() {
                continue;
            }
            report.associations += linked.len();
            self.apply_update(&RecordUpdate {
                id,
                importance: record.importance,
                associations: linked,
            })?;
        }

        tracing::info!(
            imported = report.imported,
            associations = report.associations,
            dropped = report.dropped,
            "import complete"
        );
        Ok(report)
    }
}

impl<T: RecordTable> Consciousness<T> {
    /// Export every record plus the live affect state.
    pub fn export_json_string(&self) -> Result<String> {
        self.memory().export_json_string(Some(self.affect_state()))
    }

    pub fn export_json_file(&self, path: &Path) -> Result<()> {
        let json = self.export_json_string()?;
        fs::write(path, json).map_err(|e| StoreError::io(path, e))
    }

    /// Import a document. Its affect state, when present, replaces the
    /// live one.
    pub fn import_json_str(&mut self, json: &str) -> Result<ImportReport> {
        let doc =
            import_json(json).map_err(|e| StoreError::InvalidInput(format!("invalid JSON: {e}")))?;
        let report = self.memory_mut().import_document(&doc)?;
        if let Some(affect) = doc.affect {
            self.restore_affect(affect);
        }
        Ok(report)
    }

    pub fn import_json_file(&mut self, path: &Path) -> Result<ImportReport> {
        let json = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        self.import_json_str(&json)
    }
}
