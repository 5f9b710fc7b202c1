use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use luna_core::{MemoryId, MemoryRecord, NewMemory};

use crate::error::{Result, StoreError};

/// Ordered, appendable record table keyed by a table-assigned id.
///
/// Ids are unique, never reused, and ascend in insertion order.
/// Any call may fail with a storage error.
pub trait RecordTable {
    /// Insert a record and return its new id.
    fn add(&mut self, memory: &NewMemory, accessed_at: DateTime<Utc>) -> Result<MemoryId>;

    fn get(&self, id: MemoryId) -> Result<Option<MemoryRecord>>;

    /// Overwrite the mutable fields of an existing record.
    fn update(&mut self, record: &MemoryRecord) -> Result<()>;

    /// All records in id order.
    fn to_vec(&self) -> Result<Vec<MemoryRecord>>;
}

/// Volatile table for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryTable {
    rows: BTreeMap<MemoryId, MemoryRecord>,
    next_id: i64,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordTable for MemoryTable {
    fn add(&mut self, memory: &NewMemory, accessed_at: DateTime<Utc>) -> Result<MemoryId> {
        self.next_id += 1;
        let id = MemoryId(self.next_id);
        self.rows
            .insert(id, memory.clone().into_record(id, accessed_at));
        Ok(id)
    }

    fn get(&self, id: MemoryId) -> Result<Option<MemoryRecord>> {
        Ok(self.rows.get(&id).cloned())
    }

    fn update(&mut self, record: &MemoryRecord) -> Result<()> {
        match self.rows.get_mut(&record.id) {
            Some(row) => {
                row.importance = record.importance;
                row.last_accessed_at = record.last_accessed_at;
                row.associations = record.associations.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(record.id)),
        }
    }

    fn to_vec(&self) -> Result<Vec<MemoryRecord>> {
        Ok(self.rows.values().cloned().collect())
    }
}
