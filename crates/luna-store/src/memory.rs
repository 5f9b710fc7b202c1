//! Memory store: an in-process mirror of a [`RecordTable`] plus the
//! important index.
//!
//! Every write goes to the table first. The mirror only changes once the
//! table has accepted the write, so a failed `store` leaves nothing behind
//! and a failed consolidation update leaves the old record in place for
//! the next pass to retry.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::Serialize;

use luna_core::{
    ConsolidationStrategy, MemoryConfig, MemoryId, MemoryRecord, NewMemory, RecordUpdate, jaccard,
    plan_consolidation, token_set,
};

use crate::error::{Result, StoreError};
use crate::table::RecordTable;

/// A record with its similarity to a query.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoredMemory<'a> {
    pub score: f64,
    pub record: &'a MemoryRecord,
}

/// Outcome of one best-effort consolidation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    pub pairs_examined: usize,
    pub similar_pairs: usize,
    pub updated: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub records: usize,
    pub important: usize,
    /// Directed links, so a mutual association counts twice.
    pub associations: usize,
}

pub struct MemoryStore<T> {
    table: T,
    records: BTreeMap<MemoryId, MemoryRecord>,
    important: BTreeSet<MemoryId>,
    config: MemoryConfig,
    strategy: ConsolidationStrategy,
}

impl<T: RecordTable> MemoryStore<T> {
    /// Load every record from `table` and rebuild the important index.
    pub fn open(table: T, config: MemoryConfig, strategy: ConsolidationStrategy) -> Result<Self> {
        let mut records = BTreeMap::new();
        let mut important = BTreeSet::new();
        for record in table.to_vec()? {
            if record.importance > config.important_threshold {
                important.insert(record.id);
            }
            records.insert(record.id, record);
        }
        tracing::debug!(
            records = records.len(),
            important = important.len(),
            "memory store loaded"
        );
        Ok(Self {
            table,
            records,
            important,
            config,
            strategy,
        })
    }

    /// Persist a new record and return its id.
    pub fn store(&mut self, memory: NewMemory) -> Result<MemoryId> {
        let now = Utc::now();
        let id = self.table.add(&memory, now)?;
        let record = memory.into_record(id, now);

        if record.importance > self.config.important_threshold {
            self.important.insert(id);
            tracing::debug!(%id, importance = record.importance, "added to important index");
        }
        tracing::info!(%id, importance = record.importance, "stored memory");
        self.records.insert(id, record);
        Ok(id)
    }

    /// Fetch a record and mark it accessed. Persisting the access time is
    /// best-effort; a failure is logged and the read still succeeds.
    pub fn get(&mut self, id: MemoryId) -> Result<Option<MemoryRecord>> {
        let Some(record) = self.records.get_mut(&id) else {
            return Ok(None);
        };
        record.last_accessed_at = Utc::now();
        if let Err(e) = self.table.update(record) {
            tracing::warn!(%id, error = %e, "failed to persist access time");
        }
        Ok(Some(record.clone()))
    }

    /// Peek at a record without touching its access time.
    pub fn peek(&self, id: MemoryId) -> Option<&MemoryRecord> {
        self.records.get(&id)
    }

    /// Case-insensitive substring filter, in insertion order.
    pub fn search_by_text(&self, query: &str) -> Vec<&MemoryRecord> {
        let needle = query.to_lowercase();
        self.records
            .values()
            .filter(|r| r.content.to_lowercase().contains(&needle))
            .collect()
    }

    /// Up to `limit` records, most similar to `content` first. Equal scores
    /// keep insertion order.
    pub fn find_similar(&self, content: &str, limit: usize) -> Vec<ScoredMemory<'_>> {
        let query = token_set(content);
        let mut scored: Vec<ScoredMemory<'_>> = self
            .records
            .values()
            .map(|record| ScoredMemory {
                score: jaccard(&query, &token_set(&record.content)),
                record,
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        scored
    }

    /// Records in the important index, in id order.
    pub fn important_records(&self) -> Vec<&MemoryRecord> {
        self.important
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// Merge near-duplicate records. Each changed record is persisted on its
    /// own; failures are counted and skipped.
    pub fn consolidate(&mut self) -> ConsolidationReport {
        let snapshot: Vec<MemoryRecord> = self.records.values().cloned().collect();
        let plan = plan_consolidation(&snapshot, self.config.merge_threshold, self.strategy);

        let mut report = ConsolidationReport {
            pairs_examined: plan.pairs_examined,
            similar_pairs: plan.similar_pairs.len(),
            ..Default::default()
        };
        for update in &plan.updates {
            match self.apply_update(update) {
                Ok(()) => report.updated += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(id = %update.id, error = %e, "consolidation update failed");
                }
            }
        }

        tracing::info!(
            pairs_examined = report.pairs_examined,
            merges = report.similar_pairs,
            updated = report.updated,
            failed = report.failed,
            "consolidation complete"
        );
        report
    }

    /// Persist `update` onto its record, then publish it in memory.
    pub(crate) fn apply_update(&mut self, update: &RecordUpdate) -> Result<()> {
        let Some(current) = self.records.get(&update.id) else {
            return Err(StoreError::NotFound(update.id));
        };
        let mut next = current.clone();
        update.apply_to(&mut next);
        self.table.update(&next)?;

        if next.importance > self.config.important_threshold && self.important.insert(next.id) {
            tracing::debug!(id = %next.id, importance = next.importance, "added to important index");
        }
        self.records.insert(next.id, next);
        Ok(())
    }

    /// All records in id order.
    pub fn records(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            records: self.records.len(),
            important: self.important_records().len(),
            associations: self.records.values().map(|r| r.associations.len()).sum(),
        }
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut T {
        &mut self.table
    }
}
