use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use luna_core::{AffectState, CulturalContext, MemoryId, MemoryKind, MemoryRecord, NewMemory};

use crate::error::{Result, StoreError};
use crate::schema;
use crate::table::RecordTable;

const AFFECT_KEY: &str = "affect_state";
const PROCESSED_KEY: &str = "processed_inputs";

const SELECT_MEMORY: &str = "SELECT id, kind, content, language, importance, created_at,
        last_accessed_at, emotional_snapshot, cultural_context
 FROM memories";

/// SQLite-backed record table plus key/value metadata.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        tracing::info!(path = %path.display(), "opened memory store");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Affect ---

    /// The persisted affect state, re-clamped into its bounds.
    pub fn load_affect(&self) -> Result<Option<AffectState>> {
        let Some(json) = self.get_metadata(AFFECT_KEY)? else {
            return Ok(None);
        };
        let state: AffectState = serde_json::from_str(&json)
            .map_err(|e| StoreError::InvalidData(format!("invalid affect state: {e}")))?;
        Ok(Some(state.clamped()))
    }

    pub fn save_affect(&self, state: &AffectState) -> Result<()> {
        let json = serde_json::to_string(state)
            .map_err(|e| StoreError::InvalidData(format!("affect state encode failed: {e}")))?;
        self.set_metadata(AFFECT_KEY, &json)
    }

    /// Inputs processed across all sessions, for the consolidation schedule.
    pub fn load_processed(&self) -> Result<u32> {
        match self.get_metadata(PROCESSED_KEY)? {
            Some(v) => v
                .parse()
                .map_err(|e| StoreError::InvalidData(format!("invalid input counter '{v}': {e}"))),
            None => Ok(0),
        }
    }

    pub fn save_processed(&self, processed: u32) -> Result<()> {
        self.set_metadata(PROCESSED_KEY, &processed.to_string())
    }

    // --- Counts ---

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT count(*) FROM memories", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // --- Rows ---

    fn load_associations(&self, id: MemoryId) -> Result<BTreeSet<MemoryId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT associated_id FROM associations WHERE memory_id = ?1")?;
        let ids = stmt
            .query_map([id.0], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(MemoryId))
            .collect::<std::result::Result<_, _>>()?;
        Ok(ids)
    }

    fn load_all_associations(&self) -> Result<BTreeMap<MemoryId, BTreeSet<MemoryId>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT memory_id, associated_id FROM associations")?;
        let pairs: Vec<(i64, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;

        let mut map: BTreeMap<MemoryId, BTreeSet<MemoryId>> = BTreeMap::new();
        for (from, to) in pairs {
            map.entry(MemoryId(from)).or_default().insert(MemoryId(to));
        }
        Ok(map)
    }
}

impl RecordTable for Store {
    fn add(&mut self, memory: &NewMemory, accessed_at: DateTime<Utc>) -> Result<MemoryId> {
        let snapshot = encode(&memory.emotional_snapshot, "emotional snapshot")?;
        let context = memory
            .cultural_context
            .as_ref()
            .map(|c| encode(c, "cultural context"))
            .transpose()?;

        self.conn.execute(
            "INSERT INTO memories (kind, content, language, importance, created_at,
                 last_accessed_at, emotional_snapshot, cultural_context)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                memory.kind.as_str(),
                memory.content,
                memory.language,
                memory.importance,
                memory.created_at.to_rfc3339(),
                accessed_at.to_rfc3339(),
                snapshot,
                context,
            ],
        )?;
        Ok(MemoryId(self.conn.last_insert_rowid()))
    }

    fn get(&self, id: MemoryId) -> Result<Option<MemoryRecord>> {
        let row = self
            .conn
            .query_row(&format!("{SELECT_MEMORY} WHERE id = ?1"), [id.0], RawRow::read)
            .optional()?;
        match row {
            Some(raw) => {
                let associations = self.load_associations(id)?;
                Ok(Some(raw.into_record(associations)?))
            }
            None => Ok(None),
        }
    }

    fn update(&mut self, record: &MemoryRecord) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let rows = tx.execute(
            "UPDATE memories SET importance = ?1, last_accessed_at = ?2 WHERE id = ?3",
            params![
                record.importance,
                record.last_accessed_at.to_rfc3339(),
                record.id.0
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(record.id));
        }
        {
            let mut link = tx.prepare(
                "INSERT OR IGNORE INTO associations (memory_id, associated_id) VALUES (?1, ?2)",
            )?;
            for other in &record.associations {
                link.execute(params![record.id.0, other.0])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn to_vec(&self) -> Result<Vec<MemoryRecord>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_MEMORY} ORDER BY id"))?;
        let rows: Vec<RawRow> = stmt
            .query_map([], RawRow::read)?
            .collect::<std::result::Result<_, _>>()?;

        let mut associations = self.load_all_associations()?;
        rows.into_iter()
            .map(|raw| {
                let links = associations.remove(&MemoryId(raw.id)).unwrap_or_default();
                raw.into_record(links)
            })
            .collect()
    }
}

/// Column values as stored, before JSON and timestamp decoding.
struct RawRow {
    id: i64,
    kind: String,
    content: String,
    language: String,
    importance: f64,
    created_at: String,
    last_accessed_at: String,
    emotional_snapshot: String,
    cultural_context: Option<String>,
}

impl RawRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            content: row.get(2)?,
            language: row.get(3)?,
            importance: row.get(4)?,
            created_at: row.get(5)?,
            last_accessed_at: row.get(6)?,
            emotional_snapshot: row.get(7)?,
            cultural_context: row.get(8)?,
        })
    }

    fn into_record(self, associations: BTreeSet<MemoryId>) -> Result<MemoryRecord> {
        let emotional_snapshot: AffectState = decode(&self.emotional_snapshot, "emotional snapshot")?;
        let cultural_context: Option<CulturalContext> = self
            .cultural_context
            .as_deref()
            .map(|json| decode(json, "cultural context"))
            .transpose()?;

        Ok(MemoryRecord {
            id: MemoryId(self.id),
            kind: MemoryKind::from_str_lossy(&self.kind),
            content: self.content,
            language: self.language,
            importance: self.importance,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            last_accessed_at: parse_timestamp(&self.last_accessed_at, "last_accessed_at")?,
            emotional_snapshot,
            cultural_context,
            associations,
        })
    }
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("invalid {field} timestamp '{value}': {e}")))
}

fn encode<T: serde::Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| StoreError::InvalidData(format!("{what} encode failed: {e}")))
}

fn decode<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| StoreError::InvalidData(format!("invalid {what}: {e}")))
}
