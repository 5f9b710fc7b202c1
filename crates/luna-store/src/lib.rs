pub mod config;
pub mod consciousness;
pub mod error;
pub mod json_bridge;
pub mod memory;
pub mod schema;
pub mod store;
pub mod table;

pub use config::{
    CONFIG_FILE, DATA_DIR_ENV, DATABASE_FILE, default_data_dir, load_config,
    load_config_or_default, open_data_dir,
};
pub use consciousness::{Consciousness, ProcessOutcome};
pub use error::{Result, StoreError};
pub use json_bridge::ImportReport;
pub use memory::{ConsolidationReport, MemoryStats, MemoryStore, ScoredMemory};
pub use store::Store;
pub use table::{MemoryTable, RecordTable};
