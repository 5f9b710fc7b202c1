use std::path::{Path, PathBuf};
use std::{env, fs};

use luna_core::LunaConfig;

use crate::error::{Result, StoreError};
use crate::store::Store;

pub const DATA_DIR_ENV: &str = "LUNA_DATA_DIR";
pub const DATABASE_FILE: &str = "memories.db";
pub const CONFIG_FILE: &str = "luna.toml";

/// `$LUNA_DATA_DIR`, else `~/.luna`.
pub fn default_data_dir() -> PathBuf {
    env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| dirs_home().join(".luna"))
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Open the database inside `dir`, creating the directory if needed.
pub fn open_data_dir(dir: &Path) -> Result<Store> {
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
    Store::open(&dir.join(DATABASE_FILE))
}

pub fn load_config(path: &Path) -> Result<LunaConfig> {
    let text = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    parse_config(&text).map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))
}

/// Load `path` if it exists, otherwise the defaults. A file that exists
/// but does not parse is still an error.
pub fn load_config_or_default(path: &Path) -> Result<LunaConfig> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(LunaConfig::default())
    }
}

pub fn parse_config(text: &str) -> std::result::Result<LunaConfig, toml::de::Error> {
    toml::from_str(text)
}
