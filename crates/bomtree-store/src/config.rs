use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Path understood as "private in-memory database".
pub const MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file, or `:memory:`
    pub path: PathBuf,
    /// Maximum pooled connections for file databases
    pub pool_size: u32,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            pool_size: 4,
            busy_timeout_ms: 5000,
        }
    }
}

impl StoreConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }
}

/// `<data dir>/bomtree/bomtree.sqlite`, falling back to the working directory.
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bomtree")
        .join("bomtree.sqlite")
}
