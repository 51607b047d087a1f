use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bomtree_store::StoreConfig;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "bomtree.toml";
pub const DB_ENV: &str = "BOMTREE_DB";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub import: ImportConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    pub skip_header_row: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            skip_header_row: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub include_hierarchy: bool,
    pub include_custom_fields: bool,
}

impl Config {
    /// Load configuration, then apply `BOMTREE_DB` and `--db` in that order.
    ///
    /// Without `--config`, `bomtree.toml` is looked up in the working
    /// directory and then in the user config directory.
    pub fn load(explicit: Option<&Path>, db_override: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => default_locations().into_iter().find(|p| p.is_file()),
        };

        let mut config = match &file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(db) = std::env::var_os(DB_ENV)
            && !db.is_empty()
        {
            config.store.path = PathBuf::from(db);
        }
        if let Some(db) = db_override {
            config.store.path = db.to_path_buf();
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("bomtree").join(CONFIG_FILE));
    }
    locations
}
