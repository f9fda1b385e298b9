//! Project configuration file (`pgplan.json`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use pgplan_core::codegen::SqlConfig;

/// Project-level configuration. Every field has a default so a minimal
/// `{}` file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Path to the declarative schema file.
    pub schema_path: PathBuf,
    /// Directory migration files are written to.
    pub migrations_dir: PathBuf,
    /// Path to the persisted state snapshot.
    pub state_path: PathBuf,
    /// Target provider (`postgres` or `supabase`).
    pub provider: String,
    /// SQL generation defaults.
    pub sql: SqlConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_path: PathBuf::from("schema.pgplan"),
            migrations_dir: PathBuf::from("migrations"),
            state_path: PathBuf::from("pgplan.state.json"),
            provider: "postgres".to_string(),
            sql: SqlConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize config")
    }
}
