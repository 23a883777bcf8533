//! Database and trail storage configuration.

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    "leadflow.db".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// libSQL database file, or `:memory:`.
    #[serde(default = "default_path")]
    pub path: String,

    /// Directory for JSONL trail files. Empty disables the trail.
    #[serde(default)]
    pub trail_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            trail_dir: String::new(),
        }
    }
}

impl DatabaseConfig {
    pub fn has_trail(&self) -> bool {
        !self.trail_dir.is_empty()
    }
}
