//! # lf-config
//!
//! Layered configuration loading for Leadflow using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`LEADFLOW_*` prefix, `__` as separator)
//! 2. Project-level `leadflow.toml`
//! 3. User-level `~/.config/leadflow/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `LEADFLOW_SERVER__PORT` -> `server.port`,
//! `LEADFLOW_VOICE__API_KEY` -> `voice.api_key`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use lf_config::LeadflowConfig;
//!
//! let config = LeadflowConfig::load_with_dotenv().expect("config");
//! if config.voice.is_configured() {
//!     println!("Voice endpoint: {}", config.voice.endpoint);
//! }
//! ```

mod agents;
mod calling;
mod database;
mod error;
mod server;
mod vendors;

pub use agents::AgentsConfig;
pub use calling::{CallSchedule, CallWindow, CallingConfig, DayPlan, SCHEDULE_DAYS, ScheduleDecision};
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use server::ServerConfig;
pub use vendors::{PortalConfig, VoiceConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-local config file name, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "leadflow.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LeadflowConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub calling: CallingConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub portal: PortalConfig,
}

impl LeadflowConfig {
    /// Load configuration from TOML files and environment variables, then
    /// validate it.
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load with `file` layered above the project config and below the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction or validation fails.
    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Self::file_layers();
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        let config: Self = figment.merge(Self::env()).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env` from the current directory, then [`Self::load`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction or validation fails.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    pub fn figment() -> Figment {
        Self::file_layers().merge(Self::env())
    }

    fn env() -> Env {
        Env::prefixed("LEADFLOW_").split("__")
    }

    fn file_layers() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(PROJECT_CONFIG_FILE);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment
    }

    /// Cross-field checks figment cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.calling.validate()?;
        if self.agents.voice_poll_secs == 0 || self.agents.entry_poll_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "agents".into(),
                reason: "poll intervals must be at least 1 second".into(),
            });
        }
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("leadflow").join("config.toml"))
    }
}
