use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use lf_agents::AgentSupervisor;
use lf_agents::dialer::{Dialer, HttpDialer};
use lf_agents::portal::{HttpPortalClient, PortalClient};
use lf_config::LeadflowConfig;
use lf_db::service::LeadService;

use crate::cli::GlobalFlags;

/// Load `.env`, then the layered config with `--config` on top of the files.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<LeadflowConfig> {
    if let Err(error) = dotenvy::dotenv() {
        tracing::debug!(%error, "no .env loaded");
    }
    LeadflowConfig::load_from(flags.config.as_deref()).context("failed to load configuration")
}

/// Everything a command needs: config and the opened lead service.
pub struct AppContext {
    pub config: LeadflowConfig,
    pub service: Arc<LeadService>,
}

impl AppContext {
    pub async fn init(config: LeadflowConfig) -> anyhow::Result<Self> {
        let trail_dir = config
            .database
            .has_trail()
            .then(|| PathBuf::from(&config.database.trail_dir));
        let service = LeadService::new_local(&config.database.path, trail_dir)
            .await
            .with_context(|| format!("failed to open database at {}", config.database.path))?;
        Ok(Self {
            config,
            service: Arc::new(service),
        })
    }

    /// Build the agent supervisor. Vendors left unconfigured are logged and
    /// make `start` fail later.
    pub fn supervisor(&self) -> AgentSupervisor {
        let dialer: Option<Arc<dyn Dialer>> = match HttpDialer::from_config(&self.config.voice) {
            Ok(dialer) => Some(Arc::new(dialer)),
            Err(error) => {
                tracing::warn!(%error, "voice dialer unavailable");
                None
            }
        };
        let portal: Option<Arc<dyn PortalClient>> = match HttpPortalClient::from_config(&self.config.portal) {
            Ok(portal) => Some(Arc::new(portal)),
            Err(error) => {
                tracing::warn!(%error, "portal client unavailable");
                None
            }
        };
        AgentSupervisor::new(
            Arc::clone(&self.service),
            dialer,
            portal,
            self.config.calling.clone(),
            self.config.agents.clone(),
        )
    }
}
