//! # lf-server
//!
//! The JSON API the Leadflow dashboard talks to, plus the voice vendor's
//! webhook. Handlers are thin: every rule lives in `lf_db::service::LeadService`
//! and `lf_agents::AgentSupervisor`.

pub mod error;
mod routes;

use std::sync::Arc;

use axum::Router;
use lf_agents::AgentSupervisor;
use lf_config::ServerConfig;
use lf_core::entities::CallAttemptSettings;
use lf_db::service::LeadService;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LeadService>,
    pub agents: Arc<AgentSupervisor>,
    /// Served by `GET /settings/call-attempts` until an operator saves caps.
    pub default_caps: CallAttemptSettings,
}

/// Build the API router.
pub fn router(state: AppState, cors_permissive: bool) -> Router {
    let app = Router::new()
        .merge(routes::leads::routes())
        .merge(routes::logs::routes())
        .merge(routes::stats::routes())
        .merge(routes::agents::routes())
        .merge(routes::settings::routes())
        .merge(routes::webhooks::routes())
        .merge(routes::health::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Bind `config.bind_addr()` and serve until ctrl-c. Running agents are
/// stopped before returning.
///
/// # Errors
///
/// Returns an I/O error if the address cannot be bound.
pub async fn serve(state: AppState, config: &ServerConfig) -> std::io::Result<()> {
    let agents = Arc::clone(&state.agents);
    let app = router(state, config.cors_permissive);
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %listener.local_addr()?, "leadflow api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {e}");
            }
            tracing::info!("shutdown requested");
        })
        .await?;

    if agents.status().await.agents_running {
        if let Err(e) = agents.stop().await {
            tracing::warn!("stopping agents on shutdown: {e}");
        }
    }
    Ok(())
}
