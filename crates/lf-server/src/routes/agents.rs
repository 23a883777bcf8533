use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use lf_agents::AgentError;
use lf_core::responses::{AgentStatus, MessageResponse};

use crate::{ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/agents/status", get(status))
        .route("/agents/start", post(start))
        .route("/agents/stop", post(stop))
}

async fn status(State(state): State<AppState>) -> Json<AgentStatus> {
    Json(state.agents.status().await)
}

// Starting twice or stopping idle agents is reported, not failed.
async fn start(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    match state.agents.start().await {
        Ok(()) => Ok(Json(MessageResponse::new("Agents started successfully"))),
        Err(e @ AgentError::AlreadyRunning) => Ok(Json(MessageResponse::new(e.to_string()))),
        Err(e) => Err(e.into()),
    }
}

async fn stop(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    match state.agents.stop().await {
        Ok(()) => Ok(Json(MessageResponse::new("Agents stopped successfully"))),
        Err(e @ AgentError::NotRunning) => Ok(Json(MessageResponse::new(e.to_string()))),
        Err(e) => Err(e.into()),
    }
}
