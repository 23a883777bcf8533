use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use lf_core::responses::{DashboardStats, StatusBreakdown};

use crate::{ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats/dashboard", get(dashboard))
        .route("/stats/status-breakdown", get(status_breakdown))
}

async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.service.dashboard_stats().await?))
}

async fn status_breakdown(State(state): State<AppState>) -> Result<Json<StatusBreakdown>, ApiError> {
    Ok(Json(state.service.status_breakdown().await?))
}
