use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::get;
use axum::{Json, Router};
use lf_core::entities::CallAttemptSettings;

use crate::{ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/settings/call-attempts",
        get(get_call_attempts).post(set_call_attempts),
    )
}

async fn get_call_attempts(State(state): State<AppState>) -> Result<Json<CallAttemptSettings>, ApiError> {
    let caps = state.service.get_call_settings().await?;
    Ok(Json(caps.unwrap_or(state.default_caps)))
}

async fn set_call_attempts(
    State(state): State<AppState>,
    body: Result<Json<CallAttemptSettings>, JsonRejection>,
) -> Result<Json<CallAttemptSettings>, ApiError> {
    let Json(caps) = body?;
    Ok(Json(state.service.set_call_settings(&caps).await?))
}
