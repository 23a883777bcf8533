use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use lf_core::entities::{CallLog, DataEntryLog};

use super::{Page, check_limit};
use crate::{ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/call-logs/", get(list_call_logs))
        .route("/call-logs/lead/{id}", get(call_logs_for_lead))
        .route("/data-entry-logs/", get(list_entry_logs))
        .route("/data-entry-logs/lead/{id}", get(entry_logs_for_lead))
}

async fn list_call_logs(
    State(state): State<AppState>,
    page: Result<Query<Page>, QueryRejection>,
) -> Result<Json<Vec<CallLog>>, ApiError> {
    let Query(page) = page?;
    let limit = check_limit(page.limit)?;
    Ok(Json(state.service.list_call_logs(page.skip, limit).await?))
}

async fn call_logs_for_lead(
    State(state): State<AppState>,
    Path(lead_id): Path<i64>,
) -> Result<Json<Vec<CallLog>>, ApiError> {
    state.service.get_lead(lead_id).await?;
    Ok(Json(state.service.list_call_logs_for_lead(lead_id).await?))
}

async fn list_entry_logs(
    State(state): State<AppState>,
    page: Result<Query<Page>, QueryRejection>,
) -> Result<Json<Vec<DataEntryLog>>, ApiError> {
    let Query(page) = page?;
    let limit = check_limit(page.limit)?;
    Ok(Json(state.service.list_entry_logs(page.skip, limit).await?))
}

async fn entry_logs_for_lead(
    State(state): State<AppState>,
    Path(lead_id): Path<i64>,
) -> Result<Json<Vec<DataEntryLog>>, ApiError> {
    state.service.get_lead(lead_id).await?;
    Ok(Json(state.service.list_entry_logs_for_lead(lead_id).await?))
}
