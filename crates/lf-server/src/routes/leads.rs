use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use lf_core::entities::{Lead, NewLead};
use lf_core::enums::LeadStatus;
use lf_core::import::{check_file_name, parse_csv};
use lf_core::responses::{ImportResult, LeadActionResponse};
use lf_db::repos::lead::LeadFilter;
use lf_db::updates::lead::LeadUpdate;
use serde::Deserialize;

use super::check_limit;
use crate::{ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/leads/", get(list_leads).post(create_lead))
        .route("/leads/import-csv/", post(import_csv))
        .route("/leads/{id}", get(get_lead).put(update_lead))
        .route("/leads/{id}/retry-call", post(retry_call))
        .route("/leads/{id}/retry-entry", post(retry_entry))
        .route("/leads/{id}/mark-confirmed", post(mark_confirmed))
        .route("/leads/{id}/status", post(set_status))
}

#[derive(Debug, Deserialize)]
struct LeadQuery {
    #[serde(default)]
    skip: u32,
    #[serde(default = "default_limit")]
    limit: u32,
    status: Option<LeadStatus>,
}

const fn default_limit() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: LeadStatus,
    reason: Option<String>,
}

async fn list_leads(
    State(state): State<AppState>,
    query: Result<Query<LeadQuery>, QueryRejection>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    let Query(q) = query?;
    let filter = LeadFilter {
        skip: q.skip,
        limit: check_limit(q.limit)?,
        status: q.status,
    };
    Ok(Json(state.service.list_leads(&filter).await?))
}

async fn create_lead(
    State(state): State<AppState>,
    body: Result<Json<NewLead>, JsonRejection>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let Json(new) = body?;
    let lead = state.service.create_lead(&new, "manual").await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

async fn get_lead(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Lead>, ApiError> {
    Ok(Json(state.service.get_lead(id).await?))
}

async fn update_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<LeadUpdate>, JsonRejection>,
) -> Result<Json<Lead>, ApiError> {
    let Json(update) = body?;
    Ok(Json(state.service.update_lead(id, update).await?))
}

async fn import_csv(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<ImportResult>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        check_file_name(&file_name)?;
        let bytes = field.bytes().await?;
        let parsed = parse_csv(&bytes)?;
        let result = state.service.import_leads(parsed, Some(&file_name)).await?;
        return Ok(Json(result));
    }
    Err(ApiError::bad_request("missing multipart field 'file'"))
}

async fn retry_call(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LeadActionResponse>, ApiError> {
    let outcome = state.service.retry_call(id).await?;
    Ok(Json(LeadActionResponse {
        message: format!("Lead {id} marked for call retry"),
        lead: outcome.lead,
    }))
}

async fn retry_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LeadActionResponse>, ApiError> {
    let outcome = state.service.retry_entry(id).await?;
    Ok(Json(LeadActionResponse {
        message: format!("Lead {id} marked for data entry retry"),
        lead: outcome.lead,
    }))
}

async fn mark_confirmed(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LeadActionResponse>, ApiError> {
    let outcome = state.service.mark_confirmed(id).await?;
    Ok(Json(LeadActionResponse {
        message: format!("Lead {id} manually marked as confirmed"),
        lead: outcome.lead,
    }))
}

/// Privileged override: bypasses the lifecycle rules but is still audited.
async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<LeadActionResponse>, ApiError> {
    let Json(body) = body?;
    let lead = state
        .service
        .override_status(id, body.status, body.reason.as_deref())
        .await?;
    Ok(Json(LeadActionResponse {
        message: format!("Lead {id} status set to {}", body.status),
        lead,
    }))
}
