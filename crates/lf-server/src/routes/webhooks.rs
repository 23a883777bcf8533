//! Voice vendor callbacks.
//!
//! Only `call-ended` events change anything. The event's `call.id` is the
//! call sid recorded when the call was dialed.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use lf_core::enums::CallStatus;
use lf_core::lifecycle::CallAnalysis;
use lf_core::responses::WebhookAck;
use lf_db::repos::lifecycle::{CallEndReport, CallEndResult};
use serde::Deserialize;
use serde_json::Value;

use crate::{ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/voice", post(voice_event))
}

#[derive(Debug, Deserialize)]
struct VoiceEvent {
    message: EventMessage,
    call: Option<EventCall>,
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventCall {
    id: String,
    status: Option<String>,
    ended_reason: Option<String>,
    duration: Option<i64>,
    recording_url: Option<String>,
    analysis: Option<CallAnalysis>,
}

impl EventCall {
    /// The vendor's status, else its ended reason, else `completed`.
    fn call_status(&self) -> CallStatus {
        self.status
            .as_deref()
            .and_then(CallStatus::from_vendor)
            .or_else(|| self.ended_reason.as_deref().and_then(status_from_reason))
            .unwrap_or(CallStatus::Completed)
    }
}

fn status_from_reason(reason: &str) -> Option<CallStatus> {
    match reason {
        "customer-did-not-answer" | "voicemail" => Some(CallStatus::NoAnswer),
        "customer-busy" => Some(CallStatus::Busy),
        r if r.contains("error") || r.contains("failed") => Some(CallStatus::Failed),
        _ => None,
    }
}

async fn voice_event(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WebhookAck>, ApiError> {
    let Json(raw) = body?;
    let event: VoiceEvent =
        serde_json::from_value(raw.clone()).map_err(|e| ApiError::bad_request(format!("invalid voice event: {e}")))?;

    if event.message.kind != "call-ended" {
        tracing::debug!(kind = %event.message.kind, "ignoring voice event");
        return Ok(Json(WebhookAck::ignored(format!("event type '{}'", event.message.kind))));
    }
    let Some(call) = event.call else {
        return Ok(Json(WebhookAck::ignored("event has no call")));
    };

    let report = CallEndReport {
        status: call.call_status(),
        duration: call.duration,
        recording_url: call.recording_url,
        analysis: call.analysis,
        vendor_data: Some(raw),
    };
    let ack = match state.service.record_call_end(&call.id, report).await? {
        CallEndResult::Applied(outcome) => {
            tracing::info!(call_sid = %call.id, lead_id = outcome.lead.id, status = %outcome.lead.status, "call ended");
            WebhookAck::processed()
        }
        CallEndResult::RecordingAttached(_) => WebhookAck::processed(),
        CallEndResult::Ignored(reason) => WebhookAck::ignored(reason),
    };
    Ok(Json(ack))
}
