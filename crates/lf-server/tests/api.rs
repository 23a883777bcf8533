//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use lf_agents::AgentError;
use lf_agents::dialer::{DialRequest, DialResponse, Dialer};
use lf_agents::portal::{PortalClient, PortalReceipt};
use lf_agents::AgentSupervisor;
use lf_config::{AgentsConfig, CallingConfig};
use lf_core::contact::PortalSubmission;
use lf_core::entities::CallAttemptSettings;
use lf_core::enums::{Actor, Trigger};
use lf_db::repos::lifecycle::TransitionRequest;
use lf_db::service::LeadService;
use lf_server::{AppState, router};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

struct StubDialer;

#[async_trait]
impl Dialer for StubDialer {
    async fn dial(&self, request: &DialRequest) -> Result<DialResponse, AgentError> {
        Ok(DialResponse {
            call_sid: format!("call-{}", request.call_log_id),
            vendor_data: None,
        })
    }
}

struct StubPortal;

#[async_trait]
impl PortalClient for StubPortal {
    async fn submit(&self, submission: &PortalSubmission) -> Result<PortalReceipt, AgentError> {
        Ok(PortalReceipt {
            external_id: submission.lead_id.to_string(),
            response: None,
        })
    }
}

async fn app(with_vendors: bool) -> (axum::Router, Arc<LeadService>) {
    let service = Arc::new(LeadService::new_local(":memory:", None).await.unwrap());
    let (dialer, portal): (Option<Arc<dyn Dialer>>, Option<Arc<dyn PortalClient>>) = if with_vendors {
        (Some(Arc::new(StubDialer)), Some(Arc::new(StubPortal)))
    } else {
        (None, None)
    };
    let agents = AgentSupervisor::new(
        Arc::clone(&service),
        dialer,
        portal,
        CallingConfig::default(),
        AgentsConfig {
            voice_poll_secs: 3600,
            entry_poll_secs: 3600,
            ..AgentsConfig::default()
        },
    );
    let state = AppState {
        service: Arc::clone(&service),
        agents: Arc::new(agents),
        default_caps: CallAttemptSettings::default(),
    };
    (router(state, true), service)
}

async fn api(router: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let body = match body {
        Some(v) => Body::from(serde_json::to_string(&v).unwrap()),
        None => Body::empty(),
    };
    send(router, builder.body(body).unwrap()).await
}

async fn send(router: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        json!(null)
    } else {
        serde_json::from_slice(&bytes).unwrap_or(json!(null))
    };
    (status, json)
}

async fn upload(router: &axum::Router, file_name: &str, content: &str) -> (StatusCode, Value) {
    let body = format!(
        "--BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\r\n{content}\r\n--BOUNDARY--\r\n"
    );
    let req = Request::builder()
        .method("POST")
        .uri("/leads/import-csv/")
        .header("content-type", "multipart/form-data; boundary=BOUNDARY")
        .body(Body::from(body))
        .unwrap();
    send(router, req).await
}

async fn create(router: &axum::Router, phone: &str) -> i64 {
    let (status, lead) = api(
        router,
        "POST",
        "/leads/",
        Some(json!({"first_name": "Jane", "last_name": "Doe", "phone": phone})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    lead["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_reports_healthy() {
    let (router, _) = app(false).await;
    let (status, body) = api(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn create_get_and_update_lead() {
    let (router, _) = app(false).await;
    let id = create(&router, "5551234567").await;

    let (status, lead) = api(&router, "GET", &format!("/leads/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lead["status"], "pending");
    assert_eq!(lead["tcpa_opt_in"], false);
    assert_eq!(lead["source"], "manual");

    let (status, lead) = api(&router, "PUT", &format!("/leads/{id}"), Some(json!({"notes": "prefers mornings"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lead["notes"], "prefers mornings");

    let (status, _) = api(&router, "PUT", &format!("/leads/{id}"), Some(json!({"status": "entered"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "status is not writable through update");
}

#[tokio::test]
async fn lead_without_phone_is_rejected() {
    let (router, _) = app(false).await;
    let (status, body) = api(&router, "POST", "/leads/", Some(json!({"first_name": "Jane"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);
}

#[tokio::test]
async fn missing_lead_is_404_with_error_body() {
    let (router, _) = app(false).await;
    let (status, body) = api(&router, "GET", "/leads/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], 404);
    assert!(body["error"]["message"].as_str().unwrap().contains("42"));

    let (status, _) = api(&router, "GET", "/call-logs/lead/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = api(&router, "GET", "/data-entry-logs/lead/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_by_status_and_caps_limit() {
    let (router, _) = app(false).await;
    let first = create(&router, "5551111111").await;
    create(&router, "5552222222").await;
    api(&router, "POST", &format!("/leads/{first}/mark-confirmed"), None).await;

    let (status, leads) = api(&router, "GET", "/leads/?status=confirmed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(leads.as_array().unwrap().len(), 1);
    assert_eq!(leads[0]["id"], first);

    let (_, leads) = api(&router, "GET", "/leads/?skip=0&limit=1", None).await;
    assert_eq!(leads.as_array().unwrap().len(), 1);

    let (status, _) = api(&router, "GET", "/leads/?limit=1001", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = api(&router, "GET", "/leads/?status=archived", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn csv_import_creates_pending_leads() {
    let (router, _) = app(false).await;
    let csv = "First Name,Last Name,Email,Phone,Address,City,State,Zip\n\
               Jane,Doe,jane@x.com,5551234567,1 Main St,Springfield,IL,62701\n\
               John,Roe,john@x.com,,2 Main St,Springfield,IL,62701";
    let (status, body) = upload(&router, "leads.csv", csv).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leads_created"], 1);
    assert_eq!(body["message"], "Successfully imported 1 leads");
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);

    let (_, leads) = api(&router, "GET", "/leads/", None).await;
    assert_eq!(leads[0]["first_name"], "Jane");
    assert_eq!(leads[0]["status"], "pending");
    assert_eq!(leads[0]["tcpa_opt_in"], false);
    assert_eq!(leads[0]["source"], "csv");
}

#[tokio::test]
async fn csv_import_rejects_other_files() {
    let (router, _) = app(false).await;
    let (status, body) = upload(&router, "leads.xlsx", "Phone\n5551234567").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("CSV"));
}

#[tokio::test]
async fn operator_actions_follow_the_lifecycle() {
    let (router, _) = app(false).await;
    let id = create(&router, "5551234567").await;

    let (status, body) = api(&router, "POST", &format!("/leads/{id}/retry-entry"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 409);

    let (status, body) = api(&router, "POST", &format!("/leads/{id}/mark-confirmed"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("Lead {id} manually marked as confirmed"));
    assert_eq!(body["lead"]["status"], "confirmed");

    let (status, body) = api(&router, "POST", &format!("/leads/{id}/retry-call"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("Lead {id} marked for call retry"));
    assert_eq!(body["lead"]["status"], "calling");

    let (_, logs) = api(&router, "GET", &format!("/call-logs/lead/{id}"), None).await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
    assert_eq!(logs[0]["call_status"], "queued");

    // a call that never reported back can be redialed
    let (status, body) = api(&router, "POST", &format!("/leads/{id}/retry-call"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lead"]["status"], "calling");

    let (_, logs) = api(&router, "GET", &format!("/call-logs/lead/{id}"), None).await;
    assert_eq!(logs.as_array().unwrap().len(), 2);
    assert_eq!(logs[0]["call_status"], "failed");
    assert_eq!(logs[1]["call_status"], "queued");
}

#[tokio::test]
async fn status_override_is_privileged_and_unchecked() {
    let (router, _) = app(false).await;
    let id = create(&router, "5551234567").await;

    let (status, body) = api(
        &router,
        "POST",
        &format!("/leads/{id}/status"),
        Some(json!({"status": "entry_failed", "reason": "portal outage"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lead"]["status"], "entry_failed");

    let (status, _) = api(&router, "POST", &format!("/leads/{id}/status"), Some(json!({"status": "lost"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_count_every_status() {
    let (router, _) = app(false).await;
    let id = create(&router, "5551234567").await;
    create(&router, "5552222222").await;
    api(&router, "POST", &format!("/leads/{id}/mark-confirmed"), None).await;

    let (status, stats) = api(&router, "GET", "/stats/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_leads"], 2);
    assert_eq!(stats["pending_leads"], 1);
    assert_eq!(stats["confirmed_leads"], 1);

    let (_, breakdown) = api(&router, "GET", "/stats/status-breakdown", None).await;
    assert_eq!(breakdown["pending"], 1);
    assert_eq!(breakdown["entered"], 0);
}

#[tokio::test]
async fn call_attempt_settings_default_then_persist() {
    let (router, _) = app(false).await;
    let (status, caps) = api(&router, "GET", "/settings/call-attempts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(caps, json!({"day1": 5, "day2": 4, "day3": 2, "day4": 2, "day5": 2, "day6": 0}));

    let new_caps = json!({"day1": 3, "day2": 3, "day3": 1, "day4": 1, "day5": 0, "day6": 0});
    let (status, saved) = api(&router, "POST", "/settings/call-attempts", Some(new_caps.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved, new_caps);

    let (_, caps) = api(&router, "GET", "/settings/call-attempts", None).await;
    assert_eq!(caps, new_caps);

    let (status, _) = api(
        &router,
        "POST",
        "/settings/call-attempts",
        Some(json!({"day1": -1, "day2": 0, "day3": 0, "day4": 0, "day5": 0, "day6": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn agents_start_and_stop() {
    let (router, _) = app(true).await;
    let (_, status) = api(&router, "GET", "/agents/status", None).await;
    assert_eq!(status["agents_running"], false);

    let (code, body) = api(&router, "POST", "/agents/start", None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["message"], "Agents started successfully");
    let (_, body) = api(&router, "POST", "/agents/start", None).await;
    assert_eq!(body["message"], "Agents are already running");

    let (_, status) = api(&router, "GET", "/agents/status", None).await;
    assert_eq!(status["voice_agent_running"], true);
    assert_eq!(status["data_entry_agent_running"], true);

    let (_, body) = api(&router, "POST", "/agents/stop", None).await;
    assert_eq!(body["message"], "Agents stopped successfully");
    let (code, body) = api(&router, "POST", "/agents/stop", None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["message"], "Agents are not running");
}

#[tokio::test]
async fn agents_without_vendors_fail_to_start() {
    let (router, _) = app(false).await;
    let (code, body) = api(&router, "POST", "/agents/start", None).await;
    assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]["message"].as_str().unwrap().contains("voice"));
}

#[tokio::test]
async fn voice_webhook_applies_call_outcome() {
    let (router, service) = app(false).await;
    let id = create(&router, "5551234567").await;
    let outcome = service
        .transition(TransitionRequest::new(id, Trigger::CallInitiated, Actor::VoiceAgent))
        .await
        .unwrap();
    service
        .record_dial(outcome.call_log_id.unwrap(), "vapi-1", None)
        .await
        .unwrap();

    let event = json!({
        "message": {"type": "call-ended"},
        "call": {
            "id": "vapi-1",
            "status": "ended",
            "duration": 95,
            "recordingUrl": "https://rec.example/vapi-1.wav",
            "analysis": {
                "interested": true,
                "tcpa_consent": true,
                "confirmed_email": "jane@x.com",
                "area_of_interest": "nursing"
            }
        }
    });
    let (status, ack) = api(&router, "POST", "/webhooks/voice", Some(event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"status": "processed"}));

    let (_, lead) = api(&router, "GET", &format!("/leads/{id}"), None).await;
    assert_eq!(lead["status"], "confirmed");
    assert_eq!(lead["tcpa_opt_in"], true);
    assert_eq!(lead["confirmed_email"], "jane@x.com");
    assert_eq!(lead["area_of_interest"], "nursing");
}

#[tokio::test]
async fn voice_webhook_ignores_unknown_calls_and_other_events() {
    let (router, _) = app(false).await;
    let (status, ack) = api(
        &router,
        "POST",
        "/webhooks/voice",
        Some(json!({"message": {"type": "call-ended"}, "call": {"id": "nobody"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "ignored");

    let (_, ack) = api(
        &router,
        "POST",
        "/webhooks/voice",
        Some(json!({"message": {"type": "transcript"}})),
    )
    .await;
    assert_eq!(ack["status"], "ignored");

    let (status, _) = api(&router, "POST", "/webhooks/voice", Some(json!({"call": {}}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
