//! Outbound voice calls.
//!
//! The voice agent reaches the telephony vendor only through [`Dialer`].
//! [`HttpDialer`] speaks the vendor's REST API; call outcomes come back
//! asynchronously through the `/webhooks/voice` endpoint.

use async_trait::async_trait;
use lf_config::VoiceConfig;
use lf_core::entities::Lead;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AgentError;
use crate::http::{build_client, check_response};

/// One call to place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialRequest {
    pub call_log_id: i64,
    pub lead_id: i64,
    /// E.164 number.
    pub phone_number: String,
    pub customer_name: String,
    /// Contact details the assistant reads back for confirmation.
    pub lead_data: serde_json::Value,
}

impl DialRequest {
    #[must_use]
    pub fn for_lead(call_log_id: i64, phone_number: String, lead: &Lead) -> Self {
        Self {
            call_log_id,
            lead_id: lead.id,
            phone_number,
            customer_name: lead.full_name(),
            lead_data: json!({
                "first_name": lead.first_name,
                "last_name": lead.last_name,
                "email": lead.email,
                "phone": lead.phone,
                "address": lead.address,
                "city": lead.city,
                "state": lead.state,
                "zip_code": lead.zip,
            }),
        }
    }
}

/// Vendor acknowledgement of a placed call.
#[derive(Debug, Clone, PartialEq)]
pub struct DialResponse {
    pub call_sid: String,
    pub vendor_data: Option<serde_json::Value>,
}

#[async_trait]
pub trait Dialer: Send + Sync {
    /// Place the call. The result only means the vendor accepted it.
    async fn dial(&self, request: &DialRequest) -> Result<DialResponse, AgentError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CreatedCall {
    id: String,
}

pub struct HttpDialer {
    http: reqwest::Client,
    config: VoiceConfig,
}

impl HttpDialer {
    /// # Errors
    ///
    /// Returns `AgentError::NotConfigured` if the voice section lacks an
    /// endpoint, API key or assistant id.
    pub fn from_config(config: &VoiceConfig) -> Result<Self, AgentError> {
        if !config.is_configured() {
            return Err(AgentError::NotConfigured("voice"));
        }
        Ok(Self {
            http: build_client()?,
            config: config.clone(),
        })
    }

    fn payload(&self, request: &DialRequest) -> serde_json::Value {
        let mut payload = json!({
            "assistantId": self.config.assistant_id,
            "customer": {
                "number": request.phone_number,
                "name": request.customer_name,
            },
            "metadata": {
                "lead_id": request.lead_id,
                "call_log_id": request.call_log_id,
            },
            "assistantOverrides": {
                "variableValues": { "leadData": request.lead_data },
            },
        });
        if !self.config.phone_number_id.is_empty() {
            payload["phoneNumberId"] = json!(self.config.phone_number_id);
        }
        payload
    }
}

#[async_trait]
impl Dialer for HttpDialer {
    async fn dial(&self, request: &DialRequest) -> Result<DialResponse, AgentError> {
        let url = format!("{}/call", self.config.endpoint.trim_end_matches('/'));
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.payload(request))
            .send()
            .await?;
        let body: serde_json::Value = check_response(resp).await?.json().await?;
        let created: CreatedCall = serde_json::from_value(body.clone()).map_err(|e| AgentError::Api {
            status: 200,
            message: format!("call response without id: {e}"),
        })?;
        Ok(DialResponse {
            call_sid: created.id,
            vendor_data: Some(body),
        })
    }
}
