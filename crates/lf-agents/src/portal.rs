//! Enrollment portal submissions.

use async_trait::async_trait;
use lf_config::PortalConfig;
use lf_core::contact::PortalSubmission;
use serde::Deserialize;

use crate::error::AgentError;
use crate::http::{build_client, check_response};

/// Portal acknowledgement of an accepted lead.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalReceipt {
    pub external_id: String,
    pub response: Option<serde_json::Value>,
}

#[async_trait]
pub trait PortalClient: Send + Sync {
    /// Submit one lead.
    ///
    /// A refusal by the portal is [`AgentError::Rejected`], carrying the
    /// screenshot path when the portal captured one.
    async fn submit(&self, submission: &PortalSubmission) -> Result<PortalReceipt, AgentError>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    lead_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    screenshot_path: Option<String>,
}

pub struct HttpPortalClient {
    http: reqwest::Client,
    config: PortalConfig,
}

impl HttpPortalClient {
    /// # Errors
    ///
    /// Returns `AgentError::NotConfigured` if the portal endpoint is empty.
    pub fn from_config(config: &PortalConfig) -> Result<Self, AgentError> {
        if !config.is_configured() {
            return Err(AgentError::NotConfigured("portal"));
        }
        Ok(Self {
            http: build_client()?,
            config: config.clone(),
        })
    }
}

fn receipt_from(body: serde_json::Value) -> Result<PortalReceipt, AgentError> {
    let parsed: SubmitResponse = serde_json::from_value(body.clone()).map_err(|e| AgentError::Api {
        status: 200,
        message: format!("unreadable portal response: {e}"),
    })?;
    match parsed {
        SubmitResponse {
            success: true,
            lead_id: Some(external_id),
            ..
        } => Ok(PortalReceipt {
            external_id,
            response: Some(body),
        }),
        SubmitResponse {
            error,
            screenshot_path,
            ..
        } => Err(AgentError::Rejected {
            message: error.unwrap_or_else(|| "portal returned no lead id".to_string()),
            screenshot_path,
        }),
    }
}

#[async_trait]
impl PortalClient for HttpPortalClient {
    async fn submit(&self, submission: &PortalSubmission) -> Result<PortalReceipt, AgentError> {
        let url = format!("{}/leads", self.config.endpoint.trim_end_matches('/'));
        let mut request = self.http.post(&url).json(submission);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }
        let body: serde_json::Value = check_response(request.send().await?).await?.json().await?;
        receipt_from(body)
    }
}
