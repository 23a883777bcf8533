//! Response types returned as JSON by the HTTP API and the `leadflow` CLI.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::Lead;
use crate::enums::LeadStatus;

/// `GET /stats/dashboard`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DashboardStats {
    pub total_leads: i64,
    pub pending_leads: i64,
    pub calling_leads: i64,
    pub confirmed_leads: i64,
    pub entered_leads: i64,
    /// `call_failed` plus `entry_failed`.
    pub failed_leads: i64,
    /// Percentage of all leads that reached `entered`.
    pub success_rate: f64,
}

impl DashboardStats {
    /// Derive the dashboard headline numbers from a per-status breakdown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_breakdown(b: &StatusBreakdown) -> Self {
        let total = b.total();
        let success_rate = if total > 0 {
            b.entered as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_leads: total,
            pending_leads: b.pending,
            calling_leads: b.calling,
            confirmed_leads: b.confirmed,
            entered_leads: b.entered,
            failed_leads: b.call_failed + b.entry_failed,
            success_rate,
        }
    }
}

/// `GET /stats/status-breakdown`: one count per status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusBreakdown {
    pub pending: i64,
    pub calling: i64,
    pub confirmed: i64,
    pub call_failed: i64,
    pub not_interested: i64,
    pub no_answer: i64,
    pub callback_requested: i64,
    pub entry_in_progress: i64,
    pub entered: i64,
    pub entry_failed: i64,
}

impl StatusBreakdown {
    /// Add `count` to the bucket for `status`.
    pub fn add(&mut self, status: LeadStatus, count: i64) {
        let slot = match status {
            LeadStatus::Pending => &mut self.pending,
            LeadStatus::Calling => &mut self.calling,
            LeadStatus::Confirmed => &mut self.confirmed,
            LeadStatus::CallFailed => &mut self.call_failed,
            LeadStatus::NotInterested => &mut self.not_interested,
            LeadStatus::NoAnswer => &mut self.no_answer,
            LeadStatus::CallbackRequested => &mut self.callback_requested,
            LeadStatus::EntryInProgress => &mut self.entry_in_progress,
            LeadStatus::Entered => &mut self.entered,
            LeadStatus::EntryFailed => &mut self.entry_failed,
        };
        *slot += count;
    }

    #[must_use]
    pub const fn total(&self) -> i64 {
        self.pending
            + self.calling
            + self.confirmed
            + self.call_failed
            + self.not_interested
            + self.no_answer
            + self.callback_requested
            + self.entry_in_progress
            + self.entered
            + self.entry_failed
    }
}

/// `POST /leads/import-csv/`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ImportResult {
    pub message: String,
    pub leads_created: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

/// `GET /agents/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AgentStatus {
    pub voice_agent_running: bool,
    pub data_entry_agent_running: bool,
    pub agents_running: bool,
}

/// Plain acknowledgement, e.g. `{"message": "Agents started successfully"}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of an operator action on a lead.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct LeadActionResponse {
    pub message: String,
    pub lead: Lead,
}

/// Acknowledgement for vendor webhooks: `processed` or `ignored`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct WebhookAck {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl WebhookAck {
    #[must_use]
    pub fn processed() -> Self {
        Self {
            status: "processed".to_string(),
            reason: None,
        }
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        Self {
            status: "ignored".to_string(),
            reason: Some(reason.into()),
        }
    }
}
