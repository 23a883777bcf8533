use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One portal-entry attempt against a lead. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DataEntryLog {
    pub id: i64,
    pub lead_id: i64,
    /// 1-based, strictly increasing per lead.
    pub attempt_number: i64,
    /// `None` while the attempt is still open.
    pub success: Option<bool>,
    pub external_id: Option<String>,
    pub error_message: Option<String>,
    pub screenshot_path: Option<String>,
    pub response: Option<serde_json::Value>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DataEntryLog {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }
}
