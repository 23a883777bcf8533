use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::CallStatus;

/// One voice-call attempt against a lead.
///
/// Appended in `queued` state on every transition into `calling`. Once
/// `ended_at` is set the row only accepts a late recording reference.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CallLog {
    pub id: i64,
    pub lead_id: i64,
    /// Vendor call id, assigned when the call is dialed.
    pub call_sid: Option<String>,
    pub phone_number: String,
    pub call_status: CallStatus,
    /// Seconds.
    pub duration: Option<i64>,
    pub recording_url: Option<String>,
    pub recording_key: Option<String>,
    pub vendor_data: Option<serde_json::Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CallLog {
    /// Whether the call has ended.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }
}
