use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::LeadStatus;
use crate::errors::CoreError;

/// An inbound contact record moving through the call / entry workflow.
///
/// `status` is the only mutable current-state pointer; it changes through
/// lifecycle triggers or the privileged override, and every change bumps
/// `version`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Lead {
    pub id: i64,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,

    pub status: LeadStatus,
    pub tcpa_opt_in: bool,

    pub confirmed_email: Option<String>,
    pub confirmed_phone: Option<String>,
    pub confirmed_address: Option<String>,
    pub area_of_interest: Option<String>,

    pub call_sid: Option<String>,
    pub call_duration: Option<i64>,
    pub call_recording_url: Option<String>,
    pub last_called_at: Option<DateTime<Utc>>,

    pub entry_attempts: i64,
    pub external_id: Option<String>,

    pub source: String,
    pub notes: Option<String>,
    pub error_messages: Vec<AgentErrorRecord>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// "First Last", falling back to whichever half is present.
    #[must_use]
    pub fn full_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(n), None) | (None, Some(n)) => n.to_string(),
            (None, None) => String::new(),
        }
    }

    /// Email to submit: the voice-confirmed value wins over the imported one.
    #[must_use]
    pub fn effective_email(&self) -> Option<&str> {
        self.confirmed_email.as_deref().or(self.email.as_deref())
    }

    #[must_use]
    pub fn effective_phone(&self) -> &str {
        self.confirmed_phone.as_deref().unwrap_or(&self.phone)
    }
}

/// One agent failure recorded on a lead.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AgentErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub error: String,
}

/// Input for creating a lead by import or manual add.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct NewLead {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub notes: Option<String>,
}

impl NewLead {
    /// Reject leads the voice agent could never call.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` when the phone is blank.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.phone.trim().is_empty() {
            return Err(CoreError::Validation("phone is required".to_string()));
        }
        Ok(())
    }
}
