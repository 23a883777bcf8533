//! Status enums, triggers, actors, and audit vocabulary for Leadflow.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! `LeadStatus` provides `allowed_next_states()` to enforce valid transitions at
//! the application layer; the trigger-level rules live in [`crate::lifecycle`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// LeadStatus
// ---------------------------------------------------------------------------

/// Status of a lead through the call / data-entry workflow.
///
/// ```text
/// pending → calling → confirmed → entry_in_progress → entered
///                   → call_failed            → entry_failed → entry_in_progress
///                   → no_answer
///                   → callback_requested
///                   → not_interested
/// (any non-terminal) → calling                     (retry call)
/// (any except entry_in_progress / entered / confirmed) → confirmed (mark confirmed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Pending,
    Calling,
    Confirmed,
    CallFailed,
    NotInterested,
    NoAnswer,
    CallbackRequested,
    EntryInProgress,
    Entered,
    EntryFailed,
}

impl LeadStatus {
    /// Every status, in dashboard display order.
    pub const ALL: [Self; 10] = [
        Self::Pending,
        Self::Calling,
        Self::Confirmed,
        Self::CallFailed,
        Self::NotInterested,
        Self::NoAnswer,
        Self::CallbackRequested,
        Self::EntryInProgress,
        Self::Entered,
        Self::EntryFailed,
    ];

    /// Valid next states from the current state, excluding the privileged
    /// manual override.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Calling, Self::Confirmed],
            Self::Calling => &[
                Self::Calling,
                Self::Confirmed,
                Self::CallFailed,
                Self::NoAnswer,
                Self::CallbackRequested,
                Self::NotInterested,
            ],
            Self::Confirmed => &[Self::Calling, Self::EntryInProgress],
            Self::CallFailed | Self::NoAnswer | Self::CallbackRequested => {
                &[Self::Calling, Self::Confirmed]
            }
            Self::NotInterested => &[Self::Confirmed],
            Self::EntryInProgress => &[Self::Entered, Self::EntryFailed, Self::Calling],
            Self::EntryFailed => &[Self::EntryInProgress, Self::Calling, Self::Confirmed],
            Self::Entered => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Terminal states never see an automatic transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Entered | Self::NotInterested)
    }

    /// Return the string representation used in SQL storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Calling => "calling",
            Self::Confirmed => "confirmed",
            Self::CallFailed => "call_failed",
            Self::NotInterested => "not_interested",
            Self::NoAnswer => "no_answer",
            Self::CallbackRequested => "callback_requested",
            Self::EntryInProgress => "entry_in_progress",
            Self::Entered => "entered",
            Self::EntryFailed => "entry_failed",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("unknown lead status '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// An event that moves a lead between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    CallInitiated,
    CallConfirmed,
    CallFailed,
    NoAnswer,
    CallbackRequested,
    Declined,
    RetryCall,
    EntryStarted,
    EntrySucceeded,
    EntryFailed,
    RetryEntry,
    MarkConfirmed,
}

impl Trigger {
    /// Triggers only a human operator may fire.
    #[must_use]
    pub const fn is_operator_only(self) -> bool {
        matches!(self, Self::RetryEntry | Self::MarkConfirmed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CallInitiated => "call_initiated",
            Self::CallConfirmed => "call_confirmed",
            Self::CallFailed => "call_failed",
            Self::NoAnswer => "no_answer",
            Self::CallbackRequested => "callback_requested",
            Self::Declined => "declined",
            Self::RetryCall => "retry_call",
            Self::EntryStarted => "entry_started",
            Self::EntrySucceeded => "entry_succeeded",
            Self::EntryFailed => "entry_failed",
            Self::RetryEntry => "retry_entry",
            Self::MarkConfirmed => "mark_confirmed",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Who fired a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Operator,
    VoiceAgent,
    DataEntryAgent,
    Webhook,
}

impl Actor {
    /// Agents and vendor callbacks, as opposed to a human operator.
    #[must_use]
    pub const fn is_automatic(self) -> bool {
        !matches!(self, Self::Operator)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::VoiceAgent => "voice_agent",
            Self::DataEntryAgent => "data_entry_agent",
            Self::Webhook => "webhook",
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CallStatus
// ---------------------------------------------------------------------------

/// Technical status of a single call attempt (a `CallLog` row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Queued,
    Initiated,
    Completed,
    Failed,
    NoAnswer,
    Busy,
    Callback,
}

impl CallStatus {
    /// Whether the call has ended (the row is frozen apart from recordings).
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::NoAnswer | Self::Busy | Self::Callback
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Initiated => "initiated",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::NoAnswer => "no_answer",
            Self::Busy => "busy",
            Self::Callback => "callback",
        }
    }

    /// Parse a vendor status string, accepting the dashed variants vendors use.
    #[must_use]
    pub fn from_vendor(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "queued" => Some(Self::Queued),
            "initiated" | "ringing" | "in_progress" | "answered" => Some(Self::Initiated),
            "completed" | "ended" => Some(Self::Completed),
            "failed" | "error" => Some(Self::Failed),
            "no_answer" => Some(Self::NoAnswer),
            "busy" => Some(Self::Busy),
            "callback" => Some(Self::Callback),
            _ => None,
        }
    }
}

impl FromStr for CallStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_vendor(s)
            .filter(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("unknown call status '{s}'")))
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Persisted entity kinds, used by the audit trail and the JSONL trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Lead,
    CallLog,
    DataEntryLog,
    Settings,
}

impl EntityType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::CallLog => "call_log",
            Self::DataEntryLog => "data_entry_log",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuditAction
// ---------------------------------------------------------------------------

/// Action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Imported,
    StatusChanged,
    StatusOverridden,
    SettingsChanged,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Imported => "imported",
            Self::StatusChanged => "status_changed",
            Self::StatusOverridden => "status_overridden",
            Self::SettingsChanged => "settings_changed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TrailOp
// ---------------------------------------------------------------------------

/// Operation type recorded in JSONL trail files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrailOp {
    Create,
    Update,
    Transition,
    Override,
}

impl TrailOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Transition => "transition",
            Self::Override => "override",
        }
    }
}

impl fmt::Display for TrailOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
