//! Lead lifecycle transition rules.
//!
//! [`next_status`] is the single authority on which trigger moves a lead from
//! one [`LeadStatus`] to another. It is pure: persistence, compare-and-swap and
//! log appends happen in `lf-db`, which consults [`log_effect`] to learn which
//! log row a transition owes.
//!
//! The privileged manual override does not pass through this module.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{Actor, CallStatus, LeadStatus, Trigger};
use crate::errors::CoreError;

/// Log row a transition must append in the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEffect {
    None,
    /// A new `CallLog` in `queued` state.
    AppendCallLog,
    /// A new `DataEntryLog` with the next attempt number.
    AppendDataEntryLog,
}

/// Resolve the status reached when `actor` fires `trigger` on a lead in `from`.
///
/// # Errors
///
/// Returns `CoreError::InvalidTransition` when the trigger does not apply to
/// `from`, when an automatic actor tries to leave a terminal state, or when an
/// agent fires an operator-only trigger. The error's `id` is left empty; the
/// caller fills in the lead id via [`with_lead_id`].
pub fn next_status(
    from: LeadStatus,
    trigger: Trigger,
    actor: Actor,
) -> Result<LeadStatus, CoreError> {
    let reject = || CoreError::InvalidTransition {
        entity_type: "lead".to_string(),
        id: String::new(),
        from: from.to_string(),
        trigger: trigger.to_string(),
    };

    if trigger.is_operator_only() && actor.is_automatic() {
        return Err(reject());
    }
    if from.is_terminal() && actor.is_automatic() {
        return Err(reject());
    }

    let to = match (from, trigger) {
        (LeadStatus::Pending, Trigger::CallInitiated) => LeadStatus::Calling,
        (LeadStatus::Calling, Trigger::CallConfirmed) => LeadStatus::Confirmed,
        (LeadStatus::Calling, Trigger::CallFailed) => LeadStatus::CallFailed,
        (LeadStatus::Calling, Trigger::NoAnswer) => LeadStatus::NoAnswer,
        (LeadStatus::Calling, Trigger::CallbackRequested) => LeadStatus::CallbackRequested,
        (LeadStatus::Calling, Trigger::Declined) => LeadStatus::NotInterested,
        (from, Trigger::RetryCall) if !from.is_terminal() => LeadStatus::Calling,
        (LeadStatus::Confirmed, Trigger::EntryStarted) => LeadStatus::EntryInProgress,
        (LeadStatus::EntryInProgress, Trigger::EntrySucceeded) => LeadStatus::Entered,
        (LeadStatus::EntryInProgress, Trigger::EntryFailed) => LeadStatus::EntryFailed,
        (LeadStatus::EntryFailed, Trigger::RetryEntry) => LeadStatus::EntryInProgress,
        (from, Trigger::MarkConfirmed)
            if !matches!(
                from,
                LeadStatus::Entered | LeadStatus::EntryInProgress | LeadStatus::Confirmed
            ) =>
        {
            LeadStatus::Confirmed
        }
        _ => return Err(reject()),
    };

    debug_assert!(from.can_transition_to(to));
    Ok(to)
}

/// Fill the lead id into an `InvalidTransition` error produced by [`next_status`].
#[must_use]
pub fn with_lead_id(err: CoreError, lead_id: i64) -> CoreError {
    match err {
        CoreError::InvalidTransition {
            entity_type,
            from,
            trigger,
            ..
        } => CoreError::InvalidTransition {
            entity_type,
            id: lead_id.to_string(),
            from,
            trigger,
        },
        other => other,
    }
}

/// Which log row a transition into `to` appends.
#[must_use]
pub const fn log_effect(to: LeadStatus) -> LogEffect {
    match to {
        LeadStatus::Calling => LogEffect::AppendCallLog,
        LeadStatus::EntryInProgress => LogEffect::AppendDataEntryLog,
        _ => LogEffect::None,
    }
}

// ---------------------------------------------------------------------------
// Call outcomes
// ---------------------------------------------------------------------------

/// Structured result of a voice conversation, as reported by the voice vendor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct CallAnalysis {
    pub interested: bool,
    pub tcpa_consent: bool,
    pub callback_requested: bool,
    pub confirmed_email: Option<String>,
    pub confirmed_phone: Option<String>,
    pub confirmed_address: Option<String>,
    pub area_of_interest: Option<String>,
}

/// Map a finished call to the trigger it fires on its lead, and the final
/// status recorded on the call log.
///
/// A conversation that produced analysis is judged by the analysis: interest
/// plus consent confirms, a callback request parks the lead, anything else is
/// a decline. Without analysis the call's own status decides.
#[must_use]
pub fn call_outcome(status: CallStatus, analysis: Option<&CallAnalysis>) -> (Trigger, CallStatus) {
    match (status, analysis) {
        (CallStatus::NoAnswer, _) => (Trigger::NoAnswer, CallStatus::NoAnswer),
        (CallStatus::Busy, _) => (Trigger::NoAnswer, CallStatus::Busy),
        (CallStatus::Failed, _) => (Trigger::CallFailed, CallStatus::Failed),
        (_, Some(a)) if a.interested && a.tcpa_consent => {
            (Trigger::CallConfirmed, CallStatus::Completed)
        }
        (_, Some(a)) if a.callback_requested => {
            (Trigger::CallbackRequested, CallStatus::Callback)
        }
        (_, Some(_)) => (Trigger::Declined, CallStatus::Completed),
        (CallStatus::Callback, None) => (Trigger::CallbackRequested, CallStatus::Callback),
        (_, None) => (Trigger::CallFailed, CallStatus::Failed),
    }
}
