//! Lead lifecycle persistence.
//!
//! Every status change runs under the service write gate inside one
//! transaction: read the lead, resolve the target via
//! [`lf_core::lifecycle::next_status`], compare-and-swap `leads.status`, append
//! the log row the transition owes, and write the audit entry. The JSONL trail
//! is appended after commit.

use chrono::{DateTime, Utc};
use lf_core::audit_detail::TransitionDetail;
use lf_core::contact::to_e164;
use lf_core::entities::{CallLog, DataEntryLog, Lead};
use lf_core::enums::{Actor, AuditAction, CallStatus, EntityType, LeadStatus, TrailOp, Trigger};
use lf_core::errors::CoreError;
use lf_core::lifecycle::{CallAnalysis, LogEffect, call_outcome, log_effect, next_status, with_lead_id};

use crate::error::DatabaseError;
use crate::helpers::{SetClause, opt_int, opt_text, to_json};
use crate::repos::audit::insert_audit;
use crate::repos::call_log::{fetch_call_log, find_call_log_on};
use crate::repos::data_entry_log::fetch_entry_log;
use crate::repos::lead::{append_error_on, fetch_lead};
use crate::service::LeadService;

/// Extra lead columns written together with a status change.
type LeadExtras = Vec<(&'static str, libsql::Value)>;

/// Error recorded on an entry attempt closed because its lead moved on.
pub const ENTRY_ABANDONED: &str = "abandoned: lead left entry_in_progress";

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

/// A trigger fired by an actor against one lead.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub lead_id: i64,
    pub trigger: Trigger,
    pub actor: Actor,
    /// Status the caller observed. A mismatch is a `Conflict`.
    pub expected: Option<LeadStatus>,
    pub reason: Option<String>,
}

impl TransitionRequest {
    #[must_use]
    pub const fn new(lead_id: i64, trigger: Trigger, actor: Actor) -> Self {
        Self {
            lead_id,
            trigger,
            actor,
            expected: None,
            reason: None,
        }
    }

    #[must_use]
    pub const fn expecting(mut self, status: LeadStatus) -> Self {
        self.expected = Some(status);
        self
    }

    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Result of an applied transition.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub lead: Lead,
    pub from: LeadStatus,
    /// Set when the transition entered `calling`.
    pub call_log_id: Option<i64>,
    /// Set when the transition entered `entry_in_progress`.
    pub entry_log_id: Option<i64>,
}

/// A call-ended event reported by the voice vendor.
#[derive(Debug, Clone)]
pub struct CallEndReport {
    pub status: CallStatus,
    pub duration: Option<i64>,
    pub recording_url: Option<String>,
    pub analysis: Option<CallAnalysis>,
    pub vendor_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub enum CallEndResult {
    /// The lead left `calling` through the call's outcome.
    Applied(Box<TransitionOutcome>),
    /// The call had already finished; only its recording was stored.
    RecordingAttached(CallLog),
    /// Nothing changed on the lead.
    Ignored(String),
}

/// Outcome of one portal submission.
#[derive(Debug, Clone)]
pub struct EntryReport {
    pub success: bool,
    pub external_id: Option<String>,
    pub error_message: Option<String>,
    pub screenshot_path: Option<String>,
    pub response: Option<serde_json::Value>,
}

impl EntryReport {
    #[must_use]
    pub fn success(external_id: impl Into<String>, response: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            external_id: Some(external_id.into()),
            error_message: None,
            screenshot_path: None,
            response,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>, screenshot_path: Option<String>) -> Self {
        Self {
            success: false,
            external_id: None,
            error_message: Some(error.into()),
            screenshot_path,
            response: None,
        }
    }
}

// ---------------------------------------------------------------------------
// In-transaction building blocks
// ---------------------------------------------------------------------------

struct Applied {
    from: LeadStatus,
    to: LeadStatus,
    call_log_id: Option<i64>,
    entry_log_id: Option<i64>,
}

fn conflict(lead_id: i64, expected: LeadStatus, actual: LeadStatus) -> DatabaseError {
    DatabaseError::Conflict(format!(
        "lead {lead_id} is {actual}, expected {expected}"
    ))
}

async fn transition_in_tx(
    conn: &libsql::Connection,
    req: &TransitionRequest,
    extras: LeadExtras,
    now: DateTime<Utc>,
) -> Result<Applied, DatabaseError> {
    let lead = fetch_lead(conn, req.lead_id).await?;
    let from = lead.status;
    if let Some(expected) = req.expected
        && expected != from
    {
        return Err(conflict(lead.id, expected, from));
    }

    let to = next_status(from, req.trigger, req.actor).map_err(|e| with_lead_id(e, lead.id))?;
    if matches!(req.trigger, Trigger::EntryStarted | Trigger::RetryEntry) && !lead.tcpa_opt_in {
        return Err(CoreError::Validation(format!(
            "lead {} has no TCPA consent on record",
            lead.id
        ))
        .into());
    }

    let effect = log_effect(to);
    let next_attempt = if effect == LogEffect::AppendDataEntryLog {
        Some(next_attempt_number(conn, lead.id).await?)
    } else {
        None
    };

    let mut sets = SetClause::new();
    sets.set("status", to.as_str());
    sets.set_expr("version", "version + 1");
    sets.set("updated_at", now.to_rfc3339());
    if let Some(attempt) = next_attempt {
        sets.set("entry_attempts", attempt);
    }
    for (column, value) in extras {
        sets.set(column, value);
    }
    let (sql, params) = sets.into_update(
        "leads",
        vec![("id", lead.id.into()), ("status", from.as_str().into())],
    );
    if conn.execute(&sql, libsql::params_from_iter(params)).await? == 0 {
        return Err(DatabaseError::Conflict(format!(
            "lead {} changed status concurrently",
            lead.id
        )));
    }

    if from == LeadStatus::Calling && to == LeadStatus::Calling {
        close_open_call_logs(conn, lead.id, now).await?;
    }
    if from == LeadStatus::EntryInProgress {
        close_open_entry_logs(conn, lead.id, now).await?;
    }

    let mut call_log_id = None;
    let mut entry_log_id = None;
    match effect {
        LogEffect::AppendCallLog => {
            conn.execute(
                "INSERT INTO call_logs (lead_id, phone_number, call_status, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                libsql::params![
                    lead.id,
                    to_e164(lead.effective_phone()),
                    CallStatus::Queued.as_str(),
                    now.to_rfc3339()
                ],
            )
            .await?;
            call_log_id = Some(conn.last_insert_rowid());
        }
        LogEffect::AppendDataEntryLog => {
            conn.execute(
                "INSERT INTO data_entry_logs (lead_id, attempt_number, started_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                libsql::params![
                    lead.id,
                    next_attempt.unwrap_or(1),
                    now.to_rfc3339(),
                    now.to_rfc3339()
                ],
            )
            .await?;
            entry_log_id = Some(conn.last_insert_rowid());
        }
        LogEffect::None => {}
    }

    let detail = to_json(&TransitionDetail {
        from,
        to,
        trigger: Some(req.trigger),
        actor: req.actor,
        reason: req.reason.clone(),
    })?;
    insert_audit(
        conn,
        EntityType::Lead,
        &lead.id.to_string(),
        AuditAction::StatusChanged,
        Some(&detail),
        now,
    )
    .await?;

    Ok(Applied {
        from,
        to,
        call_log_id,
        entry_log_id,
    })
}

/// Fail the lead's unfinished call so a redial starts from a single open call.
async fn close_open_call_logs(
    conn: &libsql::Connection,
    lead_id: i64,
    now: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    let closed = conn
        .execute(
            "UPDATE call_logs SET call_status = ?1, ended_at = ?2
             WHERE lead_id = ?3 AND ended_at IS NULL",
            libsql::params![CallStatus::Failed.as_str(), now.to_rfc3339(), lead_id],
        )
        .await?;
    if closed > 0 {
        tracing::debug!(lead_id, closed, "open call closed before redial");
    }
    Ok(closed)
}

/// Complete the lead's open entry attempts as unsuccessful. Runs whenever a
/// lead leaves `entry_in_progress` by any route other than the attempt's own
/// result, so the data-entry agent never sees them again.
async fn close_open_entry_logs(
    conn: &libsql::Connection,
    lead_id: i64,
    now: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    let closed = conn
        .execute(
            "UPDATE data_entry_logs SET success = 0, error_message = ?1, completed_at = ?2
             WHERE lead_id = ?3 AND completed_at IS NULL",
            libsql::params![ENTRY_ABANDONED, now.to_rfc3339(), lead_id],
        )
        .await?;
    if closed > 0 {
        tracing::debug!(lead_id, closed, "open entry attempt closed");
    }
    Ok(closed)
}

async fn next_attempt_number(conn: &libsql::Connection, lead_id: i64) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT COALESCE(MAX(attempt_number), 0) + 1 FROM data_entry_logs WHERE lead_id = ?1",
            [lead_id],
        )
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    Ok(row.get(0)?)
}

fn analysis_extras(report: &CallEndReport, trigger: Trigger) -> LeadExtras {
    let mut extras: LeadExtras = vec![
        ("call_duration", opt_int(report.duration)),
        ("call_recording_url", opt_text(report.recording_url.as_deref())),
    ];
    if let Some(analysis) = &report.analysis {
        for (column, value) in [
            ("confirmed_email", &analysis.confirmed_email),
            ("confirmed_phone", &analysis.confirmed_phone),
            ("confirmed_address", &analysis.confirmed_address),
            ("area_of_interest", &analysis.area_of_interest),
        ] {
            if let Some(value) = value {
                extras.push((column, value.as_str().into()));
            }
        }
    }
    if trigger == Trigger::CallConfirmed {
        extras.push(("tcpa_opt_in", 1_i64.into()));
    }
    extras
}

// ---------------------------------------------------------------------------
// Service operations
// ---------------------------------------------------------------------------

impl LeadService {
    /// Fire one trigger against a lead.
    ///
    /// # Errors
    ///
    /// * `DatabaseError::NotFound` for an unknown lead.
    /// * `DatabaseError::Core(InvalidTransition)` when the trigger does not apply.
    /// * `DatabaseError::Core(Validation)` when entry is requested without consent.
    /// * `DatabaseError::Conflict` when the lead is not in `req.expected`.
    pub async fn transition(&self, req: TransitionRequest) -> Result<TransitionOutcome, DatabaseError> {
        self.apply_transition(req, Vec::new()).await
    }

    async fn apply_transition(
        &self,
        req: TransitionRequest,
        extras: LeadExtras,
    ) -> Result<TransitionOutcome, DatabaseError> {
        let now = Utc::now();
        let _gate = self.write_gate().await;
        let tx = self.db().conn().transaction().await?;
        let applied = transition_in_tx(&tx, &req, extras, now).await?;
        tx.commit().await?;
        self.finish_transition(&req, applied, now).await
    }

    async fn finish_transition(
        &self,
        req: &TransitionRequest,
        applied: Applied,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, DatabaseError> {
        let lead = self.get_lead(req.lead_id).await?;
        tracing::info!(
            lead_id = lead.id,
            from = %applied.from,
            to = %applied.to,
            trigger = %req.trigger,
            actor = %req.actor,
            "lead transitioned"
        );
        let detail = TransitionDetail {
            from: applied.from,
            to: applied.to,
            trigger: Some(req.trigger),
            actor: req.actor,
            reason: req.reason.clone(),
        };
        self.record_trail(now, req.actor, TrailOp::Transition, EntityType::Lead, lead.id.to_string(), to_json(&detail)?);
        Ok(TransitionOutcome {
            lead,
            from: applied.from,
            call_log_id: applied.call_log_id,
            entry_log_id: applied.entry_log_id,
        })
    }

    /// Operator retry of the voice call.
    ///
    /// # Errors
    ///
    /// See [`LeadService::transition`].
    pub async fn retry_call(&self, lead_id: i64) -> Result<TransitionOutcome, DatabaseError> {
        self.transition(TransitionRequest::new(lead_id, Trigger::RetryCall, Actor::Operator))
            .await
    }

    /// Operator retry of portal entry for an `entry_failed` lead.
    ///
    /// # Errors
    ///
    /// See [`LeadService::transition`].
    pub async fn retry_entry(&self, lead_id: i64) -> Result<TransitionOutcome, DatabaseError> {
        self.transition(TransitionRequest::new(lead_id, Trigger::RetryEntry, Actor::Operator))
            .await
    }

    /// Operator confirmation. Records TCPA consent on the lead.
    ///
    /// # Errors
    ///
    /// See [`LeadService::transition`].
    pub async fn mark_confirmed(&self, lead_id: i64) -> Result<TransitionOutcome, DatabaseError> {
        self.apply_transition(
            TransitionRequest::new(lead_id, Trigger::MarkConfirmed, Actor::Operator),
            vec![("tcpa_opt_in", 1_i64.into())],
        )
        .await
    }

    /// Privileged override to any status, bypassing the transition table.
    ///
    /// Appends no call or entry log. Leaving `entry_in_progress` closes the
    /// lead's open entry attempt.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown lead.
    pub async fn override_status(
        &self,
        lead_id: i64,
        status: LeadStatus,
        reason: Option<&str>,
    ) -> Result<Lead, DatabaseError> {
        let now = Utc::now();
        let _gate = self.write_gate().await;
        let tx = self.db().conn().transaction().await?;
        let lead = fetch_lead(&tx, lead_id).await?;

        let mut sets = SetClause::new();
        sets.set("status", status.as_str());
        sets.set_expr("version", "version + 1");
        sets.set("updated_at", now.to_rfc3339());
        let (sql, params) = sets.into_update(
            "leads",
            vec![("id", lead_id.into()), ("status", lead.status.as_str().into())],
        );
        if tx.execute(&sql, libsql::params_from_iter(params)).await? == 0 {
            return Err(DatabaseError::Conflict(format!(
                "lead {lead_id} changed status concurrently"
            )));
        }
        if lead.status == LeadStatus::EntryInProgress && status != LeadStatus::EntryInProgress {
            close_open_entry_logs(&tx, lead_id, now).await?;
        }

        let detail = to_json(&TransitionDetail {
            from: lead.status,
            to: status,
            trigger: None,
            actor: Actor::Operator,
            reason: reason.map(String::from),
        })?;
        insert_audit(
            &tx,
            EntityType::Lead,
            &lead_id.to_string(),
            AuditAction::StatusOverridden,
            Some(&detail),
            now,
        )
        .await?;
        tx.commit().await?;

        tracing::warn!(lead_id, from = %lead.status, to = %status, "lead status overridden");
        self.record_trail(now, Actor::Operator, TrailOp::Override, EntityType::Lead, lead_id.to_string(), detail);
        self.get_lead(lead_id).await
    }

    /// Record that a queued call was handed to the voice vendor.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Conflict` if the call log is no longer queued.
    pub async fn record_dial(
        &self,
        call_log_id: i64,
        call_sid: &str,
        vendor_data: Option<&serde_json::Value>,
    ) -> Result<CallLog, DatabaseError> {
        let now = Utc::now();
        let _gate = self.write_gate().await;
        let tx = self.db().conn().transaction().await?;
        let log = fetch_call_log(&tx, call_log_id).await?;

        let changed = tx
            .execute(
                "UPDATE call_logs SET call_sid = ?1, call_status = ?2, started_at = ?3, vendor_data = ?4
                 WHERE id = ?5 AND call_status = ?6",
                libsql::params![
                    call_sid,
                    CallStatus::Initiated.as_str(),
                    now.to_rfc3339(),
                    vendor_data.map(ToString::to_string),
                    call_log_id,
                    CallStatus::Queued.as_str()
                ],
            )
            .await?;
        if changed == 0 {
            return Err(DatabaseError::Conflict(format!(
                "call log {call_log_id} is no longer queued"
            )));
        }
        tx.execute(
            "UPDATE leads SET call_sid = ?1, last_called_at = ?2, updated_at = ?2 WHERE id = ?3",
            libsql::params![call_sid, now.to_rfc3339(), log.lead_id],
        )
        .await?;
        insert_audit(
            &tx,
            EntityType::CallLog,
            &call_log_id.to_string(),
            AuditAction::Updated,
            Some(&serde_json::json!({ "fields": ["call_sid", "call_status", "started_at"] })),
            now,
        )
        .await?;
        tx.commit().await?;

        let log = fetch_call_log(self.db().conn(), call_log_id).await?;
        tracing::info!(lead_id = log.lead_id, call_log_id, call_sid, "call dialed");
        self.record_trail(now, Actor::VoiceAgent, TrailOp::Update, EntityType::CallLog, call_log_id.to_string(), to_json(&log)?);
        Ok(log)
    }

    /// Close a queued call the vendor refused, and fail its lead's call.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Conflict` if the call log is no longer queued
    /// or the lead has left `calling`.
    pub async fn record_dial_failure(
        &self,
        call_log_id: i64,
        error: &str,
    ) -> Result<TransitionOutcome, DatabaseError> {
        let now = Utc::now();
        let _gate = self.write_gate().await;
        let tx = self.db().conn().transaction().await?;
        let log = fetch_call_log(&tx, call_log_id).await?;

        let changed = tx
            .execute(
                "UPDATE call_logs SET call_status = ?1, ended_at = ?2
                 WHERE id = ?3 AND call_status = ?4",
                libsql::params![
                    CallStatus::Failed.as_str(),
                    now.to_rfc3339(),
                    call_log_id,
                    CallStatus::Queued.as_str()
                ],
            )
            .await?;
        if changed == 0 {
            return Err(DatabaseError::Conflict(format!(
                "call log {call_log_id} is no longer queued"
            )));
        }
        append_error_on(&tx, log.lead_id, Actor::VoiceAgent, error, now).await?;

        let req = TransitionRequest::new(log.lead_id, Trigger::CallFailed, Actor::VoiceAgent)
            .expecting(LeadStatus::Calling)
            .reason(error);
        let applied = transition_in_tx(&tx, &req, Vec::new(), now).await?;
        tx.commit().await?;
        self.finish_transition(&req, applied, now).await
    }

    /// Close a queued call whose lead has already left `calling`. The lead is
    /// not touched.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Conflict` if the call log is no longer queued.
    pub async fn abandon_queued_call(&self, call_log_id: i64) -> Result<CallLog, DatabaseError> {
        let now = Utc::now();
        let _gate = self.write_gate().await;
        let tx = self.db().conn().transaction().await?;
        let changed = tx
            .execute(
                "UPDATE call_logs SET call_status = ?1, ended_at = ?2
                 WHERE id = ?3 AND call_status = ?4",
                libsql::params![
                    CallStatus::Failed.as_str(),
                    now.to_rfc3339(),
                    call_log_id,
                    CallStatus::Queued.as_str()
                ],
            )
            .await?;
        if changed == 0 {
            return Err(DatabaseError::Conflict(format!(
                "call log {call_log_id} is no longer queued"
            )));
        }
        insert_audit(
            &tx,
            EntityType::CallLog,
            &call_log_id.to_string(),
            AuditAction::Updated,
            Some(&serde_json::json!({ "fields": ["call_status", "ended_at"], "reason": "lead left calling" })),
            now,
        )
        .await?;
        tx.commit().await?;

        let log = fetch_call_log(self.db().conn(), call_log_id).await?;
        tracing::warn!(lead_id = log.lead_id, call_log_id, "queued call abandoned; lead left calling");
        self.record_trail(now, Actor::VoiceAgent, TrailOp::Update, EntityType::CallLog, call_log_id.to_string(), to_json(&log)?);
        Ok(log)
    }

    /// Close an open entry attempt whose lead has already left
    /// `entry_in_progress`. The lead is not touched.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Conflict` if the attempt was already completed.
    pub async fn abandon_entry_log(&self, entry_log_id: i64) -> Result<DataEntryLog, DatabaseError> {
        let now = Utc::now();
        let _gate = self.write_gate().await;
        let tx = self.db().conn().transaction().await?;
        let changed = tx
            .execute(
                "UPDATE data_entry_logs SET success = 0, error_message = ?1, completed_at = ?2
                 WHERE id = ?3 AND completed_at IS NULL",
                libsql::params![ENTRY_ABANDONED, now.to_rfc3339(), entry_log_id],
            )
            .await?;
        if changed == 0 {
            return Err(DatabaseError::Conflict(format!(
                "entry attempt {entry_log_id} already completed"
            )));
        }
        insert_audit(
            &tx,
            EntityType::DataEntryLog,
            &entry_log_id.to_string(),
            AuditAction::Updated,
            Some(&serde_json::json!({ "fields": ["success", "error_message", "completed_at"] })),
            now,
        )
        .await?;
        tx.commit().await?;

        let log = fetch_entry_log(self.db().conn(), entry_log_id).await?;
        tracing::warn!(lead_id = log.lead_id, entry_log_id, "open entry attempt abandoned");
        self.record_trail(now, Actor::DataEntryAgent, TrailOp::Update, EntityType::DataEntryLog, entry_log_id.to_string(), to_json(&log)?);
        Ok(log)
    }

    /// Apply a call-ended event to the call log carrying `call_sid` and its lead.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a query fails. Stale events are reported as
    /// [`CallEndResult::Ignored`], not as errors.
    pub async fn record_call_end(
        &self,
        call_sid: &str,
        report: CallEndReport,
    ) -> Result<CallEndResult, DatabaseError> {
        let now = Utc::now();
        let _gate = self.write_gate().await;
        let tx = self.db().conn().transaction().await?;

        let Some(log) = find_call_log_on(&tx, call_sid).await? else {
            tracing::warn!(call_sid, "call-ended event for unknown call");
            return Ok(CallEndResult::Ignored("unknown call id".to_string()));
        };

        if log.is_finished() {
            let Some(url) = report.recording_url.as_deref().filter(|u| log.recording_url.as_deref() != Some(*u)) else {
                return Ok(CallEndResult::Ignored("call already finished".to_string()));
            };
            tx.execute(
                "UPDATE call_logs SET recording_url = ?1 WHERE id = ?2",
                libsql::params![url, log.id],
            )
            .await?;
            tx.execute(
                "UPDATE leads SET call_recording_url = ?1, updated_at = ?2
                 WHERE id = ?3 AND call_sid = ?4",
                libsql::params![url, now.to_rfc3339(), log.lead_id, call_sid],
            )
            .await?;
            tx.commit().await?;
            let log = fetch_call_log(self.db().conn(), log.id).await?;
            tracing::info!(call_log_id = log.id, "recording attached to finished call");
            return Ok(CallEndResult::RecordingAttached(log));
        }

        let (trigger, final_status) = call_outcome(report.status, report.analysis.as_ref());
        tx.execute(
            "UPDATE call_logs SET call_status = ?1, duration = ?2, recording_url = ?3,
                                  vendor_data = COALESCE(?4, vendor_data), ended_at = ?5
             WHERE id = ?6",
            libsql::params![
                final_status.as_str(),
                report.duration,
                report.recording_url.as_deref(),
                report.vendor_data.as_ref().map(ToString::to_string),
                now.to_rfc3339(),
                log.id
            ],
        )
        .await?;

        let lead = fetch_lead(&tx, log.lead_id).await?;
        if lead.status != LeadStatus::Calling {
            tx.commit().await?;
            tracing::warn!(
                lead_id = lead.id,
                status = %lead.status,
                call_sid,
                "call ended for lead no longer calling; outcome not applied"
            );
            return Ok(CallEndResult::Ignored("lead no longer calling".to_string()));
        }

        let req = TransitionRequest::new(lead.id, trigger, Actor::Webhook)
            .expecting(LeadStatus::Calling);
        let applied = transition_in_tx(&tx, &req, analysis_extras(&report, trigger), now).await?;
        tx.commit().await?;
        let outcome = self.finish_transition(&req, applied, now).await?;
        Ok(CallEndResult::Applied(Box::new(outcome)))
    }

    /// Complete an open entry attempt and move its lead out of `entry_in_progress`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Conflict` if the attempt was already completed
    /// or the lead has left `entry_in_progress`.
    pub async fn record_entry_result(
        &self,
        entry_log_id: i64,
        report: EntryReport,
    ) -> Result<TransitionOutcome, DatabaseError> {
        let now = Utc::now();
        let _gate = self.write_gate().await;
        let tx = self.db().conn().transaction().await?;
        let log = fetch_entry_log(&tx, entry_log_id).await?;

        let changed = tx
            .execute(
                "UPDATE data_entry_logs SET success = ?1, external_id = ?2, error_message = ?3,
                                            screenshot_path = ?4, response = ?5, completed_at = ?6
                 WHERE id = ?7 AND completed_at IS NULL",
                libsql::params![
                    i64::from(report.success),
                    report.external_id.as_deref(),
                    report.error_message.as_deref(),
                    report.screenshot_path.as_deref(),
                    report.response.as_ref().map(ToString::to_string),
                    now.to_rfc3339(),
                    entry_log_id
                ],
            )
            .await?;
        if changed == 0 {
            return Err(DatabaseError::Conflict(format!(
                "entry attempt {entry_log_id} already completed"
            )));
        }

        let (trigger, extras): (Trigger, LeadExtras) = if report.success {
            (
                Trigger::EntrySucceeded,
                vec![("external_id", opt_text(report.external_id.as_deref()))],
            )
        } else {
            let message = report.error_message.as_deref().unwrap_or("entry failed");
            append_error_on(&tx, log.lead_id, Actor::DataEntryAgent, message, now).await?;
            (Trigger::EntryFailed, Vec::new())
        };

        let mut req = TransitionRequest::new(log.lead_id, trigger, Actor::DataEntryAgent)
            .expecting(LeadStatus::EntryInProgress);
        req.reason.clone_from(&report.error_message);
        let applied = transition_in_tx(&tx, &req, extras, now).await?;
        tx.commit().await?;
        self.finish_transition(&req, applied, now).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repos::audit::AuditFilter;
    use crate::test_support::helpers::{entry_failed_lead, pending_lead, test_service};
    use pretty_assertions::assert_eq;

    async fn calling_lead(svc: &LeadService) -> (Lead, i64) {
        let lead = pending_lead(svc).await;
        let outcome = svc
            .transition(
                TransitionRequest::new(lead.id, Trigger::CallInitiated, Actor::VoiceAgent)
                    .expecting(LeadStatus::Pending),
            )
            .await
            .unwrap();
        (outcome.lead, outcome.call_log_id.unwrap())
    }

    async fn lead_in(svc: &LeadService, status: LeadStatus) -> Lead {
        match status {
            LeadStatus::Pending => pending_lead(svc).await,
            LeadStatus::Calling => calling_lead(svc).await.0,
            LeadStatus::EntryInProgress => {
                let lead = pending_lead(svc).await;
                svc.mark_confirmed(lead.id).await.unwrap();
                svc.transition(TransitionRequest::new(lead.id, Trigger::EntryStarted, Actor::DataEntryAgent))
                    .await
                    .unwrap()
                    .lead
            }
            other => {
                let lead = pending_lead(svc).await;
                svc.override_status(lead.id, other, None).await.unwrap()
            }
        }
    }

    #[rstest::rstest]
    #[case(LeadStatus::Pending, true)]
    #[case(LeadStatus::Calling, true)]
    #[case(LeadStatus::NoAnswer, true)]
    #[case(LeadStatus::CallFailed, true)]
    #[case(LeadStatus::CallbackRequested, true)]
    #[case(LeadStatus::Confirmed, true)]
    #[case(LeadStatus::EntryInProgress, true)]
    #[case(LeadStatus::EntryFailed, true)]
    #[case(LeadStatus::Entered, false)]
    #[case(LeadStatus::NotInterested, false)]
    #[tokio::test]
    async fn operator_retry_call_from(#[case] from: LeadStatus, #[case] allowed: bool) {
        let svc = test_service().await;
        let lead = lead_in(&svc, from).await;
        assert_eq!(lead.status, from);
        let calls_before = svc.list_call_logs_for_lead(lead.id).await.unwrap().len();

        let result = svc.retry_call(lead.id).await;
        let calls = svc.list_call_logs_for_lead(lead.id).await.unwrap();
        let entries = svc.list_entry_logs_for_lead(lead.id).await.unwrap();
        if allowed {
            let outcome = result.unwrap();
            assert_eq!(outcome.lead.status, LeadStatus::Calling);
            assert_eq!(calls.len(), calls_before + 1);
            let newest = calls.last().unwrap();
            assert_eq!(newest.id, outcome.call_log_id.unwrap());
            assert_eq!(newest.call_status, CallStatus::Queued);
            assert_eq!(calls.iter().filter(|l| !l.is_finished()).count(), 1);
            assert!(entries.iter().all(|l| !l.is_open()));
        } else {
            assert!(matches!(
                result,
                Err(DatabaseError::Core(CoreError::InvalidTransition { .. }))
            ));
            assert_eq!(calls.len(), calls_before);
            assert_eq!(svc.get_lead(lead.id).await.unwrap().status, from);
        }
    }

    #[tokio::test]
    async fn retry_call_while_calling_fails_the_silent_call() {
        let svc = test_service().await;
        let (lead, call_log_id) = calling_lead(&svc).await;
        svc.record_dial(call_log_id, "call-silent", None).await.unwrap();

        let outcome = svc.retry_call(lead.id).await.unwrap();
        assert_eq!(outcome.from, LeadStatus::Calling);

        let first = svc.get_call_log(call_log_id).await.unwrap();
        assert_eq!(first.call_status, CallStatus::Failed);
        assert!(first.is_finished());
        let queued = svc.queued_call_logs(10).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].id, outcome.call_log_id.unwrap());

        // the old call reporting back late does not move the redialed lead
        let late = svc
            .record_call_end("call-silent", ended(CallStatus::NoAnswer, None))
            .await
            .unwrap();
        assert!(!matches!(late, CallEndResult::Applied(_)));
        assert_eq!(svc.get_lead(lead.id).await.unwrap().status, LeadStatus::Calling);
    }

    #[tokio::test]
    async fn leaving_entry_in_progress_closes_the_open_attempt() {
        let svc = test_service().await;
        let lead = lead_in(&svc, LeadStatus::EntryInProgress).await;
        let open = svc.open_entry_logs(10).await.unwrap();
        assert_eq!(open.len(), 1);

        svc.override_status(lead.id, LeadStatus::Confirmed, Some("portal down"))
            .await
            .unwrap();
        assert!(svc.open_entry_logs(10).await.unwrap().is_empty());

        let log = svc.get_entry_log(open[0].id).await.unwrap();
        assert_eq!(log.success, Some(false));
        assert_eq!(log.error_message.as_deref(), Some(ENTRY_ABANDONED));

        let late = svc
            .record_entry_result(log.id, EntryReport::success("EXT-1", None))
            .await;
        assert!(matches!(late, Err(DatabaseError::Conflict(_))));
        assert_eq!(svc.get_lead(lead.id).await.unwrap().status, LeadStatus::Confirmed);
    }

    fn ended(status: CallStatus, analysis: Option<CallAnalysis>) -> CallEndReport {
        CallEndReport {
            status,
            duration: Some(95),
            recording_url: Some("https://rec.example/1.wav".into()),
            analysis,
            vendor_data: None,
        }
    }

    #[tokio::test]
    async fn mark_confirmed_on_pending_sets_consent() {
        let svc = test_service().await;
        let lead = pending_lead(&svc).await;

        let outcome = svc.mark_confirmed(lead.id).await.unwrap();
        assert_eq!(outcome.from, LeadStatus::Pending);
        assert_eq!(outcome.lead.status, LeadStatus::Confirmed);
        assert!(outcome.lead.tcpa_opt_in);
        assert_eq!(outcome.lead.version, lead.version + 1);
        assert!(outcome.call_log_id.is_none());

        let audit = svc
            .query_audit(&AuditFilter {
                action: Some(AuditAction::StatusChanged),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(audit.len(), 1);
        let detail = audit[0].detail.as_ref().unwrap();
        assert_eq!(detail["trigger"], "mark_confirmed");
        assert_eq!(detail["to"], "confirmed");
    }

    #[tokio::test]
    async fn entering_calling_appends_one_queued_call_log() {
        let svc = test_service().await;
        let (lead, call_log_id) = calling_lead(&svc).await;

        let logs = svc.list_call_logs_for_lead(lead.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, call_log_id);
        assert_eq!(logs[0].call_status, CallStatus::Queued);
        assert_eq!(logs[0].phone_number, "+15551234567");
    }

    #[tokio::test]
    async fn stale_expected_status_is_a_conflict() {
        let svc = test_service().await;
        let lead = pending_lead(&svc).await;
        svc.mark_confirmed(lead.id).await.unwrap();

        let result = svc
            .transition(
                TransitionRequest::new(lead.id, Trigger::CallInitiated, Actor::VoiceAgent)
                    .expecting(LeadStatus::Pending),
            )
            .await;
        assert!(matches!(result, Err(DatabaseError::Conflict(_))));
        assert!(svc.list_call_logs_for_lead(lead.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entry_without_consent_is_rejected() {
        let svc = test_service().await;
        let lead = pending_lead(&svc).await;
        svc.override_status(lead.id, LeadStatus::Confirmed, Some("manual fix"))
            .await
            .unwrap();

        let result = svc
            .transition(TransitionRequest::new(lead.id, Trigger::EntryStarted, Actor::DataEntryAgent))
            .await;
        assert!(matches!(result, Err(DatabaseError::Core(CoreError::Validation(_)))));
        assert!(svc.list_entry_logs_for_lead(lead.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn terminal_lead_rejects_automatic_retry() {
        let svc = test_service().await;
        let lead = pending_lead(&svc).await;
        svc.override_status(lead.id, LeadStatus::Entered, None).await.unwrap();

        let result = svc
            .transition(TransitionRequest::new(lead.id, Trigger::RetryCall, Actor::VoiceAgent))
            .await;
        assert!(matches!(
            result,
            Err(DatabaseError::Core(CoreError::InvalidTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn override_writes_overridden_audit_and_no_log() {
        let svc = test_service().await;
        let lead = pending_lead(&svc).await;

        let updated = svc
            .override_status(lead.id, LeadStatus::Calling, Some("vendor callback"))
            .await
            .unwrap();
        assert_eq!(updated.status, LeadStatus::Calling);
        assert_eq!(updated.version, 1);
        assert!(svc.list_call_logs_for_lead(lead.id).await.unwrap().is_empty());

        let audit = svc
            .query_audit(&AuditFilter {
                action: Some(AuditAction::StatusOverridden),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].detail.as_ref().unwrap()["trigger"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn call_end_with_consent_confirms_and_copies_analysis() {
        let svc = test_service().await;
        let (lead, call_log_id) = calling_lead(&svc).await;
        svc.record_dial(call_log_id, "call-1", None).await.unwrap();

        let analysis = CallAnalysis {
            interested: true,
            tcpa_consent: true,
            confirmed_email: Some("jane.doe@x.com".into()),
            area_of_interest: Some("solar".into()),
            ..CallAnalysis::default()
        };
        let result = svc
            .record_call_end("call-1", ended(CallStatus::Completed, Some(analysis)))
            .await
            .unwrap();

        let CallEndResult::Applied(outcome) = result else {
            panic!("expected applied outcome, got {result:?}");
        };
        assert_eq!(outcome.lead.status, LeadStatus::Confirmed);
        assert!(outcome.lead.tcpa_opt_in);
        assert_eq!(outcome.lead.confirmed_email.as_deref(), Some("jane.doe@x.com"));
        assert_eq!(outcome.lead.area_of_interest.as_deref(), Some("solar"));
        assert_eq!(outcome.lead.call_duration, Some(95));
        assert_eq!(outcome.lead.call_sid.as_deref(), Some("call-1"));
        assert!(outcome.lead.last_called_at.is_some());

        let log = svc.get_call_log(call_log_id).await.unwrap();
        assert_eq!(log.call_status, CallStatus::Completed);
        assert!(log.is_finished());
        assert_eq!(lead.id, log.lead_id);
    }

    #[tokio::test]
    async fn call_end_without_consent_is_not_interested() {
        let svc = test_service().await;
        let (_, call_log_id) = calling_lead(&svc).await;
        svc.record_dial(call_log_id, "call-2", None).await.unwrap();

        let analysis = CallAnalysis {
            interested: true,
            ..CallAnalysis::default()
        };
        let result = svc
            .record_call_end("call-2", ended(CallStatus::Completed, Some(analysis)))
            .await
            .unwrap();
        let CallEndResult::Applied(outcome) = result else {
            panic!("expected applied outcome");
        };
        assert_eq!(outcome.lead.status, LeadStatus::NotInterested);
        assert!(!outcome.lead.tcpa_opt_in);
    }

    #[tokio::test]
    async fn unknown_call_is_ignored() {
        let svc = test_service().await;
        let result = svc
            .record_call_end("nope", ended(CallStatus::NoAnswer, None))
            .await
            .unwrap();
        assert!(matches!(result, CallEndResult::Ignored(_)));
    }

    #[tokio::test]
    async fn late_recording_attaches_to_finished_call() {
        let svc = test_service().await;
        let (_, call_log_id) = calling_lead(&svc).await;
        svc.record_dial(call_log_id, "call-3", None).await.unwrap();
        let mut first = ended(CallStatus::NoAnswer, None);
        first.recording_url = None;
        svc.record_call_end("call-3", first).await.unwrap();

        let result = svc
            .record_call_end("call-3", ended(CallStatus::Completed, None))
            .await
            .unwrap();
        let CallEndResult::RecordingAttached(log) = result else {
            panic!("expected recording attached");
        };
        assert_eq!(log.recording_url.as_deref(), Some("https://rec.example/1.wav"));
        assert_eq!(log.call_status, CallStatus::NoAnswer);
    }

    #[tokio::test]
    async fn call_end_after_lead_moved_on_is_ignored() {
        let svc = test_service().await;
        let (lead, call_log_id) = calling_lead(&svc).await;
        svc.record_dial(call_log_id, "call-4", None).await.unwrap();
        svc.override_status(lead.id, LeadStatus::Confirmed, None).await.unwrap();

        let result = svc
            .record_call_end("call-4", ended(CallStatus::NoAnswer, None))
            .await
            .unwrap();
        assert!(matches!(result, CallEndResult::Ignored(_)));
        assert_eq!(svc.get_lead(lead.id).await.unwrap().status, LeadStatus::Confirmed);
        assert!(svc.get_call_log(call_log_id).await.unwrap().is_finished());
    }

    #[tokio::test]
    async fn dial_failure_fails_call_and_records_error() {
        let svc = test_service().await;
        let (lead, call_log_id) = calling_lead(&svc).await;

        let outcome = svc.record_dial_failure(call_log_id, "vendor 503").await.unwrap();
        assert_eq!(outcome.lead.status, LeadStatus::CallFailed);
        assert_eq!(outcome.lead.error_messages.len(), 1);
        assert_eq!(outcome.lead.error_messages[0].error, "vendor 503");

        let log = svc.get_call_log(call_log_id).await.unwrap();
        assert_eq!(log.call_status, CallStatus::Failed);
        assert_eq!(log.lead_id, lead.id);

        let again = svc.record_dial(call_log_id, "late", None).await;
        assert!(matches!(again, Err(DatabaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn abandoned_call_leaves_lead_alone() {
        let svc = test_service().await;
        let (lead, call_log_id) = calling_lead(&svc).await;
        svc.override_status(lead.id, LeadStatus::Pending, None).await.unwrap();

        let log = svc.abandon_queued_call(call_log_id).await.unwrap();
        assert_eq!(log.call_status, CallStatus::Failed);
        assert_eq!(svc.get_lead(lead.id).await.unwrap().status, LeadStatus::Pending);
        assert!(svc.queued_call_logs(10).await.unwrap().is_empty());

        let audit = svc
            .query_audit(&AuditFilter {
                entity_type: Some(EntityType::CallLog),
                entity_id: Some(call_log_id.to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::Updated);

        let again = svc.abandon_queued_call(call_log_id).await;
        assert!(matches!(again, Err(DatabaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn abandoned_entry_attempt_is_audited_once() {
        let svc = test_service().await;
        let lead = lead_in(&svc, LeadStatus::EntryInProgress).await;
        let open = svc.open_entry_logs(10).await.unwrap();

        let log = svc.abandon_entry_log(open[0].id).await.unwrap();
        assert!(!log.is_open());
        assert_eq!(log.success, Some(false));
        assert_eq!(svc.get_lead(lead.id).await.unwrap().status, LeadStatus::EntryInProgress);

        let audit = svc
            .query_audit(&AuditFilter {
                entity_type: Some(EntityType::DataEntryLog),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].entity_id, log.id.to_string());

        let again = svc.abandon_entry_log(log.id).await;
        assert!(matches!(again, Err(DatabaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn entry_success_enters_lead() {
        let svc = test_service().await;
        let lead = pending_lead(&svc).await;
        svc.mark_confirmed(lead.id).await.unwrap();
        let started = svc
            .transition(TransitionRequest::new(lead.id, Trigger::EntryStarted, Actor::DataEntryAgent))
            .await
            .unwrap();
        assert_eq!(started.lead.entry_attempts, 1);

        let outcome = svc
            .record_entry_result(started.entry_log_id.unwrap(), EntryReport::success("EXT-9", None))
            .await
            .unwrap();
        assert_eq!(outcome.lead.status, LeadStatus::Entered);
        assert_eq!(outcome.lead.external_id.as_deref(), Some("EXT-9"));

        let logs = svc.list_entry_logs_for_lead(lead.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].success, Some(true));

        let twice = svc
            .record_entry_result(started.entry_log_id.unwrap(), EntryReport::success("EXT-9", None))
            .await;
        assert!(matches!(twice, Err(DatabaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn retry_entry_appends_next_attempt() {
        let svc = test_service().await;
        let lead = entry_failed_lead(&svc).await;
        assert_eq!(lead.status, LeadStatus::EntryFailed);
        assert_eq!(lead.error_messages[0].error, "portal timeout");

        let outcome = svc.retry_entry(lead.id).await.unwrap();
        assert_eq!(outcome.lead.status, LeadStatus::EntryInProgress);
        assert_eq!(outcome.lead.entry_attempts, 2);

        let logs = svc.list_entry_logs_for_lead(lead.id).await.unwrap();
        let attempts: Vec<i64> = logs.iter().map(|l| l.attempt_number).collect();
        assert_eq!(attempts, vec![1, 2]);
    }

    #[tokio::test]
    async fn concurrent_retry_entry_has_one_winner() {
        let svc = Arc::new(test_service().await);
        let lead = entry_failed_lead(&svc).await;

        let (a, b) = tokio::join!(
            {
                let svc = Arc::clone(&svc);
                async move { svc.retry_entry(lead.id).await }
            },
            {
                let svc = Arc::clone(&svc);
                async move { svc.retry_entry(lead.id).await }
            }
        );

        let wins = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        let loser = if a.is_err() { a } else { b };
        assert!(matches!(
            loser,
            Err(DatabaseError::Core(CoreError::InvalidTransition { .. }))
        ));

        assert_eq!(svc.list_entry_logs_for_lead(lead.id).await.unwrap().len(), 2);
        assert_eq!(
            svc.get_lead(lead.id).await.unwrap().status,
            LeadStatus::EntryInProgress
        );
    }

    #[tokio::test]
    async fn retry_call_from_no_answer_opens_new_call() {
        let svc = test_service().await;
        let (lead, call_log_id) = calling_lead(&svc).await;
        svc.record_dial(call_log_id, "call-5", None).await.unwrap();
        svc.record_call_end("call-5", ended(CallStatus::NoAnswer, None))
            .await
            .unwrap();

        let outcome = svc.retry_call(lead.id).await.unwrap();
        assert_eq!(outcome.from, LeadStatus::NoAnswer);
        assert_eq!(outcome.lead.status, LeadStatus::Calling);
        assert_eq!(svc.list_call_logs_for_lead(lead.id).await.unwrap().len(), 2);
    }
}
