//! Voice agent: claims leads for calling and dials queued calls.
//!
//! Each tick, while the call window is open:
//! 1. claim `pending` leads via `call_initiated`;
//! 2. claim `no_answer` / `callback_requested` leads via `retry_call` when
//!    the call schedule allows another attempt;
//! 3. dial every queued call log, within the per-minute rate limit.
//!
//! Outcomes arrive later through the voice webhook.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lf_config::{CallSchedule, CallingConfig, ScheduleDecision};
use lf_core::enums::{Actor, LeadStatus, Trigger};
use lf_db::repos::lifecycle::TransitionRequest;
use lf_db::service::LeadService;

use crate::agent::{PollingAgent, TickReport, is_stale};
use crate::dialer::{DialRequest, Dialer};
use crate::error::AgentError;

/// Sliding one-minute window of dial timestamps. A limit of zero disables it.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    per_minute: u32,
    sent: VecDeque<DateTime<Utc>>,
}

impl RateLimiter {
    pub(crate) const fn new(per_minute: u32) -> Self {
        Self {
            per_minute,
            sent: VecDeque::new(),
        }
    }

    pub(crate) fn try_acquire(&mut self, now: DateTime<Utc>) -> bool {
        if self.per_minute == 0 {
            return true;
        }
        while self
            .sent
            .front()
            .is_some_and(|t| now - *t >= Duration::minutes(1))
        {
            self.sent.pop_front();
        }
        if self.sent.len() >= self.per_minute as usize {
            return false;
        }
        self.sent.push_back(now);
        true
    }
}

pub struct VoiceAgent {
    service: Arc<LeadService>,
    dialer: Arc<dyn Dialer>,
    calling: CallingConfig,
    batch: u32,
    limiter: RateLimiter,
}

impl VoiceAgent {
    #[must_use]
    pub fn new(
        service: Arc<LeadService>,
        dialer: Arc<dyn Dialer>,
        calling: CallingConfig,
        batch: u32,
    ) -> Self {
        let limiter = RateLimiter::new(calling.rate_limit_per_minute);
        Self {
            service,
            dialer,
            calling,
            batch,
            limiter,
        }
    }

    /// Stored operator caps, or the configured ones.
    async fn schedule(&self) -> Result<CallSchedule, AgentError> {
        let caps = match self.service.get_call_settings().await? {
            Some(caps) => caps,
            None => self.calling.default_caps(),
        };
        Ok(self.calling.schedule_with_caps(&caps))
    }

    async fn claim(
        &self,
        req: TransitionRequest,
        report: &mut TickReport,
    ) -> Result<(), AgentError> {
        match self.service.transition(req).await {
            Ok(outcome) => {
                report.claimed += 1;
                tracing::debug!(lead_id = outcome.lead.id, from = %outcome.from, "lead claimed for calling");
                Ok(())
            }
            Err(e) if is_stale(&e) => {
                tracing::warn!("skipping lead: {e}");
                report.deferred += 1;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn claim_due(&self, now: DateTime<Utc>, report: &mut TickReport) -> Result<(), AgentError> {
        let mut budget = self.batch as usize;

        for lead in self.service.leads_in_status(LeadStatus::Pending, self.batch).await? {
            let req = TransitionRequest::new(lead.id, Trigger::CallInitiated, Actor::VoiceAgent)
                .expecting(LeadStatus::Pending);
            self.claim(req, report).await?;
            budget = budget.saturating_sub(1);
        }

        let schedule = self.schedule().await?;
        for status in [LeadStatus::NoAnswer, LeadStatus::CallbackRequested] {
            if budget == 0 {
                break;
            }
            let limit = u32::try_from(budget).unwrap_or(self.batch);
            for lead in self.service.leads_in_status(status, limit).await? {
                let history = self.service.call_history(lead.id).await?;
                match schedule.should_attempt(&history, now) {
                    ScheduleDecision::Attempt => {
                        let req = TransitionRequest::new(lead.id, Trigger::RetryCall, Actor::VoiceAgent)
                            .expecting(status)
                            .reason("scheduled redial");
                        self.claim(req, report).await?;
                        budget = budget.saturating_sub(1);
                    }
                    decision => {
                        tracing::debug!(lead_id = lead.id, attempts = history.len(), ?decision, "redial not due");
                        report.deferred += 1;
                    }
                }
            }
        }
        Ok(())
    }

    async fn dial_queued(&mut self, now: DateTime<Utc>, report: &mut TickReport) -> Result<(), AgentError> {
        for log in self.service.queued_call_logs(self.batch).await? {
            let lead = self.service.get_lead(log.lead_id).await?;
            if lead.status != LeadStatus::Calling {
                self.service.abandon_queued_call(log.id).await?;
                report.deferred += 1;
                continue;
            }
            if !self.limiter.try_acquire(now) {
                tracing::debug!(call_log_id = log.id, "dial rate limit reached");
                report.deferred += 1;
                continue;
            }

            let request = DialRequest::for_lead(log.id, log.phone_number.clone(), &lead);
            match self.dialer.dial(&request).await {
                Ok(resp) => match self
                    .service
                    .record_dial(log.id, &resp.call_sid, resp.vendor_data.as_ref())
                    .await
                {
                    Ok(_) => report.sent += 1,
                    Err(e) if is_stale(&e) => {
                        tracing::warn!(call_log_id = log.id, "dial recorded late: {e}");
                        report.deferred += 1;
                    }
                    Err(e) => return Err(e.into()),
                },
                Err(e) => {
                    tracing::warn!(lead_id = lead.id, call_log_id = log.id, "dial failed: {e}");
                    match self.service.record_dial_failure(log.id, &e.to_string()).await {
                        Ok(_) => report.failed += 1,
                        Err(db) if is_stale(&db) => report.deferred += 1,
                        Err(db) => return Err(db.into()),
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PollingAgent for VoiceAgent {
    fn name(&self) -> &'static str {
        "voice_agent"
    }

    async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport, AgentError> {
        let mut report = TickReport::default();
        if !self.calling.window.is_open(now) {
            tracing::debug!("outside call window");
            return Ok(report);
        }
        self.claim_due(now, &mut report).await?;
        self.dial_queued(now, &mut report).await?;
        Ok(report)
    }
}
