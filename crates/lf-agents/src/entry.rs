//! Data-entry agent: claims confirmed leads and submits them to the portal.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lf_core::contact::PortalSubmission;
use lf_core::entities::{DataEntryLog, Lead};
use lf_core::enums::{Actor, LeadStatus, Trigger};
use lf_db::repos::lifecycle::{EntryReport, TransitionRequest};
use lf_db::service::LeadService;

use crate::agent::{PollingAgent, TickReport, is_stale};
use crate::error::AgentError;
use crate::portal::PortalClient;

pub struct DataEntryAgent {
    service: Arc<LeadService>,
    portal: Arc<dyn PortalClient>,
    batch: u32,
}

impl DataEntryAgent {
    #[must_use]
    pub fn new(service: Arc<LeadService>, portal: Arc<dyn PortalClient>, batch: u32) -> Self {
        Self {
            service,
            portal,
            batch,
        }
    }

    async fn claim_confirmed(&self, report: &mut TickReport) -> Result<(), AgentError> {
        for lead in self.service.leads_in_status(LeadStatus::Confirmed, self.batch).await? {
            if !lead.tcpa_opt_in {
                tracing::debug!(lead_id = lead.id, "confirmed lead without consent; not entering");
                report.deferred += 1;
                continue;
            }
            let req = TransitionRequest::new(lead.id, Trigger::EntryStarted, Actor::DataEntryAgent)
                .expecting(LeadStatus::Confirmed);
            match self.service.transition(req).await {
                Ok(_) => report.claimed += 1,
                Err(e) if is_stale(&e) => {
                    tracing::warn!(lead_id = lead.id, "skipping lead: {e}");
                    report.deferred += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn submit(&self, lead: &Lead) -> EntryReport {
        let submission = PortalSubmission::from_lead(lead);
        let problems = submission.validation_errors();
        if !problems.is_empty() {
            return EntryReport::failure(problems.join("; "), None);
        }

        match self.portal.submit(&submission).await {
            Ok(receipt) => EntryReport::success(receipt.external_id, receipt.response),
            Err(AgentError::Rejected {
                message,
                screenshot_path,
            }) => EntryReport::failure(message, screenshot_path),
            Err(e) => EntryReport::failure(e.to_string(), None),
        }
    }

    async fn submit_open(&self, report: &mut TickReport) -> Result<(), AgentError> {
        for log in self.service.open_entry_logs(self.batch).await? {
            let lead = self.service.get_lead(log.lead_id).await?;
            if lead.status != LeadStatus::EntryInProgress {
                self.abandon(&log, lead.status, report).await?;
                continue;
            }

            let entry = self.submit(&lead).await;
            let succeeded = entry.success;
            if let Some(ref error) = entry.error_message {
                tracing::warn!(lead_id = log.lead_id, attempt = log.attempt_number, "entry failed: {error}");
            }
            match self.service.record_entry_result(log.id, entry).await {
                Ok(_) if succeeded => report.sent += 1,
                Ok(_) => report.failed += 1,
                Err(e) if is_stale(&e) => {
                    tracing::warn!(entry_log_id = log.id, "entry result not applied: {e}");
                    report.deferred += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn abandon(
        &self,
        log: &DataEntryLog,
        status: LeadStatus,
        report: &mut TickReport,
    ) -> Result<(), AgentError> {
        tracing::info!(entry_log_id = log.id, lead_id = log.lead_id, %status, "lead left entry; closing attempt");
        if let Err(e) = self.service.abandon_entry_log(log.id).await
            && !is_stale(&e)
        {
            return Err(e.into());
        }
        report.deferred += 1;
        Ok(())
    }
}

#[async_trait]
impl PollingAgent for DataEntryAgent {
    fn name(&self) -> &'static str {
        "data_entry_agent"
    }

    async fn tick(&mut self, _now: DateTime<Utc>) -> Result<TickReport, AgentError> {
        let mut report = TickReport::default();
        self.claim_confirmed(&mut report).await?;
        self.submit_open(&mut report).await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use lf_core::entities::NewLead;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::portal::PortalReceipt;

    enum Behaviour {
        Accept,
        Reject,
    }

    struct MockPortal {
        behaviour: Behaviour,
        seen: Mutex<Vec<PortalSubmission>>,
    }

    impl MockPortal {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PortalClient for MockPortal {
        async fn submit(&self, submission: &PortalSubmission) -> Result<PortalReceipt, AgentError> {
            self.seen.lock().unwrap().push(submission.clone());
            match self.behaviour {
                Behaviour::Accept => Ok(PortalReceipt {
                    external_id: format!("LH-{}", submission.lead_id),
                    response: None,
                }),
                Behaviour::Reject => Err(AgentError::Rejected {
                    message: "duplicate lead".into(),
                    screenshot_path: Some("shots/dup.png".into()),
                }),
            }
        }
    }

    async fn confirmed_lead(svc: &LeadService, email: Option<&str>) -> i64 {
        let lead = NewLead {
            first_name: Some("jane".into()),
            last_name: Some("doe".into()),
            email: email.map(String::from),
            phone: "5551234567".into(),
            ..NewLead::default()
        };
        let id = svc.create_lead(&lead, "manual").await.unwrap().id;
        svc.mark_confirmed(id).await.unwrap();
        id
    }

    async fn service() -> Arc<LeadService> {
        Arc::new(LeadService::new_local(":memory:", None).await.unwrap())
    }

    #[tokio::test]
    async fn accepted_submission_enters_lead() {
        let svc = service().await;
        let id = confirmed_lead(&svc, Some("Jane@X.com")).await;
        let portal = MockPortal::new(Behaviour::Accept);
        let mut agent = DataEntryAgent::new(Arc::clone(&svc), portal.clone(), 3);

        let report = agent.tick(Utc::now()).await.unwrap();
        assert_eq!(report.claimed, 1);
        assert_eq!(report.sent, 1);

        let lead = svc.get_lead(id).await.unwrap();
        assert_eq!(lead.status, LeadStatus::Entered);
        assert_eq!(lead.external_id, Some(format!("LH-{id}")));

        let seen = portal.seen.lock().unwrap();
        assert_eq!(seen[0].first_name, "Jane");
        assert_eq!(seen[0].email, "jane@x.com");
        assert_eq!(seen[0].phone, "(555) 123-4567");
    }

    #[tokio::test]
    async fn rejection_fails_entry_with_screenshot() {
        let svc = service().await;
        let id = confirmed_lead(&svc, Some("jane@x.com")).await;
        let mut agent = DataEntryAgent::new(Arc::clone(&svc), MockPortal::new(Behaviour::Reject), 3);

        let report = agent.tick(Utc::now()).await.unwrap();
        assert_eq!(report.failed, 1);

        let lead = svc.get_lead(id).await.unwrap();
        assert_eq!(lead.status, LeadStatus::EntryFailed);
        let logs = svc.list_entry_logs_for_lead(id).await.unwrap();
        assert_eq!(logs[0].screenshot_path.as_deref(), Some("shots/dup.png"));
    }

    #[tokio::test]
    async fn missing_email_fails_without_calling_portal() {
        let svc = service().await;
        let id = confirmed_lead(&svc, None).await;
        let portal = MockPortal::new(Behaviour::Accept);
        let mut agent = DataEntryAgent::new(Arc::clone(&svc), portal.clone(), 3);

        agent.tick(Utc::now()).await.unwrap();
        assert!(portal.seen.lock().unwrap().is_empty());

        let lead = svc.get_lead(id).await.unwrap();
        assert_eq!(lead.status, LeadStatus::EntryFailed);
        assert!(lead.error_messages[0].error.contains("email"));
    }

    #[tokio::test]
    async fn confirmed_without_consent_is_left_alone() {
        let svc = service().await;
        let lead = svc
            .create_lead(
                &NewLead {
                    phone: "5551234567".into(),
                    ..NewLead::default()
                },
                "manual",
            )
            .await
            .unwrap();
        svc.override_status(lead.id, LeadStatus::Confirmed, None).await.unwrap();
        let mut agent = DataEntryAgent::new(Arc::clone(&svc), MockPortal::new(Behaviour::Accept), 3);

        let report = agent.tick(Utc::now()).await.unwrap();
        assert_eq!(report.claimed, 0);
        assert_eq!(report.deferred, 1);
        assert_eq!(svc.get_lead(lead.id).await.unwrap().status, LeadStatus::Confirmed);
    }

    #[tokio::test]
    async fn operator_retry_call_stops_pending_submission() {
        let svc = service().await;
        let id = confirmed_lead(&svc, Some("jane@x.com")).await;
        svc.transition(
            TransitionRequest::new(id, Trigger::EntryStarted, Actor::DataEntryAgent)
                .expecting(LeadStatus::Confirmed),
        )
        .await
        .unwrap();
        svc.retry_call(id).await.unwrap();

        let portal = MockPortal::new(Behaviour::Accept);
        let mut agent = DataEntryAgent::new(Arc::clone(&svc), portal.clone(), 3);
        for _ in 0..3 {
            agent.tick(Utc::now()).await.unwrap();
        }

        assert!(portal.seen.lock().unwrap().is_empty());
        assert!(svc.open_entry_logs(10).await.unwrap().is_empty());
        assert_eq!(svc.get_lead(id).await.unwrap().status, LeadStatus::Calling);
    }

    #[tokio::test]
    async fn stray_open_attempt_is_closed_not_submitted() {
        let svc = service().await;
        let id = confirmed_lead(&svc, Some("jane@x.com")).await;
        svc.transition(TransitionRequest::new(id, Trigger::EntryStarted, Actor::DataEntryAgent))
            .await
            .unwrap();
        // status rewritten outside the service, leaving the attempt open
        svc.db()
            .conn()
            .execute(
                "UPDATE leads SET status = 'confirmed', tcpa_opt_in = 0 WHERE id = ?1",
                [id],
            )
            .await
            .unwrap();

        let portal = MockPortal::new(Behaviour::Accept);
        let mut agent = DataEntryAgent::new(Arc::clone(&svc), portal.clone(), 3);
        let report = agent.tick(Utc::now()).await.unwrap();

        assert_eq!(report.sent, 0);
        assert_eq!(report.deferred, 2);
        assert!(portal.seen.lock().unwrap().is_empty());
        let logs = svc.list_entry_logs_for_lead(id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].success, Some(false));
        assert_eq!(svc.get_lead(id).await.unwrap().status, LeadStatus::Confirmed);
    }
}
