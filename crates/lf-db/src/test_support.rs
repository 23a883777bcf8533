//! Shared test utilities for lf-db tests.

pub(crate) mod helpers {
    use lf_core::entities::{Lead, NewLead};
    use lf_core::enums::{Actor, Trigger};

    use crate::LeadDb;
    use crate::repos::lifecycle::{EntryReport, TransitionRequest};
    use crate::service::LeadService;
    use crate::trail::writer::TrailWriter;

    /// In-memory service with trail disabled.
    pub async fn test_service() -> LeadService {
        let db = LeadDb::open_local(":memory:").await.unwrap();
        LeadService::from_db(db, TrailWriter::disabled())
    }

    /// In-memory service writing its trail to `trail_dir`.
    pub async fn test_service_with_trail(trail_dir: std::path::PathBuf) -> LeadService {
        let db = LeadDb::open_local(":memory:").await.unwrap();
        LeadService::from_db(db, TrailWriter::new(trail_dir).unwrap())
    }

    pub fn jane() -> NewLead {
        NewLead {
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: Some("jane@x.com".into()),
            phone: "5551234567".into(),
            address: Some("1 Main St".into()),
            city: Some("Phoenix".into()),
            state: Some("AZ".into()),
            zip: Some("85001".into()),
            ..NewLead::default()
        }
    }

    pub async fn pending_lead(svc: &LeadService) -> Lead {
        svc.create_lead(&jane(), "manual").await.unwrap()
    }

    /// Drive a fresh lead to `entry_failed` through one failed entry attempt.
    pub async fn entry_failed_lead(svc: &LeadService) -> Lead {
        let lead = pending_lead(svc).await;
        svc.mark_confirmed(lead.id).await.unwrap();
        let started = svc
            .transition(TransitionRequest::new(
                lead.id,
                Trigger::EntryStarted,
                Actor::DataEntryAgent,
            ))
            .await
            .unwrap();
        let log_id = started.entry_log_id.unwrap();
        svc.record_entry_result(log_id, EntryReport::failure("portal timeout", None))
            .await
            .unwrap()
            .lead
    }
}
