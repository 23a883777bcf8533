//! Lead repository: create, import, read, contact updates, agent error log.

use chrono::{DateTime, Utc};
use lf_core::audit_detail::{ImportedDetail, UpdatedDetail};
use lf_core::entities::{AgentErrorRecord, Lead, NewLead};
use lf_core::enums::{Actor, AuditAction, EntityType, LeadStatus, TrailOp};
use lf_core::errors::CoreError;
use lf_core::import::{ParsedImport, summarize};
use lf_core::responses::ImportResult;

use crate::error::DatabaseError;
use crate::helpers::{
    SetClause, get_bool, get_opt_string, opt_text, parse_datetime, parse_enum,
    parse_optional_datetime, to_json,
};
use crate::repos::audit::insert_audit;
use crate::service::LeadService;
use crate::updates::lead::LeadUpdate;

/// Most rows a single list call returns.
pub const MAX_LIST_LIMIT: u32 = 1000;

pub(crate) const SELECT_COLS: &str = "id, first_name, last_name, email, phone, address, address2, \
     city, state, zip, status, tcpa_opt_in, confirmed_email, confirmed_phone, confirmed_address, \
     area_of_interest, call_sid, call_duration, call_recording_url, last_called_at, entry_attempts, \
     external_id, source, notes, error_messages, version, created_at, updated_at";

pub(crate) fn row_to_lead(row: &libsql::Row) -> Result<Lead, DatabaseError> {
    let error_messages: Vec<AgentErrorRecord> = match get_opt_string(row, 24)? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| DatabaseError::Query(format!("Invalid error_messages JSON: {e}")))?,
        None => Vec::new(),
    };
    Ok(Lead {
        id: row.get(0)?,
        first_name: get_opt_string(row, 1)?,
        last_name: get_opt_string(row, 2)?,
        email: get_opt_string(row, 3)?,
        phone: row.get(4)?,
        address: get_opt_string(row, 5)?,
        address2: get_opt_string(row, 6)?,
        city: get_opt_string(row, 7)?,
        state: get_opt_string(row, 8)?,
        zip: get_opt_string(row, 9)?,
        status: parse_enum(&row.get::<String>(10)?)?,
        tcpa_opt_in: get_bool(row, 11)?,
        confirmed_email: get_opt_string(row, 12)?,
        confirmed_phone: get_opt_string(row, 13)?,
        confirmed_address: get_opt_string(row, 14)?,
        area_of_interest: get_opt_string(row, 15)?,
        call_sid: get_opt_string(row, 16)?,
        call_duration: row.get::<Option<i64>>(17)?,
        call_recording_url: get_opt_string(row, 18)?,
        last_called_at: parse_optional_datetime(get_opt_string(row, 19)?.as_deref())?,
        entry_attempts: row.get(20)?,
        external_id: get_opt_string(row, 21)?,
        source: row.get(22)?,
        notes: get_opt_string(row, 23)?,
        error_messages,
        version: row.get(25)?,
        created_at: parse_datetime(&row.get::<String>(26)?)?,
        updated_at: parse_datetime(&row.get::<String>(27)?)?,
    })
}

/// Read one lead on `conn`, usually an open transaction.
pub(crate) async fn fetch_lead(conn: &libsql::Connection, id: i64) -> Result<Lead, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM leads WHERE id = ?1"), [id])
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| DatabaseError::lead_not_found(id))?;
    row_to_lead(&row)
}

/// Insert a `pending` lead and return its id.
async fn insert_lead(
    conn: &libsql::Connection,
    lead: &NewLead,
    source: &str,
    now: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO leads (first_name, last_name, email, phone, address, address2, city, state,
                            zip, notes, status, source, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        libsql::params![
            lead.first_name.as_deref(),
            lead.last_name.as_deref(),
            lead.email.as_deref(),
            lead.phone.trim(),
            lead.address.as_deref(),
            lead.address2.as_deref(),
            lead.city.as_deref(),
            lead.state.as_deref(),
            lead.zip.as_deref(),
            lead.notes.as_deref(),
            LeadStatus::Pending.as_str(),
            source,
            now.to_rfc3339(),
            now.to_rfc3339()
        ],
    )
    .await?;
    Ok(conn.last_insert_rowid())
}

/// Pagination and status filter for lead listings.
#[derive(Debug, Clone, Copy)]
pub struct LeadFilter {
    pub skip: u32,
    pub limit: u32,
    pub status: Option<LeadStatus>,
}

impl Default for LeadFilter {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
            status: None,
        }
    }
}

impl LeadService {
    /// Create a single lead in `pending`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Core` if the lead has no phone, or
    /// `DatabaseError` if the insert fails.
    pub async fn create_lead(&self, new: &NewLead, source: &str) -> Result<Lead, DatabaseError> {
        new.validate()?;
        let now = Utc::now();

        let _gate = self.write_gate().await;
        let tx = self.db().conn().transaction().await?;
        let id = insert_lead(&tx, new, source, now).await?;
        insert_audit(&tx, EntityType::Lead, &id.to_string(), AuditAction::Created, None, now).await?;
        tx.commit().await?;

        let lead = self.get_lead(id).await?;
        tracing::info!(lead_id = id, source, "lead created");
        self.record_trail(now, Actor::Operator, TrailOp::Create, EntityType::Lead, id.to_string(), to_json(&lead)?);
        Ok(lead)
    }

    /// Create every parsed lead in one transaction and summarize the result.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any insert fails; nothing is imported then.
    pub async fn import_leads(
        &self,
        parsed: ParsedImport,
        file_name: Option<&str>,
    ) -> Result<ImportResult, DatabaseError> {
        let now = Utc::now();
        let ParsedImport { leads, errors } = parsed;

        let _gate = self.write_gate().await;
        let tx = self.db().conn().transaction().await?;
        let mut created = Vec::with_capacity(leads.len());
        for (row, lead) in &leads {
            let id = insert_lead(&tx, lead, "csv", now).await?;
            let detail = to_json(&ImportedDetail {
                file_name: file_name.map(String::from),
                row: *row,
            })?;
            insert_audit(&tx, EntityType::Lead, &id.to_string(), AuditAction::Imported, Some(&detail), now)
                .await?;
            created.push((id, lead));
        }
        tx.commit().await?;

        for (id, lead) in &created {
            self.record_trail(now, Actor::Operator, TrailOp::Create, EntityType::Lead, id.to_string(), to_json(lead)?);
        }
        tracing::info!(created = created.len(), skipped = errors.len(), "csv import finished");
        Ok(summarize(created.len(), errors))
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no lead has this id.
    pub async fn get_lead(&self, id: i64) -> Result<Lead, DatabaseError> {
        fetch_lead(self.db().conn(), id).await
    }

    /// List leads newest first. `limit` is clamped to [`MAX_LIST_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, DatabaseError> {
        let limit = filter.limit.min(MAX_LIST_LIMIT);
        let mut rows = match filter.status {
            Some(status) => {
                self.db()
                    .conn()
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM leads WHERE status = ?1
                             ORDER BY id DESC LIMIT ?2 OFFSET ?3"
                        ),
                        libsql::params![status.as_str(), i64::from(limit), i64::from(filter.skip)],
                    )
                    .await?
            }
            None => {
                self.db()
                    .conn()
                    .query(
                        &format!("SELECT {SELECT_COLS} FROM leads ORDER BY id DESC LIMIT ?1 OFFSET ?2"),
                        libsql::params![i64::from(limit), i64::from(filter.skip)],
                    )
                    .await?
            }
        };

        let mut leads = Vec::new();
        while let Some(row) = rows.next().await? {
            leads.push(row_to_lead(&row)?);
        }
        Ok(leads)
    }

    /// Leads currently in `status`, least recently touched first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn leads_in_status(
        &self,
        status: LeadStatus,
        limit: u32,
    ) -> Result<Vec<Lead>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM leads WHERE status = ?1
                     ORDER BY updated_at, id LIMIT ?2"
                ),
                libsql::params![status.as_str(), i64::from(limit)],
            )
            .await?;
        let mut leads = Vec::new();
        while let Some(row) = rows.next().await? {
            leads.push(row_to_lead(&row)?);
        }
        Ok(leads)
    }

    /// Update contact fields and notes. Status is never touched here.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown lead, or
    /// `DatabaseError::Core` if the phone would become blank.
    pub async fn update_lead(&self, id: i64, update: LeadUpdate) -> Result<Lead, DatabaseError> {
        let mut sets = SetClause::new();
        if let Some(ref phone) = update.phone {
            if phone.trim().is_empty() {
                return Err(CoreError::Validation("phone is required".to_string()).into());
            }
            sets.set("phone", phone.trim());
        }
        for (column, value) in update.nullable_columns() {
            if let Some(value) = value {
                sets.set(column, opt_text(value.as_deref()));
            }
        }

        if sets.is_empty() {
            return self.get_lead(id).await;
        }

        let now = Utc::now();
        let fields = sets.columns();
        sets.set("updated_at", now.to_rfc3339());
        let (sql, params) = sets.into_update("leads", vec![("id", id.into())]);

        let _gate = self.write_gate().await;
        let tx = self.db().conn().transaction().await?;
        let changed = tx.execute(&sql, libsql::params_from_iter(params)).await?;
        if changed == 0 {
            return Err(DatabaseError::lead_not_found(id));
        }
        let detail = to_json(&UpdatedDetail { fields })?;
        insert_audit(&tx, EntityType::Lead, &id.to_string(), AuditAction::Updated, Some(&detail), now).await?;
        tx.commit().await?;

        let updated = self.get_lead(id).await?;
        self.record_trail(now, Actor::Operator, TrailOp::Update, EntityType::Lead, id.to_string(), to_json(&update)?);
        Ok(updated)
    }

    /// Append an agent failure to the lead's `error_messages` history.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown lead.
    pub async fn append_lead_error(
        &self,
        id: i64,
        agent: Actor,
        error: &str,
    ) -> Result<(), DatabaseError> {
        let _gate = self.write_gate().await;
        append_error_on(self.db().conn(), id, agent, error, Utc::now()).await
    }
}

/// Append to `error_messages` on `conn` without taking the gate.
pub(crate) async fn append_error_on(
    conn: &libsql::Connection,
    id: i64,
    agent: Actor,
    error: &str,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let record = to_json(&AgentErrorRecord {
        timestamp: now,
        agent: agent.as_str().to_string(),
        error: error.to_string(),
    })?;
    let changed = conn
        .execute(
            "UPDATE leads SET error_messages = json_insert(error_messages, '$[#]', json(?1)),
                              updated_at = ?2
             WHERE id = ?3",
            libsql::params![record.to_string(), now.to_rfc3339(), id],
        )
        .await?;
    if changed == 0 {
        return Err(DatabaseError::lead_not_found(id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::audit::AuditFilter;
    use crate::test_support::helpers::{jane, pending_lead, test_service, test_service_with_trail};
    use crate::updates::lead::LeadUpdateBuilder;
    use lf_core::import::parse_csv;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn create_lead_starts_pending() {
        let svc = test_service().await;
        let lead = pending_lead(&svc).await;

        assert_eq!(lead.status, LeadStatus::Pending);
        assert!(!lead.tcpa_opt_in);
        assert_eq!(lead.source, "manual");
        assert_eq!(lead.version, 0);
        assert!(lead.error_messages.is_empty());

        let fetched = svc.get_lead(lead.id).await.unwrap();
        assert_eq!(fetched, lead);
    }

    #[tokio::test]
    async fn create_lead_requires_phone() {
        let svc = test_service().await;
        let result = svc.create_lead(&NewLead::default(), "manual").await;
        assert!(matches!(result, Err(DatabaseError::Core(CoreError::Validation(_)))));
    }

    #[tokio::test]
    async fn get_missing_lead_is_not_found() {
        let svc = test_service().await;
        let result = svc.get_lead(404).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { entity: "lead", .. })));
    }

    #[tokio::test]
    async fn import_one_row_creates_pending_lead_without_consent() {
        let svc = test_service().await;
        let csv = "First Name,Last Name,Email,Phone,Address,City,State,Zip\n\
                   Jane,Doe,jane@x.com,5551234567,1 Main St,Phoenix,AZ,85001\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();

        let result = svc.import_leads(parsed, Some("leads.csv")).await.unwrap();
        assert_eq!(result.leads_created, 1);
        assert!(result.errors.is_none());

        let leads = svc.list_leads(&LeadFilter::default()).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].status, LeadStatus::Pending);
        assert!(!leads[0].tcpa_opt_in);
        assert_eq!(leads[0].source, "csv");
        assert_eq!(leads[0].email.as_deref(), Some("jane@x.com"));

        let audit = svc
            .query_audit(&AuditFilter {
                action: Some(AuditAction::Imported),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(audit.len(), 1);
    }

    #[tokio::test]
    async fn import_reports_skipped_rows() {
        let svc = test_service().await;
        let csv = "first_name,phone\nA,\nB,5550000000\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        let result = svc.import_leads(parsed, None).await.unwrap();
        assert_eq!(result.leads_created, 1);
        assert_eq!(result.errors.unwrap(), vec!["Row 1: Missing phone number".to_string()]);
    }

    #[tokio::test]
    async fn list_leads_filters_and_paginates() {
        let svc = test_service().await;
        for _ in 0..3 {
            pending_lead(&svc).await;
        }
        let confirmed = pending_lead(&svc).await;
        svc.mark_confirmed(confirmed.id).await.unwrap();

        let all = svc.list_leads(&LeadFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].id, confirmed.id, "newest first");

        let page = svc
            .list_leads(&LeadFilter { skip: 1, limit: 2, status: None })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);

        let only_confirmed = svc
            .list_leads(&LeadFilter {
                status: Some(LeadStatus::Confirmed),
                ..LeadFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(only_confirmed.len(), 1);
    }

    #[tokio::test]
    async fn update_lead_changes_contact_fields_only() {
        let svc = test_service().await;
        let lead = pending_lead(&svc).await;

        let update = LeadUpdateBuilder::new()
            .email(None)
            .city(Some("Tempe".into()))
            .notes(Some("prefers evenings".into()))
            .build();
        let updated = svc.update_lead(lead.id, update).await.unwrap();

        assert_eq!(updated.email, None);
        assert_eq!(updated.city.as_deref(), Some("Tempe"));
        assert_eq!(updated.notes.as_deref(), Some("prefers evenings"));
        assert_eq!(updated.status, LeadStatus::Pending);
        assert_eq!(updated.version, lead.version);
    }

    #[tokio::test]
    async fn update_lead_rejects_blank_phone() {
        let svc = test_service().await;
        let lead = pending_lead(&svc).await;
        let result = svc
            .update_lead(lead.id, LeadUpdateBuilder::new().phone("  ").build())
            .await;
        assert!(matches!(result, Err(DatabaseError::Core(_))));
    }

    #[tokio::test]
    async fn update_missing_lead_is_not_found() {
        let svc = test_service().await;
        let result = svc
            .update_lead(9, LeadUpdateBuilder::new().notes(Some("x".into())).build())
            .await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn append_lead_error_accumulates() {
        let svc = test_service().await;
        let lead = pending_lead(&svc).await;

        svc.append_lead_error(lead.id, Actor::VoiceAgent, "line busy").await.unwrap();
        svc.append_lead_error(lead.id, Actor::DataEntryAgent, "portal down").await.unwrap();

        let lead = svc.get_lead(lead.id).await.unwrap();
        assert_eq!(lead.error_messages.len(), 2);
        assert_eq!(lead.error_messages[0].agent, "voice_agent");
        assert_eq!(lead.error_messages[1].error, "portal down");
    }

    #[tokio::test]
    async fn create_writes_trail() {
        let dir = tempfile::tempdir().unwrap();
        let svc = test_service_with_trail(dir.path().to_path_buf()).await;
        let lead = svc.create_lead(&jane(), "manual").await.unwrap();

        let day = lead.created_at.format("%Y-%m-%d").to_string();
        let ops = svc.trail().read_day(&day).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].op, TrailOp::Create);
        assert_eq!(ops[0].id, lead.id.to_string());
    }
}
