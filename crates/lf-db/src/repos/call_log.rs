//! Call log repository. Rows are created by transitions into `calling` and
//! updated by dial and call-end events in [`crate::repos::lifecycle`].

use chrono::{DateTime, Utc};
use lf_core::entities::CallLog;
use lf_core::enums::CallStatus;

use crate::error::DatabaseError;
use crate::helpers::{
    get_opt_string, parse_datetime, parse_enum, parse_optional_datetime, parse_optional_json,
};
use crate::repos::lead::MAX_LIST_LIMIT;
use crate::service::LeadService;

const SELECT_COLS: &str = "id, lead_id, call_sid, phone_number, call_status, duration, \
     recording_url, recording_key, vendor_data, started_at, ended_at, created_at";

fn row_to_call_log(row: &libsql::Row) -> Result<CallLog, DatabaseError> {
    Ok(CallLog {
        id: row.get(0)?,
        lead_id: row.get(1)?,
        call_sid: get_opt_string(row, 2)?,
        phone_number: row.get(3)?,
        call_status: parse_enum(&row.get::<String>(4)?)?,
        duration: row.get::<Option<i64>>(5)?,
        recording_url: get_opt_string(row, 6)?,
        recording_key: get_opt_string(row, 7)?,
        vendor_data: parse_optional_json(get_opt_string(row, 8)?.as_deref())?,
        started_at: parse_optional_datetime(get_opt_string(row, 9)?.as_deref())?,
        ended_at: parse_optional_datetime(get_opt_string(row, 10)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(11)?)?,
    })
}

async fn collect(mut rows: libsql::Rows) -> Result<Vec<CallLog>, DatabaseError> {
    let mut logs = Vec::new();
    while let Some(row) = rows.next().await? {
        logs.push(row_to_call_log(&row)?);
    }
    Ok(logs)
}

pub(crate) async fn fetch_call_log(
    conn: &libsql::Connection,
    id: i64,
) -> Result<CallLog, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM call_logs WHERE id = ?1"), [id])
        .await?;
    let row = rows.next().await?.ok_or_else(|| DatabaseError::NotFound {
        entity: "call log",
        id: id.to_string(),
    })?;
    row_to_call_log(&row)
}

pub(crate) async fn find_call_log_on(
    conn: &libsql::Connection,
    call_sid: &str,
) -> Result<Option<CallLog>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SELECT_COLS} FROM call_logs WHERE call_sid = ?1"),
            [call_sid],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_call_log(&row)?)),
        None => Ok(None),
    }
}

impl LeadService {
    /// All call logs, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_call_logs(&self, skip: u32, limit: u32) -> Result<Vec<CallLog>, DatabaseError> {
        let rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM call_logs ORDER BY id DESC LIMIT ?1 OFFSET ?2"),
                libsql::params![i64::from(limit.min(MAX_LIST_LIMIT)), i64::from(skip)],
            )
            .await?;
        collect(rows).await
    }

    /// Call history of one lead, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_call_logs_for_lead(&self, lead_id: i64) -> Result<Vec<CallLog>, DatabaseError> {
        let rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM call_logs WHERE lead_id = ?1 ORDER BY id"),
                [lead_id],
            )
            .await?;
        collect(rows).await
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no call log has this id.
    pub async fn get_call_log(&self, id: i64) -> Result<CallLog, DatabaseError> {
        fetch_call_log(self.db().conn(), id).await
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_call_log_by_sid(&self, call_sid: &str) -> Result<Option<CallLog>, DatabaseError> {
        find_call_log_on(self.db().conn(), call_sid).await
    }

    /// Calls waiting to be dialed, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn queued_call_logs(&self, limit: u32) -> Result<Vec<CallLog>, DatabaseError> {
        let rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM call_logs WHERE call_status = ?1 ORDER BY id LIMIT ?2"
                ),
                libsql::params![CallStatus::Queued.as_str(), i64::from(limit)],
            )
            .await?;
        collect(rows).await
    }

    /// When each call to the lead was placed, oldest first. Calls never dialed
    /// count from their creation.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn call_history(&self, lead_id: i64) -> Result<Vec<DateTime<Utc>>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT COALESCE(started_at, created_at) AS placed_at FROM call_logs
                 WHERE lead_id = ?1 ORDER BY placed_at",
                [lead_id],
            )
            .await?;
        let mut history = Vec::new();
        while let Some(row) = rows.next().await? {
            history.push(parse_datetime(&row.get::<String>(0)?)?);
        }
        Ok(history)
    }

    /// Store the object-storage key of an uploaded recording.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no call log has this id.
    pub async fn attach_recording_key(&self, id: i64, recording_key: &str) -> Result<CallLog, DatabaseError> {
        let _gate = self.write_gate().await;
        let changed = self
            .db()
            .conn()
            .execute(
                "UPDATE call_logs SET recording_key = ?1 WHERE id = ?2",
                libsql::params![recording_key, id],
            )
            .await?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "call log",
                id: id.to_string(),
            });
        }
        fetch_call_log(self.db().conn(), id).await
    }
}
