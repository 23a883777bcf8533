//! Data-entry log repository (read side). Attempts are appended by transitions
//! into `entry_in_progress` and completed by `record_entry_result`.

use lf_core::entities::DataEntryLog;

use crate::error::DatabaseError;
use crate::helpers::{
    get_opt_bool, get_opt_string, parse_datetime, parse_optional_datetime, parse_optional_json,
};
use crate::repos::lead::MAX_LIST_LIMIT;
use crate::service::LeadService;

const SELECT_COLS: &str = "id, lead_id, attempt_number, success, external_id, error_message, \
     screenshot_path, response, started_at, completed_at, created_at";

fn row_to_entry_log(row: &libsql::Row) -> Result<DataEntryLog, DatabaseError> {
    Ok(DataEntryLog {
        id: row.get(0)?,
        lead_id: row.get(1)?,
        attempt_number: row.get(2)?,
        success: get_opt_bool(row, 3)?,
        external_id: get_opt_string(row, 4)?,
        error_message: get_opt_string(row, 5)?,
        screenshot_path: get_opt_string(row, 6)?,
        response: parse_optional_json(get_opt_string(row, 7)?.as_deref())?,
        started_at: parse_datetime(&row.get::<String>(8)?)?,
        completed_at: parse_optional_datetime(get_opt_string(row, 9)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(10)?)?,
    })
}

async fn collect(mut rows: libsql::Rows) -> Result<Vec<DataEntryLog>, DatabaseError> {
    let mut logs = Vec::new();
    while let Some(row) = rows.next().await? {
        logs.push(row_to_entry_log(&row)?);
    }
    Ok(logs)
}

pub(crate) async fn fetch_entry_log(
    conn: &libsql::Connection,
    id: i64,
) -> Result<DataEntryLog, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM data_entry_logs WHERE id = ?1"), [id])
        .await?;
    let row = rows.next().await?.ok_or_else(|| DatabaseError::NotFound {
        entity: "data entry log",
        id: id.to_string(),
    })?;
    row_to_entry_log(&row)
}

impl LeadService {
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_entry_logs(&self, skip: u32, limit: u32) -> Result<Vec<DataEntryLog>, DatabaseError> {
        let rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM data_entry_logs ORDER BY id DESC LIMIT ?1 OFFSET ?2"
                ),
                libsql::params![i64::from(limit.min(MAX_LIST_LIMIT)), i64::from(skip)],
            )
            .await?;
        collect(rows).await
    }

    /// Attempts for one lead in attempt order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_entry_logs_for_lead(&self, lead_id: i64) -> Result<Vec<DataEntryLog>, DatabaseError> {
        let rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM data_entry_logs WHERE lead_id = ?1 ORDER BY attempt_number"
                ),
                [lead_id],
            )
            .await?;
        collect(rows).await
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no attempt has this id.
    pub async fn get_entry_log(&self, id: i64) -> Result<DataEntryLog, DatabaseError> {
        fetch_entry_log(self.db().conn(), id).await
    }

    /// Attempts started but not yet completed, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn open_entry_logs(&self, limit: u32) -> Result<Vec<DataEntryLog>, DatabaseError> {
        let rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM data_entry_logs WHERE completed_at IS NULL
                     ORDER BY id LIMIT ?1"
                ),
                [i64::from(limit)],
            )
            .await?;
        collect(rows).await
    }
}
