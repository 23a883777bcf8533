//! # lf-db
//!
//! libSQL persistence for Leadflow: leads, their append-only call and
//! data-entry logs, the audit trail and operator call settings.
//!
//! All mutations go through [`service::LeadService`], which serializes writers
//! behind a single gate and applies lifecycle transitions with a
//! compare-and-swap on `leads.status` inside one transaction.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod service;
pub mod trail;
pub mod updates;

#[cfg(test)]
mod test_support;

use error::DatabaseError;
use libsql::Builder;

/// Database handle wrapping a libSQL database and its single connection.
pub struct LeadDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl LeadDb {
    /// Open a local database at the given path, or `":memory:"`.
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Foreign keys are per-connection in SQLite
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let lead_db = Self { db, conn };
        lead_db.run_migrations().await?;
        Ok(lead_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LeadDb {
        LeadDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let db = test_db().await;

        let tables = [
            "leads",
            "call_logs",
            "data_entry_logs",
            "audit_trail",
            "call_settings",
        ];
        for table in &tables {
            let mut rows = db
                .conn()
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [*table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap();
            assert!(row.is_some(), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn status_check_constraint_rejects_unknown_status() {
        let db = test_db().await;
        let result = db
            .conn()
            .execute(
                "INSERT INTO leads (phone, status) VALUES ('5551234567', 'archived')",
                (),
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn entry_attempt_numbers_are_unique_per_lead() {
        let db = test_db().await;
        db.conn()
            .execute("INSERT INTO leads (phone) VALUES ('5551234567')", ())
            .await
            .unwrap();
        let insert = "INSERT INTO data_entry_logs (lead_id, attempt_number, started_at)
                      VALUES (1, 1, datetime('now'))";
        db.conn().execute(insert, ()).await.unwrap();
        assert!(db.conn().execute(insert, ()).await.is_err());
    }
}
