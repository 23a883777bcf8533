//! Service layer orchestrating database mutations with audit and trail.
//!
//! `LeadService` wraps `LeadDb` (raw database access) and `TrailWriter` (JSONL
//! persistence). All repo methods are implemented as `impl LeadService` blocks
//! in [`crate::repos`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use lf_core::enums::{Actor, EntityType, TrailOp};
use lf_core::trail::TrailOperation;
use tokio::sync::{Mutex, MutexGuard};

use crate::LeadDb;
use crate::error::DatabaseError;
use crate::trail::writer::TrailWriter;

/// Orchestrates database mutations with audit trail and JSONL trail.
///
/// Every mutation method follows this protocol:
/// 1. Take the write gate
/// 2. Begin transaction
/// 3. Execute SQL (status changes use compare-and-swap)
/// 4. Append audit entry (inside transaction)
/// 5. Commit
/// 6. Append JSONL trail operation
pub struct LeadService {
    db: LeadDb,
    trail: TrailWriter,
    write_gate: Mutex<()>,
}

impl LeadService {
    /// Open a service over a local database file.
    ///
    /// * `db_path`: path to the libSQL database file, or `":memory:"` for tests.
    /// * `trail_dir`: directory for JSONL trail files, `None` to disable.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or the trail
    /// directory cannot be created.
    pub async fn new_local(
        db_path: &str,
        trail_dir: Option<PathBuf>,
    ) -> Result<Self, DatabaseError> {
        let db = LeadDb::open_local(db_path).await?;
        let trail = match trail_dir {
            Some(dir) => TrailWriter::new(dir)?,
            None => TrailWriter::disabled(),
        };
        Ok(Self::from_db(db, trail))
    }

    /// Create from an existing `LeadDb`.
    #[must_use]
    pub fn from_db(db: LeadDb, trail: TrailWriter) -> Self {
        Self {
            db,
            trail,
            write_gate: Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn db(&self) -> &LeadDb {
        &self.db
    }

    #[must_use]
    pub const fn trail(&self) -> &TrailWriter {
        &self.trail
    }

    /// Serialize writers. Held for the whole read-check-write of a mutation.
    pub(crate) async fn write_gate(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }

    /// Record a committed mutation in the JSONL trail.
    ///
    /// The database is already committed at this point, so a trail failure is
    /// logged and swallowed.
    pub(crate) fn record_trail(
        &self,
        now: DateTime<Utc>,
        actor: Actor,
        op: TrailOp,
        entity: EntityType,
        id: impl Into<String>,
        data: serde_json::Value,
    ) {
        let operation = TrailOperation {
            v: 1,
            ts: now.to_rfc3339(),
            actor,
            op,
            entity,
            id: id.into(),
            data,
        };
        if let Err(e) = self.trail.append(&operation) {
            tracing::warn!(entity = %entity, id = %operation.id, "trail append failed: {e}");
        }
    }
}
