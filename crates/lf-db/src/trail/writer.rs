//! JSONL trail writer.
//!
//! Appends `TrailOperation` records to per-day `{trail_dir}/{YYYY-MM-DD}.jsonl`
//! files. Uses `serde_jsonlines::append_json_lines` for per-line appends.

use std::path::{Path, PathBuf};

use lf_core::trail::TrailOperation;

use crate::error::DatabaseError;

/// Appends trail operations to per-day JSONL files.
pub struct TrailWriter {
    trail_dir: PathBuf,
    enabled: bool,
}

impl TrailWriter {
    /// Create a writer pointing at the given directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created.
    pub fn new(trail_dir: PathBuf) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(&trail_dir).map_err(|e| DatabaseError::Other(e.into()))?;
        Ok(Self {
            trail_dir,
            enabled: true,
        })
    }

    /// A writer that drops every operation.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            trail_dir: PathBuf::new(),
            enabled: false,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append a trail operation to the file for the operation's day.
    ///
    /// File path: `{trail_dir}/{op.ts[..10]}.jsonl`
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the file write fails.
    pub fn append(&self, op: &TrailOperation) -> Result<(), DatabaseError> {
        if !self.enabled {
            return Ok(());
        }

        let day = op.ts.get(..10).unwrap_or("undated");
        let path = self.trail_dir.join(format!("{day}.jsonl"));
        serde_jsonlines::append_json_lines(&path, [op])
            .map_err(|e| DatabaseError::Other(e.into()))?;
        Ok(())
    }

    /// Read every operation from one day's file.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the file cannot be read or parsed.
    pub fn read_day(&self, day: &str) -> Result<Vec<TrailOperation>, DatabaseError> {
        let path = self.trail_dir.join(format!("{day}.jsonl"));
        if !path.exists() {
            return Ok(Vec::new());
        }
        let ops: Vec<TrailOperation> = serde_jsonlines::json_lines(&path)
            .map_err(|e| DatabaseError::Other(e.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::Other(e.into()))?;
        Ok(ops)
    }

    #[must_use]
    pub fn trail_dir(&self) -> &Path {
        &self.trail_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_core::enums::{Actor, EntityType, TrailOp};

    fn op(ts: &str, id: &str) -> TrailOperation {
        TrailOperation {
            v: 1,
            ts: ts.to_string(),
            actor: Actor::Operator,
            op: TrailOp::Create,
            entity: EntityType::Lead,
            id: id.to_string(),
            data: serde_json::json!({}),
        }
    }

    #[test]
    fn appends_to_daily_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TrailWriter::new(dir.path().join("trail")).unwrap();

        writer.append(&op("2026-03-02T10:00:00+00:00", "1")).unwrap();
        writer.append(&op("2026-03-02T11:00:00+00:00", "2")).unwrap();
        writer.append(&op("2026-03-03T09:00:00+00:00", "3")).unwrap();

        let day1 = writer.read_day("2026-03-02").unwrap();
        assert_eq!(day1.len(), 2);
        assert_eq!(day1[1].id, "2");
        assert_eq!(writer.read_day("2026-03-03").unwrap().len(), 1);
        assert!(writer.read_day("2026-03-04").unwrap().is_empty());
    }

    #[test]
    fn disabled_writer_writes_nothing() {
        let writer = TrailWriter::disabled();
        assert!(!writer.is_enabled());
        writer.append(&op("2026-03-02T10:00:00+00:00", "1")).unwrap();
    }
}
