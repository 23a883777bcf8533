//! Operator call-attempt settings: a single row keyed `id = 1`.

use chrono::Utc;
use lf_core::entities::CallAttemptSettings;
use lf_core::enums::{Actor, AuditAction, EntityType, TrailOp};

use crate::error::DatabaseError;
use crate::helpers::to_json;
use crate::repos::audit::insert_audit;
use crate::service::LeadService;

fn read_cap(row: &libsql::Row, idx: i32) -> Result<u32, DatabaseError> {
    let value = row.get::<i64>(idx)?;
    u32::try_from(value)
        .map_err(|_| DatabaseError::InvalidState(format!("call cap out of range: {value}")))
}

impl LeadService {
    /// Stored caps, or `None` if the operator never saved any.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_call_settings(&self) -> Result<Option<CallAttemptSettings>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT day1, day2, day3, day4, day5, day6 FROM call_settings WHERE id = 1",
                (),
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let mut caps = [0_u32; 6];
        for (idx, cap) in (0_i32..).zip(caps.iter_mut()) {
            *cap = read_cap(&row, idx)?;
        }
        Ok(Some(CallAttemptSettings::from_array(caps)))
    }

    /// Replace the stored caps.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the upsert fails.
    pub async fn set_call_settings(
        &self,
        settings: &CallAttemptSettings,
    ) -> Result<CallAttemptSettings, DatabaseError> {
        let now = Utc::now();
        let [d1, d2, d3, d4, d5, d6] = settings.as_array().map(i64::from);
        let detail = to_json(settings)?;

        let _gate = self.write_gate().await;
        let tx = self.db().conn().transaction().await?;
        tx.execute(
            "INSERT INTO call_settings (id, day1, day2, day3, day4, day5, day6, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                day1 = excluded.day1, day2 = excluded.day2, day3 = excluded.day3,
                day4 = excluded.day4, day5 = excluded.day5, day6 = excluded.day6,
                updated_at = excluded.updated_at",
            libsql::params![d1, d2, d3, d4, d5, d6, now.to_rfc3339()],
        )
        .await?;
        insert_audit(&tx, EntityType::Settings, "call_attempts", AuditAction::SettingsChanged, Some(&detail), now)
            .await?;
        tx.commit().await?;

        tracing::info!(caps = ?settings.as_array(), "call attempt settings updated");
        self.record_trail(now, Actor::Operator, TrailOp::Update, EntityType::Settings, "call_attempts", detail);
        Ok(*settings)
    }
}
