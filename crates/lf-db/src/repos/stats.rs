//! Aggregate lead counts for the dashboard.

use lf_core::enums::LeadStatus;
use lf_core::responses::{DashboardStats, StatusBreakdown};

use crate::error::DatabaseError;
use crate::helpers::parse_enum;
use crate::service::LeadService;

impl LeadService {
    /// Count leads per status. Statuses with no leads report zero.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn status_breakdown(&self) -> Result<StatusBreakdown, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query("SELECT status, COUNT(*) FROM leads GROUP BY status", ())
            .await?;
        let mut breakdown = StatusBreakdown::default();
        while let Some(row) = rows.next().await? {
            let status: LeadStatus = parse_enum(&row.get::<String>(0)?)?;
            breakdown.add(status, row.get::<i64>(1)?);
        }
        Ok(breakdown)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, DatabaseError> {
        Ok(DashboardStats::from_breakdown(&self.status_breakdown().await?))
    }
}
