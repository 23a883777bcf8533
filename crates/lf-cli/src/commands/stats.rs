use lf_core::responses::{DashboardStats, StatusBreakdown};
use serde::Serialize;

use crate::bootstrap::AppContext;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::output::output;

#[derive(Serialize)]
struct StatsReport {
    dashboard: DashboardStats,
    breakdown: StatusBreakdown,
}

/// Handle `leadflow stats`.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let breakdown = ctx.service.status_breakdown().await?;
    let report = StatsReport {
        dashboard: DashboardStats::from_breakdown(&breakdown),
        breakdown,
    };
    // Tables are flat; the dashboard numbers derive from the breakdown.
    match flags.format {
        OutputFormat::Json => output(&report, flags.format),
        OutputFormat::Table => output(&report.breakdown, flags.format),
    }
}
