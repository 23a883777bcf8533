use anyhow::bail;
use lf_core::entities::{CallAttemptSettings, CallLog, DataEntryLog, Lead, NewLead};
use lf_core::responses::{AgentStatus, DashboardStats, StatusBreakdown};
use schemars::schema_for;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SchemaArgs;
use crate::output::output;

/// Handle `leadflow schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let schema = match args.type_name.replace('_', "-").as_str() {
        "lead" => schema_for!(Lead),
        "new-lead" => schema_for!(NewLead),
        "call-log" => schema_for!(CallLog),
        "data-entry-log" => schema_for!(DataEntryLog),
        "call-attempts" => schema_for!(CallAttemptSettings),
        "dashboard" => schema_for!(DashboardStats),
        "status-breakdown" => schema_for!(StatusBreakdown),
        "agent-status" => schema_for!(AgentStatus),
        other => bail!("unknown schema type '{other}'"),
    };
    output(&schema, flags.format)
}
