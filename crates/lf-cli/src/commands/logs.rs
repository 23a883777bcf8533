use crate::bootstrap::AppContext;
use crate::cli::GlobalFlags;
use crate::cli::subcommands::LogsCommands;
use crate::output::output;

/// Handle `leadflow logs`.
pub async fn handle(action: &LogsCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match *action {
        LogsCommands::Calls { lead: Some(lead_id), .. } => {
            svc.get_lead(lead_id).await?;
            output(&svc.list_call_logs_for_lead(lead_id).await?, flags.format)
        }
        LogsCommands::Calls { lead: None, skip, limit } => {
            output(&svc.list_call_logs(skip, limit).await?, flags.format)
        }
        LogsCommands::Entries { lead: Some(lead_id), .. } => {
            svc.get_lead(lead_id).await?;
            output(&svc.list_entry_logs_for_lead(lead_id).await?, flags.format)
        }
        LogsCommands::Entries { lead: None, skip, limit } => {
            output(&svc.list_entry_logs(skip, limit).await?, flags.format)
        }
    }
}
