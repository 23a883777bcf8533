use lf_core::entities::{Lead, NewLead};
use lf_core::responses::LeadActionResponse;
use lf_db::repos::lead::LeadFilter;

use crate::bootstrap::AppContext;
use crate::cli::GlobalFlags;
use crate::cli::subcommands::LeadCommands;
use crate::output::output;

/// Handle `leadflow lead`.
pub async fn handle(action: LeadCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        LeadCommands::List { status, skip, limit } => {
            let leads = svc.list_leads(&LeadFilter { skip, limit, status }).await?;
            output(&leads, flags.format)
        }
        LeadCommands::Get { id } => output(&svc.get_lead(id).await?, flags.format),
        LeadCommands::Add {
            phone,
            first_name,
            last_name,
            email,
            address,
            city,
            state,
            zip,
            notes,
        } => {
            let new = NewLead {
                first_name,
                last_name,
                email,
                phone,
                address,
                address2: None,
                city,
                state,
                zip,
                notes,
            };
            output(&svc.create_lead(&new, "manual").await?, flags.format)
        }
        LeadCommands::RetryCall { id } => {
            let outcome = svc.retry_call(id).await?;
            respond(format!("Lead {id} marked for call retry"), outcome.lead, flags)
        }
        LeadCommands::RetryEntry { id } => {
            let outcome = svc.retry_entry(id).await?;
            respond(format!("Lead {id} marked for data entry retry"), outcome.lead, flags)
        }
        LeadCommands::MarkConfirmed { id } => {
            let outcome = svc.mark_confirmed(id).await?;
            respond(format!("Lead {id} manually marked as confirmed"), outcome.lead, flags)
        }
        LeadCommands::SetStatus { id, status, reason } => {
            let lead = svc.override_status(id, status, reason.as_deref()).await?;
            respond(format!("Lead {id} status set to {status}"), lead, flags)
        }
    }
}

fn respond(message: String, lead: Lead, flags: &GlobalFlags) -> anyhow::Result<()> {
    output(&LeadActionResponse { message, lead }, flags.format)
}
