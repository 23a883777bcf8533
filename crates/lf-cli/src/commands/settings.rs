use anyhow::Context;
use lf_core::entities::CallAttemptSettings;

use crate::bootstrap::AppContext;
use crate::cli::GlobalFlags;
use crate::cli::subcommands::SettingsCommands;
use crate::output::output;

/// Handle `leadflow settings`.
pub async fn handle(action: &SettingsCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        SettingsCommands::Show => {
            let caps = ctx
                .service
                .get_call_settings()
                .await?
                .unwrap_or_else(|| ctx.config.calling.default_caps());
            output(&caps, flags.format)
        }
        SettingsCommands::Set { caps } => {
            let caps: [u32; 6] = caps
                .as_slice()
                .try_into()
                .context("expected exactly six caps")?;
            let saved = ctx
                .service
                .set_call_settings(&CallAttemptSettings::from_array(caps))
                .await?;
            output(&saved, flags.format)
        }
    }
}
