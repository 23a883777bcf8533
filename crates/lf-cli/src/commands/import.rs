use anyhow::Context;
use lf_core::import::{check_file_name, parse_csv};

use crate::bootstrap::AppContext;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::ImportArgs;
use crate::output::output;

/// Handle `leadflow import <csv>`.
pub async fn handle(args: &ImportArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let file_name = args
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .context("import path has no file name")?;
    check_file_name(file_name)?;

    let bytes = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let parsed = parse_csv(&bytes)?;
    let result = ctx.service.import_leads(parsed, Some(file_name)).await?;
    output(&result, flags.format)
}
