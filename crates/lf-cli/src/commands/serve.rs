use std::sync::Arc;

use anyhow::Context;
use lf_server::AppState;

use crate::bootstrap::AppContext;
use crate::cli::root_commands::ServeArgs;

/// Handle `leadflow serve`.
pub async fn handle(args: &ServeArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let mut server = ctx.config.server.clone();
    if let Some(host) = &args.host {
        server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        server.port = port;
    }

    let agents = Arc::new(ctx.supervisor());
    if args.start_agents {
        agents.start().await.context("failed to start agents")?;
    }

    let state = AppState {
        service: Arc::clone(&ctx.service),
        agents,
        default_caps: ctx.config.calling.default_caps(),
    };
    lf_server::serve(state, &server)
        .await
        .with_context(|| format!("server on {} failed", server.bind_addr()))
}
