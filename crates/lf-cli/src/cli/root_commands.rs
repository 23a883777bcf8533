use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::cli::subcommands::{LeadCommands, LogsCommands, SettingsCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Lead records and operator actions.
    Lead {
        #[command(subcommand)]
        action: LeadCommands,
    },
    /// Import leads from a CSV file.
    Import(ImportArgs),
    /// Call and data-entry logs.
    Logs {
        #[command(subcommand)]
        action: LogsCommands,
    },
    /// Dashboard counters and per-status breakdown.
    Stats,
    /// Operator call-attempt caps.
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },
    /// Print the JSON Schema of an API type.
    Schema(SchemaArgs),
}

#[derive(Clone, Debug, Args)]
pub struct ServeArgs {
    /// Override `server.host`.
    #[arg(long)]
    pub host: Option<String>,
    /// Override `server.port`.
    #[arg(long)]
    pub port: Option<u16>,
    /// Start the voice and data-entry agents with the server.
    #[arg(long)]
    pub start_agents: bool,
}

#[derive(Clone, Debug, Args)]
pub struct ImportArgs {
    /// Path to a `.csv` file.
    pub path: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// One of: lead, new-lead, call-log, data-entry-log, call-attempts,
    /// dashboard, status-breakdown, agent-status.
    pub type_name: String,
}
