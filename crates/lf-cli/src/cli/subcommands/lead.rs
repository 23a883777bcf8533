use clap::Subcommand;
use lf_core::enums::LeadStatus;

use crate::commands::shared::parse::parse_status;

/// Lead commands.
#[derive(Clone, Debug, Subcommand)]
pub enum LeadCommands {
    /// List leads, newest first.
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<LeadStatus>,
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Get a lead by ID.
    Get { id: i64 },
    /// Add a lead by hand. It starts in `pending`.
    Add {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        zip: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Queue another call.
    RetryCall { id: i64 },
    /// Queue another portal submission for a lead in `entry_failed`.
    RetryEntry { id: i64 },
    /// Mark a lead confirmed without a call.
    MarkConfirmed { id: i64 },
    /// Force a status, bypassing the lifecycle rules.
    SetStatus {
        id: i64,
        #[arg(value_parser = parse_status)]
        status: LeadStatus,
        #[arg(long)]
        reason: Option<String>,
    },
}
