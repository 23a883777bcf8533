use clap::Subcommand;

/// Log commands.
#[derive(Clone, Debug, Subcommand)]
pub enum LogsCommands {
    /// Call attempts, newest first, or one lead's in order.
    Calls {
        #[arg(long)]
        lead: Option<i64>,
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Portal submissions, newest first, or one lead's in order.
    Entries {
        #[arg(long)]
        lead: Option<i64>,
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
}
