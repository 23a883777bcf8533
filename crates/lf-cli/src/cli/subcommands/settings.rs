use clap::Subcommand;

/// Call-attempt settings commands.
#[derive(Clone, Debug, Subcommand)]
pub enum SettingsCommands {
    /// Show the caps in effect.
    Show,
    /// Save per-day caps for days 1 through 6.
    Set {
        #[arg(num_args = 6, required = true, value_name = "CAP")]
        caps: Vec<u32>,
    },
}
