mod lead;
mod logs;
mod settings;

pub use lead::LeadCommands;
pub use logs::LogsCommands;
pub use settings::SettingsCommands;
