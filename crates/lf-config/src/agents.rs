//! Agent loop timing.

use serde::{Deserialize, Serialize};

const fn default_voice_poll_secs() -> u64 {
    30
}

const fn default_entry_poll_secs() -> u64 {
    15
}

const fn default_voice_batch() -> u32 {
    5
}

const fn default_entry_batch() -> u32 {
    3
}

const fn default_error_backoff_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentsConfig {
    /// Seconds between voice agent ticks.
    #[serde(default = "default_voice_poll_secs")]
    pub voice_poll_secs: u64,

    /// Seconds between data-entry agent ticks.
    #[serde(default = "default_entry_poll_secs")]
    pub entry_poll_secs: u64,

    /// Leads claimed per voice tick.
    #[serde(default = "default_voice_batch")]
    pub voice_batch: u32,

    /// Leads claimed per data-entry tick.
    #[serde(default = "default_entry_batch")]
    pub entry_batch: u32,

    /// Pause after a failed tick.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            voice_poll_secs: default_voice_poll_secs(),
            entry_poll_secs: default_entry_poll_secs(),
            voice_batch: default_voice_batch(),
            entry_batch: default_entry_batch(),
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}
