//! Voice vendor and enrollment portal endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VoiceConfig {
    /// Base URL of the voice vendor API (e.g., `https://api.vapi.ai`).
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    /// Assistant that runs the confirmation script.
    #[serde(default)]
    pub assistant_id: String,

    /// Vendor-side caller number id.
    #[serde(default)]
    pub phone_number_id: String,
}

impl VoiceConfig {
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.api_key.is_empty() && !self.assistant_id.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PortalConfig {
    /// Submission endpoint of the portal automation service.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,
}

impl PortalConfig {
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty()
    }
}
