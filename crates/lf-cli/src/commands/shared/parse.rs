use lf_core::enums::LeadStatus;
use serde::de::DeserializeOwned;

/// Parse a `snake_case` enum value using serde-deserialization.
pub fn parse_enum<T>(raw: &str, field: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let normalized = raw.replace('-', "_");
    let json = format!("\"{normalized}\"");
    serde_json::from_str(&json).map_err(|error| anyhow::anyhow!("invalid {field} '{raw}': {error}"))
}

/// clap value parser for lead statuses; accepts `no-answer` and `no_answer`.
pub fn parse_status(raw: &str) -> Result<LeadStatus, String> {
    parse_enum(raw, "status").map_err(|error| error.to_string())
}
