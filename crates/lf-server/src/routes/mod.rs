pub mod agents;
pub mod health;
pub mod leads;
pub mod logs;
pub mod settings;
pub mod stats;
pub mod webhooks;

use serde::Deserialize;

use crate::error::ApiError;
use lf_db::repos::lead::MAX_LIST_LIMIT;

/// `skip`/`limit` query parameters shared by the list endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct Page {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

const fn default_limit() -> u32 {
    100
}

pub(crate) fn check_limit(limit: u32) -> Result<u32, ApiError> {
    if limit > MAX_LIST_LIMIT {
        return Err(ApiError::bad_request(format!(
            "limit must be at most {MAX_LIST_LIMIT}"
        )));
    }
    Ok(limit)
}
