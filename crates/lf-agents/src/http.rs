//! Shared HTTP response check for vendor clients.

use crate::error::AgentError;

/// Return the response unchanged on success, or [`AgentError::Api`] with the
/// status code and body.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, AgentError> {
    if !resp.status().is_success() {
        return Err(AgentError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Client with the timeout and user agent every vendor call shares.
///
/// # Errors
///
/// Returns `AgentError::Http` if the TLS backend cannot be initialized.
pub fn build_client() -> Result<reqwest::Client, AgentError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("leadflow/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .build()?)
}
