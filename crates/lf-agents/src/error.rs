//! Agent error types.

use lf_db::error::DatabaseError;
use thiserror::Error;

/// Errors raised by vendor clients, agent ticks and the supervisor.
#[derive(Debug, Error)]
pub enum AgentError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A vendor API returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the vendor.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// The portal answered but refused the lead.
    #[error("portal rejected lead: {message}")]
    Rejected {
        message: String,
        screenshot_path: Option<String>,
    },

    /// A vendor section of the configuration is incomplete.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Agents are already running")]
    AlreadyRunning,

    #[error("Agents are not running")]
    NotRunning,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
