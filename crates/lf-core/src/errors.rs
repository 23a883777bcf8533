//! Cross-cutting error types for Leadflow.
//!
//! Domain-specific errors (e.g., `DatabaseError`, `AgentError`) are defined in
//! their respective crates. The HTTP layer and the CLI are where they converge.

use thiserror::Error;

/// Errors that can be raised by any Leadflow crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} via {trigger}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        trigger: String,
    },

    /// Data failed validation (schema, format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
