//! API error body and the mapping from domain errors to status codes.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lf_agents::AgentError;
use lf_core::errors::CoreError;
use lf_db::error::DatabaseError;
use serde::Serialize;

/// Rendered as `{"error": {"code": <u16>, "message": <string>}}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: 400,
            message: message.into(),
        }
    }

    fn internal(message: String) -> Self {
        tracing::error!("request failed: {message}");
        Self { code: 500, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        (status, body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::NotFound { .. } => Self { code: 404, message },
            CoreError::Validation(_) => Self { code: 400, message },
            CoreError::InvalidTransition { .. } => Self { code: 409, message },
            CoreError::Other(_) => Self::internal(message),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Core(core) => core.into(),
            DatabaseError::NotFound { .. } => Self {
                code: 404,
                message: err.to_string(),
            },
            DatabaseError::Conflict(_) => Self {
                code: 409,
                message: err.to_string(),
            },
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Database(db) => db.into(),
            AgentError::AlreadyRunning | AgentError::NotRunning => Self {
                code: 409,
                message: err.to_string(),
            },
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        Self::bad_request(err.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        Self::bad_request(err.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::bad_request(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_errors_are_conflicts() {
        let err = DatabaseError::Core(CoreError::InvalidTransition {
            entity_type: "lead".into(),
            id: "1".into(),
            from: "entered".into(),
            trigger: "retry_call".into(),
        });
        assert_eq!(ApiError::from(err).code, 409);
        assert_eq!(ApiError::from(DatabaseError::Conflict("x".into())).code, 409);
    }

    #[test]
    fn lookup_and_validation_codes() {
        let missing = DatabaseError::NotFound {
            entity: "lead",
            id: "9".into(),
        };
        let api = ApiError::from(missing);
        assert_eq!(api.code, 404);
        assert_eq!(api.message, "lead 9 not found");

        let invalid = DatabaseError::Core(CoreError::Validation("phone is required".into()));
        assert_eq!(ApiError::from(invalid).code, 400);
        assert_eq!(ApiError::from(DatabaseError::NoResult).code, 500);
    }
}
