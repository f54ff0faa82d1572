use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced by the relay's route handlers.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The backend could not be reached or answered unusably.
    #[error("Backend error: {0}")]
    Upstream(String),

    /// The client request is missing required fields.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": msg }))).into_response()
            }
            Self::Upstream(_) => {
                tracing::error!(error = %self, "Backend unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "message": "Backend unavailable" })),
                )
                    .into_response()
            }
            Self::Config(_) => {
                tracing::error!(error = %self, "Relay internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<crate::error::Error> for RelayError {
    fn from(e: crate::error::Error) -> Self {
        match e {
            crate::error::Error::Config(msg) => Self::Config(msg),
            other => Self::Upstream(other.to_string()),
        }
    }
}
