//! Terms-of-service gate.
//!
//! Runs after [`BackendClient::call`](crate::proxy::BackendClient::call) on
//! endpoints that may demand consent, and turns the backend's "must accept
//! the latest terms" message into one stable status callers can branch on.

use reqwest::StatusCode;
use serde_json::{Value as JsonValue, json};

use crate::inspect;
use crate::proxy::BackendResponse;

/// Status returned whenever the backend requires terms acceptance.
pub const TERMS_REQUIRED_STATUS: StatusCode = StatusCode::PRECONDITION_REQUIRED;

/// A response normalized to a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardedResponse {
    pub status: StatusCode,
    pub body: JsonValue,
}

impl GuardedResponse {
    #[must_use]
    pub fn is_terms_required(&self) -> bool {
        self.status == TERMS_REQUIRED_STATUS
            && self.body.get("terms_required").and_then(JsonValue::as_bool) == Some(true)
    }
}

/// Remap a terms-required body to [`TERMS_REQUIRED_STATUS`], whatever the
/// original status. Anything else keeps its status; JSON bodies pass through
/// and other bodies are wrapped as `{"message": <text>}`.
#[must_use]
pub fn guard(response: &BackendResponse) -> GuardedResponse {
    let body = response.json_or_message();
    if response.is_json() && inspect::looks_terms_required(&body) {
        let message = body
            .get("message")
            .cloned()
            .unwrap_or_else(|| JsonValue::from("Terms required"));
        tracing::info!(status = %response.status, "Backend requires terms acceptance");
        return GuardedResponse {
            status: TERMS_REQUIRED_STATUS,
            body: json!({ "terms_required": true, "message": message }),
        };
    }
    GuardedResponse {
        status: response.status,
        body,
    }
}

#[cfg(feature = "middleware")]
impl axum::response::IntoResponse for GuardedResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status, axum::Json(self.body)).into_response()
    }
}
