use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::refresh::{expires_in_secs, token_field};

/// Body of `POST /api/auth/login`. Missing fields are rejected by the handler.
#[derive(Debug, Default, Deserialize)]
pub(super) struct LoginRequest {
    #[serde(default)]
    pub(super) identifier: Option<String>,
    #[serde(default)]
    pub(super) password: Option<String>,
}

/// Body of `POST /api/auth/lookup`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct LookupRequest {
    #[serde(default)]
    pub(super) identifier: Option<String>,
}

/// Backend answer to a successful primary authentication.
///
/// Fields are read one at a time so an unexpected shape in one of them does
/// not hide the others.
#[derive(Debug)]
pub(super) struct LoginResponse(JsonValue);

impl LoginResponse {
    pub(super) fn new(body: JsonValue) -> Self {
        Self(body)
    }

    pub(super) fn access_token(&self) -> Option<String> {
        token_field(&self.0, "access_token")
    }

    pub(super) fn refresh_token(&self) -> Option<String> {
        token_field(&self.0, "refresh_token")
    }

    pub(super) fn expires_in(&self) -> Option<u64> {
        expires_in_secs(&self.0)
    }

    /// Echoed back to the client untouched.
    pub(super) fn user(&self) -> JsonValue {
        self.0.get("user").cloned().unwrap_or(JsonValue::Null)
    }

    fn user_flag(&self, key: &str) -> bool {
        self.0
            .get("user")
            .and_then(|u| u.get(key))
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }

    pub(super) fn email_verified(&self) -> bool {
        self.user_flag("email_verified")
    }

    pub(super) fn terms_accepted(&self) -> bool {
        self.user_flag("terms_accepted")
    }
}

/// The value of an optional field, unless it is missing or blank.
pub(super) fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
