//! Access credential renewal.

use reqwest::StatusCode;
use serde_json::Value as JsonValue;

use crate::config::BackendConfig;
use crate::session::SessionStore;
use crate::types::{AccessToken, RefreshToken};

/// Status the renewal endpoint reserves for a refresh credential that is
/// expired or revoked.
pub const REFRESH_REJECTED: StatusCode = StatusCode::FORBIDDEN;

/// Result of one renewal attempt.
///
/// Only [`RefreshOutcome::Renewed`] touches the session store. On every other
/// outcome the caller decides whether to clear the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Renewed,
    /// No refresh credential in the session; no request was made.
    MissingRefreshToken,
    /// The renewal endpoint answered with [`REFRESH_REJECTED`].
    Rejected,
    /// Any other non-success status.
    Failed(StatusCode),
    /// Success status without a usable `access_token`.
    Malformed,
    /// The request never completed.
    Unreachable,
}

impl RefreshOutcome {
    #[must_use]
    pub fn is_renewed(self) -> bool {
        self == Self::Renewed
    }
}

/// Non-empty string field of a token response.
pub(crate) fn token_field(body: &JsonValue, key: &str) -> Option<String> {
    body.get(key)
        .and_then(JsonValue::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Lifetime in seconds from a token response's `expires_in`.
///
/// Accepts integers, floats (truncated) and numeric strings. Negative values
/// become 0 and are clamped again when stored. Anything else is `None`.
pub(crate) fn expires_in_secs(body: &JsonValue) -> Option<u64> {
    let secs = match body.get("expires_in")? {
        JsonValue::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64))?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok().map(|f| f as u64)?,
        _ => return None,
    };
    Some(secs)
}

/// Exchanges the session's refresh credential for a new pair.
#[derive(Clone)]
pub struct Refresher {
    config: BackendConfig,
    http: reqwest::Client,
}

impl Refresher {
    #[must_use]
    pub fn new(config: BackendConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Attempt a renewal and, on success, write the new pair to `store`.
    ///
    /// The existing refresh credential is kept when the endpoint does not
    /// rotate it, and the configured default TTL is used when it omits
    /// `expires_in`.
    pub async fn refresh<S>(&self, store: &S) -> RefreshOutcome
    where
        S: SessionStore + ?Sized,
    {
        let Some(current) = store.refresh_token() else {
            tracing::debug!("No refresh token in session");
            return RefreshOutcome::MissingRefreshToken;
        };

        let url = self.config.refresh_url();
        tracing::debug!(url = %url, "Refreshing access token");

        let response = match self
            .http
            .post(&url)
            .json(&serde_json::json!({ "refresh_token": current.as_str() }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Refresh request failed");
                return RefreshOutcome::Unreachable;
            }
        };

        let status = response.status();
        if status == REFRESH_REJECTED {
            tracing::info!("Refresh token rejected, session is unrecoverable");
            return RefreshOutcome::Rejected;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Refresh failed");
            return RefreshOutcome::Failed(status);
        }

        let body = match response.json::<JsonValue>().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable refresh response");
                return RefreshOutcome::Malformed;
            }
        };
        let Some(access) = token_field(&body, "access_token") else {
            tracing::warn!("Refresh response without access_token");
            return RefreshOutcome::Malformed;
        };

        let refresh = token_field(&body, "refresh_token")
            .map(RefreshToken::from)
            .unwrap_or(current);
        let ttl = expires_in_secs(&body).unwrap_or(self.config.default_ttl_secs);
        store.store_tokens(&AccessToken::from(access), &refresh, ttl);

        tracing::info!(expires_in = ttl, "Access token renewed");
        RefreshOutcome::Renewed
    }
}
