//! Authenticated calls to the remote backend with transparent renewal.
//!
//! [`BackendClient::call`] attaches the session's access credential, renews
//! it ahead of expiry, and retries once after renewing when the backend
//! reports an expired session either through the status code or in-band in
//! a JSON body. A session that cannot be renewed is cleared and the original
//! failure is returned unchanged.

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::config::BackendConfig;
use crate::error::Error;
use crate::inspect;
use crate::refresh::{RefreshOutcome, Refresher};
use crate::session::SessionStore;

/// Non-standard status some backends use for a timed-out session.
pub const SESSION_TIMEOUT: u16 = 419;

/// Reactive renewals allowed per logical call.
const MAX_REACTIVE_RETRIES: u8 = 1;

/// A call to forward to the backend. Cheap to clone so it can be re-sent.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl ProxyRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serialize `body` as the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, Error> {
        let bytes = serde_json::to_vec(body).map_err(|e| Error::Config(format!("request body: {e}")))?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path without its query string, which may hold credentials.
    fn log_path(&self) -> &str {
        self.path.split('?').next().unwrap_or_default()
    }
}

/// Fully buffered backend response.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl BackendResponse {
    /// Whether the backend declared a JSON body.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"))
    }

    /// The parsed body, when declared JSON and parseable.
    #[must_use]
    pub fn json(&self) -> Option<JsonValue> {
        if !self.is_json() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The JSON body, or the text body wrapped as `{"message": <text>}`.
    #[must_use]
    pub fn json_or_message(&self) -> JsonValue {
        self.json()
            .unwrap_or_else(|| serde_json::json!({ "message": self.text() }))
    }

    async fn read(response: reqwest::Response) -> Result<Self, Error> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }
}

/// Where a logical call is in its renewal lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initial,
    AfterProactiveRefresh,
    AfterReactiveRefresh,
}

/// Why a response asked for a reactive renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Status,
    Body,
}

/// HTTP client for the remote backend bound to a per-request session store.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    refresher: Refresher,
}

impl BackendClient {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(config: BackendConfig, http: reqwest::Client) -> Self {
        Self {
            refresher: Refresher::new(config, http.clone()),
            http,
        }
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        self.refresher.config()
    }

    #[must_use]
    pub fn refresher(&self) -> &Refresher {
        &self.refresher
    }

    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Forward `request`, keeping the session in `store` alive.
    ///
    /// At most one reactive retry happens per call, whatever mix of status
    /// and body signals the responses carry. A proactive renewal before the
    /// first dispatch does not count against that budget.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the backend cannot be reached. Expiry
    /// signals and renewal failures never produce an error.
    pub async fn call<S>(&self, store: &S, request: &ProxyRequest) -> Result<BackendResponse, Error>
    where
        S: SessionStore + ?Sized,
    {
        let mut phase = Phase::Initial;
        let mut reactive_retries = 0u8;

        loop {
            if phase == Phase::Initial && self.access_expiring(store) {
                tracing::debug!(path = %request.log_path(), "Access token about to expire, refreshing");
                self.renew_or_clear(store).await;
                phase = Phase::AfterProactiveRefresh;
            }

            let response = self.dispatch(store, request).await?;

            if reactive_retries >= MAX_REACTIVE_RETRIES {
                return Ok(response);
            }
            let Some(trigger) = Self::reactive_trigger(&response) else {
                return Ok(response);
            };

            tracing::debug!(
                path = %request.log_path(),
                status = %response.status,
                ?trigger,
                ?phase,
                "Session looks expired, refreshing"
            );
            if !self.renew_or_clear(store).await.is_renewed() {
                return Ok(response);
            }

            reactive_retries += 1;
            phase = Phase::AfterReactiveRefresh;
        }
    }

    fn access_expiring<S>(&self, store: &S) -> bool
    where
        S: SessionStore + ?Sized,
    {
        store
            .access_token()
            .and_then(|token| inspect::decode_expiry(token.as_str()))
            .is_some_and(|exp| {
                inspect::expires_within(exp, inspect::unix_now(), self.config().refresh_lookahead_secs)
            })
    }

    /// Run the refresher; a failed renewal leaves no partial session behind.
    async fn renew_or_clear<S>(&self, store: &S) -> RefreshOutcome
    where
        S: SessionStore + ?Sized,
    {
        let outcome = self.refresher.refresh(store).await;
        if !outcome.is_renewed() {
            tracing::info!(?outcome, "Session could not be renewed, clearing");
            store.clear();
        }
        outcome
    }

    fn reactive_trigger(response: &BackendResponse) -> Option<Trigger> {
        let status = response.status.as_u16();
        if status == StatusCode::UNAUTHORIZED.as_u16() || status == SESSION_TIMEOUT {
            return Some(Trigger::Status);
        }
        response
            .json()
            .filter(inspect::looks_expired)
            .map(|_| Trigger::Body)
    }

    async fn dispatch<S>(&self, store: &S, request: &ProxyRequest) -> Result<BackendResponse, Error>
    where
        S: SessionStore + ?Sized,
    {
        let config = self.config();
        let url = config.endpoint(&request.path);

        let mut headers = request.headers.clone();
        if let Some(token) = store.access_token() {
            match HeaderValue::try_from(format!("Bearer {}", token.as_str())) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("Access token is not a valid header value, sending without it"),
            }
        }
        let (marker_name, marker_value) = config.forward_header();
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(marker_name),
            HeaderValue::try_from(marker_value),
        ) {
            headers.insert(name, value);
        }
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

        tracing::debug!(method = %request.method, path = %request.log_path(), "Backend request");

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = BackendResponse::read(builder.send().await?).await?;
        tracing::debug!(status = %response.status, path = %request.log_path(), "Backend response");
        Ok(response)
    }
}
