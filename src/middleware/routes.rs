use std::sync::Arc;

use axum::extract::{RawQuery, State};
use axum::http::header::{ACCEPT, AUTHORIZATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use bytes::Bytes;
use serde_json::{Value as JsonValue, json};

use super::config::RelayConfig;
use super::cookies::CookieSessionStore;
use super::error::RelayError;
use super::guard::{not_found, session_guard};
use super::state::RelayState;
use super::types::{LoginRequest, LoginResponse, LookupRequest, required};
use crate::gate;
use crate::proxy::ProxyRequest;
use crate::session::SessionStore;
use crate::types::{AccessToken, RefreshToken};

/// Create the relay router: JSON API routes plus the page guard.
pub fn proxy_routes(config: RelayConfig) -> Router {
    let state = RelayState {
        client: Arc::new(config.client),
        settings: config.settings,
    };

    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/lookup", post(lookup))
        .route("/api/auth/logout", post(logout))
        .route("/api/me", get(me))
        .route("/api/term", get(term))
        .route("/api/terms/accept", post(accept_terms))
        .route("/api/prizes", get(prizes))
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_guard,
        ))
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login(
    State(state): State<RelayState>,
    jar: PrivateCookieJar,
    body: Bytes,
) -> (PrivateCookieJar, Response) {
    let store = state.session(jar);
    let result = login_with(&state, &store, &body).await;
    respond(store, result)
}

async fn login_with(
    state: &RelayState,
    store: &CookieSessionStore,
    body: &[u8],
) -> Result<Response, RelayError> {
    let request: LoginRequest = serde_json::from_slice(body).unwrap_or_default();
    let (Some(identifier), Some(password)) = (required(request.identifier), required(request.password))
    else {
        return Err(RelayError::BadRequest("identifier and password are required".into()));
    };

    let path = format!(
        "/api/login?identifier={}&password={}",
        urlencoding::encode(&identifier),
        urlencoding::encode(&password)
    );
    let response = state.client.call(store, &ProxyRequest::post(path)).await?;
    let body = response.json().unwrap_or_else(|| json!({}));

    if !response.status.is_success() {
        tracing::info!(status = %response.status, "Login rejected by backend");
        store.clear();
        return Ok((response.status, Json(body)).into_response());
    }

    let login = LoginResponse::new(body);
    if !login.email_verified() {
        store.clear();
        return Ok((
            StatusCode::PRECONDITION_FAILED,
            Json(json!({ "message": "E-mail not verified. Check your inbox to continue." })),
        )
            .into_response());
    }

    let (Some(access), Some(refresh)) = (login.access_token(), login.refresh_token()) else {
        store.clear();
        return Err(RelayError::Upstream("login response without tokens".into()));
    };

    let ttl = login
        .expires_in()
        .unwrap_or(state.client.config().default_ttl_secs());
    store.store_tokens(&AccessToken::from(access), &RefreshToken::from(refresh), ttl);
    store.set_accepted_terms(login.terms_accepted());

    tracing::info!("Login successful");
    Ok(Json(json!({ "ok": true, "user": login.user() })).into_response())
}

// ── Lookup ─────────────────────────────────────────────────────────

async fn lookup(
    State(state): State<RelayState>,
    jar: PrivateCookieJar,
    body: Bytes,
) -> (PrivateCookieJar, Response) {
    let store = state.session(jar);
    let result: Result<Response, RelayError> = async {
        let request: LookupRequest = serde_json::from_slice(&body).unwrap_or_default();
        let identifier = required(request.identifier)
            .ok_or_else(|| RelayError::BadRequest("identifier is required".into()))?;

        let path = format!(
            "/api/auth/lookup?identifier={}",
            urlencoding::encode(&identifier)
        );
        let response = state.client.call(&store, &ProxyRequest::post(path)).await?;
        let body = response.json().unwrap_or_else(|| json!({}));
        Ok((response.status, Json(body)).into_response())
    }
    .await;
    respond(store, result)
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout(
    State(state): State<RelayState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
) -> (PrivateCookieJar, Json<JsonValue>) {
    let store = state.session(jar);

    let access = bearer_from(&headers)
        .or_else(|| store.access_token().map(|t| t.as_str().to_string()));

    // Local state goes first so a slow or failing backend cannot keep the
    // session alive.
    store.clear();

    let url = state.client.config().endpoint("/api/logout");
    let mut request = state
        .client
        .http()
        .post(&url)
        .header(ACCEPT, "application/json")
        .timeout(state.settings.logout_timeout);
    if let Some(token) = &access {
        request = request.bearer_auth(token);
    }
    match request.send().await {
        Ok(response) => tracing::debug!(status = %response.status(), "Backend logout notified"),
        Err(e) => tracing::warn!(error = %e, "Backend logout notification failed"),
    }

    (
        store.into_jar(),
        Json(json!({ "ok": true, "message": "Logged out locally" })),
    )
}

// ── Account & terms ────────────────────────────────────────────────

async fn me(State(state): State<RelayState>, jar: PrivateCookieJar) -> (PrivateCookieJar, Response) {
    let store = state.session(jar);
    let result: Result<Response, RelayError> = async {
        let response = state.client.call(&store, &ProxyRequest::get("/api/me")).await?;
        let guarded = gate::guard(&response);
        if guarded.status != StatusCode::OK {
            return Ok(guarded.into_response());
        }

        let user = guarded
            .body
            .get("data")
            .and_then(JsonValue::as_array)
            .and_then(|data| data.first())
            .cloned()
            .unwrap_or(JsonValue::Null);
        Ok(Json(json!({ "user": user, "raw": guarded.body })).into_response())
    }
    .await;
    respond(store, result)
}

async fn term(State(state): State<RelayState>, jar: PrivateCookieJar) -> (PrivateCookieJar, Response) {
    let store = state.session(jar);
    let result = state
        .client
        .call(&store, &ProxyRequest::get("/api/term"))
        .await
        .map(|response| gate::guard(&response).into_response())
        .map_err(RelayError::from);
    respond(store, result)
}

async fn accept_terms(
    State(state): State<RelayState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Response) {
    let store = state.session(jar);
    let result: Result<Response, RelayError> = async {
        let response = state
            .client
            .call(&store, &ProxyRequest::post("/api/accept/terms"))
            .await?;
        if response.status.is_success() {
            store.set_accepted_terms(true);
        }
        Ok((response.status, Json(response.json_or_message())).into_response())
    }
    .await;
    respond(store, result)
}

// ── Prizes ─────────────────────────────────────────────────────────

async fn prizes(
    State(state): State<RelayState>,
    jar: PrivateCookieJar,
    RawQuery(query): RawQuery,
) -> (PrivateCookieJar, Response) {
    let store = state.session(jar);
    let path = match query {
        Some(q) if !q.is_empty() => format!("/api/premio/filter?{q}"),
        _ => "/api/premio/filter".to_string(),
    };
    let result = state
        .client
        .call(&store, &ProxyRequest::get(path))
        .await
        .map(|response| (response.status, Json(response.json_or_message())).into_response())
        .map_err(RelayError::from);
    respond(store, result)
}

// ── Helpers ────────────────────────────────────────────────────────

/// Hand the session's cookies back alongside the outcome, success or not.
fn respond(
    store: CookieSessionStore,
    result: Result<Response, RelayError>,
) -> (PrivateCookieJar, Response) {
    let response = result.unwrap_or_else(IntoResponse::into_response);
    (store.into_jar(), response)
}

fn bearer_from(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim_start();
    let (scheme, token) = value.split_once(char::is_whitespace)?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}
