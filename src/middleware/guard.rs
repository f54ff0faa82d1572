use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;
use serde_json::json;

use super::cookies::ACCESS_COOKIE_NAME;
use super::state::RelayState;

/// Paths served to anonymous visitors.
#[must_use]
pub fn is_public_path(path: &str) -> bool {
    path == "/"
        || path == "/favicon.ico"
        || path.starts_with("/api")
        || path.starts_with("/_next")
        || path.starts_with("/login")
        || path.starts_with("/terms")
}

/// Redirect page requests without an access credential to the login page.
///
/// Only presence is checked; an expired credential is dealt with by the
/// proxy on the first API call the page makes.
pub(super) async fn session_guard(
    State(state): State<RelayState>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if is_public_path(&path) || jar.get(ACCESS_COOKIE_NAME).is_some() {
        return next.run(request).await;
    }

    tracing::debug!(path = %path, "Anonymous page request, redirecting to login");
    Redirect::temporary(&state.settings.login_path).into_response()
}

pub(super) async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" })))
}
