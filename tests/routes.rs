#![cfg(feature = "middleware")]

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use session_relay::middleware::{
    ACCEPTED_COOKIE_NAME, ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, RelayConfig, proxy_routes,
};
use session_relay::{BackendClient, BackendConfig};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TERMS_MESSAGE: &str = "You must accept the latest terms and conditions.";

fn relay(base: &str) -> TestServer {
    let backend = BackendConfig::new(base.parse().expect("valid base url"));
    let config = RelayConfig::new(BackendClient::new(backend)).with_secure_cookies(false);
    TestServer::new(proxy_routes(config)).expect("create test server")
}

async fn mount_login(server: &MockServer, user: Value) {
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(query_param("identifier", "ana@example.com"))
        .and(query_param("password", "s3cret&more"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "at-1",
            "refresh_token": "rt-1",
            "expires_in": 600,
            "user": user
        })))
        .mount(server)
        .await;
}

fn login_body() -> Value {
    json!({"identifier": "ana@example.com", "password": "s3cret&more"})
}

#[tokio::test]
async fn login_sets_session_cookies() {
    let backend = MockServer::start().await;
    mount_login(
        &backend,
        json!({"name": "Ana", "email_verified": true, "terms_accepted": true}),
    )
    .await;
    let server = relay(&backend.uri());

    let response = server.post("/api/auth/login").json(&login_body()).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["user"]["name"], json!("Ana"));
    assert!(response.maybe_cookie(ACCESS_COOKIE_NAME).is_some());
    assert!(response.maybe_cookie(REFRESH_COOKIE_NAME).is_some());
    assert!(response.maybe_cookie(ACCEPTED_COOKIE_NAME).is_some());

    // Values are encrypted, never the raw tokens.
    assert_ne!(response.cookie(ACCESS_COOKIE_NAME).value(), "at-1");
    assert_eq!(response.cookie(ACCESS_COOKIE_NAME).http_only(), Some(true));
}

#[tokio::test]
async fn login_requires_identifier_and_password() {
    let backend = MockServer::start().await;
    let server = relay(&backend.uri());

    let response = server
        .post("/api/auth/login")
        .json(&json!({"identifier": "ana@example.com"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(backend.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn login_with_unverified_email_is_precondition_failed() {
    let backend = MockServer::start().await;
    mount_login(&backend, json!({"name": "Ana", "email_verified": false})).await;
    let server = relay(&backend.uri());

    let response = server.post("/api/auth/login").json(&login_body()).await;

    assert_eq!(response.status_code(), StatusCode::PRECONDITION_FAILED);
    assert!(response.maybe_cookie(ACCESS_COOKIE_NAME).is_none());
}

#[tokio::test]
async fn login_rejection_passes_through() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})),
        )
        .expect(1)
        .mount(&backend)
        .await;
    let server = relay(&backend.uri());

    let response = server.post("/api/auth/login").json(&login_body()).await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>(), json!({"message": "Invalid credentials"}));
}

#[tokio::test]
async fn login_accepts_fractional_expires_in() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-1",
            "refresh_token": "rt-1",
            "expires_in": 3600.0,
            "user": {"name": "Ana", "email_verified": true}
        })))
        .mount(&backend)
        .await;
    let server = relay(&backend.uri());

    let response = server.post("/api/auth/login").json(&login_body()).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["user"]["name"], json!("Ana"));
    let access = response.cookie(ACCESS_COOKIE_NAME);
    assert_eq!(access.max_age(), Some(time::Duration::seconds(3600)));
    assert!(response.maybe_cookie(REFRESH_COOKIE_NAME).is_some());
}

#[tokio::test]
async fn me_uses_session_and_unwraps_first_user() {
    let backend = MockServer::start().await;
    mount_login(&backend, json!({"email_verified": true})).await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer at-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "ok": true,
            "data": [{"name": "Ana", "email": "ana@example.com"}]
        })))
        .expect(1)
        .mount(&backend)
        .await;
    let server = relay(&backend.uri());

    let login = server.post("/api/auth/login").json(&login_body()).await;
    let response = server
        .get("/api/me")
        .add_cookie(login.cookie(ACCESS_COOKIE_NAME))
        .add_cookie(login.cookie(REFRESH_COOKIE_NAME))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["user"], json!({"name": "Ana", "email": "ana@example.com"}));
    assert_eq!(body["raw"]["status"], json!("success"));
}

#[tokio::test]
async fn me_renews_expired_session_and_sets_new_cookie() {
    let backend = MockServer::start().await;
    mount_login(&backend, json!({"email_verified": true})).await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer at-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-2",
            "refresh_token": "rt-2",
            "expires_in": 900
        })))
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer at-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"name": "Ana"}]})))
        .expect(1)
        .mount(&backend)
        .await;
    let server = relay(&backend.uri());

    let login = server.post("/api/auth/login").json(&login_body()).await;
    let response = server
        .get("/api/me")
        .add_cookie(login.cookie(ACCESS_COOKIE_NAME))
        .add_cookie(login.cookie(REFRESH_COOKIE_NAME))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let renewed = response.cookie(ACCESS_COOKIE_NAME);
    assert!(!renewed.value().is_empty());
    assert_ne!(renewed.value(), login.cookie(ACCESS_COOKIE_NAME).value());
}

#[tokio::test]
async fn term_requiring_acceptance_is_428() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/term"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"ok": false, "message": TERMS_MESSAGE})),
        )
        .mount(&backend)
        .await;
    let server = relay(&backend.uri());

    let response = server.get("/api/term").await;

    assert_eq!(response.status_code(), StatusCode::PRECONDITION_REQUIRED);
    assert_eq!(
        response.json::<Value>(),
        json!({"terms_required": true, "message": TERMS_MESSAGE})
    );
}

#[tokio::test]
async fn accept_terms_sets_accepted_flag() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/accept/terms"))
        .respond_with(ResponseTemplate::new(200).set_body_string("accepted"))
        .mount(&backend)
        .await;
    let server = relay(&backend.uri());

    let response = server.post("/api/terms/accept").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({"message": "accepted"}));
    assert!(response.maybe_cookie(ACCEPTED_COOKIE_NAME).is_some());
}

#[tokio::test]
async fn prizes_forward_query_string() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/premio/filter"))
        .and(query_param("page", "2"))
        .and(query_param("category", "travel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [], "page": 2})))
        .expect(1)
        .mount(&backend)
        .await;
    let server = relay(&backend.uri());

    let response = server.get("/api/prizes?page=2&category=travel").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["page"], json!(2));
}

#[tokio::test]
async fn logout_succeeds_with_backend_down() {
    let server = relay("http://127.0.0.1:1");

    let response = server.post("/api/auth/logout").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({"ok": true, "message": "Logged out locally"})
    );
}

#[tokio::test]
async fn logout_clears_cookies_and_notifies_backend() {
    let backend = MockServer::start().await;
    mount_login(&backend, json!({"email_verified": true})).await;
    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .and(header("authorization", "Bearer at-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&backend)
        .await;
    let server = relay(&backend.uri());

    let login = server.post("/api/auth/login").json(&login_body()).await;
    let response = server
        .post("/api/auth/logout")
        .add_cookie(login.cookie(ACCESS_COOKIE_NAME))
        .add_cookie(login.cookie(REFRESH_COOKIE_NAME))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.cookie(ACCESS_COOKIE_NAME).value(), "");
    assert_eq!(response.cookie(REFRESH_COOKIE_NAME).value(), "");
}

#[tokio::test]
async fn unreachable_backend_is_bad_gateway() {
    let server = relay("http://127.0.0.1:1");

    let response = server.get("/api/term").await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.json::<Value>(), json!({"message": "Backend unavailable"}));
}

#[tokio::test]
async fn page_guard_redirects_anonymous_visitors() {
    let backend = MockServer::start().await;
    mount_login(&backend, json!({"email_verified": true})).await;
    let server = relay(&backend.uri());

    let anonymous = server.get("/home").await;
    assert_eq!(anonymous.status_code(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(anonymous.header("location"), "/login");

    let public = server.get("/login").await;
    assert_eq!(public.status_code(), StatusCode::NOT_FOUND);

    let login = server.post("/api/auth/login").json(&login_body()).await;
    let signed_in = server
        .get("/home")
        .add_cookie(login.cookie(ACCESS_COOKIE_NAME))
        .await;
    assert_eq!(signed_in.status_code(), StatusCode::NOT_FOUND);
}
