//! Axum layer around the authenticated proxy.
//!
//! Credentials live in private (encrypted, http-only) cookies and never reach
//! page scripts. Each handler wraps the request's cookie jar in a
//! [`CookieSessionStore`], lets the proxy renew or clear the session as
//! needed, and returns the updated jar with its response.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use session_relay::middleware::{RelayConfig, proxy_routes};
//!
//! // 1. Configure from environment (BACKEND_BASE, REFRESH_PATH, COOKIE_KEY, DEV_AUTH)
//! let config = RelayConfig::from_env()?;
//!
//! // 2. Serve the JSON API and page guard
//! let app = proxy_routes(config);
//! axum::serve(listener, app).await?;
//! ```

mod config;
mod cookies;
mod error;
mod guard;
mod routes;
mod state;
mod types;

pub use config::RelayConfig;
pub use cookies::{
    ACCEPTED_COOKIE_NAME, ACCESS_COOKIE_NAME, CookieSessionStore, REFRESH_COOKIE_NAME,
};
pub use error::RelayError;
pub use guard::is_public_path;
pub use routes::proxy_routes;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
