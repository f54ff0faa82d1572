use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;

use super::config::RelaySettings;
use super::cookies::CookieSessionStore;
use crate::proxy::BackendClient;

/// Shared state for relay route handlers.
#[derive(Clone)]
pub(super) struct RelayState {
    pub(super) client: Arc<BackendClient>,
    pub(super) settings: RelaySettings,
}

impl RelayState {
    /// Session store over this request's cookie jar.
    pub(super) fn session(&self, jar: PrivateCookieJar) -> CookieSessionStore {
        CookieSessionStore::new(jar, self.settings.secure_cookies)
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<RelayState> for Key {
    fn from_ref(state: &RelayState) -> Self {
        state.settings.cookie_key.clone()
    }
}
