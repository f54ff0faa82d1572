use std::time::Duration;

use axum_extra::extract::cookie::Key;

use super::error::RelayError;
use crate::config::BackendConfig;
use crate::proxy::BackendClient;

/// Settings shared by the config and the runtime state.
#[derive(Clone)]
pub(crate) struct RelaySettings {
    pub(crate) cookie_key: Key,
    pub(crate) secure_cookies: bool,
    pub(crate) login_path: String,
    pub(crate) logout_timeout: Duration,
}

impl RelaySettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            secure_cookies: true,
            login_path: "/login".into(),
            logout_timeout: Duration::from_secs(5),
        }
    }
}

/// Relay configuration.
///
/// Required field (`client`) is a constructor parameter, everything else has
/// a default.
///
/// Use [`from_env()`](RelayConfig::from_env) for convention-based setup,
/// or [`new()`](RelayConfig::new) with `with_*` methods for full control.
pub struct RelayConfig {
    pub(super) client: BackendClient,
    pub(super) settings: RelaySettings,
}

impl RelayConfig {
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            settings: RelaySettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `BACKEND_BASE`: Remote backend base URL (default `http://localhost:8081`)
    /// - `REFRESH_PATH`: Renewal endpoint path (default `/api/refresh`)
    /// - `DEV_AUTH`: Set to `"1"` or `"true"` to drop the `Secure` cookie attribute
    /// - `COOKIE_KEY`: Cookie encryption key bytes
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if `BACKEND_BASE` is not a URL or
    /// `COOKIE_KEY` is too short.
    pub fn from_env() -> Result<Self, RelayError> {
        let backend = BackendConfig::from_env()?;

        let dev_auth = env_flag("DEV_AUTH");
        let cookie_key = cookie_key(std::env::var("COOKIE_KEY").ok())?;

        Ok(Self::new(BackendClient::new(backend))
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!dev_auth))
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Where the page guard sends anonymous visitors.
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.settings.login_path = path.into();
        self
    }

    /// Upper bound on the best-effort logout notification to the backend.
    #[must_use]
    pub fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.settings.logout_timeout = timeout;
        self
    }
}

/// `1` or `true`, anything else is off.
fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Cookie encryption key from its configured bytes, or a fresh one.
fn cookie_key(configured: Option<String>) -> Result<Key, RelayError> {
    let Some(raw) = configured else {
        tracing::warn!("No COOKIE_KEY configured, cookies will not decrypt after a restart");
        return Ok(Key::generate());
    };
    Key::try_from(raw.as_bytes()).map_err(|_| {
        RelayError::Config(format!(
            "COOKIE_KEY holds {} bytes, at least 64 are needed",
            raw.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_key_generated_when_unset() {
        assert!(cookie_key(None).is_ok());
    }

    #[test]
    fn test_cookie_key_from_long_value() {
        assert!(cookie_key(Some("k".repeat(64))).is_ok());
    }

    #[test]
    fn test_short_cookie_key_is_config_error() {
        let Err(RelayError::Config(msg)) = cookie_key(Some("short".into())) else {
            panic!("expected a config error");
        };
        assert!(msg.contains("5 bytes"), "{msg}");
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::new(BackendClient::new(BackendConfig::default()));
        assert!(config.settings.secure_cookies);
        assert_eq!(config.settings.login_path, "/login");
        assert_eq!(config.settings.logout_timeout, Duration::from_secs(5));
    }
}
