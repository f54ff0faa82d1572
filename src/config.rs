use url::Url;

use crate::error::Error;

/// Remote backend configuration shared by the proxy and the refresher.
///
/// Required fields are constructor parameters; everything else has a default
/// that can be overridden by chaining `with_*` calls.
///
/// ```rust,ignore
/// use session_relay::BackendConfig;
///
/// let config = BackendConfig::new("https://api.example.com".parse()?)
///     .with_refresh_path("/api/refresh-token");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct BackendConfig {
    pub(crate) base_url: Url,
    pub(crate) refresh_path: String,
    pub(crate) forward_header: (String, String),
    pub(crate) default_ttl_secs: u64,
    pub(crate) refresh_lookahead_secs: i64,
}

impl BackendConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8081";
    pub const DEFAULT_REFRESH_PATH: &'static str = "/api/refresh";

    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            refresh_path: Self::DEFAULT_REFRESH_PATH.into(),
            forward_header: ("x-from".into(), "session-relay".into()),
            default_ttl_secs: 900,
            refresh_lookahead_secs: 10,
        }
    }

    /// Read `BACKEND_BASE` and `REFRESH_PATH`, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `BACKEND_BASE` is not a valid URL.
    pub fn from_env() -> Result<Self, Error> {
        let base = std::env::var("BACKEND_BASE").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.into());
        let base_url: Url = base
            .parse()
            .map_err(|e| Error::Config(format!("BACKEND_BASE: {e}")))?;

        let mut config = Self::new(base_url);
        if let Ok(path) = std::env::var("REFRESH_PATH") {
            config = config.with_refresh_path(path);
        }
        Ok(config)
    }

    /// Override the renewal endpoint path (default: `/api/refresh`).
    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Override the origin marker header added to every outbound call.
    #[must_use]
    pub fn with_forward_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.forward_header = (name.into(), value.into());
        self
    }

    /// Access TTL used when the renewal endpoint omits `expires_in`.
    #[must_use]
    pub fn with_default_ttl_secs(mut self, secs: u64) -> Self {
        self.default_ttl_secs = secs;
        self
    }

    /// Seconds before expiry at which a proactive refresh kicks in.
    #[must_use]
    pub fn with_refresh_lookahead_secs(mut self, secs: i64) -> Self {
        self.refresh_lookahead_secs = secs;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn refresh_path(&self) -> &str {
        &self.refresh_path
    }

    #[must_use]
    pub fn forward_header(&self) -> (&str, &str) {
        (&self.forward_header.0, &self.forward_header.1)
    }

    #[must_use]
    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }

    #[must_use]
    pub fn refresh_lookahead_secs(&self) -> i64 {
        self.refresh_lookahead_secs
    }

    /// Resolve a backend path against the base URL.
    ///
    /// Absolute `http(s)` URLs pass through untouched. Relative paths are
    /// appended to the base as-is, so a base with a path prefix keeps it.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Full URL of the renewal endpoint.
    #[must_use]
    pub fn refresh_url(&self) -> String {
        self.endpoint(&self.refresh_path)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_URL.parse().expect("valid default URL"))
    }
}
