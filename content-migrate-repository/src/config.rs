//! Configuration types for the HTTP content store client.

use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retries for transient failures.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Default name of the identifier field on records and media assets.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Connection settings for one content store endpoint.
#[derive(Clone)]
pub struct StoreConfig {
    /// API base URL, e.g. `http://localhost:1337/api`.
    pub base_url: String,
    /// Bearer token sent with every request, if any.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How many times a transient failure is retried before giving up.
    pub max_retries: usize,
    /// Field holding the identifier of stored records and uploaded assets.
    pub id_field: String,
}

impl StoreConfig {
    /// Create a config for `base_url` with default timeout and retries and no token.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            id_field: DEFAULT_ID_FIELD.to_string(),
        }
    }

    /// Set the bearer token. Empty tokens are treated as absent.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.is_empty() { None } else { Some(token) };
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Absolute URL for an API path relative to the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("id_field", &self.id_field)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slashes() {
        let config = StoreConfig::new("http://localhost:1337/api/");
        assert_eq!(
            config.url("/navigation-items/4"),
            "http://localhost:1337/api/navigation-items/4"
        );
        assert_eq!(
            config.url("upload/files"),
            "http://localhost:1337/api/upload/files"
        );
    }

    #[test]
    fn test_empty_token_is_absent() {
        assert!(StoreConfig::new("http://x").with_token("").token.is_none());
        assert_eq!(
            StoreConfig::new("http://x").with_token("abc").token.as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = StoreConfig::new("http://x").with_token("secret-token");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("<redacted>"));
    }
}
