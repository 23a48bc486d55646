//! Client configuration and builder pattern.

use crate::error::{ClientError, Result};
use std::fmt;
use std::time::Duration;

/// Username/password pair used to obtain a session token from the login endpoint.
///
/// The password is masked in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login user name
    pub username: String,
    /// Login password
    pub password: String,
}

impl Credentials {
    /// Create a new credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***REDACTED***")
            .finish()
    }
}

/// Configuration for the Dremio client.
///
/// # Security
///
/// The `Debug` implementation masks the API key and password to prevent
/// accidental exposure in logs.
#[derive(Clone)]
pub struct ClientConfig {
    /// Server root URL (e.g., "http://localhost:9047"). A path prefix on the
    /// base is kept and the API paths are joined beneath it.
    pub base_url: String,
    /// Path of the REST API below the base URL (default: "api/v3")
    pub api_prefix: String,
    /// Path of the login endpoint below the base URL (default: "apiv2/login")
    pub login_path: String,
    /// Static token; when set the login endpoint is never called
    pub api_key: Option<String>,
    /// Credentials for lazy login when no static token is configured
    pub credentials: Option<Credentials>,
    /// Prefix placed before the token in the Authorization header (default: "_dremio")
    pub auth_scheme: String,
    /// Request timeout (default: 30 seconds)
    pub timeout: Duration,
    /// Whether to verify TLS certificates (default: true)
    pub tls_verify: bool,
    /// User-Agent header value
    pub user_agent: String,
    /// Log request and response bodies at debug level (default: false)
    pub log_bodies: bool,
    /// Caller-supplied HTTP client; `timeout`, `tls_verify` and `user_agent`
    /// are ignored when set
    pub http_client: Option<reqwest::Client>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9047".to_string(),
            api_prefix: Self::DEFAULT_API_PREFIX.to_string(),
            login_path: Self::DEFAULT_LOGIN_PATH.to_string(),
            api_key: None,
            credentials: None,
            auth_scheme: Self::DEFAULT_AUTH_SCHEME.to_string(),
            timeout: Duration::from_secs(30),
            tls_verify: true,
            user_agent: format!("dremio-catalog-client/{}", env!("CARGO_PKG_VERSION")),
            log_bodies: false,
            http_client: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_prefix", &self.api_prefix)
            .field("login_path", &self.login_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "***REDACTED***"))
            .field("credentials", &self.credentials)
            .field("auth_scheme", &self.auth_scheme)
            .field("timeout", &self.timeout)
            .field("tls_verify", &self.tls_verify)
            .field("user_agent", &self.user_agent)
            .field("log_bodies", &self.log_bodies)
            .field("http_client", &self.http_client.is_some())
            .finish()
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(base_url)
    }

    /// Minimum allowed timeout value.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

    /// Default REST API prefix.
    pub const DEFAULT_API_PREFIX: &'static str = "api/v3";

    /// Default login endpoint.
    pub const DEFAULT_LOGIN_PATH: &'static str = "apiv2/login";

    /// Default Authorization scheme prefix.
    pub const DEFAULT_AUTH_SCHEME: &'static str = "_dremio";

    /// Build a configuration from `DREMIO_*` environment variables.
    ///
    /// Reads `DREMIO_API_KEY`, `DREMIO_USERNAME`, `DREMIO_PASSWORD` and
    /// `DREMIO_LOG`. The result still has to pass [`ClientConfig::validate`].
    pub fn from_env(base_url: impl Into<String>) -> Result<Self> {
        Self::from_lookup(base_url, |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(base_url: impl Into<String>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let mut builder = ClientConfigBuilder::new(base_url);
        if let Some(api_key) = non_empty("DREMIO_API_KEY") {
            builder = builder.api_key(api_key);
        }
        match (non_empty("DREMIO_USERNAME"), lookup("DREMIO_PASSWORD")) {
            (Some(username), Some(password)) => {
                builder = builder.credentials(username, password);
            }
            (Some(_), None) => {
                return Err(ClientError::Config(
                    "DREMIO_USERNAME is set but DREMIO_PASSWORD is not".to_string(),
                ));
            }
            _ => {}
        }
        builder = builder.log_bodies(non_empty("DREMIO_LOG").is_some());
        builder.build()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::Config("base_url cannot be empty".to_string()));
        }

        let url = url::Url::parse(&self.base_url)
            .map_err(|e| ClientError::Config(format!("Invalid base_url: {}", e)))?;
        if url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base_url cannot be used as a base: {}",
                self.base_url
            )));
        }

        if let Some(ref credentials) = self.credentials {
            if credentials.username.is_empty() {
                return Err(ClientError::Config(
                    "credentials username cannot be empty".to_string(),
                ));
            }
        }

        if self.timeout < Self::MIN_TIMEOUT {
            return Err(ClientError::Config(format!(
                "timeout ({:?}) must be >= {:?}",
                self.timeout,
                Self::MIN_TIMEOUT
            )));
        }

        Ok(())
    }

    /// The static token, if one is configured and non-empty.
    pub(crate) fn static_token(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}

/// Builder for client configuration.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                base_url: base_url.into(),
                ..Default::default()
            },
        }
    }

    /// Set a static token. The login endpoint is never called when set.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    /// Set credentials for lazy login.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Set the REST API prefix below the base URL.
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.api_prefix = prefix.into();
        self
    }

    /// Set the login endpoint path below the base URL.
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.config.login_path = path.into();
        self
    }

    /// Set the Authorization header scheme prefix.
    pub fn auth_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.auth_scheme = scheme.into();
        self
    }

    /// Send tokens as `Bearer <token>`, as personal access tokens expect.
    pub fn bearer(self) -> Self {
        self.auth_scheme("Bearer ")
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set whether to verify TLS certificates.
    pub fn tls_verify(mut self, verify: bool) -> Self {
        self.config.tls_verify = verify;
        self
    }

    /// Set a custom User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Log request and response bodies at debug level.
    pub fn log_bodies(mut self, enabled: bool) -> Self {
        self.config.log_bodies = enabled;
        self
    }

    /// Use a caller-supplied HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.config.http_client = Some(client);
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:9047");
        assert_eq!(config.api_prefix, "api/v3");
        assert_eq!(config.login_path, "apiv2/login");
        assert_eq!(config.auth_scheme, "_dremio");
        assert!(config.api_key.is_none());
        assert!(config.credentials.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.log_bodies);
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::builder("https://dremio.example.com/proxy")
            .credentials("analyst", "hunter2")
            .api_prefix("api/v3")
            .timeout(Duration::from_secs(60))
            .log_bodies(true)
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://dremio.example.com/proxy");
        assert_eq!(
            config.credentials,
            Some(Credentials::new("analyst", "hunter2"))
        );
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.log_bodies);
    }

    #[test]
    fn test_bearer_scheme() {
        let config = ClientConfig::builder("http://localhost:9047")
            .api_key("pat")
            .bearer()
            .build()
            .unwrap();
        assert_eq!(config.auth_scheme, "Bearer ");
    }

    #[test]
    fn test_empty_api_key_is_not_a_token() {
        let config = ClientConfig::builder("http://localhost:9047")
            .api_key("")
            .build()
            .unwrap();
        assert_eq!(config.static_token(), None);
    }

    #[test]
    fn test_invalid_url() {
        let result = ClientConfig::builder("not a valid url").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_url() {
        let result = ClientConfig::builder("").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_cannot_be_a_base_url() {
        let result = ClientConfig::builder("mailto:admin@example.com").build();
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_empty_username_rejected() {
        let result = ClientConfig::builder("http://localhost:9047")
            .credentials("", "secret")
            .build();
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_secrets_masked_in_debug() {
        let config = ClientConfig::builder("http://localhost:9047")
            .api_key("super_secret_token_12345")
            .credentials("analyst", "very_secret_password")
            .build()
            .unwrap();

        let debug_output = format!("{:?}", config);

        assert!(!debug_output.contains("super_secret_token_12345"));
        assert!(!debug_output.contains("very_secret_password"));
        assert!(debug_output.contains("analyst"));
        assert!(debug_output.contains("REDACTED"));
    }

    #[test]
    fn test_timeout_too_small() {
        let result = ClientConfig::builder("http://localhost:9047")
            .timeout(Duration::from_millis(50))
            .build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_timeout_at_minimum() {
        let result = ClientConfig::builder("http://localhost:9047")
            .timeout(ClientConfig::MIN_TIMEOUT)
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_from_lookup_reads_credentials_and_log_flag() {
        let config = ClientConfig::from_lookup(
            "http://localhost:9047",
            lookup_from(&[
                ("DREMIO_USERNAME", "analyst"),
                ("DREMIO_PASSWORD", "secret"),
                ("DREMIO_LOG", "1"),
            ]),
        )
        .unwrap();

        assert_eq!(config.credentials, Some(Credentials::new("analyst", "secret")));
        assert!(config.api_key.is_none());
        assert!(config.log_bodies);
    }

    #[test]
    fn test_from_lookup_reads_api_key() {
        let config = ClientConfig::from_lookup(
            "http://localhost:9047",
            lookup_from(&[("DREMIO_API_KEY", "tok"), ("DREMIO_LOG", "")]),
        )
        .unwrap();

        assert_eq!(config.static_token(), Some("tok"));
        assert!(!config.log_bodies);
    }

    #[test]
    fn test_from_lookup_username_without_password() {
        let result = ClientConfig::from_lookup(
            "http://localhost:9047",
            lookup_from(&[("DREMIO_USERNAME", "analyst")]),
        );
        assert!(matches!(result, Err(ClientError::Config(_))));
    }
}
