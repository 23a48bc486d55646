//! Lazy session authentication.
//!
//! A static token puts the client in the authenticated state from the start.
//! Otherwise the first request that needs a token logs in with the configured
//! credentials and the token is kept for the lifetime of the client. The
//! check-then-login sequence runs under a mutex, so concurrent first calls
//! produce a single login request.

use crate::config::{ClientConfig, Credentials};
use crate::error::{ClientError, Result};
use crate::transport::{decode, ApiPath, Body, Transport};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Whether the client currently holds a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No static token and no session token obtained yet
    Unauthenticated,
    /// A static or fetched token is available
    Authenticated,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    user_name: &'a str,
    password: &'a str,
}

/// Login endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Session token
    pub token: String,
    /// Expiry as epoch milliseconds, when reported
    #[serde(default)]
    pub expires: Option<i64>,
}

pub(crate) struct Authenticator {
    scheme: String,
    static_token: Option<String>,
    credentials: Option<Credentials>,
    login_path: ApiPath,
    session: Mutex<Option<String>>,
}

impl Authenticator {
    pub(crate) fn new(config: &ClientConfig) -> Self {
        Self {
            scheme: config.auth_scheme.clone(),
            static_token: config.static_token().map(String::from),
            credentials: config.credentials.clone(),
            login_path: ApiPath::new(&config.login_path),
            session: Mutex::new(None),
        }
    }

    pub(crate) async fn state(&self) -> AuthState {
        if self.static_token.is_some() || self.session.lock().await.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    /// Authorization header value for the static token, if any.
    pub(crate) fn static_header(&self) -> Option<String> {
        self.static_token.as_deref().map(|token| self.header(token))
    }

    /// Authorization header value for the next request, logging in first if needed.
    ///
    /// Returns `None` when neither a static token nor credentials are configured.
    pub(crate) async fn authorization(&self, transport: &Transport) -> Result<Option<String>> {
        if let Some(header) = self.static_header() {
            return Ok(Some(header));
        }
        let Some(ref credentials) = self.credentials else {
            return Ok(None);
        };

        let mut session = self.session.lock().await;
        if let Some(ref token) = *session {
            return Ok(Some(self.header(token)));
        }

        let token = self.login(transport, credentials).await?;
        let header = self.header(&token);
        *session = Some(token);
        Ok(Some(header))
    }

    /// Drop a fetched session token. Static tokens are unaffected.
    pub(crate) async fn invalidate(&self) {
        *self.session.lock().await = None;
    }

    async fn login(&self, transport: &Transport, credentials: &Credentials) -> Result<String> {
        let request = LoginRequest {
            user_name: &credentials.username,
            password: &credentials.password,
        };
        let body = Body::Secret(serde_json::to_vec(&request)?);

        let bytes = transport
            .send(Method::POST, &self.login_path, Some(body), None)
            .await?;
        let response: LoginResponse = decode(&bytes)?;

        if response.token.is_empty() {
            return Err(ClientError::Authentication(
                "login response carried an empty token".to_string(),
            ));
        }

        tracing::info!(
            user = %credentials.username,
            expires = ?response.expires,
            "Obtained session token"
        );
        Ok(response.token)
    }

    fn header(&self, token: &str) -> String {
        format!("{}{}", self.scheme, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_wire_names() {
        let request = LoginRequest {
            user_name: "analyst",
            password: "secret",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"userName": "analyst", "password": "secret"})
        );
    }

    #[test]
    fn test_login_response_without_expiry() {
        let response: LoginResponse = serde_json::from_str(r#"{"token": "abc"}"#).unwrap();
        assert_eq!(response.token, "abc");
        assert_eq!(response.expires, None);
    }

    #[tokio::test]
    async fn test_static_token_starts_authenticated() {
        let config = ClientConfig::builder("http://localhost:9047")
            .api_key("tok")
            .build()
            .unwrap();
        let auth = Authenticator::new(&config);

        assert_eq!(auth.state().await, AuthState::Authenticated);
        assert_eq!(auth.static_header(), Some("_dremiotok".to_string()));
    }

    #[tokio::test]
    async fn test_credentials_start_unauthenticated() {
        let config = ClientConfig::builder("http://localhost:9047")
            .credentials("analyst", "secret")
            .build()
            .unwrap();
        let auth = Authenticator::new(&config);

        assert_eq!(auth.state().await, AuthState::Unauthenticated);
        assert_eq!(auth.static_header(), None);
    }

    #[tokio::test]
    async fn test_anonymous_has_no_header() {
        let config = ClientConfig::builder("http://localhost:9047").build().unwrap();
        let transport = Transport::new(&config).unwrap();
        let auth = Authenticator::new(&config);

        assert_eq!(auth.authorization(&transport).await.unwrap(), None);
    }
}
