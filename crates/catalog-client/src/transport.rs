//! Request pipeline shared by every endpoint.
//!
//! Builds URLs beneath the configured base, attaches the JSON content type and
//! optional Authorization header, and classifies responses: any status >= 400
//! becomes [`ClientError::Status`] with the body kept verbatim.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::time::Instant;
use url::Url;

/// Endpoint path made of raw, unencoded segments.
///
/// Each segment is percent-encoded on its own when the URL is built, so an
/// identifier or path element containing `/` stays a single segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApiPath {
    segments: Vec<String>,
}

impl ApiPath {
    /// Start a path from a literal prefix such as `api/v3`.
    pub(crate) fn new(prefix: &str) -> Self {
        Self {
            segments: prefix
                .split('/')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Append one raw segment.
    pub(crate) fn push(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Append raw segments in order.
    pub(crate) fn extend<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.segments
            .extend(segments.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Reject segments the URL parser would drop or resolve away.
    ///
    /// `.` and `..` are dot segments even when percent-encoded, and an empty
    /// segment would address the parent collection.
    pub(crate) fn validate(&self) -> Result<()> {
        match self
            .segments
            .iter()
            .find(|s| s.is_empty() || *s == "." || *s == "..")
        {
            Some(segment) => Err(ClientError::Validation(format!(
                "path segment {:?} cannot be addressed",
                segment
            ))),
            None => Ok(()),
        }
    }

    fn encoded(&self) -> String {
        self.segments
            .iter()
            .map(|s| urlencoding::encode(s))
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.encoded())
    }
}

/// Request body. Secret bodies are never written to the diagnostic log.
pub(crate) enum Body {
    Json(Vec<u8>),
    Secret(Vec<u8>),
}

impl Body {
    /// Encode a payload as a JSON body.
    pub(crate) fn json<B: Serialize>(payload: &B) -> Result<Self> {
        Ok(Body::Json(serde_json::to_vec(payload)?))
    }

    fn loggable(&self) -> Cow<'_, str> {
        match self {
            Body::Json(bytes) => String::from_utf8_lossy(bytes),
            Body::Secret(_) => Cow::Borrowed("***REDACTED***"),
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        match self {
            Body::Json(bytes) | Body::Secret(bytes) => bytes,
        }
    }
}

/// HTTP transport bound to one base URL.
pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: Url,
    log_bodies: bool,
}

impl Transport {
    /// Create a transport from a validated configuration.
    pub(crate) fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let http = match config.http_client {
            Some(ref client) => client.clone(),
            None => {
                let mut headers = HeaderMap::new();
                headers.insert(
                    USER_AGENT,
                    HeaderValue::from_str(&config.user_agent)
                        .unwrap_or_else(|_| HeaderValue::from_static("dremio-catalog-client")),
                );

                reqwest::Client::builder()
                    .default_headers(headers)
                    .timeout(config.timeout)
                    .danger_accept_invalid_certs(!config.tls_verify)
                    .build()?
            }
        };

        Ok(Self {
            http,
            base_url,
            log_bodies: config.log_bodies,
        })
    }

    /// Resolve a path beneath the base URL, keeping the base's own path prefix.
    pub(crate) fn url(&self, path: &ApiPath) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!("{}/{}", url.path().trim_end_matches('/'), path.encoded());
        url.set_path(&joined);
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    /// Send a request and return the raw body of a successful response.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &ApiPath,
        body: Option<Body>,
        authorization: Option<&str>,
    ) -> Result<Vec<u8>> {
        path.validate()?;
        let url = self.url(path);
        let start = Instant::now();

        tracing::debug!(method = %method, url = %url, "Sending request");
        if self.log_bodies {
            tracing::debug!(
                method = %method,
                url = %url,
                body = %body.as_ref().map(Body::loggable).unwrap_or_default(),
                "Request body"
            );
        }

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(authorization) = authorization {
            let value = HeaderValue::from_str(authorization).map_err(|_| {
                ClientError::Authentication("token is not a valid header value".to_string())
            })?;
            request = request.header(AUTHORIZATION, value);
        }

        if let Some(body) = body {
            request = request.body(body.into_bytes());
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let duration = start.elapsed();

        tracing::debug!(
            method = %method,
            url = %url,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Received response"
        );
        if self.log_bodies {
            tracing::debug!(
                status = %status.as_u16(),
                body = %String::from_utf8_lossy(&bytes),
                "Response body"
            );
        }

        if status.as_u16() >= 400 {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            tracing::warn!(
                method = %method,
                url = %url,
                status = %status.as_u16(),
                duration_ms = %duration.as_millis(),
                "Request failed"
            );
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(bytes.to_vec())
    }
}

/// Decode a successful response body.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|source| ClientError::Decode {
        source,
        body: String::from_utf8_lossy(body).into_owned(),
    })
}
