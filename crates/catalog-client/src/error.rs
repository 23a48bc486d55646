//! Error types for the Dremio catalog client.

/// Errors that can occur when using the Dremio client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status >= 400.
    ///
    /// The body is kept verbatim; it is never parsed on the error path.
    #[error("Request failed with status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// A successful response did not decode into the expected shape.
    #[error("Failed to decode response: {source} (body: {body})")]
    Decode {
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
        /// Raw response body
        body: String,
    },

    /// The entity read back is not of the kind the typed accessor asked for.
    #[error("Wrong entity kind: expected {expected}, found {actual}")]
    WrongKind {
        /// Discriminator value the accessor requires
        expected: String,
        /// Discriminator value the server returned
        actual: String,
    },

    /// Request payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A constructor or update spec failed a client-side precondition
    #[error("Validation error: {0}")]
    Validation(String),

    /// Login succeeded but the returned token is unusable
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns the HTTP status if this is a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body for status and decode errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            ClientError::Status { body, .. } | ClientError::Decode { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns true for a 404 response.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns true for a 409 response, e.g. an update carrying a stale tag.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Returns true for a 401 response.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_helpers() {
        let conflict = ClientError::Status {
            status: 409,
            body: "tag mismatch".to_string(),
        };
        assert!(conflict.is_conflict());
        assert!(!conflict.is_not_found());
        assert_eq!(conflict.status(), Some(409));
        assert_eq!(conflict.body(), Some("tag mismatch"));

        let not_found = ClientError::Status {
            status: 404,
            body: String::new(),
        };
        assert!(not_found.is_not_found());

        let unauthorized = ClientError::Status {
            status: 401,
            body: String::new(),
        };
        assert!(unauthorized.is_unauthorized());
    }

    #[test]
    fn test_non_status_errors_have_no_status() {
        let wrong_kind = ClientError::WrongKind {
            expected: "dataset".to_string(),
            actual: "space".to_string(),
        };
        assert_eq!(wrong_kind.status(), None);
        assert_eq!(wrong_kind.body(), None);
        assert!(wrong_kind.to_string().contains("expected dataset"));
        assert!(wrong_kind.to_string().contains("found space"));
    }

    #[test]
    fn test_decode_error_keeps_body() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let error = ClientError::Decode {
            source,
            body: "not json".to_string(),
        };
        assert_eq!(error.body(), Some("not json"));
        assert_eq!(error.status(), None);
    }
}
