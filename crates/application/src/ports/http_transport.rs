//! HTTP transport port

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// HTTP methods used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// A fully prepared request, relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Method to use.
    pub method: HttpMethod,
    /// Path including any query string, e.g. `/api/jobs/?page=2`.
    pub path: String,
    /// Headers to send.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
}

impl TransportRequest {
    /// Returns the first header with the given name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response as received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers (lower-case names).
    pub headers: HashMap<String, String>,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Creates a response with no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Creates a JSON response.
    #[must_use]
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        let mut response = Self::new(status, value.to_string());
        response
            .headers
            .insert("content-type".to_string(), "application/json".to_string());
        response
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns true for statuses that mean the credential was not accepted.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self.status, 401 | 403)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport-level failures (no HTTP response was obtained).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete in time.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// Could not connect to the server.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Reading the response failed or another transport error occurred.
    #[error("{0}")]
    Other(String),
}

/// Port for sending HTTP requests to the API server.
///
/// Implementations must not retry on their own; retry policy belongs to
/// the gateway.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request and returns whatever response the server gave.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` only when no HTTP response was received;
    /// non-2xx statuses are returned as responses.
    async fn execute(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_statuses() {
        assert!(TransportResponse::new(401, "").is_auth_failure());
        assert!(TransportResponse::new(403, "").is_auth_failure());
        assert!(!TransportResponse::new(404, "").is_auth_failure());
        assert!(TransportResponse::new(204, "").is_success());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = TransportRequest {
            method: HttpMethod::Get,
            path: "/".to_string(),
            headers: vec![("Authorization".to_string(), "Bearer t".to_string())],
            body: None,
        };
        assert_eq!(request.header("authorization"), Some("Bearer t"));
    }
}
