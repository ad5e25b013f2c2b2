//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port. Paths are resolved
//! against the configured API base URL; statuses are passed through
//! untouched so the gateway can apply its refresh and error policy.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use harvest_application::ports::{
    HttpMethod, HttpTransport, TransportError, TransportRequest, TransportResponse,
};
use harvest_domain::ClientConfig;
use reqwest::{Client, Method, Url};
use tracing::trace;

/// HTTP transport backed by `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base: String,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport for the configured API.
    ///
    /// Default configuration:
    /// - Request timeout: `request_timeout_ms`
    /// - Follow redirects: up to 10
    /// - User-Agent: "harvest/<version>"
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the client cannot
    /// be created.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("harvest/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Self::with_client(client, &config.api_base, config.request_timeout())
    }

    /// Creates a transport around an existing client.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidUrl` if `base` is not a URL.
    pub fn with_client(
        client: Client,
        base: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        Url::parse(base).map_err(|e| TransportError::InvalidUrl(format!("{e}: {base}")))?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Resolves a path (with query) against the base URL, keeping any
    /// path prefix the base carries.
    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.base)
        } else {
            format!("{}/{path}", self.base)
        };
        Url::parse(&joined).map_err(|e| TransportError::InvalidUrl(format!("{e}: {joined}")))
    }

    /// Converts the port's `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// Maps reqwest errors to `TransportError`.
    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout { timeout_ms };
        }
        if error.is_connect() {
            return TransportError::ConnectionFailed(error.to_string());
        }
        if error.is_builder() {
            return TransportError::InvalidUrl(error.to_string());
        }
        TransportError::Other(error.to_string())
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: &TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let url = self.url_for(&request.path)?;
        trace!(method = request.method.as_str(), %url, "sending request");

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url)
            .timeout(self.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let timeout_ms = self.timeout_ms();
        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("<binary>").to_string()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Other(format!("Failed to read body: {e}")))?
            .to_vec();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn transport(base: &str) -> ReqwestTransport {
        ReqwestTransport::with_client(Client::new(), base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_to_reqwest_method() {
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Get),
            Method::GET
        );
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Post),
            Method::POST
        );
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Delete),
            Method::DELETE
        );
    }

    #[test]
    fn test_url_keeps_base_prefix_and_query() {
        let url = transport("https://harvest.example.com/backend/")
            .url_for("/api/jobs/?page=2")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://harvest.example.com/backend/api/jobs/?page=2"
        );
    }

    #[test]
    fn test_rejects_invalid_base() {
        let result =
            ReqwestTransport::with_client(Client::new(), "not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_client_creation() {
        assert!(ReqwestTransport::new(&ClientConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_transport_error() {
        let transport = transport("http://127.0.0.1:9");
        let request = TransportRequest {
            method: HttpMethod::Get,
            path: "/api/auth/me/".to_string(),
            headers: Vec::new(),
            body: None,
        };

        let result = transport.execute(&request).await;

        assert!(matches!(
            result,
            Err(TransportError::ConnectionFailed(_) | TransportError::Other(_))
        ));
    }
}
