//! Authenticated request gateway.
//!
//! Every outbound API call goes through [`AuthenticatedGateway::send`],
//! which attaches the bearer credential, turns a 401/403 into one refresh
//! and one resend, and maps everything else onto [`ApiError`].

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{RefreshCoordinator, SessionStore};
use crate::error::{ApiError, ApiResult};
use crate::ports::{HttpMethod, HttpTransport, TransportRequest, TransportResponse};

/// An API call before credentials are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: HttpMethod,
    path: String,
    body: Option<serde_json::Value>,
    headers: Vec<(String, String)>,
    retried: bool,
    public: bool,
}

impl ApiRequest {
    /// Creates a request with no body.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            retried: false,
            public: false,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if the body cannot be serialized.
    pub fn with_json(mut self, body: &impl Serialize) -> ApiResult<Self> {
        let value =
            serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Appends url-encoded query parameters.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if the query cannot be encoded.
    pub fn with_query(mut self, query: &impl Serialize) -> ApiResult<Self> {
        let encoded = serde_urlencoded::to_string(query)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        if !encoded.is_empty() {
            let separator = if self.path.contains('?') { '&' } else { '?' };
            self.path = format!("{}{separator}{encoded}", self.path);
        }
        Ok(self)
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sends without a credential and never triggers a refresh.
    ///
    /// For the login and registration endpoints, where a 401 means wrong
    /// credentials rather than an expired session.
    #[must_use]
    pub const fn public(mut self) -> Self {
        self.public = true;
        self
    }

    /// Marks the request as already resent after a refresh.
    #[must_use]
    pub const fn mark_retried(mut self) -> Self {
        self.retried = true;
        self
    }

    /// Returns true if the request was already resent after a refresh.
    #[must_use]
    pub const fn is_retried(&self) -> bool {
        self.retried
    }

    /// Method of the request.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Path including the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    fn to_transport(&self, token: Option<&str>) -> TransportRequest {
        let mut headers = self.headers.clone();
        if self.body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = token.filter(|_| !self.public) {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        TransportRequest {
            method: self.method,
            path: self.path.clone(),
            headers,
            body: self.body.clone(),
        }
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    inner: TransportResponse,
}

impl ApiResponse {
    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.inner.status
    }

    /// Raw body bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.inner.body
    }

    /// Consumes the response and returns the body.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.body
    }

    /// The `content-type` header, if present.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.inner.headers.get("content-type").map(String::as_str)
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_slice(&self.inner.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Decodes the body as JSON, treating `204 No Content` or an empty
    /// body as no value.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if a non-empty body does not match `T`.
    pub fn json_opt<T: DeserializeOwned>(&self) -> ApiResult<Option<T>> {
        if self.inner.status == 204 || self.inner.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        self.json().map(Some)
    }
}

/// Sends API requests with the session credential.
#[derive(Clone)]
pub struct AuthenticatedGateway {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl std::fmt::Debug for AuthenticatedGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedGateway").finish_non_exhaustive()
    }
}

impl AuthenticatedGateway {
    /// Creates a gateway.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionStore>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            transport,
            session,
            coordinator,
        }
    }

    /// Sends a request.
    ///
    /// An auth failure on a request that has not been resent yet triggers
    /// a refresh and exactly one resend with the new credential. Network
    /// errors are never retried.
    ///
    /// # Errors
    ///
    /// - `ApiError::Auth` if the credential is rejected and a refresh does
    ///   not help (the original failure is returned).
    /// - `ApiError::Server` for any other non-2xx status.
    /// - `ApiError::Network` if no response was received.
    pub async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let token = if request.public {
            None
        } else {
            self.session.access_token().await
        };
        let response = self.execute(&request, token.as_deref()).await?;

        if !response.is_auth_failure() || request.public || request.is_retried() {
            return Self::finish(response);
        }

        debug!(
            method = request.method.as_str(),
            path = %request.path,
            status = response.status,
            "credential rejected, refreshing"
        );
        match self.coordinator.refresh(token.as_deref()).await {
            Ok(fresh) => {
                let retry = request.mark_retried();
                let response = self.execute(&retry, Some(&fresh)).await?;
                Self::finish(response)
            }
            Err(e) => {
                warn!(error = %e, path = %request.path, "refresh did not recover request");
                Self::finish(response)
            }
        }
    }

    /// Sends a request and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// See [`Self::send`]; also `ApiError::Decode` for a malformed body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        self.send(request).await?.json()
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> ApiResult<TransportResponse> {
        let prepared = request.to_transport(token);
        self.transport.execute(&prepared).await.map_err(|e| {
            debug!(error = %e, path = %request.path, "request failed");
            ApiError::Network(e)
        })
    }

    fn finish(response: TransportResponse) -> ApiResult<ApiResponse> {
        if response.is_success() {
            Ok(ApiResponse { inner: response })
        } else if response.is_auth_failure() {
            Err(ApiError::Auth {
                status: response.status,
                body: response.text(),
            })
        } else {
            Err(ApiError::Server {
                status: response.status,
                body: response.text(),
            })
        }
    }
}
