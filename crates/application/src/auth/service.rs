//! Sign-in, registration and session restore.

use std::sync::Arc;

use harvest_domain::{AuthTokens, LoginRequest, RegisterRequest, UserRecord};
use tracing::{info, warn};

use super::{LogoutBroadcaster, LogoutReason, RefreshCoordinator, SessionStore};
use crate::api::paths;
use crate::error::{ApiError, ApiResult};
use crate::gateway::{ApiRequest, AuthenticatedGateway};

/// Authentication use cases.
#[derive(Debug, Clone)]
pub struct AuthService {
    gateway: AuthenticatedGateway,
    session: Arc<SessionStore>,
    coordinator: Arc<RefreshCoordinator>,
    logout: Arc<LogoutBroadcaster>,
}

impl AuthService {
    /// Creates the service.
    #[must_use]
    pub const fn new(
        gateway: AuthenticatedGateway,
        session: Arc<SessionStore>,
        coordinator: Arc<RefreshCoordinator>,
        logout: Arc<LogoutBroadcaster>,
    ) -> Self {
        Self {
            gateway,
            session,
            coordinator,
            logout,
        }
    }

    /// Signs in and loads the user record.
    ///
    /// # Errors
    ///
    /// `ApiError::Auth` for wrong credentials; any gateway error otherwise.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<UserRecord> {
        let request = ApiRequest::post(paths::AUTH_LOGIN)
            .public()
            .with_json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })?;
        let tokens: AuthTokens = self.gateway.send_json(request).await?;
        self.coordinator.establish(tokens).await;
        self.fetch_user().await
    }

    /// Creates an account and signs in with it.
    ///
    /// # Errors
    ///
    /// Any gateway error; a 400 with field errors arrives as `ApiError::Server`.
    pub async fn register(&self, registration: &RegisterRequest) -> ApiResult<UserRecord> {
        let request = ApiRequest::post(paths::AUTH_REGISTER)
            .public()
            .with_json(registration)?;
        let tokens: AuthTokens = self.gateway.send_json(request).await?;
        let user = tokens.user.clone();
        self.coordinator.establish(tokens).await;
        match user {
            Some(user) => Ok(user),
            None => self.fetch_user().await,
        }
    }

    /// Validates a persisted session against the server.
    ///
    /// Returns `None` when there is no session or the server no longer
    /// accepts it; in the latter case the session is ended.
    ///
    /// # Errors
    ///
    /// Network and server errors are returned and leave the session as is.
    pub async fn restore(&self) -> ApiResult<Option<UserRecord>> {
        if !self.session.is_authenticated().await {
            return Ok(None);
        }
        match self.fetch_user().await {
            Ok(user) => {
                info!(user = %user.username, "session restored");
                Ok(Some(user))
            }
            Err(ApiError::Auth { status, .. }) => {
                warn!(status, "persisted session rejected");
                self.logout.signal_logout(LogoutReason::SessionRejected).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Ends the session.
    pub async fn sign_out(&self) {
        self.logout.signal_logout(LogoutReason::SignedOut).await;
    }

    /// The cached user, if signed in.
    pub async fn current_user(&self) -> Option<UserRecord> {
        self.session.user().await
    }

    async fn fetch_user(&self) -> ApiResult<UserRecord> {
        let user: UserRecord = self.gateway.send_json(ApiRequest::get(paths::AUTH_ME)).await?;
        self.coordinator.attach_user(user.clone()).await;
        Ok(user)
    }
}
