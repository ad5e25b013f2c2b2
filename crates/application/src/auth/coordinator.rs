//! Single-flight credential refresh.
//!
//! The coordinator is an explicit `Idle | Refreshing { waiters }` state
//! machine. The first caller that finds it idle starts a refresh cycle;
//! every caller arriving while the cycle runs joins the waiter queue. When
//! the cycle ends all waiters are resolved in arrival order with the same
//! outcome, so one failure episode produces exactly one refresh call.

use std::sync::Arc;

use harvest_domain::{AuthTokens, RefreshGrant, RefreshRequest, Session, UserRecord};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

use super::{LogoutBroadcaster, LogoutReason, SessionEvent, SessionStore};
use crate::api::paths;
use crate::error::RefreshError;
use crate::ports::{HttpMethod, HttpTransport, TransportRequest};

type RefreshOutcome = Result<String, RefreshError>;

enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// The only writer of session credentials.
pub struct RefreshCoordinator {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionStore>,
    logout: Arc<LogoutBroadcaster>,
    state: Mutex<RefreshState>,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator").finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionStore>,
        logout: Arc<LogoutBroadcaster>,
    ) -> Self {
        Self {
            transport,
            session,
            logout,
            state: Mutex::new(RefreshState::Idle),
        }
    }

    /// Returns true while a refresh cycle is in flight.
    pub async fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock().await, RefreshState::Refreshing { .. })
    }

    /// Obtains an access credential newer than `stale`.
    ///
    /// `stale` is the credential the failed request carried. If the session
    /// already holds a different one, a refresh has happened since and that
    /// credential is returned without another round trip. Otherwise the
    /// caller joins (or starts) the current refresh cycle.
    ///
    /// # Errors
    ///
    /// Returns the cycle's `RefreshError`. By then the session has been
    /// cleared and the logout broadcast sent.
    pub async fn refresh(self: &Arc<Self>, stale: Option<&str>) -> RefreshOutcome {
        let receiver = {
            let mut state = self.state.lock().await;
            if let Some(current) = self.session.access_token().await
                && Some(current.as_str()) != stale
            {
                return Ok(current);
            }

            let (sender, receiver) = oneshot::channel();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    waiters.push(sender);
                    debug!(waiters = waiters.len(), "waiting for refresh in flight");
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: vec![sender],
                    };
                    // Detached so a cancelled caller cannot strand the queue.
                    let this = Arc::clone(self);
                    tokio::spawn(async move { this.run_cycle().await });
                }
            }
            receiver
        };

        receiver.await.unwrap_or(Err(RefreshError::Aborted))
    }

    /// Installs credentials issued by a login or registration.
    pub(crate) async fn establish(&self, tokens: AuthTokens) {
        let username = tokens.user.as_ref().map(|user| user.username.clone());
        self.session
            .replace(Session::new(tokens.access, tokens.refresh, tokens.user))
            .await;
        info!(user = username.as_deref().unwrap_or("-"), "signed in");
        self.logout.announce(SessionEvent::SignedIn { username });
    }

    /// Caches the identity of the signed-in user.
    pub(crate) async fn attach_user(&self, user: UserRecord) {
        self.session.attach_user(user).await;
    }

    async fn run_cycle(self: Arc<Self>) {
        debug!("refresh cycle started");
        let outcome = self.request_refresh().await;

        match &outcome {
            Ok(_) => {
                info!("access credential refreshed");
                self.logout.announce(SessionEvent::TokenRefreshed);
            }
            Err(e) => {
                warn!(error = %e, "refresh failed, ending session");
                self.logout.signal_logout(LogoutReason::RefreshFailed).await;
            }
        }

        let waiters = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { waiters } => waiters,
                RefreshState::Idle => Vec::new(),
            }
        };
        debug!(waiters = waiters.len(), "refresh cycle resolved");
        for waiter in waiters {
            // A waiter that gave up has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn request_refresh(&self) -> RefreshOutcome {
        let refresh = self
            .session
            .refresh_token()
            .await
            .ok_or(RefreshError::MissingCredential)?;

        let body = serde_json::to_value(RefreshRequest { refresh: &refresh })
            .map_err(|e| RefreshError::Decode(e.to_string()))?;
        let request = TransportRequest {
            method: HttpMethod::Post,
            path: paths::AUTH_REFRESH.to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body),
        };

        let response = self.transport.execute(&request).await?;
        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status,
                body: response.text(),
            });
        }
        let grant: RefreshGrant = serde_json::from_slice(&response.body)
            .map_err(|e| RefreshError::Decode(e.to_string()))?;

        let access = grant.access.clone();
        if !self
            .session
            .rotate(&refresh, grant.access, grant.refresh)
            .await
        {
            return Err(RefreshError::Aborted);
        }
        Ok(access)
    }
}
