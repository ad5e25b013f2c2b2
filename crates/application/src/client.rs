//! The client context shared by every component.

use std::sync::Arc;

use crate::api::{JobsApi, ResultsApi};
use crate::auth::{AuthService, LogoutBroadcaster, RefreshCoordinator, SessionEvent, SessionStore};
use crate::gateway::AuthenticatedGateway;
use crate::ports::{HttpTransport, PushSource};
use crate::sync::{Interest, JobSyncConfig, JobSyncHandle};

/// Owns the session singletons and hands out the services built on them.
///
/// There is one session store, one refresh coordinator and one logout
/// broadcaster per client; every service created from the same client
/// shares them.
#[derive(Debug, Clone)]
pub struct HarvestClient {
    session: Arc<SessionStore>,
    logout: Arc<LogoutBroadcaster>,
    coordinator: Arc<RefreshCoordinator>,
    gateway: AuthenticatedGateway,
}

impl HarvestClient {
    /// Builds a client around a transport and a session store.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, session: Arc<SessionStore>) -> Self {
        let logout = Arc::new(LogoutBroadcaster::new(session.clone()));
        let coordinator = Arc::new(RefreshCoordinator::new(
            transport.clone(),
            session.clone(),
            logout.clone(),
        ));
        let gateway = AuthenticatedGateway::new(transport, session.clone(), coordinator.clone());
        Self {
            session,
            logout,
            coordinator,
            gateway,
        }
    }

    /// The session store.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// The request gateway.
    #[must_use]
    pub const fn gateway(&self) -> &AuthenticatedGateway {
        &self.gateway
    }

    /// The refresh coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// The logout broadcaster.
    #[must_use]
    pub const fn logout(&self) -> &Arc<LogoutBroadcaster> {
        &self.logout
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn session_events(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.logout.subscribe()
    }

    /// Authentication use cases.
    #[must_use]
    pub fn auth(&self) -> AuthService {
        AuthService::new(
            self.gateway.clone(),
            self.session.clone(),
            self.coordinator.clone(),
            self.logout.clone(),
        )
    }

    /// Job endpoints.
    #[must_use]
    pub fn jobs(&self) -> JobsApi {
        JobsApi::new(self.gateway.clone())
    }

    /// Result endpoints.
    #[must_use]
    pub fn results(&self) -> ResultsApi {
        ResultsApi::new(self.gateway.clone())
    }

    /// Starts a job sync channel. It stops on its own when the session ends.
    #[must_use]
    pub fn sync_jobs(
        &self,
        push: Arc<dyn PushSource>,
        config: JobSyncConfig,
        interest: Interest,
    ) -> JobSyncHandle {
        JobSyncHandle::spawn(
            self.gateway.clone(),
            push,
            self.session.clone(),
            &self.logout,
            config,
            interest,
        )
    }
}
