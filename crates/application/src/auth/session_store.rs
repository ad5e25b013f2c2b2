//! Process-wide session storage.
//!
//! Holds the current credentials and user identity, mirrors every change
//! to the session repository, and hands out read-only views. Writes are
//! crate-private: only the refresh coordinator and the logout broadcaster
//! change credentials.

use std::sync::Arc;

use harvest_domain::{Session, UserRecord, token_preview};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::ports::SessionRepository;

/// Thread-safe session store.
pub struct SessionStore {
    session: RwLock<Session>,
    repository: Option<Arc<dyn SessionRepository>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("persistent", &self.repository.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store that keeps the session in memory only.
    #[must_use]
    pub fn in_memory(initial: Session) -> Self {
        Self {
            session: RwLock::new(initial.normalized()),
            repository: None,
        }
    }

    /// Create a store backed by a repository, starting from what it holds.
    ///
    /// A session that cannot be loaded is logged and replaced by an empty one.
    pub async fn load(repository: Arc<dyn SessionRepository>) -> Self {
        let initial = match repository.load().await {
            Ok(session) => session.normalized(),
            Err(e) => {
                warn!(error = %e, "could not load persisted session, starting signed out");
                Session::empty()
            }
        };
        debug!(authenticated = initial.is_authenticated(), "session loaded");
        Self {
            session: RwLock::new(initial),
            repository: Some(repository),
        }
    }

    /// Copy of the whole session.
    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Current access credential.
    pub async fn access_token(&self) -> Option<String> {
        self.session.read().await.access_token().map(String::from)
    }

    /// Current refresh credential.
    pub async fn refresh_token(&self) -> Option<String> {
        self.session.read().await.refresh_token().map(String::from)
    }

    /// Cached user identity.
    pub async fn user(&self) -> Option<UserRecord> {
        self.session.read().await.user().cloned()
    }

    /// Returns true while an access credential is held.
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    /// Replace the session with freshly issued credentials.
    pub(crate) async fn replace(&self, session: Session) {
        let mut current = self.session.write().await;
        *current = session.normalized();
        self.persist(&current).await;
    }

    /// Swap in a refreshed access credential.
    ///
    /// Applies only while the session still holds `used_refresh`, so a
    /// refresh that completes after a logout cannot revive the session.
    pub(crate) async fn rotate(
        &self,
        used_refresh: &str,
        access_token: String,
        refresh_token: Option<String>,
    ) -> bool {
        let mut current = self.session.write().await;
        if current.refresh_token() != Some(used_refresh) {
            return false;
        }
        debug!(access = %token_preview(&access_token), "access credential rotated");
        current.rotate(access_token, refresh_token);
        self.persist(&current).await;
        true
    }

    /// Attach the user identity to the current session.
    pub(crate) async fn attach_user(&self, user: UserRecord) {
        let mut current = self.session.write().await;
        if !current.is_authenticated() {
            return;
        }
        current.set_user(user);
        self.persist(&current).await;
    }

    /// Clear everything. Returns true if anything was held.
    pub(crate) async fn clear(&self) -> bool {
        let mut current = self.session.write().await;
        if current.is_empty() {
            return false;
        }
        *current = Session::empty();
        if let Some(repository) = &self.repository
            && let Err(e) = repository.clear().await
        {
            warn!(error = %e, "could not remove persisted session");
        }
        true
    }

    async fn persist(&self, session: &Session) {
        if let Some(repository) = &self.repository
            && let Err(e) = repository.save(session).await
        {
            warn!(error = %e, "could not persist session");
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory(Session::empty())
    }
}
