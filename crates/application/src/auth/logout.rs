//! Process-wide logout notification.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::SessionStore;

const EVENT_CAPACITY: usize = 64;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user signed out.
    SignedOut,
    /// The refresh credential was rejected or could not be used.
    RefreshFailed,
    /// The server no longer accepts the restored session.
    SessionRejected,
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were issued by a login or registration.
    SignedIn {
        /// Name of the signed-in user, when known.
        username: Option<String>,
    },
    /// The access credential was rotated by a refresh.
    TokenRefreshed,
    /// The session was cleared.
    LoggedOut {
        /// What ended the session.
        reason: LogoutReason,
    },
}

/// Clears the session and tells every subscriber about it.
///
/// Logout is idempotent per invalidation episode: only the call that
/// actually clears a non-empty session emits [`SessionEvent::LoggedOut`].
#[derive(Debug)]
pub struct LogoutBroadcaster {
    session: Arc<SessionStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl LogoutBroadcaster {
    /// Creates a broadcaster for the given session.
    #[must_use]
    pub fn new(session: Arc<SessionStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { session, events }
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Ends the session. Returns true if this call ended it.
    pub async fn signal_logout(&self, reason: LogoutReason) -> bool {
        if !self.session.clear().await {
            debug!(?reason, "logout ignored, session already cleared");
            return false;
        }
        info!(?reason, "session ended");
        self.announce(SessionEvent::LoggedOut { reason });
        true
    }

    pub(crate) fn announce(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}
