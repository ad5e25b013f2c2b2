//! Session state and credential management.
//!
//! - [`SessionStore`]: current credentials and user, persisted between runs
//! - [`RefreshCoordinator`]: single-flight refresh, the only credential writer
//! - [`LogoutBroadcaster`]: idempotent logout and session notifications
//! - [`AuthService`]: login, registration and restore

mod coordinator;
mod logout;
mod service;
mod session_store;

pub use coordinator::RefreshCoordinator;
pub use logout::{LogoutBroadcaster, LogoutReason, SessionEvent};
pub use service::AuthService;
pub use session_store::SessionStore;
