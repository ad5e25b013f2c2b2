//! Harvest Application - Session handling and job synchronisation
//!
//! This crate contains the client's behaviour on top of the domain types:
//! credential storage and single-flight refresh, the authenticated request
//! gateway, typed endpoints and the live job sync channel. External systems
//! are reached through the traits in [`ports`].

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod gateway;
pub mod ports;
pub mod sync;

pub use api::{JobsApi, ResultsApi};
pub use auth::{
    AuthService, LogoutBroadcaster, LogoutReason, RefreshCoordinator, SessionEvent, SessionStore,
};
pub use client::HarvestClient;
pub use error::{ApiError, ApiResult, RefreshError, SyncError};
pub use gateway::{ApiRequest, ApiResponse, AuthenticatedGateway};
pub use sync::{Interest, JobSyncConfig, JobSyncEvent, JobSyncHandle, PollState, StopReason};
