//! Harvest Domain - Core client types
//!
//! This crate defines the domain model of the Harvest dashboard client:
//! session credentials, job records and the job table, push messages and
//! configuration. All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod config;
pub mod error;
pub mod id;
pub mod job;
pub mod push;
pub mod results;

pub use auth::{
    AuthTokens, LoginRequest, RefreshGrant, RefreshRequest, RegisterRequest, Session, UserRecord,
    token_preview,
};
pub use config::ClientConfig;
pub use error::{DomainError, DomainResult};
pub use id::JobId;
pub use job::{
    ApplyOutcome, BatchCreate, CreateJob, JobListQuery, JobRecord, JobStatistics, JobStatus,
    JobTable, JobUpdate, Page, supersedes,
};
pub use push::{ConnectionState, PushMessage};
pub use results::{
    CompareRequest, Comparison, ExportFormat, ExportedResult, HarvestResult, ResultListQuery,
};
