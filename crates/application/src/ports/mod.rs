//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod http_transport;
mod push_source;
mod session_repository;

pub use http_transport::{
    HttpMethod, HttpTransport, TransportError, TransportRequest, TransportResponse,
};
pub use push_source::{PushSource, PushStream};
pub use session_repository::{SessionRepository, SessionRepositoryError};
