//! Harvest Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, plus configuration loading and
//! logging setup for binaries.

pub mod adapters;
pub mod config;
pub mod logging;
pub mod persistence;
pub mod push;
pub mod serialization;

pub use adapters::ReqwestTransport;
pub use config::{ConfigError, load_config};
pub use persistence::FileSessionRepository;
pub use push::WebSocketPushSource;
pub use serialization::{DocumentError, decode_document, encode_document};
