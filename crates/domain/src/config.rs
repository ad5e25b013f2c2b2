//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DomainError, DomainResult};

/// Connection and synchronisation settings of the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST API.
    pub api_base: String,
    /// URL of the job event stream.
    pub ws_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Interval of the reconciling poll in milliseconds.
    pub poll_interval_ms: u64,
    /// First reconnection delay in milliseconds.
    pub reconnect_initial_ms: u64,
    /// Upper bound of the reconnection delay in milliseconds.
    pub reconnect_max_ms: u64,
    /// Where the session is persisted; `None` uses the platform config dir.
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000/ws/".to_string(),
            request_timeout_ms: 30_000,
            poll_interval_ms: 5_000,
            reconnect_initial_ms: 1_000,
            reconnect_max_ms: 30_000,
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Reconciling poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// First reconnection delay.
    #[must_use]
    pub const fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    /// Reconnection delay ceiling.
    #[must_use]
    pub const fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidConfig` describing the first bad field.
    pub fn validate(&self) -> DomainResult<()> {
        check_scheme("api_base", &self.api_base, &["http", "https"])?;
        check_scheme("ws_url", &self.ws_url, &["ws", "wss"])?;

        if self.request_timeout_ms == 0 {
            return Err(DomainError::InvalidConfig(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(DomainError::InvalidConfig(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.reconnect_initial_ms == 0 || self.reconnect_initial_ms > self.reconnect_max_ms {
            return Err(DomainError::InvalidConfig(format!(
                "reconnect_initial_ms ({}) must be in 1..={}",
                self.reconnect_initial_ms, self.reconnect_max_ms
            )));
        }
        Ok(())
    }
}

fn check_scheme(field: &str, value: &str, allowed: &[&str]) -> DomainResult<()> {
    let url = Url::parse(value)
        .map_err(|e| DomainError::InvalidConfig(format!("{field}: {e}: {value}")))?;
    if !allowed.contains(&url.scheme()) {
        return Err(DomainError::InvalidConfig(format!(
            "{field} must use one of {allowed:?}, got {value}"
        )));
    }
    Ok(())
}
