//! Client configuration loading.
//!
//! Sources, later ones winning:
//! 1. Built-in defaults
//! 2. `<config dir>/harvest/config.json`, if present
//! 3. `HARVEST_*` environment variables

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use harvest_domain::{ClientConfig, DomainError};
use tokio::fs;
use tracing::debug;

use crate::serialization::decode_document;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("could not read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid JSON for `ClientConfig`.
    #[error("invalid config file {}: {message}", path.display())]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// An environment variable holds an unusable value.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        name: String,
        /// Offending value.
        value: String,
    },

    /// The merged configuration failed validation.
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Default location of the config file.
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("harvest").join("config.json"))
}

/// Loads the configuration from the default file and the process environment.
///
/// # Errors
///
/// Returns a `ConfigError` naming the first source that is unusable.
pub async fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from(config_file_path().as_deref(), |name| std::env::var(name).ok()).await
}

/// Loads the configuration from an optional file and an environment lookup.
///
/// # Errors
///
/// Returns a `ConfigError` naming the first source that is unusable.
pub async fn load_config_from<F>(file: Option<&Path>, env: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match file {
        Some(path) => read_file(path).await?,
        None => ClientConfig::default(),
    };
    apply_env(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

async fn read_file(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = match fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(ClientConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    decode_document(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn apply_env<F>(config: &mut ClientConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = env("HARVEST_API_BASE") {
        config.api_base = value;
    }
    if let Some(value) = env("HARVEST_WS_URL") {
        config.ws_url = value;
    }
    if let Some(value) = env("HARVEST_SESSION_FILE") {
        config.session_file = Some(PathBuf::from(value));
    }
    parse_env(&env, "HARVEST_REQUEST_TIMEOUT_MS", &mut config.request_timeout_ms)?;
    parse_env(&env, "HARVEST_POLL_INTERVAL_MS", &mut config.poll_interval_ms)?;
    parse_env(&env, "HARVEST_RECONNECT_INITIAL_MS", &mut config.reconnect_initial_ms)?;
    parse_env(&env, "HARVEST_RECONNECT_MAX_MS", &mut config.reconnect_max_ms)?;
    Ok(())
}

fn parse_env<F, T>(env: &F, name: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = env(name) {
        *target = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: name.to_string(),
            value,
        })?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[tokio::test]
    async fn defaults_without_file_or_env() {
        let config = load_config_from(None, env(&[])).await.unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[tokio::test]
    async fn env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"api_base": "https://file.example.com", "poll_interval_ms": 2000}"#,
        )
        .unwrap();

        let config = load_config_from(
            Some(&path),
            env(&[("HARVEST_API_BASE", "https://env.example.com")]),
        )
        .await
        .unwrap();

        assert_eq!(config.api_base, "https://env.example.com");
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(Some(&dir.path().join("absent.json")), env(&[]))
            .await
            .unwrap();
        assert_eq!(config.ws_url, "ws://localhost:8000/ws/");
    }

    #[tokio::test]
    async fn unparsable_number_is_rejected() {
        let result = load_config_from(None, env(&[("HARVEST_POLL_INTERVAL_MS", "soon")])).await;
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[tokio::test]
    async fn invalid_merged_config_is_rejected() {
        let result = load_config_from(None, env(&[("HARVEST_WS_URL", "http://localhost/ws/")])).await;
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn malformed_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{").unwrap();

        let result = load_config_from(Some(&path), env(&[])).await;

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
