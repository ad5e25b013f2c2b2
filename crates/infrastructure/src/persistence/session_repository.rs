//! Session persistence.
//!
//! Stores the session in the platform-specific config directory unless a
//! path is configured:
//! - Linux: ~/.config/harvest/session.json
//! - macOS: ~/Library/Application Support/harvest/session.json
//! - Windows: %APPDATA%/harvest/session.json

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use harvest_application::ports::{SessionRepository, SessionRepositoryError};
use harvest_domain::{ClientConfig, Session};
use tokio::fs;
use tracing::debug;

use crate::serialization::{decode_document, encode_document};

/// Session repository writing one JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionRepository {
    path: Option<PathBuf>,
}

impl FileSessionRepository {
    /// Creates a repository using the given file.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Creates a repository in the platform config directory.
    #[must_use]
    pub fn default_location() -> Self {
        Self {
            path: dirs::config_dir().map(|p| p.join("harvest").join("session.json")),
        }
    }

    /// Uses `session_file` from the configuration, or the default location.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        config
            .session_file
            .clone()
            .map_or_else(Self::default_location, Self::new)
    }

    /// Where the session is stored, if a location is available.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[async_trait]
impl SessionRepository for FileSessionRepository {
    async fn load(&self) -> Result<Session, SessionRepositoryError> {
        let Some(path) = &self.path else {
            return Ok(Session::empty());
        };

        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Session::empty()),
            Err(e) => return Err(e.into()),
        };
        let session: Session = decode_document(&content)
            .map_err(|e| SessionRepositoryError::Serialization(e.to_string()))?;
        Ok(session.normalized())
    }

    async fn save(&self, session: &Session) -> Result<(), SessionRepositoryError> {
        let Some(path) = &self.path else {
            return Err(SessionRepositoryError::NoLocation);
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = encode_document(session)
            .map_err(|e| SessionRepositoryError::Serialization(e.to_string()))?;
        fs::write(path, content).await?;
        restrict_permissions(path).await?;

        debug!(path = %path.display(), "session saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionRepositoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        match fs::remove_file(path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Credentials are readable by the owner only.
#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use harvest_domain::UserRecord;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn repository(dir: &TempDir) -> FileSessionRepository {
        FileSessionRepository::new(dir.path().join("nested").join("session.json"))
    }

    #[test]
    fn default_path_is_under_harvest_dir() {
        if let Some(path) = FileSessionRepository::default_location().path() {
            assert!(path.ends_with("harvest/session.json"));
        }
    }

    #[tokio::test]
    async fn missing_file_loads_empty_session() {
        let dir = TempDir::new().unwrap();
        let session = repository(&dir).load().await.unwrap();
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_restores_session() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir);
        let session = Session::new(
            "access".to_string(),
            Some("refresh".to_string()),
            Some(UserRecord::new(3, "ann")),
        );

        repo.save(&session).await.unwrap();

        assert_eq!(repo.load().await.unwrap(), session);
        let raw = std::fs::read_to_string(repo.path().unwrap()).unwrap();
        assert!(raw.ends_with('\n'));
    }

    #[tokio::test]
    async fn user_without_access_token_is_dropped_on_load() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir);
        let path = repo.path().unwrap().to_path_buf();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"access_token": null, "refresh_token": "r", "user": {"id": 1, "username": "x"}}"#,
        )
        .unwrap();

        let session = repo.load().await.unwrap();

        assert!(session.user().is_none());
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn clear_removes_file_and_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir);
        repo.save(&Session::new("a".to_string(), None, None))
            .await
            .unwrap();

        repo.clear().await.unwrap();
        repo.clear().await.unwrap();

        assert!(!repo.path().unwrap().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir);
        let path = repo.path().unwrap().to_path_buf();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            repo.load().await,
            Err(SessionRepositoryError::Serialization(_))
        ));
    }
}
