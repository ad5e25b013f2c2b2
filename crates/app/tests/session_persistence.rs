//! Session persistence across client restarts.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use async_trait::async_trait;
use harvest_application::HarvestClient;
use harvest_application::SessionStore;
use harvest_application::ports::{
    HttpTransport, TransportError, TransportRequest, TransportResponse,
};
use harvest_infrastructure::FileSessionRepository;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;

struct AuthServer;

#[async_trait]
impl HttpTransport for AuthServer {
    async fn execute(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let response = match request.path.as_str() {
            "/api/auth/login/" => {
                TransportResponse::json(200, &json!({"access": "a-1", "refresh": "r-1"}))
            }
            "/api/auth/me/" if request.header("authorization") == Some("Bearer a-1") => {
                TransportResponse::json(200, &json!({"id": 1, "username": "ann"}))
            }
            _ => TransportResponse::json(401, &json!({"detail": "unauthorized"})),
        };
        Ok(response)
    }
}

#[tokio::test]
async fn login_survives_restart_and_sign_out_forgets_it() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("harvest").join("session.json");
    let repository = Arc::new(FileSessionRepository::new(path.clone()));

    let first = HarvestClient::new(
        Arc::new(AuthServer),
        Arc::new(SessionStore::load(repository.clone()).await),
    );
    first.auth().login("ann", "secret").await.unwrap();
    assert!(path.exists());

    let second = HarvestClient::new(
        Arc::new(AuthServer),
        Arc::new(SessionStore::load(repository.clone()).await),
    );
    assert_eq!(second.session().access_token().await.as_deref(), Some("a-1"));
    let restored = second.auth().restore().await.unwrap().unwrap();
    assert_eq!(restored.username, "ann");

    second.auth().sign_out().await;
    assert!(!path.exists());

    let third = SessionStore::load(repository).await;
    assert!(!third.is_authenticated().await);
}

#[tokio::test]
async fn rejected_session_is_removed_from_disk() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("session.json");
    std::fs::write(
        &path,
        r#"{"access_token": "stale", "refresh_token": "gone", "user": null}"#,
    )
    .unwrap();
    let repository = Arc::new(FileSessionRepository::new(path.clone()));

    let client = HarvestClient::new(
        Arc::new(AuthServer),
        Arc::new(SessionStore::load(repository).await),
    );

    assert!(client.auth().restore().await.unwrap().is_none());
    assert!(!path.exists());
}
