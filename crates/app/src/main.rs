//! Harvest Watch - Live job monitor
//!
//! Restores the persisted session (or signs in with `HARVEST_USERNAME` and
//! `HARVEST_PASSWORD`), then prints every job state change until Ctrl-C or
//! until the session ends.

use std::sync::Arc;

use harvest_application::{
    AuthService, HarvestClient, Interest, JobSyncConfig, JobSyncEvent, SessionStore,
};
use harvest_domain::UserRecord;
use harvest_infrastructure::{
    FileSessionRepository, ReqwestTransport, WebSocketPushSource, load_config, logging,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init()?;

    let config = load_config().await?;
    let repository = Arc::new(FileSessionRepository::from_config(&config));
    let session = Arc::new(SessionStore::load(repository).await);
    let transport = Arc::new(ReqwestTransport::new(&config)?);
    let client = HarvestClient::new(transport, session);

    let auth = client.auth();
    let user = match auth.restore().await? {
        Some(user) => user,
        None => sign_in(&auth).await?,
    };
    info!(user = %user.username, api = %config.api_base, "watching jobs");

    let push = Arc::new(WebSocketPushSource::from_config(&config));
    let sync = client.sync_jobs(push, JobSyncConfig::from(&config), Interest::all());
    let mut events = sync.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, closing");
                sync.close().await;
                break;
            }
            event = events.recv() => match event {
                Ok(JobSyncEvent::JobUpdated(record)) => {
                    println!(
                        "{:<24} {:<10} seq={:<4} {}",
                        record.id, record.status, record.sequence, record.url
                    );
                }
                Ok(JobSyncEvent::ConnectionChanged(state)) => info!(?state, "push connection"),
                Ok(JobSyncEvent::Stopped(reason)) => {
                    info!(?reason, "job sync stopped");
                    break;
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "output fell behind"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

async fn sign_in(auth: &AuthService) -> Result<UserRecord, Box<dyn std::error::Error>> {
    let (Ok(username), Ok(password)) = (
        std::env::var("HARVEST_USERNAME"),
        std::env::var("HARVEST_PASSWORD"),
    ) else {
        return Err("not signed in: set HARVEST_USERNAME and HARVEST_PASSWORD".into());
    };
    Ok(auth.login(&username, &password).await?)
}
