//! Push channel port

use async_trait::async_trait;
use futures::stream::BoxStream;
use harvest_domain::PushMessage;

use crate::error::SyncError;

/// Stream of messages from one push connection.
///
/// The stream ends (or yields an error) when the connection drops.
pub type PushStream = BoxStream<'static, Result<PushMessage, SyncError>>;

/// Port for opening the server's job event stream.
#[async_trait]
pub trait PushSource: Send + Sync {
    /// Opens a new subscription, authorised with the given credential.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Connect` if the connection cannot be opened.
    async fn connect(&self, access_token: Option<String>) -> Result<PushStream, SyncError>;
}
