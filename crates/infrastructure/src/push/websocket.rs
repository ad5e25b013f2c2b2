//! Job event stream over a websocket.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use harvest_application::SyncError;
use harvest_application::ports::{PushSource, PushStream};
use harvest_domain::{ClientConfig, PushMessage};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, warn};

/// Opens the server's job event stream with tokio-tungstenite.
///
/// Text frames are decoded as [`PushMessage`]; frames that do not decode
/// are logged and skipped. Pings are answered by the websocket layer
/// while the stream is read.
#[derive(Debug, Clone)]
pub struct WebSocketPushSource {
    url: String,
    connect_timeout: Duration,
}

impl WebSocketPushSource {
    /// Creates a source for the given `ws://` or `wss://` URL.
    #[must_use]
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
        }
    }

    /// Creates a source from the client configuration.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.ws_url.clone(), config.request_timeout())
    }
}

#[async_trait]
impl PushSource for WebSocketPushSource {
    async fn connect(&self, access_token: Option<String>) -> Result<PushStream, SyncError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| SyncError::Connect(e.to_string()))?;
        if let Some(token) = access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| SyncError::Connect(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (socket, response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| SyncError::Connect(format!("timed out connecting to {}", self.url)))?
            .map_err(|e| SyncError::Connect(e.to_string()))?;
        debug!(url = %self.url, status = response.status().as_u16(), "push socket open");

        let stream = socket.filter_map(|frame| async move { decode(frame) });
        Ok(Box::pin(stream))
    }
}

fn decode(frame: Result<Message, WsError>) -> Option<Result<PushMessage, SyncError>> {
    match frame {
        Ok(Message::Text(text)) => match serde_json::from_str::<PushMessage>(text.as_str()) {
            Ok(message) => Some(Ok(message)),
            Err(e) => {
                warn!(error = %e, "skipping malformed push message");
                None
            }
        },
        Ok(Message::Close(frame)) => {
            debug!(?frame, "push socket closed by server");
            None
        }
        Ok(_) => None,
        Err(e) => Some(Err(SyncError::Dropped(e.to_string()))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use harvest_domain::{JobId, JobStatus, JobUpdate};
    use pretty_assertions::assert_eq;

    #[test]
    fn text_frames_decode_to_messages() {
        let frame = Message::Text(
            r#"{"type": "job_updated", "id": "J1", "status": "running", "sequence": 2}"#
                .to_string()
                .into(),
        );
        assert_eq!(
            decode(Ok(frame)),
            Some(Ok(PushMessage::JobUpdated(JobUpdate {
                id: JobId::from("J1"),
                status: JobStatus::Running,
                sequence: 2,
            })))
        );
    }

    #[test]
    fn malformed_and_control_frames_are_skipped() {
        assert_eq!(decode(Ok(Message::Text("not json".to_string().into()))), None);
        assert_eq!(decode(Ok(Message::Ping(Vec::new().into()))), None);
        assert_eq!(decode(Ok(Message::Close(None))), None);
    }

    #[test]
    fn socket_errors_end_the_stream() {
        let decoded = decode(Err(WsError::ConnectionClosed));
        assert!(matches!(decoded, Some(Err(SyncError::Dropped(_)))));
    }

    #[tokio::test]
    async fn unreachable_server_fails_to_connect() {
        let source = WebSocketPushSource::new("ws://127.0.0.1:9/ws/", Duration::from_secs(2));
        let result = source.connect(Some("token".to_string())).await;
        assert!(matches!(result, Err(SyncError::Connect(_))));
    }

    #[tokio::test]
    async fn invalid_url_fails_to_connect() {
        let source = WebSocketPushSource::new("not a url", Duration::from_secs(1));
        assert!(matches!(
            source.connect(None).await,
            Err(SyncError::Connect(_))
        ));
    }
}
