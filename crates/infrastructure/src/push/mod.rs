//! Push channel adapters.

mod websocket;

pub use websocket::WebSocketPushSource;
