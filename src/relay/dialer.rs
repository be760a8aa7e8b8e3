//! Outbound WebSocket Dialing

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::debug;

use super::frame::FramedSocket;
use crate::error::RelayError;

/// Opens the outbound side of a relay session
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, url: &str) -> Result<FramedSocket, RelayError>;
}

/// Dials real WebSocket servers with tokio-tungstenite
#[derive(Debug, Clone)]
pub struct TungsteniteDialer {
    config: WebSocketConfig,
    dial_timeout: Option<Duration>,
}

impl TungsteniteDialer {
    pub fn new(write_buffer_size: usize, max_message_size: Option<usize>, dial_timeout: Option<Duration>) -> Self {
        let mut config = WebSocketConfig::default();
        config.write_buffer_size = write_buffer_size;
        // One limit for both; `None` lifts them entirely
        config.max_message_size = max_message_size;
        config.max_frame_size = max_message_size;

        Self {
            config,
            dial_timeout,
        }
    }
}

#[async_trait]
impl Dialer for TungsteniteDialer {
    async fn dial(&self, url: &str) -> Result<FramedSocket, RelayError> {
        let connect = connect_async_with_config(url, Some(self.config), false);

        let result = match self.dial_timeout {
            Some(limit) => timeout(limit, connect).await.map_err(|_| RelayError::DialFailed {
                url: url.to_string(),
                source: format!("timed out after {:?}", limit).into(),
            })?,
            None => connect.await,
        };

        let (socket, response) = result.map_err(|e| RelayError::DialFailed {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        debug!("Upstream {} accepted handshake with status {}", url, response.status());
        Ok(FramedSocket::from_upstream(socket))
    }
}
