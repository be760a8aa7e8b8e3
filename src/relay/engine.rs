//! Relay Engine

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::closer::SessionCloser;
use super::dialer::{Dialer, TungsteniteDialer};
use super::frame::{FrameSink, FrameStream, FramedSocket};
use super::origin::{AllowAnyOrigin, OriginPolicy, OriginRequest};
use super::session::{RelaySession, SessionStats};
use crate::config::RelayConfig;
use crate::error::{Direction, RelayError};

/// Upgrade settings, built once at startup and never mutated
#[derive(Clone)]
pub struct UpgradeSettings {
    pub write_buffer_size: usize,
    pub max_message_size: Option<usize>,
    pub origin_policy: Arc<dyn OriginPolicy>,
}

impl Default for UpgradeSettings {
    fn default() -> Self {
        Self {
            write_buffer_size: 1024,
            max_message_size: None,
            origin_policy: Arc::new(AllowAnyOrigin),
        }
    }
}

impl fmt::Debug for UpgradeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeSettings")
            .field("write_buffer_size", &self.write_buffer_size)
            .field("max_message_size", &self.max_message_size)
            .field("origin_policy", &self.origin_policy)
            .finish()
    }
}

/// Pairs an upgraded browser WebSocket with a freshly dialed upstream one and
/// pumps frames between them until either side goes away.
pub struct ConnectionRelay {
    settings: UpgradeSettings,
    dialer: Arc<dyn Dialer>,
    upstream_scheme: String,
    upstream_path: String,
    idle_timeout: Option<Duration>,
    close_timeout: Duration,
}

impl ConnectionRelay {
    /// Create a relay dialing `ws://{target}/websocket`
    pub fn new(settings: UpgradeSettings, dialer: Arc<dyn Dialer>) -> Self {
        Self {
            settings,
            dialer,
            upstream_scheme: "ws".to_string(),
            upstream_path: "/websocket".to_string(),
            idle_timeout: None,
            close_timeout: Duration::from_secs(1),
        }
    }

    /// Create a relay from configuration
    pub fn from_config(config: &RelayConfig) -> Self {
        let settings = UpgradeSettings {
            write_buffer_size: config.write_buffer_size,
            max_message_size: config.max_message_size,
            origin_policy: config.origin_policy.build(),
        };
        let dialer = TungsteniteDialer::new(
            config.write_buffer_size,
            config.max_message_size,
            config.dial_timeout,
        );

        Self::new(settings, Arc::new(dialer))
            .with_endpoint(&config.upstream_scheme, &config.upstream_path)
            .with_timeouts(config.idle_timeout, config.close_timeout)
    }

    pub fn with_endpoint(mut self, scheme: &str, path: &str) -> Self {
        self.upstream_scheme = scheme.to_string();
        self.upstream_path = path.to_string();
        self
    }

    /// `idle` bounds each read (None waits forever); `close` bounds the final close handshake
    pub fn with_timeouts(mut self, idle: Option<Duration>, close: Duration) -> Self {
        self.idle_timeout = idle;
        self.close_timeout = close;
        self
    }

    pub fn settings(&self) -> &UpgradeSettings {
        &self.settings
    }

    /// Upstream endpoint for a `host[:port]` target
    pub fn upstream_url(&self, target: &str) -> String {
        format!("{}://{}{}", self.upstream_scheme, target, self.upstream_path)
    }

    /// Serve one `/ws` request: dial, check origin, upgrade, then relay.
    ///
    /// Nothing is dialed when `target` is missing, and nothing is upgraded when
    /// the dial fails. A dialed upstream that never gets paired is closed
    /// before returning.
    pub async fn handle(
        self: Arc<Self>,
        target: Option<&str>,
        origin: OriginRequest<'_>,
        upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    ) -> Response {
        let Some(target) = target.filter(|t| !t.is_empty()) else {
            return RelayError::MissingParameter("target").into_response();
        };

        let upstream_url = self.upstream_url(target);
        info!("Proxying WebSocket to: {}", upstream_url);

        let upstream = match self.dialer.dial(&upstream_url).await {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!("Error dialing target WebSocket server: {}", e);
                return e.into_response();
            }
        };

        if !self.settings.origin_policy.allows(&origin) {
            let err = RelayError::OriginRejected {
                origin: origin.origin.map(str::to_string),
            };
            warn!("Refusing upgrade: {}", err);
            close_quietly(upstream, self.close_timeout).await;
            return err.into_response();
        }

        let upgrade = match upgrade {
            Ok(upgrade) => upgrade,
            Err(rejection) => {
                error!("Error upgrading client WebSocket connection: {}", rejection);
                close_quietly(upstream, self.close_timeout).await;
                return rejection.into_response();
            }
        };

        // Without a configured limit neither messages nor frames are capped
        let max = self.settings.max_message_size.unwrap_or(usize::MAX);
        let upgrade = upgrade
            .write_buffer_size(self.settings.write_buffer_size)
            .max_message_size(max)
            .max_frame_size(max);

        let session = Arc::new(RelaySession::new(target, upstream_url));
        let relay = Arc::clone(&self);

        // If the protocol switch fails after the 101, the callback below is
        // dropped unrun, and the upstream it owns is closed with it.
        upgrade
            .on_failed_upgrade(|e: axum::Error| error!("Error upgrading client WebSocket connection: {}", e))
            .on_upgrade(move |socket| async move {
                relay
                    .run_session(session, FramedSocket::from_client(socket), upstream)
                    .await;
            })
    }

    /// Pump frames both ways until either direction stops.
    ///
    /// Client to upstream runs on a spawned task, upstream to client on the
    /// calling task. The spawned task is always joined before returning.
    pub async fn run_session(
        &self,
        session: Arc<RelaySession>,
        client: FramedSocket,
        upstream: FramedSocket,
    ) -> SessionStats {
        info!(
            "Starting relay session {} to {}",
            session.session_id, session.upstream_url
        );

        let closer = SessionCloser::new();
        let FramedSocket {
            sink: client_sink,
            stream: client_stream,
        } = client;
        let FramedSocket {
            sink: upstream_sink,
            stream: upstream_stream,
        } = upstream;

        let inbound = tokio::spawn(pump(
            client_stream,
            upstream_sink,
            Direction::ClientToUpstream,
            Arc::clone(&session),
            closer.clone(),
            self.idle_timeout,
            self.close_timeout,
        ));

        pump(
            upstream_stream,
            client_sink,
            Direction::UpstreamToClient,
            Arc::clone(&session),
            closer.clone(),
            self.idle_timeout,
            self.close_timeout,
        )
        .await;

        if let Err(e) = inbound.await {
            error!(
                "Relay session {} client loop failed: {}",
                session.session_id, e
            );
        }

        session.log_stats();
        session.to_stats()
    }
}

/// Outcome of moving a single frame
enum Step {
    Relayed(usize),
    SourceEnded,
    ReadFailed(RelayError),
    WriteFailed(RelayError),
}

/// Copy frames from `source` into `sink` until either fails or the session is
/// closed from the other direction, then close the session and `sink`.
async fn pump(
    mut source: FrameStream,
    mut sink: FrameSink,
    direction: Direction,
    session: Arc<RelaySession>,
    closer: SessionCloser,
    idle_timeout: Option<Duration>,
    close_timeout: Duration,
) {
    loop {
        tokio::select! {
            biased;
            _ = closer.closed() => {
                debug!("Session {} ({}) stopped by the other direction", session.session_id, direction);
                break;
            }
            step = forward_one(&mut source, &mut sink, direction, idle_timeout) => {
                match step {
                    Step::Relayed(len) => session.record(direction, len),
                    Step::SourceEnded => {
                        debug!("Session {} ({}) source ended", session.session_id, direction);
                        break;
                    }
                    Step::ReadFailed(e) => {
                        debug!("Session {} read ended: {}", session.session_id, e);
                        break;
                    }
                    Step::WriteFailed(e) => {
                        warn!("Session {} write error: {}", session.session_id, e);
                        break;
                    }
                }
            }
        }
    }

    closer.close();
    drop(source);

    match timeout(close_timeout, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Session {} ({}) close error: {}", session.session_id, direction, e),
        Err(_) => debug!("Session {} ({}) close timed out", session.session_id, direction),
    }
}

async fn forward_one(
    source: &mut FrameStream,
    sink: &mut FrameSink,
    direction: Direction,
    idle_timeout: Option<Duration>,
) -> Step {
    let next = match idle_timeout {
        Some(limit) => match timeout(limit, source.next()).await {
            Ok(next) => next,
            Err(_) => {
                return Step::ReadFailed(RelayError::Transport {
                    direction,
                    source: format!("no message for {:?}", limit).into(),
                })
            }
        },
        None => source.next().await,
    };

    let frame = match next {
        None => return Step::SourceEnded,
        Some(Err(e)) => return Step::ReadFailed(RelayError::Transport { direction, source: e }),
        Some(Ok(frame)) => frame,
    };

    let len = frame.len();
    match sink.send(frame).await {
        Ok(()) => Step::Relayed(len),
        Err(e) => Step::WriteFailed(RelayError::Transport { direction, source: e }),
    }
}

/// Release a socket that will never be paired with a session
async fn close_quietly(socket: FramedSocket, close_timeout: Duration) {
    let FramedSocket { mut sink, stream } = socket;
    drop(stream);
    if let Ok(Err(e)) = timeout(close_timeout, sink.close()).await {
        debug!("Error closing unpaired upstream: {}", e);
    }
}
