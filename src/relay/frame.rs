//! Relayed Frames
//!
//! Both WebSocket stacks (axum for the browser side, tokio-tungstenite for the
//! remote side) are adapted to the same pair of frame halves so the pump loops
//! never see transport-specific message types.

use std::fmt;
use std::pin::Pin;

use axum::extract::ws::{Message as ClientMessage, WebSocket};
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::BoxError;

/// Outbound WebSocket as returned by tokio-tungstenite
pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reading half of a relayed connection
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, BoxError>> + Send>>;

/// Writing half of a relayed connection
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = BoxError> + Send>>;

/// A data message passed through unmodified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Payload length in bytes
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The peer sent a close frame
#[derive(Debug)]
pub struct PeerClosed;

impl fmt::Display for PeerClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("peer sent close frame")
    }
}

impl std::error::Error for PeerClosed {}

/// One side of a relay session, already split into halves
pub struct FramedSocket {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl FramedSocket {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }

    /// Adapt the upgraded browser connection
    pub fn from_client(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();

        let sink = sink
            .sink_map_err(|e| -> BoxError { Box::new(e) })
            .with(|frame: Frame| {
                future::ready(Ok::<_, BoxError>(match frame {
                    Frame::Text(text) => ClientMessage::Text(text),
                    Frame::Binary(data) => ClientMessage::Binary(data),
                }))
            });

        let stream = stream.filter_map(|message| {
            future::ready(match message {
                Ok(ClientMessage::Text(text)) => Some(Ok(Frame::Text(text))),
                Ok(ClientMessage::Binary(data)) => Some(Ok(Frame::Binary(data))),
                Ok(ClientMessage::Ping(_)) | Ok(ClientMessage::Pong(_)) => None,
                Ok(ClientMessage::Close(_)) => Some(Err(Box::new(PeerClosed) as BoxError)),
                Err(e) => Some(Err(Box::new(e) as BoxError)),
            })
        });

        Self::new(Box::pin(sink), Box::pin(stream))
    }

    /// Adapt the dialed remote connection
    pub fn from_upstream(socket: UpstreamSocket) -> Self {
        let (sink, stream) = socket.split();

        let sink = sink
            .sink_map_err(|e| -> BoxError { Box::new(e) })
            .with(|frame: Frame| {
                future::ready(Ok::<_, BoxError>(match frame {
                    Frame::Text(text) => UpstreamMessage::Text(text),
                    Frame::Binary(data) => UpstreamMessage::Binary(data),
                }))
            });

        let stream = stream.filter_map(|message| {
            future::ready(match message {
                Ok(UpstreamMessage::Text(text)) => Some(Ok(Frame::Text(text))),
                Ok(UpstreamMessage::Binary(data)) => Some(Ok(Frame::Binary(data))),
                Ok(UpstreamMessage::Ping(_))
                | Ok(UpstreamMessage::Pong(_))
                | Ok(UpstreamMessage::Frame(_)) => None,
                Ok(UpstreamMessage::Close(_)) => Some(Err(Box::new(PeerClosed) as BoxError)),
                Err(e) => Some(Err(Box::new(e) as BoxError)),
            })
        });

        Self::new(Box::pin(sink), Box::pin(stream))
    }
}

impl fmt::Debug for FramedSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramedSocket").finish_non_exhaustive()
    }
}
