//! Relay Errors
//!
//! Every failure the relays can hit, and how each one surfaces over HTTP.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Boxed error used for transport failures from either WebSocket stack.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Direction a frame travels through a relay session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Browser (inbound) to remote server (outbound)
    ClientToUpstream,
    /// Remote server (outbound) to browser (inbound)
    UpstreamToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToUpstream => f.write_str("client -> upstream"),
            Direction::UpstreamToClient => f.write_str("upstream -> client"),
        }
    }
}

/// Errors raised while serving or relaying a request
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required query parameter was absent or empty
    #[error("Missing '{0}' query parameter")]
    MissingParameter(&'static str),

    /// The outbound WebSocket could not be established
    #[error("could not connect to {url}: {source}")]
    DialFailed {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The outbound GET failed before a response arrived
    #[error("could not fetch {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The upgrade request came from an origin the policy refuses
    #[error("origin {origin:?} is not allowed to open a relay session")]
    OriginRejected { origin: Option<String> },

    /// A read or write failed mid-session
    #[error("transport error ({direction}): {source}")]
    Transport {
        direction: Direction,
        #[source]
        source: BoxError,
    },

    /// The override page exists but could not be read
    #[error("could not read page asset: {0}")]
    Asset(#[source] std::io::Error),
}

impl RelayError {
    /// Status code reported to the inbound client
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            RelayError::DialFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::FetchFailed { .. } => StatusCode::BAD_GATEWAY,
            RelayError::OriginRejected { .. } => StatusCode::FORBIDDEN,
            RelayError::Transport { .. } | RelayError::Asset(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short plain-text body; details stay in the log
    fn public_message(&self) -> String {
        match self {
            RelayError::MissingParameter(_) => self.to_string(),
            RelayError::DialFailed { .. } => "Could not connect to target server".to_string(),
            RelayError::FetchFailed { .. } => "Failed to fetch from target".to_string(),
            RelayError::OriginRejected { .. } => "Forbidden".to_string(),
            RelayError::Transport { .. } => "Internal Server Error".to_string(),
            RelayError::Asset(_) => "Internal Server Error: page asset unavailable.".to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        if let RelayError::Asset(ref e) = self {
            error!("Could not serve page asset: {}", e);
        }
        (self.status_code(), self.public_message()).into_response()
    }
}
