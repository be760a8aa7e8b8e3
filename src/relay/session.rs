//! Relay Session

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Direction;

/// Represents an active relay session
#[derive(Debug)]
pub struct RelaySession {
    pub session_id: String,
    pub target: String,
    pub upstream_url: String,
    pub start_time: Instant,
    pub messages_up: AtomicU64,
    pub messages_down: AtomicU64,
    pub bytes_up: AtomicU64,
    pub bytes_down: AtomicU64,
}

/// Statistics for a completed session
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub session_id: String,
    pub target: String,
    pub upstream_url: String,
    pub start_time: SystemTime,
    pub duration_ms: u64,
    pub messages_up: u64,
    pub messages_down: u64,
    pub bytes_up: u64,
    pub bytes_down: u64,
}

impl RelaySession {
    /// Create a new relay session
    pub fn new(target: impl Into<String>, upstream_url: impl Into<String>) -> Self {
        let session = Self {
            session_id: Uuid::new_v4().to_string(),
            target: target.into(),
            upstream_url: upstream_url.into(),
            start_time: Instant::now(),
            messages_up: AtomicU64::new(0),
            messages_down: AtomicU64::new(0),
            bytes_up: AtomicU64::new(0),
            bytes_down: AtomicU64::new(0),
        };
        debug!("Creating new relay session: {} -> {}", session.session_id, session.upstream_url);
        session
    }

    /// Count one relayed frame of `len` payload bytes
    pub fn record(&self, direction: Direction, len: usize) {
        let (messages, bytes) = match direction {
            Direction::ClientToUpstream => (&self.messages_up, &self.bytes_up),
            Direction::UpstreamToClient => (&self.messages_down, &self.bytes_down),
        };
        messages.fetch_add(1, Ordering::Relaxed);
        bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn messages_up(&self) -> u64 {
        self.messages_up.load(Ordering::Relaxed)
    }

    pub fn messages_down(&self) -> u64 {
        self.messages_down.load(Ordering::Relaxed)
    }

    pub fn bytes_up(&self) -> u64 {
        self.bytes_up.load(Ordering::Relaxed)
    }

    pub fn bytes_down(&self) -> u64 {
        self.bytes_down.load(Ordering::Relaxed)
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Generate session statistics
    pub fn to_stats(&self) -> SessionStats {
        let duration = self.duration();

        SessionStats {
            session_id: self.session_id.clone(),
            target: self.target.clone(),
            upstream_url: self.upstream_url.clone(),
            start_time: SystemTime::now() - duration,
            duration_ms: duration.as_millis() as u64,
            messages_up: self.messages_up(),
            messages_down: self.messages_down(),
            bytes_up: self.bytes_up(),
            bytes_down: self.bytes_down(),
        }
    }

    /// Log session statistics
    pub fn log_stats(&self) {
        info!(
            session_id = %self.session_id,
            target = %self.target,
            duration_ms = self.duration().as_millis() as u64,
            messages_up = self.messages_up(),
            messages_down = self.messages_down(),
            bytes_up = self.bytes_up(),
            bytes_down = self.bytes_down(),
            "Relay session closed"
        );
    }
}
