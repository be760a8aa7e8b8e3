//! Toolshop Relay Library
//!
//! Local developer relay serving a single page and forwarding its WebSocket
//! and schema requests to servers the browser cannot reach directly.

pub mod assets;
pub mod browser;
pub mod config;
pub mod error;
pub mod fetch;
pub mod relay;
pub mod shutdown;
pub mod web;

pub use config::Config;
pub use error::RelayError;
pub use relay::ConnectionRelay;
pub use shutdown::ShutdownCoordinator;
pub use web::{AppState, RelayServer};

/// Common error type for the relay
pub type Result<T> = anyhow::Result<T>;
