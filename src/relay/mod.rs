//! Connection Relay Module
//!
//! Relays WebSocket frames between the browser and a remote server.

pub mod closer;
pub mod dialer;
pub mod engine;
pub mod frame;
pub mod origin;
pub mod session;

pub use closer::SessionCloser;
pub use dialer::{Dialer, TungsteniteDialer};
pub use engine::{ConnectionRelay, UpgradeSettings};
pub use frame::{Frame, FramedSocket};
pub use origin::{AllowAnyOrigin, AllowListedOrigins, OriginPolicy, OriginRequest, SameHostOrigin};
pub use session::{RelaySession, SessionStats};
