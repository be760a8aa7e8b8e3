//! Web Module
//!
//! Routes `/`, `/ws` and `/proxy-schema` to the page store and the two relays.

pub mod handlers;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use routes::RelayRoutes;
pub use server::RelayServer;
