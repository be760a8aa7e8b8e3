//! Relay Routes

use super::handlers::*;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// HTTP surface of the relay
pub struct RelayRoutes;

impl RelayRoutes {
    /// Create the router
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/", get(serve_index))
            .route("/ws", get(ws_proxy))
            .route("/proxy-schema", get(schema_proxy))
            .fallback(not_found)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
