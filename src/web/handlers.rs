//! Request Handlers

use crate::assets::AssetStore;
use crate::config::Config;
use crate::fetch::RequestRelay;
use crate::relay::{ConnectionRelay, OriginRequest};
use crate::Result;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        Query, State,
    },
    http::{
        header::{HOST, ORIGIN},
        HeaderMap, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub connection_relay: Arc<ConnectionRelay>,
    pub request_relay: Arc<RequestRelay>,
    pub assets: Arc<AssetStore>,
}

impl AppState {
    pub fn new(
        connection_relay: ConnectionRelay,
        request_relay: RequestRelay,
        assets: AssetStore,
    ) -> Self {
        Self {
            connection_relay: Arc::new(connection_relay),
            request_relay: Arc::new(request_relay),
            assets: Arc::new(assets),
        }
    }

    /// Build every component from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            ConnectionRelay::from_config(&config.relay),
            RequestRelay::new(&config.fetch)?,
            AssetStore::from_config(&config.assets),
        ))
    }
}

/// Query parameters for `/ws`
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub target: Option<String>,
}

/// Query parameters for `/proxy-schema`
#[derive(Debug, Deserialize)]
pub struct SchemaQuery {
    pub url: Option<String>,
}

/// Serve the page at `/`
pub async fn serve_index(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    match state.assets.lookup(uri.path()).await {
        Ok(Some(asset)) => asset.into_response_for(&headers),
        Ok(None) => not_found().await.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Relay a WebSocket to `target`
pub async fn ws_proxy(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    upgrade: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let origin = OriginRequest {
        origin: headers.get(ORIGIN).and_then(|v| v.to_str().ok()),
        host: headers.get(HOST).and_then(|v| v.to_str().ok()),
    };

    Arc::clone(&state.connection_relay)
        .handle(query.target.as_deref(), origin, upgrade)
        .await
}

/// Relay a GET to `url`
pub async fn schema_proxy(
    State(state): State<AppState>,
    Query(query): Query<SchemaQuery>,
) -> Response {
    state.request_relay.forward(query.url.as_deref()).await
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 page not found")
}
