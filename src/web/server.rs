//! Relay HTTP Server

use super::{handlers::AppState, routes::RelayRoutes};
use crate::Result;
use anyhow::Context;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// HTTP server hosting the page and both relays
pub struct RelayServer {
    bind_addr: SocketAddr,
    app_state: AppState,
}

impl RelayServer {
    /// Create a new relay server
    pub fn new(bind_addr: SocketAddr, app_state: AppState) -> Self {
        Self {
            bind_addr,
            app_state,
        }
    }

    /// Bind the listener without serving yet
    pub async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind relay server to {}", self.bind_addr))?;

        info!("Relay server listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Serve on `listener` until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.create_router();

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("Relay server error: {}", e);
            return Err(e.into());
        }

        info!("Relay server stopped accepting connections");
        Ok(())
    }

    /// Bind and serve
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    pub fn create_router(&self) -> Router {
        RelayRoutes::create_router(self.app_state.clone())
    }
}
