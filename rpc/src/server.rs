//! Axum-based RPC server.

use crate::error::RpcError;
use crate::handlers;
use agora_governance::Governor;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Header carrying the calling principal.
pub const CALLER_HEADER: &str = "x-agora-caller";

/// State shared by every handler.
pub struct RpcState {
    pub governor: Arc<Governor>,
    /// Registry rendered at `/metrics`; `None` disables the endpoint.
    pub metrics: Option<prometheus::Registry>,
}

pub struct RpcServer {
    addr: SocketAddr,
    state: Arc<RpcState>,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, state: RpcState) -> Self {
        Self {
            addr,
            state: Arc::new(state),
        }
    }

    /// Build the router with all handlers.
    pub fn router(state: Arc<RpcState>) -> Router {
        Router::new()
            .route(
                "/proposals",
                post(handlers::create_proposal).get(handlers::list_proposals),
            )
            .route("/proposals/:id", get(handlers::get_proposal))
            .route("/proposals/:id/votes", post(handlers::cast_vote))
            .route("/proposals/:id/cancel", post(handlers::cancel_proposal))
            .route("/proposals/:id/execute", post(handlers::execute_proposal))
            .route(
                "/params",
                get(handlers::get_params).post(handlers::update_params),
            )
            .route("/past-votes/:principal", get(handlers::past_votes))
            .route("/past-total-supply", get(handlers::past_total_supply))
            .route("/checkpoints/refresh", post(handlers::refresh_checkpoints))
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {}: {e}", self.addr)))?;
        info!(addr = %self.addr, "RPC server listening");

        axum::serve(listener, Self::router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        info!("RPC server stopped");
        Ok(())
    }
}
