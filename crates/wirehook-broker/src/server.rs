//! Broker assembly: shared state, router, startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{AcceptNonEmpty, TokenPolicy};
use crate::config::BrokerConfig;
use crate::gateway;
use crate::ingest;
use crate::registry::{ConnectionIdAllocator, ConnectionRegistry};

/// Shared state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BrokerConfig>,
    pub registry: Arc<ConnectionRegistry>,
    pub ids: Arc<ConnectionIdAllocator>,
    pub token_policy: Arc<dyn TokenPolicy>,
}

impl AppState {
    /// State for one broker instance with the default token policy.
    #[must_use]
    pub fn new(config: BrokerConfig) -> Self {
        let ids = ConnectionIdAllocator::new(config.id_prefix.clone());
        Self {
            config: Arc::new(config),
            registry: Arc::new(ConnectionRegistry::new()),
            ids: Arc::new(ids),
            token_policy: Arc::new(AcceptNonEmpty),
        }
    }

    /// Replace the token policy.
    #[must_use]
    pub fn with_token_policy(mut self, policy: impl TokenPolicy) -> Self {
        self.token_policy = Arc::new(policy);
        self
    }
}

/// Build the Axum router with all broker routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/gateway", get(gateway::gateway_handler))
        .route("/relay/{connection_id}", post(ingest::ingest_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// `GET /health` — liveness only: unconditional 200, empty body.
async fn health_handler() -> StatusCode {
    StatusCode::OK
}

/// Start a broker. Returns a handle carrying the bound address and the
/// shutdown trigger.
pub async fn start(config: BrokerConfig) -> std::io::Result<BrokerHandle> {
    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config);
    let registry = Arc::clone(&state.registry);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let addr = listener.local_addr()?;

    let shutdown = CancellationToken::new();
    let serve_token = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { serve_token.cancelled().await })
            .await
            .ok();
    });

    info!(addr = %addr, "relay broker listening");

    Ok(BrokerHandle {
        addr,
        registry,
        shutdown,
        server,
    })
}

/// Handle to a running broker.
pub struct BrokerHandle {
    addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    shutdown: CancellationToken,
    server: tokio::task::JoinHandle<()>,
}

impl BrokerHandle {
    /// The bound address (useful when started on port 0).
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The bound port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// The broker's connection registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Stop the broker. Open gateway connections are dropped rather than
    /// drained; the clients' reconnect loops are the recovery path.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.server.abort();
        let _ = self.server.await;
    }
}
