//! Gateway server implementation

use std::net::SocketAddr;

use glyph_core::GatewayConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;

use crate::error::{Result, ServerError};
use crate::registry::SourceRegistry;
use crate::routes::create_router;
use crate::state::{AppState, SharedState};

/// HTTP gateway in front of the configured chains
pub struct GatewayServer {
    state: SharedState,
    addr: SocketAddr,
}

impl GatewayServer {
    /// Serve until ctrl-c, then release every source
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.run_with_listener(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn run_with_listener<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        self.log_startup(addr).await;

        let router = create_router(self.state.clone());
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        self.state.registry.shutdown().await;
        served
    }

    async fn log_startup(&self, addr: SocketAddr) {
        let chain_ids = self.state.registry.chain_ids().await;
        tracing::info!("Starting NFT glyph gateway on {}", addr);
        for chain_id in &chain_ids {
            tracing::info!(chain_id, "Serving chain");
        }
        if let Some(chain_id) = chain_ids.first() {
            tracing::info!(
                "Example: http://localhost:{}/{}/1?c0=%20&c1=%E2%96%91",
                addr.port(),
                chain_id
            );
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the server state for testing
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Builder for GatewayServer
pub struct ServerBuilder {
    config: GatewayConfig,
    addr: Option<SocketAddr>,
    registry: Option<SourceRegistry>,
    metrics: Option<PrometheusHandle>,
}

impl ServerBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            addr: None,
            registry: None,
            metrics: None,
        }
    }

    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.addr = Some(([0, 0, 0, 0], port).into());
        self
    }

    /// Use a prepared registry instead of connecting the configured sources
    pub fn registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub async fn build(self) -> Result<GatewayServer> {
        let addr = match self.addr {
            Some(addr) => addr,
            None => self.config.listen_addr()?,
        };

        let registry = match self.registry {
            Some(registry) => registry,
            None => SourceRegistry::from_config(&self.config).await?,
        };

        let mut state = AppState::new(registry);
        if let Some(handle) = self.metrics {
            state = state.with_metrics(handle);
        }

        Ok(GatewayServer {
            state: std::sync::Arc::new(state),
            addr,
        })
    }
}
