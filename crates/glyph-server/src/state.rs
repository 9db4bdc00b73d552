//! Server state: the source registry and the metrics handle

use std::sync::Arc;

use glyph_core::{format_metadata, parse_chain_id, parse_token_id, Palette};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::error::{Result, ServerError};
use crate::registry::SourceRegistry;

pub struct AppState {
    pub registry: SourceRegistry,
    /// Set when a Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(registry: SourceRegistry) -> Self {
        Self {
            registry,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Look up a token and format it as plain text
    ///
    /// `chain_id` and `token_id` are the raw path segments; `raw_query` is
    /// the undecoded query string carrying the palette.
    pub async fn render_token(
        &self,
        chain_id: &str,
        token_id: &str,
        raw_query: Option<&str>,
    ) -> Result<String> {
        let chain_id = parse_chain_id(chain_id)
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
        let token_id = parse_token_id(token_id)
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let source = self
            .registry
            .resolve(chain_id)
            .await
            .map_err(|source| ServerError::NoSource { chain_id, source })?;

        let metadata = source
            .token_metadata(&token_id)
            .await
            .map_err(ServerError::Metadata)?;

        let palette = Palette::from_query(raw_query);
        Ok(format_metadata(&metadata, chain_id, &token_id, &palette))
    }
}

/// Shared server state type
pub type SharedState = Arc<AppState>;

pub fn create_shared_state(registry: SourceRegistry) -> SharedState {
    Arc::new(AppState::new(registry))
}
