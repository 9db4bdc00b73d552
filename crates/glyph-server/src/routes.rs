//! HTTP routes for the gateway

use std::time::Instant;

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, Method},
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{Result, ServerError};
use crate::metrics;
use crate::state::SharedState;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Health check endpoint
async fn health() -> &'static str {
    "OK"
}

/// Prometheus exposition, when a recorder is installed
async fn metrics_endpoint(State(state): State<SharedState>) -> Result<String> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(ServerError::MetricsDisabled)
}

/// Render one token's metadata as text
async fn token(
    State(state): State<SharedState>,
    Path((chain_id, token_id)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse> {
    let start = Instant::now();
    let result = state
        .render_token(&chain_id, &token_id, query.as_deref())
        .await;

    let outcome = match &result {
        Ok(_) => metrics::OUTCOME_OK,
        Err(ServerError::InvalidRequest(_) | ServerError::NoSource { .. }) => {
            metrics::OUTCOME_CLIENT_ERROR
        }
        Err(_) => metrics::OUTCOME_SERVER_ERROR,
    };
    metrics::record_token_request(outcome, start.elapsed());

    match result {
        Ok(body) => Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], body)),
        Err(e) => {
            tracing::warn!(
                chain_id = %chain_id,
                token_id = %token_id,
                error = %e,
                "Token request failed"
            );
            Err(e)
        }
    }
}

/// Anything that is not `/CHAIN_ID/TOKEN_ID`
async fn invalid_path() -> ServerError {
    ServerError::InvalidPath
}

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/{chain_id}/{token_id}", get(token))
        .fallback(invalid_path)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
