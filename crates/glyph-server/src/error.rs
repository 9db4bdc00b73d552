//! Server error types

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use glyph_core::ChainId;
use thiserror::Error;

/// Failure talking to one upstream source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to connect to RPC {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("invalid contract address: {0}")]
    InvalidAddress(String),

    #[error("{method} failed: {reason}")]
    Rpc { method: &'static str, reason: String },

    #[error("failed to decode tokenURI result: {0}")]
    Abi(String),

    #[error("invalid token ID: {0}")]
    InvalidTokenId(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    Status(u16),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("source is closed")]
    Closed,

    #[error("invalid metadata: {0}")]
    Metadata(#[from] glyph_core::Error),
}

/// Failure resolving a chain id to a source
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("no RPC server configured for chain ID {chain_id}")]
    NotFound { chain_id: ChainId },

    #[error("failed to get chain ID from source registered under {key}: {source}")]
    ProbeFailure { key: ChainId, source: SourceError },

    #[error("legacy source reported the reserved chain ID 0")]
    SentinelChainId,

    #[error("chain ID {0} is configured more than once")]
    DuplicateChain(ChainId),

    #[error("source configured for chain ID {key} reports chain ID {reported}")]
    ChainMismatch { key: ChainId, reported: ChainId },

    #[error("failed to create source for chain {chain_id}: {source}")]
    Source { chain_id: ChainId, source: SourceError },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid path. Expected format: /CHAIN_ID/TOKEN_ID")]
    InvalidPath,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Failed to get RPC service for chain ID {chain_id}: {source}")]
    NoSource {
        chain_id: ChainId,
        source: RegistryError,
    },

    #[error("Failed to fetch metadata: {0}")]
    Metadata(SourceError),

    #[error("Metrics recorder not installed")]
    MetricsDisabled,

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Config error: {0}")]
    Config(#[from] glyph_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::InvalidPath => StatusCode::BAD_REQUEST,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NoSource { .. } => StatusCode::BAD_REQUEST,
            ServerError::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::MetricsDisabled => StatusCode::NOT_FOUND,
            ServerError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
