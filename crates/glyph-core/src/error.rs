//! Error types for glyph-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to decode base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid chain ID: {0}")]
    InvalidChainId(String),

    #[error("Invalid token ID: {0}")]
    InvalidTokenId(String),

    #[error("CONTRACT_ADDRESS_{chain} is required when RPC_URL_{chain} is set")]
    MissingContractAddress { chain: String },

    #[error("either RPC_URL_<CHAIN_ID> and CONTRACT_ADDRESS_<CHAIN_ID> pairs, or RPC_URL and CONTRACT_ADDRESS are required")]
    NoSourcesConfigured,

    #[error("Invalid listen address: {0}")]
    InvalidListenAddr(String),

    #[error("Failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}
