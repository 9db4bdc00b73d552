//! Upstream sources: something that knows its chain id and can look up tokens

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use glyph_core::{ChainId, MetadataUri, SourceConfig, TokenMetadata};
use reqwest::StatusCode;

use crate::error::SourceError;
use crate::rpc::Erc721Client;

/// One configured upstream
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Chain id the upstream says it serves
    async fn chain_id(&self) -> Result<ChainId, SourceError>;

    /// Resolve a decimal token id to its metadata document
    async fn token_metadata(&self, token_id: &str) -> Result<TokenMetadata, SourceError>;

    /// Release the underlying connection. Called once by the registry.
    async fn close(&self);

    /// Human-readable identity for logs
    fn describe(&self) -> String;
}

pub type SharedSource = Arc<dyn ChainSource>;

/// Pointer identity, ignoring the vtable
pub fn same_source(a: &SharedSource, b: &SharedSource) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// ERC-721 contract reached over JSON-RPC
pub struct Erc721Source {
    rpc: RwLock<Option<Arc<Erc721Client>>>,
    http: reqwest::Client,
    ipfs_gateway: String,
    description: String,
}

impl Erc721Source {
    pub async fn connect(
        config: &SourceConfig,
        fetch_timeout: Duration,
        ipfs_gateway: &str,
    ) -> Result<Self, SourceError> {
        let rpc = Erc721Client::connect(&config.rpc_url, &config.contract_address).await?;
        let http = reqwest::Client::builder().timeout(fetch_timeout).build()?;
        let description = format!("RPC={}, Contract={}", rpc.rpc_url(), rpc.contract());

        Ok(Self {
            rpc: RwLock::new(Some(Arc::new(rpc))),
            http,
            ipfs_gateway: ipfs_gateway.to_string(),
            description,
        })
    }

    fn rpc(&self) -> Result<Arc<Erc721Client>, SourceError> {
        self.rpc
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(SourceError::Closed)
    }

    async fn fetch_metadata(&self, uri: &str) -> Result<TokenMetadata, SourceError> {
        match MetadataUri::parse(uri, &self.ipfs_gateway)? {
            MetadataUri::Inline(json) => Ok(TokenMetadata::from_json(&json)?),
            MetadataUri::Remote(url) => {
                let resp = self.http.get(&url).send().await?;
                if resp.status() != StatusCode::OK {
                    return Err(SourceError::Status(resp.status().as_u16()));
                }
                let body = resp.bytes().await?;
                Ok(TokenMetadata::from_json(&body)?)
            }
        }
    }
}

#[async_trait]
impl ChainSource for Erc721Source {
    async fn chain_id(&self) -> Result<ChainId, SourceError> {
        self.rpc()?.chain_id().await
    }

    async fn token_metadata(&self, token_id: &str) -> Result<TokenMetadata, SourceError> {
        let uri = self.rpc()?.token_uri(token_id).await?;
        tracing::debug!(token_id, uri = %uri, "Resolved token URI");
        self.fetch_metadata(&uri).await
    }

    async fn close(&self) {
        let client = self.rpc.write().unwrap_or_else(|e| e.into_inner()).take();
        if client.is_some() {
            tracing::info!(source = %self.description, "Closed source");
        }
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}
