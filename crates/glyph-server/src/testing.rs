//! Test support: an in-memory chain source
//!
//! Compiled for this crate's unit tests and, with the `test-util` feature,
//! for integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use glyph_core::{ChainId, TokenMetadata};

use crate::error::SourceError;
use crate::source::ChainSource;

/// In-memory source with a fixed chain id and token table
///
/// Counts chain id probes and closes, and can be told to fail or stall its
/// chain id answer.
#[derive(Default)]
pub struct MemorySource {
    chain_id: ChainId,
    tokens: HashMap<String, TokenMetadata>,
    fail_probe: bool,
    probe_delay: Option<Duration>,
    probes: AtomicUsize,
    closes: AtomicUsize,
    name: String,
}

impl MemorySource {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            name: format!("memory:{}", chain_id),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token_id: impl Into<String>, metadata: TokenMetadata) -> Self {
        self.tokens.insert(token_id.into(), metadata);
        self
    }

    /// Make every chain id probe fail
    pub fn failing(mut self) -> Self {
        self.fail_probe = true;
        self
    }

    /// Delay every chain id answer
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = Some(delay);
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainSource for MemorySource {
    async fn chain_id(&self) -> Result<ChainId, SourceError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_probe {
            return Err(SourceError::Rpc {
                method: "eth_chainId",
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.chain_id)
    }

    async fn token_metadata(&self, token_id: &str) -> Result<TokenMetadata, SourceError> {
        self.tokens
            .get(token_id)
            .cloned()
            .ok_or_else(|| SourceError::InvalidTokenId(format!("{} does not exist", token_id)))
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_source() {
        let metadata = TokenMetadata {
            name: "One".into(),
            ..Default::default()
        };
        let source = MemorySource::new(10).with_token("1", metadata.clone());

        assert_eq!(source.chain_id().await.unwrap(), 10);
        assert_eq!(source.probe_count(), 1);
        assert_eq!(source.token_metadata("1").await.unwrap(), metadata);
        assert!(source.token_metadata("2").await.is_err());

        source.close().await;
        assert_eq!(source.close_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_source() {
        let source = MemorySource::new(10).failing();
        assert!(matches!(source.chain_id().await, Err(SourceError::Rpc { .. })));
    }
}
