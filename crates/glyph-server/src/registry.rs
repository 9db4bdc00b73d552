//! Chain id -> source routing
//!
//! Configured chains resolve with a shared-lock lookup. A chain id nobody
//! configured is discovered by asking every distinct source which chain it
//! serves; the first match is memoized under the requested id, so one source
//! may end up registered under several keys.
//!
//! Discovery is serialized by its own mutex and probes run without holding
//! the map lock, so lookups of mapped chains never wait on a probe.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use glyph_core::{ChainId, GatewayConfig, LEGACY_CHAIN_ID};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{RegistryError, SourceError};
use crate::metrics;
use crate::source::{same_source, Erc721Source, SharedSource};

pub struct SourceRegistry {
    sources: RwLock<BTreeMap<ChainId, SharedSource>>,
    /// Held for a whole discovery scan and during teardown
    discovery: Mutex<()>,
    probe_timeout: Duration,
}

impl SourceRegistry {
    /// Register `entries` in order
    ///
    /// An entry keyed by the legacy chain id 0 is asked for its chain id and
    /// registered under the answer. If that fails, or a chain id appears
    /// twice, every source in `entries` is released and an error returned.
    pub async fn new(
        entries: impl IntoIterator<Item = (ChainId, SharedSource)>,
        probe_timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let entries: Vec<(ChainId, SharedSource)> = entries.into_iter().collect();
        let mut sources = BTreeMap::new();

        for (configured, source) in &entries {
            match Self::initial_key(*configured, source, &sources, probe_timeout).await {
                Ok(chain_id) => {
                    info!(chain_id, source = %source.describe(), "Configured chain");
                    sources.insert(chain_id, source.clone());
                }
                Err(e) => {
                    release_distinct(entries.iter().map(|(_, s)| s.clone())).await;
                    return Err(e);
                }
            }
        }

        metrics::set_chains_mapped(sources.len());

        Ok(Self {
            sources: RwLock::new(sources),
            discovery: Mutex::new(()),
            probe_timeout,
        })
    }

    /// Connect an ERC-721 source for every configured chain
    pub async fn from_config(config: &GatewayConfig) -> Result<Self, RegistryError> {
        let mut entries: Vec<(ChainId, SharedSource)> = Vec::with_capacity(config.sources.len());

        for (&chain_id, source_config) in &config.sources {
            let connected =
                Erc721Source::connect(source_config, config.fetch_timeout(), &config.ipfs_gateway)
                    .await;
            match connected {
                Ok(source) => entries.push((chain_id, Arc::new(source))),
                Err(source) => {
                    release_distinct(entries.into_iter().map(|(_, s)| s)).await;
                    return Err(RegistryError::Source { chain_id, source });
                }
            }
        }

        Self::new(entries, config.probe_timeout()).await
    }

    async fn initial_key(
        configured: ChainId,
        source: &SharedSource,
        registered: &BTreeMap<ChainId, SharedSource>,
        probe_timeout: Duration,
    ) -> Result<ChainId, RegistryError> {
        let chain_id = if configured == LEGACY_CHAIN_ID {
            let discovered = probe(source, probe_timeout)
                .await
                .map_err(|source| RegistryError::ProbeFailure {
                    key: LEGACY_CHAIN_ID,
                    source,
                })?;
            if discovered == LEGACY_CHAIN_ID {
                return Err(RegistryError::SentinelChainId);
            }
            info!(chain_id = discovered, "Resolved chain ID from RPC");
            discovered
        } else {
            configured
        };

        if registered.contains_key(&chain_id) {
            return Err(RegistryError::DuplicateChain(chain_id));
        }
        Ok(chain_id)
    }

    /// Source serving `chain_id`
    ///
    /// Known ids are answered under the shared lock. Unknown ids take the
    /// discovery mutex, re-check, then probe each distinct source once with
    /// no map lock held. Only the final insert takes the exclusive lock.
    pub async fn resolve(&self, chain_id: ChainId) -> Result<SharedSource, RegistryError> {
        if chain_id == LEGACY_CHAIN_ID {
            return Err(RegistryError::NotFound { chain_id });
        }

        if let Some(source) = self.lookup(chain_id).await {
            return Ok(source);
        }

        let _discovery = self.discovery.lock().await;

        // Another caller may have discovered it while we waited
        if let Some(source) = self.lookup(chain_id).await {
            return Ok(source);
        }

        let candidates = self.distinct_sources().await;
        let found = self.scan(&candidates, chain_id).await;

        metrics::record_discovery(found.is_some());
        let Some(source) = found else {
            return Err(RegistryError::NotFound { chain_id });
        };

        let mut sources = self.sources.write().await;
        sources.insert(chain_id, source.clone());
        metrics::set_chains_mapped(sources.len());
        info!(
            chain_id,
            source = %source.describe(),
            "Found matching RPC server for chain ID"
        );
        Ok(source)
    }

    async fn lookup(&self, chain_id: ChainId) -> Option<SharedSource> {
        self.sources.read().await.get(&chain_id).cloned()
    }

    /// Each distinct source with the lowest key it is registered under
    async fn distinct_sources(&self) -> Vec<(ChainId, SharedSource)> {
        let sources = self.sources.read().await;
        let mut distinct: Vec<(ChainId, SharedSource)> = Vec::new();
        for (&key, source) in sources.iter() {
            if !distinct.iter().any(|(_, d)| same_source(d, source)) {
                distinct.push((key, source.clone()));
            }
        }
        distinct
    }

    /// Probe candidates in order, returning the first that reports `chain_id`
    async fn scan(
        &self,
        candidates: &[(ChainId, SharedSource)],
        chain_id: ChainId,
    ) -> Option<SharedSource> {
        for (key, source) in candidates {
            let key = *key;
            match probe(source, self.probe_timeout).await {
                Ok(reported) if reported == chain_id => {
                    metrics::record_probe(metrics::PROBE_MATCH);
                    return Some(source.clone());
                }
                Ok(reported) => {
                    metrics::record_probe(metrics::PROBE_MISMATCH);
                    debug!(key, reported, wanted = chain_id, "Source serves a different chain");
                }
                Err(err) => {
                    metrics::record_probe(metrics::PROBE_FAILED);
                    let err = RegistryError::ProbeFailure { key, source: err };
                    warn!(error = %err, "Skipping source during discovery");
                }
            }
        }
        None
    }

    /// Ask every distinct source for its chain id and compare it with the key
    /// it is registered under
    ///
    /// Meant for startup checks, before discovery has added alias keys.
    /// Returns the verified keys, or the first unreachable or mismatched one.
    pub async fn verify(&self) -> Result<Vec<ChainId>, RegistryError> {
        let registered: Vec<(ChainId, SharedSource)> = self
            .sources
            .read()
            .await
            .iter()
            .map(|(&key, source)| (key, source.clone()))
            .collect();

        let mut answers: Vec<(SharedSource, ChainId)> = Vec::new();
        let mut verified = Vec::with_capacity(registered.len());
        for (key, source) in registered {
            let known = answers
                .iter()
                .find(|(s, _)| same_source(s, &source))
                .map(|(_, reported)| *reported);
            let reported = match known {
                Some(reported) => reported,
                None => {
                    let reported = probe(&source, self.probe_timeout)
                        .await
                        .map_err(|source| RegistryError::ProbeFailure { key, source })?;
                    answers.push((source.clone(), reported));
                    reported
                }
            };

            if reported != key {
                return Err(RegistryError::ChainMismatch { key, reported });
            }
            debug!(chain_id = key, source = %source.describe(), "Verified source");
            verified.push(key);
        }
        Ok(verified)
    }

    /// Currently mapped chain ids, ascending
    pub async fn chain_ids(&self) -> Vec<ChainId> {
        self.sources.read().await.keys().copied().collect()
    }

    /// Number of distinct sources behind the mapping
    pub async fn source_count(&self) -> usize {
        self.distinct_sources().await.len()
    }

    /// Drain the mapping and release each distinct source once
    ///
    /// Returns how many sources were released. Later calls release nothing.
    pub async fn shutdown(&self) -> usize {
        // Waits out a running scan so nothing is inserted after the drain
        let _discovery = self.discovery.lock().await;
        let drained = std::mem::take(&mut *self.sources.write().await);
        let released = release_distinct(drained.into_values()).await;
        metrics::set_chains_mapped(0);
        info!(released, "Released chain sources");
        released
    }
}

async fn probe(source: &SharedSource, deadline: Duration) -> Result<ChainId, SourceError> {
    tokio::time::timeout(deadline, source.chain_id())
        .await
        .map_err(|_| SourceError::Timeout(deadline))?
}

async fn release_distinct(sources: impl IntoIterator<Item = SharedSource>) -> usize {
    let mut distinct: Vec<SharedSource> = Vec::new();
    for source in sources {
        if !distinct.iter().any(|d| same_source(d, &source)) {
            distinct.push(source);
        }
    }

    for source in &distinct {
        source.close().await;
        debug!(source = %source.describe(), "Released source");
    }
    distinct.len()
}
