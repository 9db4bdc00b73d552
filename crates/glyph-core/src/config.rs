//! Gateway configuration: which RPC endpoint and contract serve which chain

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::constants::DEFAULT_IPFS_GATEWAY;
use crate::{ChainId, Error, Result, LEGACY_CHAIN_ID};

/// One upstream: an RPC endpoint and the ERC-721 contract to query on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub rpc_url: String,
    pub contract_address: String,
}

impl SourceConfig {
    pub fn new(rpc_url: impl Into<String>, contract_address: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address: contract_address.into(),
        }
    }
}

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Chain id -> upstream. Key 0 means "ask the RPC which chain it serves".
    pub sources: BTreeMap<ChainId, SourceConfig>,
    /// Listen address: `:8080`, `8080`, or `host:port`
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Per-source deadline for chain id probes during discovery
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Deadline for fetching a remote metadata document
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Gateway that `ipfs://` references are rewritten onto
    #[serde(default = "default_ipfs_gateway")]
    pub ipfs_gateway: String,
}

fn default_listen() -> String {
    ":8080".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    10_000
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_ipfs_gateway() -> String {
    DEFAULT_IPFS_GATEWAY.to_string()
}

impl GatewayConfig {
    /// Configuration with the given sources and default settings
    pub fn new(sources: BTreeMap<ChainId, SourceConfig>) -> Self {
        Self {
            sources,
            listen: default_listen(),
            probe_timeout_ms: default_probe_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            ipfs_gateway: default_ipfs_gateway(),
        }
    }

    /// Read configuration from `.env` in the working directory, if present,
    /// and the process environment
    pub fn from_env() -> Result<Self> {
        match Self::from_env_file(".env") {
            Err(Error::EnvFile(e)) if e.not_found() => Self::from_vars(std::env::vars()),
            other => other,
        }
    }

    /// Read configuration from a dotenv file layered under the process
    /// environment; variables already set in the environment win
    pub fn from_env_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let mut vars = BTreeMap::new();
        for item in dotenvy::from_path_iter(path.as_ref())? {
            let (key, value) = item?;
            vars.insert(key, value);
        }
        tracing::debug!(path = %path.as_ref().display(), entries = vars.len(), "Read env file");

        vars.extend(std::env::vars());
        Self::from_vars(vars)
    }

    /// Read configuration from `KEY=value` pairs
    ///
    /// Recognized keys:
    /// - `RPC_URL_<CHAIN_ID>` with a matching `CONTRACT_ADDRESS_<CHAIN_ID>`
    /// - `RPC_URL` + `CONTRACT_ADDRESS` (legacy, only used when no
    ///   per-chain pair is present; the chain id is discovered at startup)
    /// - `PORT`
    ///
    /// `RPC_URL_<X>` entries whose suffix is not a chain id are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: BTreeMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut sources = BTreeMap::new();
        for (key, rpc_url) in &vars {
            let Some(suffix) = key.strip_prefix("RPC_URL_") else {
                continue;
            };
            let Ok(chain_id) = suffix.parse::<ChainId>() else {
                continue;
            };

            let contract_address = vars
                .get(&format!("CONTRACT_ADDRESS_{}", suffix))
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::MissingContractAddress {
                    chain: suffix.to_string(),
                })?;

            sources.insert(chain_id, SourceConfig::new(rpc_url, contract_address));
        }

        if sources.is_empty() {
            let rpc_url = vars.get("RPC_URL").filter(|v| !v.is_empty());
            let contract_address = vars.get("CONTRACT_ADDRESS").filter(|v| !v.is_empty());
            match (rpc_url, contract_address) {
                (Some(rpc_url), Some(contract_address)) => {
                    sources.insert(LEGACY_CHAIN_ID, SourceConfig::new(rpc_url, contract_address));
                }
                _ => return Err(Error::NoSourcesConfigured),
            }
        }

        let mut config = Self::new(sources);
        if let Some(port) = vars.get("PORT").filter(|v| !v.is_empty()) {
            config.listen = port.clone();
        }
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        if config.sources.is_empty() {
            return Err(Error::NoSourcesConfigured);
        }
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = listen.into();
        self
    }

    pub fn with_probe_timeout_ms(mut self, ms: u64) -> Self {
        self.probe_timeout_ms = ms;
        self
    }

    pub fn with_ipfs_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.ipfs_gateway = gateway.into();
        self
    }

    /// Resolve `listen` to a socket address; a bare port binds all interfaces
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let listen = self.listen.trim();
        let candidate = if let Some(port) = listen.strip_prefix(':') {
            format!("0.0.0.0:{}", port)
        } else if listen.parse::<u16>().is_ok() {
            format!("0.0.0.0:{}", listen)
        } else {
            listen.to_string()
        };

        candidate
            .parse()
            .map_err(|_| Error::InvalidListenAddr(self.listen.clone()))
    }

    pub fn probe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.fetch_timeout_ms)
    }

    /// True when the only source still has to discover its chain id
    pub fn is_legacy(&self) -> bool {
        self.sources.contains_key(&LEGACY_CHAIN_ID)
    }
}

/// Parse a chain id path segment
pub fn parse_chain_id(s: &str) -> Result<ChainId> {
    s.parse::<ChainId>()
        .map_err(|e| Error::InvalidChainId(format!("{}: {}", s, e)))
}

/// Validate a token id path segment
///
/// Token ids are uint256 values, so they stay decimal strings here; the RPC
/// layer does the numeric conversion.
pub fn parse_token_id(s: &str) -> Result<String> {
    if s.is_empty() {
        return Err(Error::InvalidTokenId("token ID cannot be empty".to_string()));
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidTokenId(format!("{} is not a decimal number", s)));
    }
    Ok(s.to_string())
}
