//! JSON-RPC client for an ERC-721 contract

use alloy_primitives::{Address, Bytes, U256, U64};
use alloy_rpc_client::{ClientBuilder, RpcClient};
use alloy_sol_types::{sol, SolCall};
use glyph_core::ChainId;
use serde::Serialize;

use crate::error::SourceError;

sol! {
    function tokenURI(uint256 tokenId) external view returns (string);
}

/// `eth_call` transaction object
#[derive(Debug, Clone, Serialize)]
struct CallRequest {
    to: Address,
    data: Bytes,
}

/// Client for one RPC endpoint and one contract on it
pub struct Erc721Client {
    client: RpcClient,
    contract: Address,
    rpc_url: String,
}

impl Erc721Client {
    pub async fn connect(rpc_url: &str, contract_address: &str) -> Result<Self, SourceError> {
        let contract: Address = contract_address
            .parse()
            .map_err(|_| SourceError::InvalidAddress(contract_address.to_string()))?;

        let client = ClientBuilder::default()
            .connect(rpc_url)
            .await
            .map_err(|e| SourceError::Connect {
                url: rpc_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            contract,
            rpc_url: rpc_url.to_string(),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Chain id reported by the node
    pub async fn chain_id(&self) -> Result<ChainId, SourceError> {
        let chain_id: U64 = self
            .client
            .request_noparams("eth_chainId")
            .await
            .map_err(|e| SourceError::Rpc {
                method: "eth_chainId",
                reason: e.to_string(),
            })?;
        Ok(chain_id.to::<u64>())
    }

    /// Call `tokenURI(tokenId)` at the latest block
    ///
    /// `token_id` is a decimal uint256.
    pub async fn token_uri(&self, token_id: &str) -> Result<String, SourceError> {
        let token_id = U256::from_str_radix(token_id, 10)
            .map_err(|e| SourceError::InvalidTokenId(format!("{}: {}", token_id, e)))?;

        let request = CallRequest {
            to: self.contract,
            data: tokenURICall { tokenId: token_id }.abi_encode().into(),
        };

        let raw: Bytes = self
            .client
            .request("eth_call", (request, "latest"))
            .await
            .map_err(|e| SourceError::Rpc {
                method: "eth_call",
                reason: e.to_string(),
            })?;

        tokenURICall::abi_decode_returns(&raw).map_err(|e| SourceError::Abi(e.to_string()))
    }
}
