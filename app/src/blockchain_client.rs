/// Chain RPC client for the Abstract network
///
/// Read-only JSON-RPC calls against a public node: chain identity, head block
/// and `eth_call` into the NFT contract. Transactions are never sent from here;
/// they go through the user's wallet.
use crate::blockchain::Address;
use crate::chain::ChainId;
use crate::contract::{decode_token_ids, encode_tokens_of_owner, from_hex_data, to_hex_data};
use crate::errors::{WalletError, WalletResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// HTTP client for chain RPC communication
pub struct BlockchainClient {
    client: Client,
    rpc_url: String,
    next_id: AtomicU64,
}

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl BlockchainClient {
    pub fn new(rpc_url: &str, timeout: Duration) -> WalletResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            WalletError::NetworkError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(BlockchainClient {
            client,
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub async fn chain_id(&self) -> WalletResult<ChainId> {
        let raw: Value = self.rpc_call("eth_chainId", json!([])).await?;
        ChainId::from_json(&raw)
    }

    /// Get current block number
    pub async fn block_number(&self) -> WalletResult<u64> {
        let raw: String = self.rpc_call("eth_blockNumber", json!([])).await?;
        let digits = raw.strip_prefix("0x").ok_or_else(|| {
            WalletError::InvalidResponse(format!("Invalid block number format: {}", raw))
        })?;
        u64::from_str_radix(digits, 16)
            .map_err(|_| WalletError::InvalidResponse("Invalid block number format".to_string()))
    }

    /// Read-only contract call at the latest block; returns the raw return data.
    pub async fn call(&self, to: &Address, data: &[u8]) -> WalletResult<Vec<u8>> {
        let params = json!([
            { "to": to.to_hex(), "data": to_hex_data(data) },
            "latest"
        ]);
        let raw: String = self.rpc_call("eth_call", params).await?;
        from_hex_data(&raw)
    }

    /// Token ids held by `owner` in the collection contract.
    pub async fn tokens_of_owner(
        &self,
        contract: &Address,
        owner: &Address,
    ) -> WalletResult<Vec<u64>> {
        let output = self.call(contract, &encode_tokens_of_owner(owner)).await?;
        let ids = decode_token_ids(&output)?;
        log::debug!("{} holds {} token(s)", owner.short(), ids.len());
        Ok(ids)
    }

    /// Make a JSON-RPC call to the node
    async fn rpc_call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Value,
    ) -> WalletResult<T> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| WalletError::NetworkError(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(WalletError::NetworkError(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let rpc_response: JsonRpcResponse<T> = response.json().await.map_err(|e| {
            WalletError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        if let Some(error) = rpc_response.error {
            log::warn!("{} failed with RPC error {}: {}", method, error.code, error.message);
            return Err(WalletError::NetworkError(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }

        rpc_response
            .result
            .ok_or_else(|| WalletError::InvalidResponse("No result in RPC response".to_string()))
    }
}
