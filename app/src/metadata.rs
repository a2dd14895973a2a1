//! Token metadata from the collection's metadata API.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinSet;

use crate::errors::{WalletError, WalletResult};

const HIVE_TRAIT: &str = "hive";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trait_type: Option<String>,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_url: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// Unrevealed tokens are hives; revealed ones are bees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenForm {
    Hive,
    Bee,
}

impl TokenMetadata {
    pub fn is_hive(&self) -> bool {
        self.attributes.iter().any(|attr| {
            attr.trait_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(HIVE_TRAIT))
        })
    }

    pub fn form(&self) -> TokenForm {
        if self.is_hive() {
            TokenForm::Hive
        } else {
            TokenForm::Bee
        }
    }
}

/// Hive and bee tallies over the tokens whose metadata loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormCounts {
    pub all: usize,
    pub hives: usize,
    pub bees: usize,
}

impl FormCounts {
    pub fn tally(token_count: usize, metadata: &BTreeMap<u64, Option<TokenMetadata>>) -> Self {
        let mut counts = FormCounts {
            all: token_count,
            ..Default::default()
        };
        for meta in metadata.values().flatten() {
            match meta.form() {
                TokenForm::Hive => counts.hives += 1,
                TokenForm::Bee => counts.bees += 1,
            }
        }
        counts
    }
}

#[derive(Clone)]
pub struct MetadataClient {
    client: Client,
    base_url: String,
    asset_gateway: String,
}

impl MetadataClient {
    pub fn new(base_url: &str, asset_gateway: &str, timeout: Duration) -> WalletResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            WalletError::NetworkError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            asset_gateway: format!("{}/", asset_gateway.trim_end_matches('/')),
        })
    }

    pub fn metadata_url(&self, token_id: u64) -> String {
        format!("{}/metadata/{}", self.base_url, token_id)
    }

    pub async fn fetch(&self, token_id: u64) -> WalletResult<TokenMetadata> {
        let response = self.client.get(self.metadata_url(token_id)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WalletError::UpstreamApi {
                status: Some(status.as_u16()),
                message: format!(
                    "Failed to fetch metadata: {}",
                    status.canonical_reason().unwrap_or("unknown status")
                ),
            });
        }

        let metadata: TokenMetadata = response.json().await?;
        if metadata.image.is_none() {
            log::warn!("No image URL found for token {}", token_id);
        }
        Ok(metadata)
    }

    /// Fetch all tokens concurrently. A token whose metadata cannot be loaded maps to `None`.
    pub async fn fetch_many(&self, token_ids: &[u64]) -> BTreeMap<u64, Option<TokenMetadata>> {
        let mut tasks = JoinSet::new();
        for &token_id in token_ids {
            let client = self.clone();
            tasks.spawn(async move { (token_id, client.fetch(token_id).await) });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((token_id, Ok(metadata))) => {
                    results.insert(token_id, Some(metadata));
                }
                Ok((token_id, Err(err))) => {
                    log::error!("Error fetching metadata for token {}: {}", token_id, err);
                    results.insert(token_id, None);
                }
                Err(err) => log::error!("Metadata task failed: {}", err),
            }
        }
        for &token_id in token_ids {
            results.entry(token_id).or_insert(None);
        }
        results
    }

    /// Turn an `image`/`animation_url` value into a URL a browser can load directly.
    pub fn resolve_asset_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else if let Some(cid) = url.strip_prefix("ipfs://") {
            format!("{}{}", self.asset_gateway, cid)
        } else if let Some(rest) = url.strip_prefix("http://") {
            format!("https://{}", rest)
        } else {
            url.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> MetadataClient {
        MetadataClient::new(
            base,
            "https://beeishxyz.mypinata.cloud/ipfs",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn metadata(attributes: Value) -> TokenMetadata {
        serde_json::from_value(json!({ "name": "Bee-ish #1", "attributes": attributes })).unwrap()
    }

    #[test]
    fn hive_trait_is_case_insensitive() {
        assert!(metadata(json!([{ "trait_type": "Hive", "value": "Golden" }])).is_hive());
        assert!(metadata(json!([{ "trait_type": "HIVE", "value": 1 }])).is_hive());
        let bee = metadata(json!([{ "trait_type": "Wings", "value": "Clear" }, { "value": "x" }]));
        assert_eq!(bee.form(), TokenForm::Bee);
        assert_eq!(metadata(json!([])).form(), TokenForm::Bee);
    }

    #[test]
    fn asset_urls_are_normalized() {
        let client = client("https://secure-metadata-api-beeish.vercel.app/");
        assert_eq!(
            client.resolve_asset_url("/images/1.png"),
            "https://secure-metadata-api-beeish.vercel.app/images/1.png"
        );
        assert_eq!(
            client.resolve_asset_url("ipfs://bafy123/1.gif"),
            "https://beeishxyz.mypinata.cloud/ipfs/bafy123/1.gif"
        );
        assert_eq!(
            client.resolve_asset_url("http://cdn.example.com/1.png"),
            "https://cdn.example.com/1.png"
        );
        assert_eq!(
            client.resolve_asset_url("https://cdn.example.com/1.png"),
            "https://cdn.example.com/1.png"
        );
    }

    #[test]
    fn counts_skip_missing_metadata() {
        let mut map = BTreeMap::new();
        map.insert(1, Some(metadata(json!([{ "trait_type": "hive", "value": "a" }]))));
        map.insert(2, Some(metadata(json!([]))));
        map.insert(3, None);
        assert_eq!(
            FormCounts::tally(3, &map),
            FormCounts {
                all: 3,
                hives: 1,
                bees: 1
            }
        );
    }

    #[tokio::test]
    async fn fetch_many_tolerates_failures() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/metadata/1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "name": "Bee-ish #1",
                    "image": "ipfs://cid/1.png",
                    "attributes": [{ "trait_type": "Hive", "value": "Forest" }]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/metadata/2")
            .with_status(404)
            .create_async()
            .await;

        let results = client(&server.url()).fetch_many(&[1, 2]).await;
        assert_eq!(results.len(), 2);
        assert!(results[&1].as_ref().unwrap().is_hive());
        assert!(results[&2].is_none());
    }

    #[tokio::test]
    async fn http_error_carries_status() {
        let mut server = mockito::Server::new_async().await;
        let _gone = server
            .mock("GET", "/metadata/9")
            .with_status(500)
            .create_async()
            .await;

        let err = client(&server.url()).fetch(9).await.unwrap_err();
        assert!(matches!(err, WalletError::UpstreamApi { status: Some(500), .. }));
    }
}
