//! Hive reveal: the server-side proxy that holds the passcode, and the
//! client the UI uses to call it.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::api::types::{RevealRequest, RevealResponse};
use crate::errors::{WalletError, WalletResult};
use crate::metadata::{MetadataClient, TokenMetadata};
use crate::validation::InputValidator;

/// Status and JSON body the proxy answers with.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyReply {
    pub status: u16,
    pub body: Value,
}

impl ProxyReply {
    fn failure(status: u16, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            status,
            body: json!({ "success": false, "message": message }),
        }
    }
}

/// Forwards reveal requests to the metadata service, attaching the passcode
/// that must never reach the browser.
pub struct RevealProxy {
    client: Client,
    upstream_url: String,
    passcode: Option<SecretString>,
    validator: InputValidator,
}

impl RevealProxy {
    pub fn new(
        upstream_url: &str,
        passcode: Option<SecretString>,
        timeout: Duration,
    ) -> WalletResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            WalletError::NetworkError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            upstream_url: upstream_url.trim_end_matches('/').to_string(),
            passcode,
            validator: InputValidator::new()?,
        })
    }

    pub async fn handle(&self, request: &RevealRequest) -> ProxyReply {
        let token_id = match self.validator.parse_token_id(request.token_id.as_ref()) {
            Ok(id) => id,
            Err(WalletError::ValidationError(message)) => return ProxyReply::failure(400, message),
            Err(err) => return ProxyReply::failure(400, err.to_string()),
        };

        let Some(passcode) = &self.passcode else {
            log::error!("REVEAL_PASSCODE environment variable is not set");
            return ProxyReply::failure(500, "Server configuration error");
        };

        let url = format!("{}/api/reveal-token/{}", self.upstream_url, token_id);
        let result = self
            .client
            .get(&url)
            .query(&[("passcode", passcode.expose_secret())])
            .header("Content-Type", "application/json")
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                // The request URL carries the passcode.
                let err = err.without_url();
                log::error!("Error calling reveal API for token {}: {}", token_id, err);
                return ProxyReply::failure(500, transport_message(&err));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = error_message(status, response.json::<Value>().await.ok());
            log::warn!(
                "Reveal API rejected token {} with {}: {}",
                token_id,
                status,
                message
            );
            return ProxyReply::failure(status.as_u16(), message);
        }

        match response.json::<Value>().await {
            Ok(body) => {
                log::info!("Token {} revealed", token_id);
                ProxyReply { status: 200, body }
            }
            Err(err) => {
                let err = err.without_url();
                log::error!("Reveal API returned invalid JSON for token {}: {}", token_id, err);
                ProxyReply::failure(500, transport_message(&err))
            }
        }
    }
}

/// Calls the reveal proxy from the client side.
pub struct RevealClient {
    client: Client,
    base_url: String,
}

impl RevealClient {
    pub fn new(base_url: &str, timeout: Duration) -> WalletResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            WalletError::NetworkError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Reveal one hive. Returns the updated metadata when the service sends it back.
    pub async fn reveal(&self, token_id: u64) -> WalletResult<Option<TokenMetadata>> {
        let response = self
            .client
            .post(format!("{}/api/reveal", self.base_url))
            .json(&RevealRequest::for_token(token_id))
            .send()
            .await?;

        let status = response.status();
        let body = response.json::<Value>().await.ok();
        if !status.is_success() {
            return Err(WalletError::UpstreamApi {
                status: Some(status.as_u16()),
                message: error_message(status, body),
            });
        }

        let reply: RevealResponse = body
            .map(serde_json::from_value)
            .transpose()?
            .ok_or_else(|| WalletError::InvalidResponse("Empty reveal response".to_string()))?;

        if !reply.success {
            return Err(WalletError::UpstreamApi {
                status: Some(status.as_u16()),
                message: reply
                    .message
                    .unwrap_or_else(|| "Failed to reveal NFT".to_string()),
            });
        }

        match reply.item {
            Some(item) => Ok(Some(serde_json::from_value(item)?)),
            None => Ok(None),
        }
    }

    /// Reveal, then load fresh metadata if the reveal reply did not include it.
    /// `Ok(None)` means the reveal succeeded but the new metadata is not available yet.
    pub async fn reveal_and_refresh(
        &self,
        token_id: u64,
        metadata: &MetadataClient,
    ) -> WalletResult<Option<TokenMetadata>> {
        if let Some(item) = self.reveal(token_id).await? {
            return Ok(Some(item));
        }

        match metadata.fetch(token_id).await {
            Ok(fresh) => Ok(Some(fresh)),
            Err(err) => {
                log::warn!("Revealed token {} but could not refresh metadata: {}", token_id, err);
                Ok(None)
            }
        }
    }
}

fn error_message(status: StatusCode, body: Option<Value>) -> String {
    body.as_ref()
        .and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "API error: {}",
                status.canonical_reason().unwrap_or("Unknown")
            )
        })
}

fn transport_message(err: &reqwest::Error) -> String {
    let message = err.to_string();
    if message.is_empty() {
        "Failed to call reveal API".to_string()
    } else {
        message
    }
}
