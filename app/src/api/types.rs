use crate::metadata::{FormCounts, TokenForm};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/reveal`. The id stays loosely typed so a missing or
/// malformed value is answered with the same 400 as the browser build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealRequest {
    #[serde(default)]
    pub token_id: Option<Value>,
}

impl RevealRequest {
    pub fn for_token(token_id: u64) -> Self {
        Self {
            token_id: Some(Value::from(token_id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Updated token metadata, when the upstream returns it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Value>,
}

impl RevealResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            item: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedToken {
    pub token_id: u64,
    /// `None` when the metadata could not be loaded.
    #[serde(default)]
    pub form: Option<TokenForm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerTokensResponse {
    pub address: String,
    pub tokens: Vec<OwnedToken>,
    pub counts: FormCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub environment: String,
    pub chain_id: u64,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reveal_request_accepts_missing_id() {
        let request: RevealRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.token_id.is_none());
        let request: RevealRequest = serde_json::from_value(json!({ "tokenId": "12" })).unwrap();
        assert_eq!(request.token_id, Some(json!("12")));
    }

    #[test]
    fn failure_omits_item() {
        let body = serde_json::to_value(RevealResponse::failure("Token ID is required")).unwrap();
        assert_eq!(
            body,
            json!({ "success": false, "message": "Token ID is required" })
        );
    }
}
