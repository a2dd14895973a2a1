//! Chain identity for the network the application requires.
//!
//! Chain ids travel through the core as a decimal `u64`. Providers report them
//! as hex strings (`"0xab5"`), decimal strings or numbers; every provider
//! boundary converts with [`ChainId::parse`] or [`ChainId::from_json`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::errors::{WalletError, WalletResult};

/// Abstract mainnet chain id.
pub const ABSTRACT_CHAIN_ID: u64 = 2741;
pub const ABSTRACT_CHAIN_NAME: &str = "Abstract";
pub const ABSTRACT_RPC_URL: &str = "https://api.mainnet.abs.xyz";
pub const ABSTRACT_EXPLORER_URL: &str = "https://abscan.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const ABSTRACT: ChainId = ChainId(ABSTRACT_CHAIN_ID);

    /// Parse a chain id given either as `0x`-prefixed hex or as a decimal string.
    pub fn parse(raw: &str) -> WalletResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WalletError::ValidationError(
                "Chain id cannot be empty".to_string(),
            ));
        }

        let parsed = if let Some(stripped) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            u64::from_str_radix(stripped, 16)
        } else {
            trimmed.parse::<u64>()
        };

        parsed
            .map(ChainId)
            .map_err(|_| WalletError::ValidationError(format!("Invalid chain id '{}'", raw)))
    }

    /// Accept the loose shapes providers put on the wire: hex/decimal strings or numbers.
    pub fn from_json(value: &Value) -> WalletResult<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => n.as_u64().map(ChainId).ok_or_else(|| {
                WalletError::ValidationError(format!("Invalid chain id number {}", n))
            }),
            other => Err(WalletError::ValidationError(format!(
                "Unexpected chain id payload: {}",
                other
            ))),
        }
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Lowercase `0x` hex form used by EIP-1193 requests.
    pub fn to_hex(self) -> String {
        format!("0x{:x}", self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChainId::parse(s)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        ChainId(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for NativeCurrency {
    fn default() -> Self {
        Self {
            name: "Ethereum".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }
}

/// The single network the application requires for minting and reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetChain {
    pub chain_id: ChainId,
    pub name: String,
    pub rpc_url: String,
    pub explorer_url: String,
    pub native_currency: NativeCurrency,
}

impl TargetChain {
    pub fn abstract_mainnet() -> Self {
        Self {
            chain_id: ChainId::ABSTRACT,
            name: ABSTRACT_CHAIN_NAME.to_string(),
            rpc_url: ABSTRACT_RPC_URL.to_string(),
            explorer_url: ABSTRACT_EXPLORER_URL.to_string(),
            native_currency: NativeCurrency::default(),
        }
    }

    pub fn matches(&self, chain_id: Option<ChainId>) -> bool {
        chain_id == Some(self.chain_id)
    }

    /// EIP-3085 parameters for `wallet_addEthereumChain`.
    pub fn add_chain_params(&self) -> Value {
        let explorer = if self.explorer_url.ends_with('/') {
            self.explorer_url.clone()
        } else {
            format!("{}/", self.explorer_url)
        };

        serde_json::json!({
            "chainId": self.chain_id.to_hex(),
            "chainName": self.name,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
            "rpcUrls": [self.rpc_url],
            "blockExplorerUrls": [explorer],
        })
    }

    /// EIP-3326 parameters for `wallet_switchEthereumChain`.
    pub fn switch_chain_params(&self) -> Value {
        serde_json::json!({ "chainId": self.chain_id.to_hex() })
    }

    pub fn transaction_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }
}

impl Default for TargetChain {
    fn default() -> Self {
        Self::abstract_mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal_forms() {
        assert_eq!(ChainId::parse("0xab5").unwrap(), ChainId::ABSTRACT);
        assert_eq!(ChainId::parse("0xAB5").unwrap(), ChainId::ABSTRACT);
        assert_eq!(ChainId::parse("2741").unwrap(), ChainId::ABSTRACT);
        assert_eq!(ChainId::parse(" 0x1 ").unwrap(), ChainId(1));
        assert!(ChainId::parse("").is_err());
        assert!(ChainId::parse("abstract").is_err());
    }

    #[test]
    fn parses_json_numbers_and_strings() {
        assert_eq!(
            ChainId::from_json(&serde_json::json!("0xab5")).unwrap(),
            ChainId::ABSTRACT
        );
        assert_eq!(
            ChainId::from_json(&serde_json::json!(2741)).unwrap(),
            ChainId::ABSTRACT
        );
        assert!(ChainId::from_json(&serde_json::json!(null)).is_err());
    }

    #[test]
    fn renders_hex() {
        assert_eq!(ChainId::ABSTRACT.to_hex(), "0xab5");
        assert_eq!(ChainId::ABSTRACT.to_string(), "2741");
    }

    #[test]
    fn add_chain_params_follow_eip3085() {
        let params = TargetChain::abstract_mainnet().add_chain_params();
        assert_eq!(params["chainId"], "0xab5");
        assert_eq!(params["chainName"], "Abstract");
        assert_eq!(params["nativeCurrency"]["symbol"], "ETH");
        assert_eq!(params["nativeCurrency"]["decimals"], 18);
        assert_eq!(params["rpcUrls"][0], "https://api.mainnet.abs.xyz");
        assert_eq!(params["blockExplorerUrls"][0], "https://abscan.org/");
    }

    #[test]
    fn target_matches_only_its_chain() {
        let target = TargetChain::abstract_mainnet();
        assert!(target.matches(Some(ChainId(2741))));
        assert!(!target.matches(Some(ChainId(1))));
        assert!(!target.matches(None));
    }
}
