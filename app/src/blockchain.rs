/// Core value types for the Abstract chain
///
/// Accounts are Ethereum-style 20-byte addresses and amounts are carried in wei
/// (18 decimals), so the same types serve both wallet sources and the RPC client.
use crate::errors::{WalletError, WalletResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An account or contract address: `0x{40_hex_chars}`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create a new address from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        if bytes.len() != 20 {
            return Err(WalletError::InvalidAddress(format!(
                "Invalid address length: expected 20 bytes, got {}",
                bytes.len()
            )));
        }

        let mut raw = [0u8; 20];
        raw.copy_from_slice(bytes);
        Ok(Address(raw))
    }

    /// Parse a `0x`-prefixed hex address. Checksummed (mixed-case) input is accepted as-is.
    pub fn from_string(address: &str) -> WalletResult<Self> {
        let trimmed = address.trim();
        let stripped = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| {
                WalletError::InvalidAddress("Address must start with 0x".to_string())
            })?;

        if stripped.len() != 40 {
            return Err(WalletError::InvalidAddress(format!(
                "Invalid address length: expected 40 hex characters, got {}",
                stripped.len()
            )));
        }

        let bytes = hex::decode(stripped)
            .map_err(|e| WalletError::InvalidAddress(format!("Invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Lowercase `0x` hex form.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Shortened `0x1234...abcd` form for headers and toasts.
    pub fn short(&self) -> String {
        let full = self.to_hex();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_string(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::from_string(&raw).map_err(serde::de::Error::custom)
    }
}

/// An amount of ETH held in wei.
///
/// Uses fixed-point arithmetic to avoid floating-point precision issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Amount {
    wei: u128,
}

impl Amount {
    /// Number of decimal places for ETH
    pub const DECIMALS: u8 = 18;
    /// Wei per ETH (10^18)
    pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

    pub const fn from_wei(wei: u128) -> Self {
        Amount { wei }
    }

    /// Create amount from whole ETH
    pub fn from_eth(eth: u128) -> WalletResult<Self> {
        eth.checked_mul(Self::WEI_PER_ETH)
            .map(Amount::from_wei)
            .ok_or_else(|| WalletError::InvalidAmount("Amount calculation overflow".to_string()))
    }

    /// Create amount from a decimal ETH string such as `"0.004"`
    pub fn from_string(amount_str: &str) -> WalletResult<Self> {
        if amount_str.is_empty() {
            return Err(WalletError::InvalidAmount(
                "Amount cannot be empty".to_string(),
            ));
        }

        let parts: Vec<&str> = amount_str.split('.').collect();
        if parts.len() > 2 {
            return Err(WalletError::InvalidAmount(
                "Invalid decimal format".to_string(),
            ));
        }

        let whole_part: u128 = parts[0]
            .parse()
            .map_err(|_| WalletError::InvalidAmount("Invalid number format".to_string()))?;

        let fractional_units = if parts.len() == 2 {
            let fractional_str = parts[1];
            if fractional_str.len() > Self::DECIMALS as usize {
                return Err(WalletError::InvalidAmount(
                    "Too many decimal places".to_string(),
                ));
            }

            let padded = format!("{:0<18}", fractional_str);
            padded
                .parse::<u128>()
                .map_err(|_| WalletError::InvalidAmount("Invalid fractional part".to_string()))?
        } else {
            0
        };

        whole_part
            .checked_mul(Self::WEI_PER_ETH)
            .and_then(|w| w.checked_add(fractional_units))
            .map(Amount::from_wei)
            .ok_or_else(|| WalletError::InvalidAmount("Amount overflow".to_string()))
    }

    pub fn wei(&self) -> u128 {
        self.wei
    }

    pub fn is_zero(&self) -> bool {
        self.wei == 0
    }

    /// Full-precision decimal ETH string
    pub fn as_string(&self) -> String {
        let whole = self.wei / Self::WEI_PER_ETH;
        let fractional = self.wei % Self::WEI_PER_ETH;

        if fractional == 0 {
            whole.to_string()
        } else {
            let frac_str = format!("{:018}", fractional)
                .trim_end_matches('0')
                .to_string();
            format!("{}.{}", whole, frac_str)
        }
    }

    /// `0x` hex quantity as used in `eth_sendTransaction`
    pub fn to_hex(&self) -> String {
        format!("0x{:x}", self.wei)
    }

    pub fn checked_mul(&self, factor: u64) -> WalletResult<Amount> {
        self.wei
            .checked_mul(factor as u128)
            .map(Amount::from_wei)
            .ok_or_else(|| {
                WalletError::InvalidAmount("Amount overflow in multiplication".to_string())
            })
    }

    pub fn checked_add(&self, other: &Amount) -> WalletResult<Amount> {
        self.wei
            .checked_add(other.wei)
            .map(Amount::from_wei)
            .ok_or_else(|| WalletError::InvalidAmount("Amount overflow in addition".to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.as_string())
    }
}

impl FromStr for Amount {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::from_string(s)
    }
}
