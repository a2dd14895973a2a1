//! Wallet source integrations.
//!
//! Each source is reached through a trait so the coordinator never inspects
//! provider objects directly: a source states what it is through
//! [`ProviderIdentity`] and reports its state as a [`LiveProviderState`].

pub mod eip1193;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::blockchain::{Address, Amount};
use crate::chain::{ChainId, TargetChain};
use crate::contract::to_hex_data;
use crate::errors::WalletError;
use crate::session::WalletKind;

pub use eip1193::{Eip1193Provider, Eip1193Transport, RpcErrorObject, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Source not installed, not injected, or returned no usable account.
    Unavailable(String),
    /// The user declined the request in the wallet UI.
    UserRejected(String),
    /// The wallet does not know the requested chain yet.
    UnrecognizedChain(String),
    /// The source answered with something that cannot be interpreted.
    Malformed(String),
    Rpc { code: i64, message: String },
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Unavailable(msg) => write!(f, "Provider unavailable: {}", msg),
            ProviderError::UserRejected(msg) => write!(f, "User rejected request: {}", msg),
            ProviderError::UnrecognizedChain(msg) => write!(f, "Unrecognized chain: {}", msg),
            ProviderError::Malformed(msg) => write!(f, "Malformed provider response: {}", msg),
            ProviderError::Rpc { code, message } => {
                write!(f, "Provider error {}: {}", code, message)
            }
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderError> for WalletError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Unavailable(msg) => WalletError::ProviderUnavailable(msg),
            // Malformed answers are treated the same as an absent provider.
            ProviderError::Malformed(msg) => WalletError::ProviderUnavailable(msg),
            ProviderError::UserRejected(msg) => WalletError::UserRejected(msg),
            ProviderError::UnrecognizedChain(msg) => {
                WalletError::NetworkError(format!("Chain not added to wallet: {}", msg))
            }
            ProviderError::Rpc { code, message } => {
                WalletError::NetworkError(format!("Provider error {}: {}", code, message))
            }
        }
    }
}

/// Explicit, typed identity every integration declares about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    pub kind: WalletKind,
    pub name: String,
}

impl ProviderIdentity {
    pub fn new(kind: WalletKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Snapshot of one source as last observed. Owned by the integration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveProviderState {
    pub address: Option<Address>,
    pub chain_id: Option<ChainId>,
    pub is_authenticated: bool,
}

impl LiveProviderState {
    pub fn authenticated(address: Address, chain_id: Option<ChainId>) -> Self {
        Self {
            address: Some(address),
            chain_id,
            is_authenticated: true,
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    /// The account, only while the source reports itself authenticated.
    pub fn authenticated_address(&self) -> Option<Address> {
        if self.is_authenticated {
            self.address
        } else {
            None
        }
    }
}

/// Transaction handed to the active wallet for signing and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub value: Amount,
    pub data: Vec<u8>,
}

impl TransactionRequest {
    /// `eth_sendTransaction` parameter object.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "from": self.from.to_hex(),
            "to": self.to.to_hex(),
            "value": self.value.to_hex(),
            "data": to_hex_data(&self.data),
        })
    }
}

/// Browser-extension wallet reached through the injected request/event interface.
#[async_trait]
pub trait InjectedProvider: Send + Sync {
    fn identity(&self) -> ProviderIdentity;

    /// Prompting connection: request accounts, then read the active chain.
    async fn connect(&self) -> ProviderResult<LiveProviderState>;

    /// Non-prompting reconnection; a signed-out state means nothing to restore.
    async fn silent_reconnect(&self) -> ProviderResult<LiveProviderState>;

    async fn switch_chain(&self, chain_id: ChainId) -> ProviderResult<()>;

    async fn add_chain(&self, chain: &TargetChain) -> ProviderResult<()>;

    async fn disconnect(&self) -> ProviderResult<()>;

    /// Returns the transaction hash.
    async fn send_transaction(&self, tx: &TransactionRequest) -> ProviderResult<String>;
}

/// Smart-contract account wallet reached through its vendor SDK.
/// Always operates on the target chain.
#[async_trait]
pub trait EmbeddedWallet: Send + Sync {
    fn identity(&self) -> ProviderIdentity;

    /// Interactive login; returns the smart-account address.
    async fn login(&self) -> ProviderResult<Address>;

    /// Restore a session left by a previous page lifetime, if any.
    async fn restore_session(&self) -> ProviderResult<Option<Address>>;

    async fn logout(&self) -> ProviderResult<()>;

    /// Returns the transaction hash.
    async fn send_transaction(&self, tx: &TransactionRequest) -> ProviderResult<String>;
}
