use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletError {
    // Wallet provider errors
    ProviderUnavailable(String),
    UserRejected(String),
    WrongNetwork { expected: u64, actual: Option<u64> },
    NotConnected,
    Busy,

    // Network errors
    NetworkError(String),
    InvalidResponse(String),
    UpstreamApi { status: Option<u16>, message: String },

    // Storage errors
    StorageError(String),
    FileNotFound(String),
    PermissionDenied(String),

    // Validation errors
    ValidationError(String),
    InvalidAddress(String),
    InvalidAmount(String),

    // Application errors
    ConfigError(String),
    NotFound(String),

    // Generic errors
    Unknown(String),
}

impl WalletError {
    /// Short human-readable reason suitable for a toast or `lastError`.
    pub fn user_message(&self) -> String {
        match self {
            WalletError::ProviderUnavailable(msg) => msg.clone(),
            WalletError::UserRejected(_) => "Request rejected by user".to_string(),
            WalletError::WrongNetwork { .. } => {
                "Please switch to the Abstract Chain network".to_string()
            }
            WalletError::NotConnected => "Please connect your wallet".to_string(),
            WalletError::UpstreamApi { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the user can retry the action without reloading.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WalletError::UserRejected(_)
                | WalletError::WrongNetwork { .. }
                | WalletError::Busy
                | WalletError::NetworkError(_)
                | WalletError::UpstreamApi { .. }
        )
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WalletError::ProviderUnavailable(msg) => write!(f, "Wallet unavailable: {}", msg),
            WalletError::UserRejected(msg) => write!(f, "Rejected by user: {}", msg),
            WalletError::WrongNetwork { expected, actual } => match actual {
                Some(actual) => write!(
                    f,
                    "Wrong network: expected chain {}, connected to {}",
                    expected, actual
                ),
                None => write!(f, "Wrong network: expected chain {}", expected),
            },
            WalletError::NotConnected => write!(f, "Wallet not connected"),
            WalletError::Busy => write!(f, "Another wallet operation is in progress"),

            WalletError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            WalletError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            WalletError::UpstreamApi { status, message } => match status {
                Some(status) => write!(f, "Upstream API error ({}): {}", status, message),
                None => write!(f, "Upstream API error: {}", message),
            },

            WalletError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            WalletError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            WalletError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),

            WalletError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            WalletError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            WalletError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),

            WalletError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            WalletError::NotFound(msg) => write!(f, "Not found: {}", msg),

            WalletError::Unknown(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {}

pub type WalletResult<T> = Result<T, WalletError>;

// Helper macro for easy error creation
#[macro_export]
macro_rules! wallet_error {
    ($variant:ident, $msg:expr) => {
        $crate::errors::WalletError::$variant($msg.to_string())
    };
    ($variant:ident) => {
        $crate::errors::WalletError::$variant
    };
}

// Conversion helpers
impl From<std::io::Error> for WalletError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => WalletError::FileNotFound(error.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                WalletError::PermissionDenied(error.to_string())
            }
            _ => WalletError::StorageError(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(error: serde_json::Error) -> Self {
        WalletError::ValidationError(format!("JSON error: {}", error))
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            WalletError::InvalidResponse(error.to_string())
        } else {
            WalletError::NetworkError(error.to_string())
        }
    }
}
