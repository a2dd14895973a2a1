//! Public mint of the collection through the active wallet.

use std::sync::Arc;

use crate::blockchain::Amount;
use crate::config_store::ContractConfig;
use crate::contract::MintCall;
use crate::coordinator::SessionCoordinator;
use crate::errors::{WalletError, WalletResult};
use crate::notices::Notice;
use crate::validation::InputValidator;

const REVERTED_MESSAGE: &str = "Contract execution reverted - you may not be eligible to mint";

/// A mint that reached the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub tx_hash: String,
    pub quantity: u64,
    pub total_price: Amount,
    pub explorer_url: String,
}

pub struct MintService {
    coordinator: Arc<SessionCoordinator>,
    contract: ContractConfig,
    validator: InputValidator,
}

impl MintService {
    pub fn new(coordinator: Arc<SessionCoordinator>, contract: ContractConfig) -> WalletResult<Self> {
        Ok(Self {
            coordinator,
            contract,
            validator: InputValidator::new()?,
        })
    }

    /// Value sent with a mint of `quantity` tokens.
    pub fn total_price(&self, quantity: u64) -> WalletResult<Amount> {
        self.contract.price_per_token().checked_mul(quantity)
    }

    /// Mint `quantity` tokens. Failures are announced as notices and returned
    /// with a user-facing message.
    pub async fn mint(&self, quantity: u64) -> WalletResult<MintReceipt> {
        match self.submit(quantity).await {
            Ok(receipt) => {
                log::info!("Mint of {} submitted: {}", quantity, receipt.tx_hash);
                self.coordinator.notify(Notice::info(
                    "Transaction submitted",
                    format!(
                        "Your mint transaction for {} Bee-ish NFT{} has been sent!",
                        quantity,
                        if quantity > 1 { "s" } else { "" }
                    ),
                ));
                Ok(receipt)
            }
            Err(WalletError::Busy) => Err(WalletError::Busy),
            Err(err) => {
                let message = mint_failure_message(&err);
                log::warn!("Mint of {} failed: {}", quantity, err);
                self.coordinator
                    .notify(Notice::error("Minting failed", message.clone()));
                Err(match err {
                    WalletError::NetworkError(_) => WalletError::NetworkError(message),
                    other => other,
                })
            }
        }
    }

    async fn submit(&self, quantity: u64) -> WalletResult<MintReceipt> {
        self.validator
            .validate_mint_quantity(quantity, self.contract.max_per_mint)?;
        if !self.contract.is_configured() {
            return Err(WalletError::ConfigError(
                "NFT contract address is not configured".to_string(),
            ));
        }

        let total_price = self.total_price(quantity)?;
        let data = MintCall::public(quantity).encode();
        let tx_hash = self
            .coordinator
            .submit_transaction(self.contract.address, total_price, data)
            .await?;

        Ok(MintReceipt {
            explorer_url: self.coordinator.target().transaction_url(&tx_hash),
            tx_hash,
            quantity,
            total_price,
        })
    }
}

/// Short reason shown to the user for a failed mint.
pub fn mint_failure_message(err: &WalletError) -> String {
    match err {
        WalletError::UserRejected(_) => "Transaction rejected by user".to_string(),
        WalletError::NetworkError(msg) => {
            if msg.contains("insufficient funds") {
                "Insufficient funds in your wallet".to_string()
            } else if let Some(reason) = revert_reason(msg) {
                reason
            } else if msg.contains("execution reverted") {
                REVERTED_MESSAGE.to_string()
            } else {
                "There was an error minting your NFT".to_string()
            }
        }
        other => other.user_message(),
    }
}

/// The `reason` of `execution reverted: reason, ...`, if present.
fn revert_reason(message: &str) -> Option<String> {
    let (_, rest) = message.split_once("execution reverted: ")?;
    let reason = rest.split(',').next().unwrap_or(rest).trim();
    if reason.is_empty() {
        None
    } else {
        Some(reason.to_string())
    }
}
