// lib.rs - Core library structure for the Bee-ish wallet backend

pub mod api;
pub mod app_state;
pub mod blockchain;
pub mod blockchain_client;
pub mod chain;
pub mod config_store;
pub mod connection_store;
pub mod contract;
pub mod coordinator;
pub mod errors;
pub mod metadata;
pub mod minting;
pub mod notices;
pub mod providers;
pub mod reconcile;
pub mod reveal;
pub mod security;
pub mod server;
pub mod session;
pub mod storage;
pub mod validation;

// Re-export common types
pub use app_state::AppContext;
pub use blockchain::{Address, Amount};
pub use blockchain_client::BlockchainClient;
pub use chain::{ChainId, TargetChain};
pub use config_store::{AppConfig, ConfigStore};
pub use connection_store::{ConnectionRecord, ConnectionStore};
pub use coordinator::{ActionOutcome, SessionCoordinator};
pub use errors::{WalletError, WalletResult};
pub use metadata::{MetadataClient, TokenForm, TokenMetadata};
pub use minting::{MintReceipt, MintService};
pub use notices::{Notice, NoticeLevel};
pub use providers::{EmbeddedWallet, InjectedProvider, LiveProviderState, ProviderIdentity};
pub use reveal::{RevealClient, RevealProxy};
pub use security::{Environment, SecurityConfig};
pub use session::{UnifiedSession, WalletKind};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use validation::InputValidator;
