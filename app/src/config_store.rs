use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use blake3::Hasher as Blake3;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blockchain::{Address, Amount};
use crate::chain::{ChainId, NativeCurrency, TargetChain};
use crate::connection_store::DEFAULT_RECORD_TTL_HOURS;
use crate::errors::{WalletError, WalletResult};
use crate::storage::AppPaths;

const CONFIG_VERSION: u16 = 1;

pub const DEFAULT_METADATA_BASE_URL: &str = "https://secure-metadata-api-beeish.vercel.app";
pub const DEFAULT_ASSET_GATEWAY: &str = "https://beeishxyz.mypinata.cloud/ipfs/";
/// 0.004 ETH
pub const DEFAULT_MINT_PRICE_WEI: u128 = 4_000_000_000_000_000;
pub const DEFAULT_MAX_PER_MINT: u64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub rpc_url: String,
    pub explorer_url: String,
    pub native_currency: NativeCurrency,
}

impl NetworkConfig {
    pub fn target_chain(&self) -> TargetChain {
        TargetChain {
            chain_id: self.chain_id,
            name: self.chain_name.clone(),
            rpc_url: self.rpc_url.clone(),
            explorer_url: self.explorer_url.clone(),
            native_currency: self.native_currency.clone(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let chain = TargetChain::abstract_mainnet();
        Self {
            chain_id: chain.chain_id,
            chain_name: chain.name,
            rpc_url: chain.rpc_url,
            explorer_url: chain.explorer_url,
            native_currency: chain.native_currency,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a saved wallet connection stays eligible for silent reconnection.
    pub record_ttl_hours: u32,
}

impl SessionConfig {
    pub fn record_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.record_ttl_hours))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            record_ttl_hours: DEFAULT_RECORD_TTL_HOURS as u32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    pub metadata_base_url: String,
    pub reveal_upstream_url: String,
    pub asset_gateway: String,
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            metadata_base_url: DEFAULT_METADATA_BASE_URL.to_string(),
            reveal_upstream_url: DEFAULT_METADATA_BASE_URL.to_string(),
            asset_gateway: DEFAULT_ASSET_GATEWAY.to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractConfig {
    /// Zero until deployed collection address is configured.
    pub address: Address,
    pub price_per_token_wei: u128,
    pub max_per_mint: u64,
}

impl ContractConfig {
    pub fn price_per_token(&self) -> Amount {
        Amount::from_wei(self.price_per_token_wei)
    }

    pub fn is_configured(&self) -> bool {
        !self.address.is_zero()
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: Address::ZERO,
            price_per_token_wei: DEFAULT_MINT_PRICE_WEI,
            max_per_mint: DEFAULT_MAX_PER_MINT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub session: SessionConfig,
    pub api: ApiConfig,
    pub contract: ContractConfig,
    pub environment: String,
    pub last_updated: DateTime<Utc>,
    pub version: u16,
}

impl AppConfig {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            network: NetworkConfig::default(),
            session: SessionConfig::default(),
            api: ApiConfig::default(),
            contract: ContractConfig::default(),
            environment: environment.into(),
            last_updated: Utc::now(),
            version: CONFIG_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    pub fn validate(&self) -> WalletResult<()> {
        if self.session.record_ttl_hours == 0 {
            return Err(WalletError::ConfigError(
                "session.record_ttl_hours must be positive".to_string(),
            ));
        }
        if self.contract.max_per_mint == 0 {
            return Err(WalletError::ConfigError(
                "contract.max_per_mint must be positive".to_string(),
            ));
        }
        for (name, url) in [
            ("network.rpc_url", &self.network.rpc_url),
            ("api.metadata_base_url", &self.api.metadata_base_url),
            ("api.reveal_upstream_url", &self.api.reveal_upstream_url),
            ("api.asset_gateway", &self.api.asset_gateway),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(WalletError::ConfigError(format!(
                    "{} must be an http(s) URL, got {:?}",
                    name, url
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigEnvelope {
    version: u16,
    checksum: [u8; 32],
    payload: AppConfig,
    modified_at_unix: i64,
}

/// Handles persistence of application configuration with integrity checks.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn from_paths(paths: &AppPaths) -> Self {
        Self {
            path: paths.config_file().to_path_buf(),
        }
    }

    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load_or_default(&self, environment: impl Into<String>) -> WalletResult<AppConfig> {
        if !self.path.exists() {
            let config = AppConfig::new(environment);
            self.save(&config)?;
            log::info!("Wrote default configuration to {}", self.path.display());
            return Ok(config);
        }

        let bytes = fs::read(&self.path)?;
        let envelope: ConfigEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version != CONFIG_VERSION {
            return Err(WalletError::ConfigError(format!(
                "Unsupported config version {}",
                envelope.version
            )));
        }

        if checksum(&envelope.payload)? != envelope.checksum {
            return Err(WalletError::ConfigError(
                "Config integrity verification failed".to_string(),
            ));
        }

        envelope.payload.validate()?;
        Ok(envelope.payload)
    }

    pub fn save(&self, config: &AppConfig) -> WalletResult<()> {
        config.validate()?;
        let mut payload = config.clone();
        payload.touch();

        let envelope = ConfigEnvelope {
            version: CONFIG_VERSION,
            checksum: checksum(&payload)?,
            modified_at_unix: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map_err(|e| WalletError::StorageError(e.to_string()))?
                .as_secs() as i64,
            payload,
        };

        let serialized = serde_json::to_vec_pretty(&envelope)?;
        let tmp_path = self.path.with_extension("new");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&serialized)?;
            file.sync_all()?;
        }
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }

    pub fn update<F>(&self, environment: impl Into<String>, updater: F) -> WalletResult<AppConfig>
    where
        F: FnOnce(&mut AppConfig) -> WalletResult<()>,
    {
        let mut config = self.load_or_default(environment)?;
        updater(&mut config)?;
        config.touch();
        self.save(&config)?;
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn checksum(config: &AppConfig) -> WalletResult<[u8; 32]> {
    let mut hasher = Blake3::new();
    let encoded = serde_json::to_vec(config)?;
    hasher.update(&encoded);
    let mut output = [0u8; 32];
    output.copy_from_slice(hasher.finalize().as_bytes());
    Ok(output)
}
