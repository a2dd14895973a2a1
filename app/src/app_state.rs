use std::path::PathBuf;
use std::sync::Arc;

use crate::blockchain_client::BlockchainClient;
use crate::config_store::{AppConfig, ConfigStore};
use crate::connection_store::ConnectionStore;
use crate::coordinator::SessionCoordinator;
use crate::errors::WalletResult;
use crate::metadata::MetadataClient;
use crate::minting::MintService;
use crate::providers::{EmbeddedWallet, InjectedProvider};
use crate::security::Environment;
use crate::storage::{AppPaths, FileKeyValueStore, KeyValueStore};

/// Everything one application instance needs, built once at startup and
/// passed explicitly to whoever needs it.
pub struct AppContext {
    paths: AppPaths,
    config_store: ConfigStore,
    config: AppConfig,
    local_storage: Arc<dyn KeyValueStore>,
    environment: Environment,
}

impl AppContext {
    pub fn initialize(root_dir: PathBuf, environment: Environment) -> WalletResult<Self> {
        let paths = AppPaths::new(&root_dir)?;
        paths.ensure_directories()?;

        let config_store = ConfigStore::from_paths(&paths);
        let config = config_store.load_or_default(environment.as_str())?;
        let local_storage: Arc<dyn KeyValueStore> =
            Arc::new(FileKeyValueStore::new(paths.local_storage_dir()));

        log::info!(
            "Initialized {} context at {}",
            environment.as_str(),
            paths.root_dir().display()
        );

        Ok(Self {
            paths,
            config_store,
            config,
            local_storage,
            environment,
        })
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn update_config<F>(&mut self, updater: F) -> WalletResult<&AppConfig>
    where
        F: FnOnce(&mut AppConfig) -> WalletResult<()>,
    {
        self.config = self
            .config_store
            .update(self.environment.as_str(), updater)?;
        Ok(&self.config)
    }

    pub fn connection_store(&self) -> ConnectionStore {
        ConnectionStore::new(Arc::clone(&self.local_storage))
            .with_ttl(self.config.session.record_ttl())
    }

    /// A coordinator over the given wallet sources. Call `start` on it once mounted.
    pub fn build_coordinator(
        &self,
        injected: Arc<dyn InjectedProvider>,
        embedded: Arc<dyn EmbeddedWallet>,
    ) -> Arc<SessionCoordinator> {
        Arc::new(SessionCoordinator::new(
            injected,
            embedded,
            self.connection_store(),
            self.config.network.target_chain(),
        ))
    }

    pub fn mint_service(&self, coordinator: Arc<SessionCoordinator>) -> WalletResult<MintService> {
        MintService::new(coordinator, self.config.contract.clone())
    }

    pub fn blockchain_client(&self) -> WalletResult<BlockchainClient> {
        BlockchainClient::new(&self.config.network.rpc_url, self.config.api.request_timeout())
    }

    pub fn metadata_client(&self) -> WalletResult<MetadataClient> {
        MetadataClient::new(
            &self.config.api.metadata_base_url,
            &self.config.api.asset_gateway,
            self.config.api.request_timeout(),
        )
    }
}
