use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{WalletError, WalletResult};

/// Manages filesystem paths used by the application backend.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Root directory for application data.
    root_dir: PathBuf,
    /// Directory backing the local key-value store.
    local_storage_dir: PathBuf,
    /// Path to persisted application configuration.
    config_file: PathBuf,
}

impl AppPaths {
    pub const CONFIG_FILENAME: &'static str = "beeish.config";
    pub const LOCAL_STORAGE_DIRNAME: &'static str = "local-storage";

    /// Create a new path manager rooted at the provided directory.
    pub fn new(root: impl AsRef<Path>) -> WalletResult<Self> {
        let root_dir = root.as_ref().to_path_buf();
        if root_dir.as_os_str().is_empty() {
            return Err(WalletError::StorageError(
                "Application root directory cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            local_storage_dir: root_dir.join(Self::LOCAL_STORAGE_DIRNAME),
            config_file: root_dir.join(Self::CONFIG_FILENAME),
            root_dir,
        })
    }

    /// Ensure the directory structure exists, creating missing folders.
    pub fn ensure_directories(&self) -> WalletResult<()> {
        fs::create_dir_all(&self.root_dir)?;
        fs::create_dir_all(&self.local_storage_dir)?;
        Ok(())
    }

    pub fn local_storage_dir(&self) -> &Path {
        &self.local_storage_dir
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}
