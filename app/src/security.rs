use crate::errors::{WalletError, WalletResult};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

const KEY_DATA_DIR: &str = "DATA_DIR";
const KEY_BIND_ADDR: &str = "BIND_ADDR";
const KEY_LOG_JSON: &str = "LOG_JSON";

const ENV_ENVIRONMENT: &str = "BEEISH_ENV";
const ENV_REVEAL_PASSCODE: &str = "REVEAL_PASSCODE";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Deployment environment of the server process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" | "testing" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

/// Process-level settings taken from environment variables.
///
/// The reveal passcode is kept apart from the plain settings map so it can
/// never end up in logs or `Debug` output.
#[derive(Debug)]
pub struct SecurityConfig {
    environment: Environment,
    config_map: HashMap<String, String>,
    reveal_passcode: Option<SecretString>,
}

impl SecurityConfig {
    pub fn new(environment: Environment) -> Self {
        let mut config_map = HashMap::new();
        config_map.insert(KEY_BIND_ADDR.to_string(), DEFAULT_BIND_ADDR.to_string());
        config_map.insert(KEY_LOG_JSON.to_string(), "false".to_string());
        Self {
            environment,
            config_map,
            reveal_passcode: None,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> WalletResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> WalletResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup(ENV_ENVIRONMENT)
            .map(|value| Environment::parse(&value))
            .unwrap_or(Environment::Development);

        let mut config = Self::new(environment);
        config.load_from_vars(&lookup);
        config.validate()?;

        log::info!(
            "Server configuration loaded for {} environment (reveal passcode {})",
            environment.as_str(),
            if config.reveal_passcode.is_some() {
                "configured"
            } else {
                "missing"
            }
        );
        Ok(config)
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn data_dir(&self) -> Option<PathBuf> {
        self.config_map.get(KEY_DATA_DIR).map(PathBuf::from)
    }

    pub fn bind_addr(&self) -> WalletResult<SocketAddr> {
        let raw = self
            .config_map
            .get(KEY_BIND_ADDR)
            .map(String::as_str)
            .unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|_| {
            WalletError::ConfigError(format!("Invalid bind address '{}'", raw))
        })
    }

    pub fn log_json(&self) -> bool {
        self.config_map
            .get(KEY_LOG_JSON)
            .map(|value| parse_bool_flag(value))
            .unwrap_or(false)
    }

    /// A fresh handle on the passcode used by the reveal proxy.
    pub fn reveal_passcode(&self) -> Option<SecretString> {
        self.reveal_passcode
            .as_ref()
            .map(|secret| SecretString::from(secret.expose_secret().to_string()))
    }

    pub fn validate(&self) -> WalletResult<()> {
        self.bind_addr()?;
        if self.is_production() && self.reveal_passcode.is_none() {
            log::warn!("{} is not set; reveal requests will fail", ENV_REVEAL_PASSCODE);
        }
        Ok(())
    }

    fn load_from_vars<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_mappings = [
            ("BEEISH_DATA_DIR", KEY_DATA_DIR),
            ("BEEISH_BIND_ADDR", KEY_BIND_ADDR),
            ("BEEISH_LOG_JSON", KEY_LOG_JSON),
        ];

        for (env_var, config_key) in &env_mappings {
            if let Some(value) = accepted_value(env_var, lookup(env_var)) {
                self.config_map.insert(config_key.to_string(), value);
                log::debug!(
                    "Loaded configuration {} from environment variable {}",
                    config_key,
                    env_var
                );
            }
        }

        self.reveal_passcode =
            accepted_value(ENV_REVEAL_PASSCODE, lookup(ENV_REVEAL_PASSCODE)).map(SecretString::from);
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::new(Environment::Development)
    }
}

/// Drop empty values and values carrying control characters.
fn accepted_value(env_var: &str, value: Option<String>) -> Option<String> {
    let value = value?;
    if value.trim().is_empty() {
        log::warn!("Environment variable {} is empty", env_var);
        return None;
    }
    if value.chars().any(|c| c.is_control()) {
        log::warn!(
            "Environment variable {} contains control characters, ignoring",
            env_var
        );
        return None;
    }
    Some(value)
}

fn parse_bool_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
