use std::{fs, path::PathBuf};

use common::ledger::{DEFAULT_CHAIN_ID, DEFAULT_CONTRACT_ADDRESS};
use common::store::{Gateway, DEFAULT_PINATA_API_URL};
use serde::{Deserialize, Serialize};
use url::Url;

pub const APP_NAME: &str = "timevault";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STORAGE_FILE_NAME: &str = "storage.json";
/// Overrides `store.jwt` from the config file
pub const PINATA_JWT_ENV: &str = "TIMEVAULT_PINATA_JWT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// JSON-RPC endpoint of the wallet (EIP-1193 over HTTP)
    #[serde(default = "default_rpc_url")]
    pub rpc_url: Url,
    #[serde(default = "default_accounts_poll_secs")]
    pub accounts_poll_secs: u64,
}

fn default_rpc_url() -> Url {
    Url::parse("http://localhost:8545").expect("hardcoded URL must parse")
}

fn default_accounts_poll_secs() -> u64 {
    2
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            accounts_poll_secs: default_accounts_poll_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Without the ledger, uploads go straight to the pinning service
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_contract_address")]
    pub contract_address: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_receipt_poll_millis")]
    pub receipt_poll_millis: u64,
}

fn default_true() -> bool {
    true
}

fn default_contract_address() -> String {
    DEFAULT_CONTRACT_ADDRESS.to_string()
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

fn default_receipt_poll_millis() -> u64 {
    1000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contract_address: default_contract_address(),
            chain_id: default_chain_id(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            receipt_poll_millis: default_receipt_poll_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_api_url")]
    pub api_url: Url,
    /// Pinning service bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
    /// `subdomain:<domain>` or a path-style gateway URL
    #[serde(default)]
    pub gateway: Gateway,
}

fn default_api_url() -> Url {
    Url::parse(DEFAULT_PINATA_API_URL).expect("hardcoded URL must parse")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            jwt: None,
            gateway: Gateway::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_interval_secs")]
    pub balance_interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    30
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            balance_interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Daily-rolling log files go here when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the timevault directory (~/.timevault)
    pub timevault_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Path to the persisted wallet session
    pub storage_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the timevault directory path (custom or default ~/.timevault)
    pub fn timevault_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new timevault state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let timevault_dir = Self::timevault_dir(custom_path)?;

        if timevault_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&timevault_dir)?;

        let config = config.unwrap_or_default();
        let config_path = timevault_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        let storage_path = timevault_dir.join(STORAGE_FILE_NAME);
        fs::write(&storage_path, "{}")?;

        Ok(Self {
            timevault_dir,
            config_path,
            storage_path,
            config,
        })
    }

    /// Load existing state from the timevault directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let timevault_dir = Self::timevault_dir(custom_path)?;

        if !timevault_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = timevault_dir.join(CONFIG_FILE_NAME);
        let storage_path = timevault_dir.join(STORAGE_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            timevault_dir,
            config_path,
            storage_path,
            config,
        })
    }

    /// Pinning token, with the environment taking precedence over the file
    pub fn pinata_jwt(&self) -> Option<String> {
        match std::env::var(PINATA_JWT_ENV) {
            Ok(token) if !token.trim().is_empty() => Some(token),
            _ => self.config.store.jwt.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("timevault directory not initialized. Run 'timevault init' first")]
    NotInitialized,

    #[error("timevault directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("tv");

        let state = AppState::init(Some(dir.clone()), None).unwrap();
        assert!(state.config_path.exists());
        assert_eq!(fs::read_to_string(&state.storage_path).unwrap(), "{}");

        let loaded = AppState::load(Some(dir.clone())).unwrap();
        assert!(loaded.config.ledger.enabled);
        assert_eq!(loaded.config.ledger.chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(loaded.config.refresh.interval_secs, 30);

        assert!(matches!(
            AppState::init(Some(dir), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            AppState::load(Some(temp.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [ledger]
            enabled = false

            [store]
            gateway = "subdomain:ipfs.dweb.link"
            "#,
        )
        .unwrap();
        assert!(!config.ledger.enabled);
        assert_eq!(config.ledger.contract_address, DEFAULT_CONTRACT_ADDRESS);
        assert_eq!(config.store.gateway, Gateway::default());
        assert_eq!(config.wallet.accounts_poll_secs, 2);
        assert_eq!(config.log.level, "warn");
    }
}
