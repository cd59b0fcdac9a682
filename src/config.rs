//! Tool configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! defaults below. Secrets are never stored here: the RPC API key is read
//! from the environment variable the config names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

use crate::core::network::{Network, TxParams};
use crate::multisig::WalletOptions;
use crate::rpc::{BackendError, JsonRpcBackend};

/// Default fee: 0.0001 ZEC
pub const DEFAULT_FEE: u64 = 10_000;

/// Default environment variable holding the RPC API key
pub const DEFAULT_API_KEY_ENV: &str = "ZEC_RPC_API_KEY";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("No RPC endpoint configured")]
    MissingRpc,
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// JSON-RPC endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

impl RpcConfig {
    /// API key from the environment, if set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn backend(&self) -> Result<JsonRpcBackend, ConfigError> {
        Ok(JsonRpcBackend::new(self.url.clone(), self.api_key())?)
    }
}

/// Top level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: Network,
    pub account: u32,
    pub change: u32,
    pub address_index: u32,
    /// Fee in zatoshi
    pub fee: u64,
    pub tx: TxParams,
    pub rpc: Option<RpcConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            account: 0,
            change: 0,
            address_index: 0,
            fee: DEFAULT_FEE,
            tx: TxParams::default(),
            rpc: None,
        }
    }
}

impl Config {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = fs::File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        log::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load from `path` if given and present, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                log::warn!("Config file {:?} not found, using defaults", path);
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Wallet derivation options; the passphrase is supplied separately
    pub fn wallet_options(&self, passphrase: &str) -> WalletOptions {
        WalletOptions {
            network: self.network,
            account: self.account,
            change: self.change,
            address_index: self.address_index,
            passphrase: passphrase.to_string(),
        }
    }

    pub fn rpc_backend(&self) -> Result<JsonRpcBackend, ConfigError> {
        self.rpc.as_ref().ok_or(ConfigError::MissingRpc)?.backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::network::BRANCH_ID_NU6;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.fee, 10_000);
        assert!(config.rpc.is_none());
        assert!(matches!(config.rpc_backend(), Err(ConfigError::MissingRpc)));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "network": "mainnet",
                "tx": { "consensus_branch_id": 3370586197 },
                "rpc": { "url": "http://127.0.0.1:8232" }
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.fee, DEFAULT_FEE);
        assert_eq!(config.tx.consensus_branch_id, BRANCH_ID_NU6);
        assert_eq!(config.tx.expiry_height, 0);
        let rpc = config.rpc.unwrap();
        assert_eq!(rpc.api_key_env, DEFAULT_API_KEY_ENV);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config {
            account: 3,
            fee: 20_000,
            rpc: Some(RpcConfig {
                url: "https://zcash-testnet.example".into(),
                api_key_env: "TEST_ZEC_KEY".into(),
            }),
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(Config::load(&missing).is_err());
        assert_eq!(
            Config::load_or_default(Some(&missing)).unwrap(),
            Config::default()
        );
    }

    #[test]
    fn test_api_key_from_environment() {
        let rpc = RpcConfig {
            url: "http://localhost".into(),
            api_key_env: "ZEC_MULTISIG_CONFIG_TEST_KEY".into(),
        };
        std::env::remove_var(&rpc.api_key_env);
        assert_eq!(rpc.api_key(), None);
        std::env::set_var(&rpc.api_key_env, "  secret  ");
        assert_eq!(rpc.api_key().as_deref(), Some("secret"));
        std::env::remove_var(&rpc.api_key_env);
    }

    #[test]
    fn test_wallet_options() {
        let config = Config {
            account: 1,
            address_index: 7,
            ..Config::default()
        };
        let options = config.wallet_options("pw");
        assert_eq!(options.account, 1);
        assert_eq!(options.address_index, 7);
        assert_eq!(options.passphrase, "pw");
    }
}
