//! Chain backend collaborators
//!
//! The signing pipeline never talks to the network itself. UTXO lookup,
//! watch-only import and broadcast go through [`ChainBackend`], which is
//! implemented over JSON-RPC by [`JsonRpcBackend`] and in memory by tests.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::amount::{zec_to_zatoshi, AmountError};
use crate::multisig::spend::Utxo;

pub use client::JsonRpcBackend;

/// Substring the node uses when a script or address is already being watched
pub const ALREADY_IMPORTED: &str = "is already imported";

/// Errors reported by a chain backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// True for the error a node returns when re-importing a watched script
    pub fn is_already_imported(&self) -> bool {
        match self {
            BackendError::Rpc { message, .. } => message.contains(ALREADY_IMPORTED),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Transport(e.to_string())
    }
}

/// An unspent output as returned by `listunspent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcUtxo {
    pub txid: String,
    pub vout: u32,
    /// Value in ZEC
    pub amount: f64,
    #[serde(default)]
    pub confirmations: u32,
    #[serde(rename = "scriptPubKey", default)]
    pub script_pub_key: String,
    #[serde(default = "default_spendable")]
    pub spendable: bool,
}

fn default_spendable() -> bool {
    true
}

impl RpcUtxo {
    /// Convert to base units, rounding the ZEC float to the nearest zatoshi
    pub fn to_utxo(&self) -> Result<Utxo, AmountError> {
        Ok(Utxo {
            txid: self.txid.clone(),
            output_index: self.vout,
            amount: zec_to_zatoshi(self.amount)?,
            locking_script: self.script_pub_key.clone(),
            confirmations: self.confirmations,
        })
    }
}

/// Lookup, watch-only import and broadcast
#[async_trait]
pub trait ChainBackend: Send + Sync {
    /// Unspent outputs paying to `address`
    async fn list_unspent(&self, address: &str) -> Result<Vec<RpcUtxo>, BackendError>;

    /// Watch a script (`p2sh = true`, hex redeem script) or an address
    async fn import_watch_only(&self, script_or_address: &str, p2sh: bool)
        -> Result<(), BackendError>;

    /// Broadcast a hex encoded raw transaction, returning its id
    async fn send_raw_transaction(&self, raw_hex: &str) -> Result<String, BackendError>;
}

/// Backend for offline signing; every call fails
pub struct OfflineBackend;

#[async_trait]
impl ChainBackend for OfflineBackend {
    async fn list_unspent(&self, _address: &str) -> Result<Vec<RpcUtxo>, BackendError> {
        Err(offline())
    }

    async fn import_watch_only(
        &self,
        _script_or_address: &str,
        _p2sh: bool,
    ) -> Result<(), BackendError> {
        Err(offline())
    }

    async fn send_raw_transaction(&self, _raw_hex: &str) -> Result<String, BackendError> {
        Err(offline())
    }
}

fn offline() -> BackendError {
    BackendError::Transport("no RPC endpoint configured".to_string())
}

/// Import the redeem script and then the address as watch-only.
///
/// "Already imported" errors are treated as success; anything else aborts.
pub async fn import_watch_only_idempotent<B: ChainBackend + ?Sized>(
    backend: &B,
    address: &str,
    redeem_script_hex: &str,
) -> Result<(), BackendError> {
    swallow_already_imported(backend.import_watch_only(redeem_script_hex, true).await)?;
    swallow_already_imported(backend.import_watch_only(address, false).await)?;
    log::info!("Watch-only import complete for {}", address);
    Ok(())
}

fn swallow_already_imported(result: Result<(), BackendError>) -> Result<(), BackendError> {
    match result {
        Err(e) if e.is_already_imported() => {
            log::debug!("Ignoring: {}", e);
            Ok(())
        }
        other => other,
    }
}
