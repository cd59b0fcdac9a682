//! Transparent M-of-N multisig wallets
//!
//! Provides threshold wallets where M signatures from N participants are
//! required to spend from a P2SH address.
//!
//! # Example
//!
//! ```ignore
//! use zec_multisig::core::Network;
//! use zec_multisig::multisig::{create_multisig_wallet, WalletOptions};
//!
//! // 2-of-3 wallet on testnet from three participants' mnemonics
//! let wallet = create_multisig_wallet(&mnemonics, 2, &WalletOptions::new(Network::Testnet))?;
//! println!("{} {}", wallet.address, wallet.redeem_script);
//!
//! // Spend from it through a chain backend
//! let manager = MultisigManager::new(backend, TxParams::default());
//! let result = manager.send(options).await?;
//! ```

pub mod manager;
pub mod script;
pub mod spend;
pub mod wallet;

use thiserror::Error;

use crate::core::{AddressError, AmountError, ScriptError, TransactionError};
use crate::crypto::KeyError;
use crate::hd::DerivationError;
use crate::rpc::BackendError;

pub use manager::{MultisigManager, SendOptions, SendResult};
pub use script::{build_multisig_script, MultisigScript, MAX_MULTISIG_KEYS};
pub use spend::{build_and_sign_spend, SignedTransaction, SignerKey, SpendRequest, Utxo};
pub use wallet::{
    create_multisig_wallet, create_wallet_with_signers, derive_signer_keys, MultisigWallet,
    Participant, WalletKeys, WalletOptions,
};

/// Errors related to multisig operations
#[derive(Error, Debug)]
pub enum MultisigError {
    #[error("Public key {index} is not a 33 byte compressed key ({len} bytes)")]
    InvalidPublicKeyEncoding { index: usize, len: usize },
    #[error("Invalid threshold {threshold} for {keys} keys (need 1 <= M <= N <= 16)")]
    InvalidThreshold { threshold: usize, keys: usize },
    #[error("Duplicate public key: {0}")]
    DuplicatePublicKey(String),
    #[error("At least one participant mnemonic is required")]
    NoParticipants,
    #[error("Invalid {field}: must be greater than zero")]
    InvalidAmount { field: &'static str },
    #[error("No spendable outputs")]
    NoInputs,
    #[error("Insufficient funds: have {available}, need {required} zatoshi")]
    InsufficientFunds { available: u64, required: u64 },
    #[error("Insufficient signers: have {available}, need {required}")]
    InsufficientSigners { available: usize, required: usize },
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),
    #[error("Derivation error: {0}")]
    Derivation(#[from] DerivationError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),
    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
