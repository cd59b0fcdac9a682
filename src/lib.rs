//! zec-multisig: ZIP-48 transparent multisig wallets for Zcash
//!
//! This crate provides the full pipeline from participant mnemonics to a
//! broadcast spend:
//! - BIP-39 seeds and BIP-32 key derivation along ZIP-48 paths
//!   (`m/48'/coin'/account'/133000'/change/index`)
//! - Sorted M-of-N checkmultisig redeem scripts and P2SH addresses
//! - v4 transaction assembly with ZIP-243 signature hashes
//! - Threshold signing and JSON-RPC broadcast
//!
//! # Example
//!
//! ```ignore
//! use zec_multisig::core::Network;
//! use zec_multisig::multisig::{create_multisig_wallet, WalletOptions};
//!
//! // 2-of-3 wallet from three participants
//! let wallet = create_multisig_wallet(&mnemonics, 2, &WalletOptions::new(Network::Testnet))?;
//! println!("Address: {}", wallet.address);
//! println!("Redeem script: {}", wallet.redeem_script);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod hd;
pub mod multisig;
pub mod rpc;

// Re-export commonly used types
pub use config::{Config, ConfigError, RpcConfig};
pub use crate::core::{Network, Script, Transaction, TransparentAddress, TxParams};
pub use crypto::KeyError;
pub use hd::{DerivationError, DerivationParams, DerivedKey, KeyNode};
pub use multisig::{
    build_and_sign_spend, build_multisig_script, create_multisig_wallet, MultisigError,
    MultisigManager, MultisigScript, MultisigWallet, SendOptions, SendResult, SignedTransaction,
    SpendRequest, Utxo, WalletOptions,
};
pub use rpc::{BackendError, ChainBackend, JsonRpcBackend};
