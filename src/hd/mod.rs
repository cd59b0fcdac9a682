//! Hierarchical deterministic key derivation
//!
//! Mnemonic → seed → master node → ZIP-48 account node → address node.

pub mod node;
pub mod path;
pub mod seed;

use thiserror::Error;

pub use node::{KeyNode, HARDENED_OFFSET, XPRV_VERSION, XPUB_VERSION};
pub use path::{
    build_path, derive_account_node, derive_address_node, parse_path, DerivationParams,
    DerivedKey, ACCOUNT_DEPTH, MASTER_DEPTH,
};
pub use seed::{derive_seed, generate_mnemonic, validate_mnemonic, Seed};

/// Errors raised while turning mnemonics into key nodes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    #[error("Invalid BIP-39 mnemonic")]
    InvalidMnemonic,
    #[error("Unsupported mnemonic length: {0} words")]
    UnsupportedWordCount(usize),
    #[error("Invalid derivation parameter {field}: {value}")]
    InvalidDerivationParameter { field: &'static str, value: String },
    #[error("Invalid node depth {0}: expected a master (0) or ZIP-48 account (4) node")]
    InvalidNodeDepth(u8),
    #[error("Cannot derive a hardened child from a public-only node")]
    CannotDeriveHardenedFromPublic,
    #[error("Derived key is out of range")]
    InvalidDerivedKey,
    #[error("Invalid extended key: {0}")]
    InvalidExtendedKey(String),
}

/// Master node for `(mnemonic, passphrase)`
pub fn master_from_mnemonic(mnemonic: &str, passphrase: &str) -> Result<KeyNode, DerivationError> {
    let seed = derive_seed(mnemonic, passphrase)?;
    KeyNode::master(&seed)
}
