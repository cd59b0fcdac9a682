//! Core chain primitives
//!
//! This module contains the fundamental building blocks:
//! - Network parameters (coin types, address prefixes, consensus branch ids)
//! - Amounts in integer base units
//! - Transparent addresses (P2PKH, P2SH)
//! - Script primitives
//! - Transactions (v4 serialization, ZIP-243 signature hash)

pub mod address;
pub mod amount;
pub mod network;
pub mod script;
pub mod transaction;

pub use address::{
    encode_address, p2pkh_address, p2sh_address, AddressError, AddressKind, TransparentAddress,
};
pub use amount::{format_zec, parse_zec, zec_to_zatoshi, AmountError, COIN};
pub use network::{
    Network, TxParams, BRANCH_ID_NU5, BRANCH_ID_NU6, BRANCH_ID_NU6_1, ZIP48_PURPOSE,
    ZIP48_SCRIPT_TYPE,
};
pub use script::{encode_small_int, Script, ScriptError, SigHashType};
pub use transaction::{
    OutPoint, Transaction, TransactionBuilder, TransactionError, TxIn, TxOut, SEQUENCE_FINAL,
    TX_VERSION,
};
