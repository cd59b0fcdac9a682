//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256, hash160 and base58-check
//! - Personalised BLAKE2b for Zcash signature hashes
//! - ECDSA signing and verification (secp256k1)

pub mod hash;
pub mod keys;

pub use hash::{
    base58check_decode, base58check_encode, blake2b_256_personal, checksum4, double_sha256,
    hash160, sha256,
};
pub use keys::{
    compressed_public_key, sign_sighash, verify_sighash, KeyError, COMPRESSED_PUBLIC_KEY_LEN,
};
