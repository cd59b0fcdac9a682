//! Hashing utilities shared by addresses, scripts and transactions
//!
//! Provides the SHA-256 family used for base58-check and hash160, and the
//! personalised BLAKE2b-256 used by the Zcash v4 signature hash.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes double SHA-256 hash (SHA-256 of SHA-256)
/// Used for base58-check checksums and transaction ids
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD-160 of SHA-256, the hash behind P2PKH and P2SH addresses
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha256(data));
    ripemd.finalize().into()
}

/// First four bytes of double SHA-256
pub fn checksum4(data: &[u8]) -> [u8; 4] {
    let hash = double_sha256(data);
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Base58 encoding with a four byte double SHA-256 checksum appended
pub fn base58check_encode(payload: &[u8]) -> String {
    let mut data = payload.to_vec();
    data.extend_from_slice(&checksum4(payload));
    bs58::encode(data).into_string()
}

/// Decode a base58-check string, returning the payload without checksum.
///
/// Returns `None` if the text is not base58 or the checksum does not match.
pub fn base58check_decode(encoded: &str) -> Option<Vec<u8>> {
    let data = bs58::decode(encoded).into_vec().ok()?;
    if data.len() < 4 {
        return None;
    }
    let (payload, checksum) = data.split_at(data.len() - 4);
    if checksum4(payload) != checksum {
        return None;
    }
    Some(payload.to_vec())
}

/// BLAKE2b with a 32 byte digest and a 16 byte personalisation string
pub fn blake2b_256_personal(personal: &[u8; 16], data: &[u8]) -> [u8; 32] {
    let hash = blake2b_simd::Params::new()
        .hash_length(32)
        .personal(personal)
        .hash(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(hash.as_bytes());
    out
}
