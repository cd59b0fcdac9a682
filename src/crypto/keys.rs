//! ECDSA signing for transparent inputs
//!
//! DER signatures over transaction signature hashes and their verification
//! on the secp256k1 curve (same as Bitcoin and Zcash transparent addresses).

use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use crate::core::script::SigHashType;

/// Length of a compressed secp256k1 public key
pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// Parse a public key that must be in 33 byte compressed form
pub fn compressed_public_key(bytes: &[u8]) -> Result<PublicKey, KeyError> {
    if bytes.len() != COMPRESSED_PUBLIC_KEY_LEN {
        return Err(KeyError::InvalidPublicKey);
    }
    PublicKey::from_slice(bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Sign a 32 byte signature hash.
///
/// Returns the DER encoded, low-S signature followed by the sighash type
/// byte, which is the form pushed into a scriptSig.
pub fn sign_sighash(secret_key: &SecretKey, sighash: &[u8; 32], hash_type: SigHashType) -> Vec<u8> {
    let secp = Secp256k1::signing_only();
    let message = Message::from_digest(*sighash);
    let signature = secp.sign_ecdsa(&message, secret_key);

    let mut encoded = signature.serialize_der().to_vec();
    encoded.push(hash_type.as_byte());
    encoded
}

/// Verify a scriptSig signature (DER plus trailing sighash byte)
pub fn verify_sighash(
    public_key: &PublicKey,
    sighash: &[u8; 32],
    signature_with_type: &[u8],
) -> Result<bool, KeyError> {
    let (_hash_type, der) = signature_with_type
        .split_last()
        .ok_or(KeyError::InvalidSignature)?;

    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(*sighash);
    let signature = Signature::from_der(der).map_err(|_| KeyError::InvalidSignature)?;

    Ok(secp.verify_ecdsa(&message, &signature, public_key).is_ok())
}

/// Random key pair for tests
#[cfg(test)]
pub(crate) struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

#[cfg(test)]
impl KeyPair {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut rand::rngs::OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    pub fn public_key_bytes(&self) -> [u8; COMPRESSED_PUBLIC_KEY_LEN] {
        self.public_key.serialize()
    }
}
