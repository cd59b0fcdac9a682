//! BIP-32 extended key nodes
//!
//! A [`KeyNode`] is a value: it carries its depth, chain code, optional
//! private key, public key and the path that produced it. Only the nodes on
//! the path being walked are ever materialised.
//!
//! Reference: https://github.com/bitcoin/bips/blob/master/bip-0032.mediawiki

use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::Sha512;
use std::fmt;

use super::seed::Seed;
use super::DerivationError;
use crate::crypto::{base58check_decode, base58check_encode, hash160};

type HmacSha512 = Hmac<Sha512>;

/// Child indices at or above this value are hardened
pub const HARDENED_OFFSET: u32 = 1 << 31;

/// Version bytes of serialized extended public keys (`xpub`)
pub const XPUB_VERSION: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];

/// Version bytes of serialized extended private keys (`xprv`)
pub const XPRV_VERSION: [u8; 4] = [0x04, 0x88, 0xAD, 0xE4];

/// Path marker for nodes imported from an extended key below the root
pub const IMPORTED_PATH: &str = "<imported>";

const EXTENDED_KEY_LEN: usize = 78;

/// An extended key: key material plus chain code and position in the tree
#[derive(Clone, PartialEq, Eq)]
pub struct KeyNode {
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
    chain_code: [u8; 32],
    private_key: Option<SecretKey>,
    public_key: PublicKey,
    path: String,
}

impl KeyNode {
    /// Create the master node from a BIP-39 seed
    pub fn master(seed: &Seed) -> Result<Self, DerivationError> {
        Self::from_seed_bytes(seed.as_bytes())
    }

    /// Create the master node from raw seed bytes (HMAC-SHA512 keyed with
    /// "Bitcoin seed"). BIP-32 allows seeds of 16 to 64 bytes.
    pub fn from_seed_bytes(seed: &[u8]) -> Result<Self, DerivationError> {
        if !(16..=64).contains(&seed.len()) {
            return Err(DerivationError::InvalidExtendedKey(format!(
                "seed must be 16 to 64 bytes, got {}",
                seed.len()
            )));
        }

        let mut mac = HmacSha512::new_from_slice(b"Bitcoin seed")
            .map_err(|_| DerivationError::InvalidDerivedKey)?;
        mac.update(seed);
        let result = mac.finalize().into_bytes();

        let private_key =
            SecretKey::from_slice(&result[..32]).map_err(|_| DerivationError::InvalidDerivedKey)?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&result[32..]);

        let secp = Secp256k1::signing_only();
        Ok(Self {
            depth: 0,
            parent_fingerprint: [0; 4],
            child_number: 0,
            chain_code,
            public_key: PublicKey::from_secret_key(&secp, &private_key),
            private_key: Some(private_key),
            path: "m".to_string(),
        })
    }

    /// Derive the child at `index` (hardened when `index >= 2^31`)
    pub fn derive_child(&self, index: u32) -> Result<Self, DerivationError> {
        let hardened = index >= HARDENED_OFFSET;

        let mut mac = HmacSha512::new_from_slice(&self.chain_code)
            .map_err(|_| DerivationError::InvalidDerivedKey)?;
        if hardened {
            // HMAC(chain_code, 0x00 || private_key || index)
            let private_key = self
                .private_key
                .as_ref()
                .ok_or(DerivationError::CannotDeriveHardenedFromPublic)?;
            mac.update(&[0x00]);
            mac.update(&private_key.secret_bytes());
        } else {
            // HMAC(chain_code, public_key || index)
            mac.update(&self.public_key.serialize());
        }
        mac.update(&index.to_be_bytes());
        let result = mac.finalize().into_bytes();

        let mut tweak_bytes = [0u8; 32];
        tweak_bytes.copy_from_slice(&result[..32]);
        let tweak =
            Scalar::from_be_bytes(tweak_bytes).map_err(|_| DerivationError::InvalidDerivedKey)?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&result[32..]);

        let (private_key, public_key) = match self.private_key {
            Some(parent) => {
                let child = parent
                    .add_tweak(&tweak)
                    .map_err(|_| DerivationError::InvalidDerivedKey)?;
                let secp = Secp256k1::signing_only();
                (Some(child), PublicKey::from_secret_key(&secp, &child))
            }
            None => {
                let secp = Secp256k1::verification_only();
                let child = self
                    .public_key
                    .add_exp_tweak(&secp, &tweak)
                    .map_err(|_| DerivationError::InvalidDerivedKey)?;
                (None, child)
            }
        };

        let depth = self
            .depth
            .checked_add(1)
            .ok_or(DerivationError::InvalidDerivedKey)?;

        Ok(Self {
            depth,
            parent_fingerprint: self.fingerprint(),
            child_number: index,
            chain_code,
            private_key,
            public_key,
            path: format!("{}/{}", self.path, format_index(index)),
        })
    }

    /// Walk a list of child indices starting at this node
    pub fn derive_indices(&self, indices: &[u32]) -> Result<Self, DerivationError> {
        let mut current = self.clone();
        for &index in indices {
            current = current.derive_child(index)?;
        }
        Ok(current)
    }

    /// Drop the private key, keeping a public-only node
    pub fn neutered(&self) -> Self {
        Self {
            private_key: None,
            ..self.clone()
        }
    }

    pub fn is_neutered(&self) -> bool {
        self.private_key.is_none()
    }

    /// First four bytes of hash160 of the compressed public key
    pub fn fingerprint(&self) -> [u8; 4] {
        let hash = hash160(&self.public_key.serialize());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn child_number(&self) -> u32 {
        self.child_number
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn private_key(&self) -> Option<&SecretKey> {
        self.private_key.as_ref()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// 33 byte compressed public key
    pub fn public_key_bytes(&self) -> [u8; 33] {
        self.public_key.serialize()
    }

    /// Path string that produced this node, e.g. `m/48'/1'/0'/133000'`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Base58-check encoded extended public key
    pub fn to_xpub(&self) -> String {
        let mut data = self.serialize_header(XPUB_VERSION);
        data.extend_from_slice(&self.public_key.serialize());
        base58check_encode(&data)
    }

    /// Base58-check encoded extended private key, `None` for neutered nodes
    pub fn to_xprv(&self) -> Option<String> {
        let private_key = self.private_key.as_ref()?;
        let mut data = self.serialize_header(XPRV_VERSION);
        data.push(0x00);
        data.extend_from_slice(&private_key.secret_bytes());
        Some(base58check_encode(&data))
    }

    /// Parse an `xpub` or `xprv` string
    pub fn from_extended_key(encoded: &str) -> Result<Self, DerivationError> {
        let invalid = |reason: &str| DerivationError::InvalidExtendedKey(reason.to_string());

        let data = base58check_decode(encoded.trim()).ok_or_else(|| invalid("bad checksum"))?;
        if data.len() != EXTENDED_KEY_LEN {
            return Err(invalid("wrong length"));
        }

        let version = [data[0], data[1], data[2], data[3]];
        let depth = data[4];
        let parent_fingerprint = [data[5], data[6], data[7], data[8]];
        let child_number = u32::from_be_bytes([data[9], data[10], data[11], data[12]]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&data[13..45]);
        let key_data = &data[45..];

        if depth == 0 && (parent_fingerprint != [0; 4] || child_number != 0) {
            return Err(invalid("master key with parent information"));
        }

        let (private_key, public_key) = match version {
            XPRV_VERSION => {
                if key_data[0] != 0x00 {
                    return Err(invalid("private key data must start with 0x00"));
                }
                let private_key = SecretKey::from_slice(&key_data[1..])
                    .map_err(|_| invalid("private key out of range"))?;
                let secp = Secp256k1::signing_only();
                (
                    Some(private_key),
                    PublicKey::from_secret_key(&secp, &private_key),
                )
            }
            XPUB_VERSION => {
                let public_key =
                    PublicKey::from_slice(key_data).map_err(|_| invalid("bad public key"))?;
                (None, public_key)
            }
            _ => return Err(invalid("unknown version bytes")),
        };

        let path = if depth == 0 { "m" } else { IMPORTED_PATH };

        Ok(Self {
            depth,
            parent_fingerprint,
            child_number,
            chain_code,
            private_key,
            public_key,
            path: path.to_string(),
        })
    }

    /// Re-label the node with the path it is known to sit at
    pub(crate) fn with_path(mut self, path: String) -> Self {
        self.path = path;
        self
    }

    fn serialize_header(&self, version: [u8; 4]) -> Vec<u8> {
        let mut data = Vec::with_capacity(EXTENDED_KEY_LEN);
        data.extend_from_slice(&version);
        data.push(self.depth);
        data.extend_from_slice(&self.parent_fingerprint);
        data.extend_from_slice(&self.child_number.to_be_bytes());
        data.extend_from_slice(&self.chain_code);
        data
    }
}

impl fmt::Debug for KeyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyNode")
            .field("path", &self.path)
            .field("depth", &self.depth)
            .field("public_key", &hex::encode(self.public_key.serialize()))
            .field("has_private_key", &self.private_key.is_some())
            .finish()
    }
}

/// Render a child index as a path component (`5` or `48'`)
pub fn format_index(index: u32) -> String {
    if index >= HARDENED_OFFSET {
        format!("{}'", index - HARDENED_OFFSET)
    } else {
        index.to_string()
    }
}
