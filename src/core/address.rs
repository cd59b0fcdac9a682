//! Transparent address encoding
//!
//! Address = Base58Check(prefix[2] || hash160), where the two byte prefix
//! selects both the network and the address kind (P2PKH or P2SH).

use crate::core::network::Network;
use crate::core::script::Script;
use crate::crypto::{base58check_decode, base58check_encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid base58-check encoding: {0}")]
    InvalidEncoding(String),
    #[error("Invalid address length: {0} bytes (expected 22)")]
    InvalidLength(usize),
    #[error("Unknown address prefix: {0:02x}{1:02x}")]
    UnknownPrefix(u8, u8),
    #[error("Address is for {found}, expected {expected}")]
    WrongNetwork { expected: Network, found: Network },
}

/// Kind of transparent address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressKind {
    P2pkh,
    P2sh,
}

/// A decoded transparent address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransparentAddress {
    pub network: Network,
    pub kind: AddressKind,
    pub hash: [u8; 20],
}

impl TransparentAddress {
    /// Decode and classify a transparent address string
    pub fn decode(address: &str) -> Result<Self, AddressError> {
        let payload = base58check_decode(address.trim())
            .ok_or_else(|| AddressError::InvalidEncoding(address.to_string()))?;
        if payload.len() != 22 {
            return Err(AddressError::InvalidLength(payload.len()));
        }

        let prefix = [payload[0], payload[1]];
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[2..]);

        for network in Network::all() {
            if prefix == network.p2pkh_prefix() {
                return Ok(Self {
                    network,
                    kind: AddressKind::P2pkh,
                    hash,
                });
            }
            if prefix == network.p2sh_prefix() {
                return Ok(Self {
                    network,
                    kind: AddressKind::P2sh,
                    hash,
                });
            }
        }

        Err(AddressError::UnknownPrefix(prefix[0], prefix[1]))
    }

    /// Decode an address and require it to belong to `network`
    pub fn decode_for(address: &str, network: Network) -> Result<Self, AddressError> {
        let decoded = Self::decode(address)?;
        if decoded.network != network {
            return Err(AddressError::WrongNetwork {
                expected: network,
                found: decoded.network,
            });
        }
        Ok(decoded)
    }

    /// Locking script paying to this address
    pub fn script_pubkey(&self) -> Script {
        match self.kind {
            AddressKind::P2pkh => Script::p2pkh(&self.hash),
            AddressKind::P2sh => Script::p2sh(&self.hash),
        }
    }

    pub fn encode(&self) -> String {
        let prefix = match self.kind {
            AddressKind::P2pkh => self.network.p2pkh_prefix(),
            AddressKind::P2sh => self.network.p2sh_prefix(),
        };
        encode_address(prefix, &self.hash)
    }
}

impl fmt::Display for TransparentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Base58-check encode a two byte prefix followed by a 20 byte hash
pub fn encode_address(prefix: [u8; 2], hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(22);
    payload.extend_from_slice(&prefix);
    payload.extend_from_slice(hash);
    base58check_encode(&payload)
}

/// P2SH address for a script hash
pub fn p2sh_address(network: Network, script_hash: &[u8; 20]) -> String {
    encode_address(network.p2sh_prefix(), script_hash)
}

/// P2PKH address for a public key hash
pub fn p2pkh_address(network: Network, pubkey_hash: &[u8; 20]) -> String {
    encode_address(network.p2pkh_prefix(), pubkey_hash)
}
