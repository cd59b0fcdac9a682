//! Script primitives for transparent outputs and inputs
//!
//! Only the small subset of the Bitcoin-derived script language needed for
//! P2PKH, P2SH and bare checkmultisig scripts is modelled here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Opcodes
// =============================================================================

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
/// Base of the small integer opcodes: `OP_k = OP_RESERVED + k` for 1..=16
pub const OP_RESERVED: u8 = 0x50;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// Largest value a small integer opcode can push
pub const MAX_SMALL_INT: u8 = 16;

// =============================================================================
// Script Errors
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Small integer out of range: {0} (expected 0..=16)")]
    SmallIntOutOfRange(usize),
    #[error("Script too large: {0} bytes")]
    ScriptTooLarge(usize),
}

// =============================================================================
// Signature Hash Types
// =============================================================================

/// Signature hash type appended to every signature
///
/// Only `SIGHASH_ALL` is produced: every input signs all inputs and outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum SigHashType {
    #[default]
    All = 0x01,
}

impl SigHashType {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Value committed to by the signature hash (four bytes little-endian)
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

// =============================================================================
// Script
// =============================================================================

/// Encode `k` as the opcode that pushes it (`OP_0`, `OP_1` … `OP_16`)
pub fn encode_small_int(k: usize) -> Result<u8, ScriptError> {
    match k {
        0 => Ok(OP_0),
        1..=16 => Ok(OP_RESERVED + k as u8),
        _ => Err(ScriptError::SmallIntOutOfRange(k)),
    }
}

/// A serialized script
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Append a raw opcode
    pub fn push_opcode(mut self, opcode: u8) -> Self {
        self.0.push(opcode);
        self
    }

    /// Append a small integer opcode
    pub fn push_int(self, k: usize) -> Result<Self, ScriptError> {
        let opcode = encode_small_int(k)?;
        Ok(self.push_opcode(opcode))
    }

    /// Append a data push using the minimal length prefix
    pub fn push_slice(mut self, data: &[u8]) -> Result<Self, ScriptError> {
        let len = data.len();
        match len {
            0..=0x4b => self.0.push(len as u8),
            0x4c..=0xff => {
                self.0.push(OP_PUSHDATA1);
                self.0.push(len as u8);
            }
            0x100..=0xffff => {
                self.0.push(OP_PUSHDATA2);
                self.0.extend_from_slice(&(len as u16).to_le_bytes());
            }
            _ => return Err(ScriptError::ScriptTooLarge(len)),
        }
        self.0.extend_from_slice(data);
        Ok(self)
    }

    /// `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(25);
        bytes.extend_from_slice(&[OP_DUP, OP_HASH160, 20]);
        bytes.extend_from_slice(pubkey_hash);
        bytes.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Self(bytes)
    }

    /// `OP_HASH160 <20> OP_EQUAL`
    pub fn p2sh(script_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(23);
        bytes.extend_from_slice(&[OP_HASH160, 20]);
        bytes.extend_from_slice(script_hash);
        bytes.push(OP_EQUAL);
        Self(bytes)
    }

    /// Check for the P2SH template
    pub fn is_p2sh(&self) -> bool {
        self.0.len() == 23 && self.0[0] == OP_HASH160 && self.0[1] == 20 && self.0[22] == OP_EQUAL
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// =============================================================================
// Tests
// =============================================================================
