//! Transparent transaction format
//!
//! Implements the Sapling-era (v4, overwintered) transaction layout with no
//! shielded components, and the ZIP-243 signature hash for transparent
//! inputs.
//!
//! Wire layout:
//! - header (`version | fOverwintered`) and version group id
//! - transparent inputs and outputs
//! - lock time and expiry height
//! - value balance (always 0) and empty shielded spend, output and joinsplit vectors

use crate::core::network::TxParams;
use crate::core::script::{Script, SigHashType};
use crate::crypto::{blake2b_256_personal, double_sha256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Transaction version written in the header
pub const TX_VERSION: u32 = 4;

/// High bit of the header marking an overwintered transaction
pub const OVERWINTER_FLAG: u32 = 1 << 31;

/// Version group id of Sapling (v4) transactions
pub const SAPLING_VERSION_GROUP_ID: u32 = 0x892F_2085;

/// Sequence number that disables lock time for an input
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;

const PERSONAL_SIGHASH_PREFIX: &[u8; 12] = b"ZcashSigHash";
const PERSONAL_PREVOUTS: &[u8; 16] = b"ZcashPrevoutHash";
const PERSONAL_SEQUENCE: &[u8; 16] = b"ZcashSequencHash";
const PERSONAL_OUTPUTS: &[u8; 16] = b"ZcashOutputsHash";

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Invalid transaction id: {0}")]
    InvalidTxid(String),
    #[error("Input index {0} out of range")]
    InputOutOfRange(usize),
    #[error("Output value overflow")]
    ValueOverflow,
}

// =============================================================================
// Inputs and outputs
// =============================================================================

/// Reference to a previous transaction output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
    /// Transaction id in display (RPC) byte order
    pub txid: [u8; 32],
    pub index: u32,
}

impl OutPoint {
    /// Build an outpoint from the hex txid shown by explorers and RPC
    pub fn from_hex(txid: &str, index: u32) -> Result<Self, TransactionError> {
        let bytes = hex::decode(txid.trim())
            .map_err(|_| TransactionError::InvalidTxid(txid.to_string()))?;
        let txid_bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TransactionError::InvalidTxid(txid.to_string()))?;
        Ok(Self {
            txid: txid_bytes,
            index,
        })
    }

    pub fn txid_hex(&self) -> String {
        hex::encode(self.txid)
    }

    /// 36 byte wire form: txid in internal (reversed) order, then index LE
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend(self.txid.iter().rev());
        out.extend_from_slice(&self.index.to_le_bytes());
    }
}

/// Transaction input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
    /// Value of the spent output in zatoshi. Not serialized; committed to by
    /// the signature hash.
    pub value: u64,
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Script,
}

impl TxOut {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.value as i64).to_le_bytes());
        write_var_bytes(out, self.script_pubkey.as_bytes());
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A transparent-only v4 transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub version_group_id: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
    pub expiry_height: u32,
}

impl Transaction {
    fn header(&self) -> u32 {
        self.version | OVERWINTER_FLAG
    }

    /// Raw wire serialization
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            64 + self.inputs.len() * 300 + self.outputs.len() * 34,
        );
        out.extend_from_slice(&self.header().to_le_bytes());
        out.extend_from_slice(&self.version_group_id.to_le_bytes());

        write_compact_size(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            input.prevout.write_to(&mut out);
            write_var_bytes(&mut out, input.script_sig.as_bytes());
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }

        write_compact_size(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write_to(&mut out);
        }

        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out.extend_from_slice(&self.expiry_height.to_le_bytes());
        // valueBalance, nShieldedSpend, nShieldedOutput, nJoinSplit
        out.extend_from_slice(&0i64.to_le_bytes());
        write_compact_size(&mut out, 0);
        write_compact_size(&mut out, 0);
        write_compact_size(&mut out, 0);
        out
    }

    /// Hex encoded raw transaction, the form accepted by `sendrawtransaction`
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Transaction id (double SHA-256, displayed byte-reversed)
    pub fn txid(&self) -> String {
        let mut hash = double_sha256(&self.serialize());
        hash.reverse();
        hex::encode(hash)
    }

    /// Sum of all output values
    pub fn total_output(&self) -> Result<u64, TransactionError> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.value))
            .ok_or(TransactionError::ValueOverflow)
    }

    /// ZIP-243 signature hash for a transparent input.
    ///
    /// `script_code` is the script being satisfied; for P2SH inputs that is
    /// the redeem script, not the P2SH locking script.
    pub fn signature_hash(
        &self,
        input_index: usize,
        script_code: &Script,
        hash_type: SigHashType,
        consensus_branch_id: u32,
    ) -> Result<[u8; 32], TransactionError> {
        let input = self
            .inputs
            .get(input_index)
            .ok_or(TransactionError::InputOutOfRange(input_index))?;

        let mut prevouts = Vec::with_capacity(self.inputs.len() * 36);
        let mut sequences = Vec::with_capacity(self.inputs.len() * 4);
        for txin in &self.inputs {
            txin.prevout.write_to(&mut prevouts);
            sequences.extend_from_slice(&txin.sequence.to_le_bytes());
        }
        let mut outputs = Vec::new();
        for txout in &self.outputs {
            txout.write_to(&mut outputs);
        }

        let mut preimage = Vec::with_capacity(256 + script_code.len());
        preimage.extend_from_slice(&self.header().to_le_bytes());
        preimage.extend_from_slice(&self.version_group_id.to_le_bytes());
        preimage.extend_from_slice(&blake2b_256_personal(PERSONAL_PREVOUTS, &prevouts));
        preimage.extend_from_slice(&blake2b_256_personal(PERSONAL_SEQUENCE, &sequences));
        preimage.extend_from_slice(&blake2b_256_personal(PERSONAL_OUTPUTS, &outputs));
        // hashJoinSplits, hashShieldedSpends, hashShieldedOutputs
        preimage.extend_from_slice(&[0u8; 96]);
        preimage.extend_from_slice(&self.lock_time.to_le_bytes());
        preimage.extend_from_slice(&self.expiry_height.to_le_bytes());
        preimage.extend_from_slice(&0i64.to_le_bytes());
        preimage.extend_from_slice(&hash_type.as_u32().to_le_bytes());

        input.prevout.write_to(&mut preimage);
        write_var_bytes(&mut preimage, script_code.as_bytes());
        preimage.extend_from_slice(&input.value.to_le_bytes());
        preimage.extend_from_slice(&input.sequence.to_le_bytes());

        let mut personal = [0u8; 16];
        personal[..12].copy_from_slice(PERSONAL_SIGHASH_PREFIX);
        personal[12..].copy_from_slice(&consensus_branch_id.to_le_bytes());

        Ok(blake2b_256_personal(&personal, &preimage))
    }
}

// =============================================================================
// Transaction Builder
// =============================================================================

/// Builder for unsigned transactions
pub struct TransactionBuilder {
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
    params: TxParams,
}

impl TransactionBuilder {
    pub fn new(params: TxParams) -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            params,
        }
    }

    /// Add an unsigned input spending `prevout` worth `value` zatoshi
    pub fn add_input(mut self, prevout: OutPoint, value: u64) -> Self {
        self.inputs.push(TxIn {
            prevout,
            script_sig: Script::new(),
            sequence: SEQUENCE_FINAL,
            value,
        });
        self
    }

    /// Add an output
    pub fn add_output(mut self, script_pubkey: Script, value: u64) -> Self {
        self.outputs.push(TxOut {
            value,
            script_pubkey,
        });
        self
    }

    /// Build without signing
    pub fn build(self) -> Transaction {
        Transaction {
            version: TX_VERSION,
            version_group_id: SAPLING_VERSION_GROUP_ID,
            inputs: self.inputs,
            outputs: self.outputs,
            lock_time: self.params.lock_time,
            expiry_height: self.params.expiry_height,
        }
    }
}

// =============================================================================
// Encoding helpers
// =============================================================================

/// Bitcoin-style CompactSize length prefix
pub fn write_compact_size(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn write_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_compact_size(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

// =============================================================================
// Tests
// =============================================================================
