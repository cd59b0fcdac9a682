//! Spending from a multisig P2SH address
//!
//! Builds a transaction paying a destination and returning change to the
//! wallet, then signs every input with the first `threshold` available
//! signers in sorted-key order. All validation happens before the first
//! signature is produced.

use secp256k1::SecretKey;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address::TransparentAddress;
use crate::core::network::TxParams;
use crate::core::script::{Script, SigHashType, OP_0};
use crate::core::transaction::{OutPoint, Transaction, TransactionBuilder, TransactionError};
use crate::crypto::{sign_sighash, COMPRESSED_PUBLIC_KEY_LEN};
use crate::hd::KeyNode;
use crate::multisig::script::MultisigScript;
use crate::multisig::MultisigError;

// =============================================================================
// Inputs
// =============================================================================

/// A spendable output locked by the wallet's P2SH script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Transaction id (display hex)
    pub txid: String,
    pub output_index: u32,
    /// Value in zatoshi
    pub amount: u64,
    /// Hex encoded locking script, empty when unknown
    #[serde(default)]
    pub locking_script: String,
    #[serde(default)]
    pub confirmations: u32,
}

/// Private signing material for one participant
#[derive(Clone)]
pub struct SignerKey {
    pub public_key: [u8; COMPRESSED_PUBLIC_KEY_LEN],
    pub secret_key: SecretKey,
}

impl SignerKey {
    /// Signer for a derived node; `None` for public-only nodes
    pub fn from_node(node: &KeyNode) -> Option<Self> {
        node.private_key().map(|secret_key| Self {
            public_key: node.public_key_bytes(),
            secret_key: *secret_key,
        })
    }
}

impl fmt::Debug for SignerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerKey")
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}

/// What to pay and how much fee to leave
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendRequest {
    pub destination: String,
    /// Zatoshi sent to `destination`
    pub amount: u64,
    /// Zatoshi left to miners
    pub fee: u64,
}

// =============================================================================
// Output
// =============================================================================

/// A fully signed spend ready for broadcast
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub raw_hex: String,
    pub txid: String,
    pub total_input: u64,
    pub amount: u64,
    pub fee: u64,
    /// Zatoshi returned to the wallet, 0 when no change output was created
    pub change: u64,
    /// Public keys that signed, in sorted-key order
    pub signers: Vec<[u8; COMPRESSED_PUBLIC_KEY_LEN]>,
}

impl SignedTransaction {
    /// Number of signatures placed in each input's scriptSig
    pub fn signature_count(&self) -> usize {
        self.signers.len()
    }
}

// =============================================================================
// Build and sign
// =============================================================================

/// Build and sign a spend of `utxos` from the wallet described by `wallet`.
///
/// Fails before signing with `InvalidAmount`, `NoInputs`, `InvalidAddress`,
/// `InsufficientFunds` or `InsufficientSigners`.
pub fn build_and_sign_spend(
    wallet: &MultisigScript,
    signers: &[SignerKey],
    request: &SpendRequest,
    utxos: &[Utxo],
    params: &TxParams,
) -> Result<SignedTransaction, MultisigError> {
    if request.amount == 0 {
        return Err(MultisigError::InvalidAmount { field: "amount" });
    }
    if request.fee == 0 {
        return Err(MultisigError::InvalidAmount { field: "fee" });
    }
    if utxos.is_empty() {
        return Err(MultisigError::NoInputs);
    }

    let destination = TransparentAddress::decode_for(&request.destination, wallet.network)?;

    let outpoints = utxos
        .iter()
        .map(|u| OutPoint::from_hex(&u.txid, u.output_index))
        .collect::<Result<Vec<_>, _>>()?;

    let total_input = utxos
        .iter()
        .try_fold(0u64, |acc, u| acc.checked_add(u.amount))
        .ok_or(TransactionError::ValueOverflow)?;
    let required = request
        .amount
        .checked_add(request.fee)
        .ok_or(TransactionError::ValueOverflow)?;
    if total_input < required {
        return Err(MultisigError::InsufficientFunds {
            available: total_input,
            required,
        });
    }
    let change = total_input - required;

    let selected = select_signers(wallet, signers)?;

    let wallet_script = wallet.script_pubkey();
    for utxo in utxos {
        if !utxo.locking_script.is_empty() && utxo.locking_script != wallet_script.to_hex() {
            log::warn!(
                "UTXO {}:{} locking script does not match {}",
                utxo.txid,
                utxo.output_index,
                wallet.address
            );
        }
    }

    let mut builder = TransactionBuilder::new(*params);
    for (outpoint, utxo) in outpoints.into_iter().zip(utxos) {
        builder = builder.add_input(outpoint, utxo.amount);
    }
    builder = builder.add_output(destination.script_pubkey(), request.amount);
    if change > 0 {
        builder = builder.add_output(wallet_script, change);
    }
    let mut transaction = builder.build();

    for index in 0..transaction.inputs.len() {
        let sighash = transaction.signature_hash(
            index,
            &wallet.redeem_script,
            SigHashType::All,
            params.consensus_branch_id,
        )?;

        let mut script_sig = Script::new().push_opcode(OP_0);
        for signer in &selected {
            let signature = sign_sighash(&signer.secret_key, &sighash, SigHashType::All);
            script_sig = script_sig.push_slice(&signature)?;
        }
        script_sig = script_sig.push_slice(wallet.redeem_script.as_bytes())?;
        transaction.inputs[index].script_sig = script_sig;
    }

    let raw_hex = transaction.to_hex();
    let txid = transaction.txid();
    log::info!(
        "Signed {} spending {} input(s) from {} with {} of {} keys",
        txid,
        utxos.len(),
        wallet.address,
        selected.len(),
        wallet.key_count()
    );

    Ok(SignedTransaction {
        transaction,
        raw_hex,
        txid,
        total_input,
        amount: request.amount,
        fee: request.fee,
        change,
        signers: selected.iter().map(|s| s.public_key).collect(),
    })
}

/// First `threshold` signers in the order their keys appear in the script
fn select_signers<'a>(
    wallet: &MultisigScript,
    signers: &'a [SignerKey],
) -> Result<Vec<&'a SignerKey>, MultisigError> {
    let selected: Vec<&SignerKey> = wallet
        .sorted_keys
        .iter()
        .filter_map(|key| signers.iter().find(|s| &s.public_key == key))
        .take(wallet.threshold)
        .collect();

    if selected.len() < wallet.threshold {
        return Err(MultisigError::InsufficientSigners {
            available: selected.len(),
            required: wallet.threshold,
        });
    }
    Ok(selected)
}
