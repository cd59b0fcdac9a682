//! M-of-N checkmultisig redeem scripts and their P2SH addresses
//!
//! Keys are sorted by raw byte value before the script is assembled, so the
//! script, its hash and the address depend only on the key set and the
//! threshold, never on the order participants were listed in.

use crate::core::address::p2sh_address;
use crate::core::network::Network;
use crate::core::script::{Script, OP_CHECKMULTISIG};
use crate::crypto::{compressed_public_key, hash160, COMPRESSED_PUBLIC_KEY_LEN};
use crate::multisig::MultisigError;

/// Largest key count a checkmultisig script can encode with small-int pushes
pub const MAX_MULTISIG_KEYS: usize = 16;

/// A canonical multisig redeem script and the P2SH address that locks to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigScript {
    pub network: Network,
    /// Required signatures (M)
    pub threshold: usize,
    /// Public keys in ascending byte order, as they appear in the script
    pub sorted_keys: Vec<[u8; COMPRESSED_PUBLIC_KEY_LEN]>,
    pub redeem_script: Script,
    /// hash160 of the redeem script
    pub script_hash: [u8; 20],
    pub address: String,
}

impl MultisigScript {
    pub fn redeem_script_hex(&self) -> String {
        self.redeem_script.to_hex()
    }

    /// `OP_HASH160 <script_hash> OP_EQUAL`
    pub fn script_pubkey(&self) -> Script {
        Script::p2sh(&self.script_hash)
    }

    /// Total key count (N)
    pub fn key_count(&self) -> usize {
        self.sorted_keys.len()
    }

    /// Position of `public_key` in the sorted key list
    pub fn key_position(&self, public_key: &[u8]) -> Option<usize> {
        self.sorted_keys.iter().position(|k| k.as_slice() == public_key)
    }

    /// Human readable "2-of-3" description
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.sorted_keys.len())
    }
}

/// Build the sorted M-of-N redeem script and its P2SH address.
///
/// Fails with `InvalidPublicKeyEncoding` if any key is not a 33 byte
/// compressed point, `InvalidThreshold` unless `1 <= M <= N <= 16`, and
/// `DuplicatePublicKey` if the same key appears twice.
pub fn build_multisig_script<K: AsRef<[u8]>>(
    public_keys: &[K],
    threshold: usize,
    network: Network,
) -> Result<MultisigScript, MultisigError> {
    let mut sorted_keys = Vec::with_capacity(public_keys.len());
    for (index, key) in public_keys.iter().enumerate() {
        let bytes = key.as_ref();
        let invalid = || MultisigError::InvalidPublicKeyEncoding {
            index,
            len: bytes.len(),
        };
        compressed_public_key(bytes).map_err(|_| invalid())?;
        let key: [u8; COMPRESSED_PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| invalid())?;
        sorted_keys.push(key);
    }

    let key_count = sorted_keys.len();
    if threshold == 0 || threshold > key_count || key_count > MAX_MULTISIG_KEYS {
        return Err(MultisigError::InvalidThreshold {
            threshold,
            keys: key_count,
        });
    }

    sorted_keys.sort_unstable();
    if let Some(pair) = sorted_keys.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(MultisigError::DuplicatePublicKey(hex::encode(pair[0])));
    }

    let mut redeem_script = Script::new().push_int(threshold)?;
    for key in &sorted_keys {
        redeem_script = redeem_script.push_slice(key)?;
    }
    let redeem_script = redeem_script
        .push_int(key_count)?
        .push_opcode(OP_CHECKMULTISIG);

    let script_hash = hash160(redeem_script.as_bytes());
    let address = p2sh_address(network, &script_hash);

    log::debug!(
        "Built {}-of-{} redeem script for {} ({})",
        threshold,
        key_count,
        address,
        network
    );

    Ok(MultisigScript {
        network,
        threshold,
        sorted_keys,
        redeem_script,
        script_hash,
        address,
    })
}
