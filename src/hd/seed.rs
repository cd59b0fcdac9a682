//! BIP-39 mnemonic handling
//!
//! Turns a validated mnemonic phrase and optional passphrase into the
//! 64 byte seed that roots the key tree.

use bip39::{Language, Mnemonic};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::DerivationError;

/// Word counts accepted by [`generate_mnemonic`]
pub const SUPPORTED_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// 64 byte BIP-39 seed, wiped from memory when dropped
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 64]);

impl Seed {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}

/// Validate a phrase against the English wordlist and its checksum
pub fn validate_mnemonic(phrase: &str) -> Result<(), DerivationError> {
    parse(phrase).map(|_| ())
}

/// Derive the seed for `(phrase, passphrase)`.
///
/// Deterministic: identical inputs always give the identical seed.
pub fn derive_seed(phrase: &str, passphrase: &str) -> Result<Seed, DerivationError> {
    let mnemonic = parse(phrase)?;
    Ok(Seed(mnemonic.to_seed(passphrase)))
}

/// Generate a fresh English mnemonic with `word_count` words
pub fn generate_mnemonic(word_count: usize) -> Result<String, DerivationError> {
    if !SUPPORTED_WORD_COUNTS.contains(&word_count) {
        return Err(DerivationError::UnsupportedWordCount(word_count));
    }

    // 32 bits of entropy for every 3 words
    let mut entropy = vec![0u8; word_count / 3 * 4];
    rand::thread_rng().fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|_| DerivationError::InvalidMnemonic);
    entropy.zeroize();

    Ok(mnemonic?.to_string())
}

fn parse(phrase: &str) -> Result<Mnemonic, DerivationError> {
    let phrase = phrase.trim();
    if phrase.is_empty() {
        return Err(DerivationError::InvalidMnemonic);
    }
    Mnemonic::parse_in(Language::English, phrase).map_err(|_| DerivationError::InvalidMnemonic)
}
