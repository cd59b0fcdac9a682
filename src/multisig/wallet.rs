//! Multisig wallet creation from participant mnemonics
//!
//! Each participant's mnemonic is walked down the ZIP-48 path to an address
//! node; the resulting public keys form the wallet's redeem script. Wallets
//! are never persisted with secrets, they are recomputed from the mnemonics.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::network::Network;
use crate::hd::{
    derive_account_node, derive_address_node, master_from_mnemonic, DerivationError,
    DerivationParams, DerivedKey,
};
use crate::multisig::script::{build_multisig_script, MultisigScript, MAX_MULTISIG_KEYS};
use crate::multisig::spend::SignerKey;
use crate::multisig::MultisigError;

/// Where in the ZIP-48 tree every participant's key is taken from
#[derive(Clone, Default, PartialEq, Eq)]
pub struct WalletOptions {
    pub network: Network,
    pub account: u32,
    pub change: u32,
    pub address_index: u32,
    /// BIP-39 passphrase shared by all participants (usually empty)
    pub passphrase: String,
}

impl WalletOptions {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    pub fn derivation_params(&self) -> DerivationParams {
        DerivationParams::new(self.network)
            .account(self.account)
            .change(self.change)
            .address_index(self.address_index)
    }
}

impl fmt::Debug for WalletOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletOptions")
            .field("network", &self.network)
            .field("account", &self.account)
            .field("change", &self.change)
            .field("address_index", &self.address_index)
            .field("has_passphrase", &!self.passphrase.is_empty())
            .finish()
    }
}

/// One signer's derived material
#[derive(Clone, Serialize, Deserialize)]
pub struct Participant {
    #[serde(skip)]
    pub mnemonic: String,
    /// Account-level extended public key (`m/48'/coin'/account'/133000'`)
    pub account_xpub: String,
    #[serde(skip)]
    pub account_xprv: Option<String>,
    /// Full path of the leaf key
    pub derivation_path: String,
    /// Compressed leaf public key, hex
    pub public_key: String,
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("account_xpub", &self.account_xpub)
            .field("derivation_path", &self.derivation_path)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// An M-of-N transparent multisig wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultisigWallet {
    pub network: Network,
    pub threshold: usize,
    pub participants: Vec<Participant>,
    /// Redeem script, hex
    pub redeem_script: String,
    pub address: String,
}

impl MultisigWallet {
    /// Participant public keys in input order
    pub fn public_keys(&self) -> Result<Vec<Vec<u8>>, MultisigError> {
        self.participants
            .iter()
            .enumerate()
            .map(|(index, p)| {
                hex::decode(&p.public_key).map_err(|_| MultisigError::InvalidPublicKeyEncoding {
                    index,
                    len: p.public_key.len() / 2,
                })
            })
            .collect()
    }

    /// Rebuild the redeem script from the participants' public keys
    pub fn script(&self) -> Result<MultisigScript, MultisigError> {
        build_multisig_script(&self.public_keys()?, self.threshold, self.network)
    }

    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.participants.len())
    }
}

/// A wallet together with the signing keys derived alongside it
pub struct WalletKeys {
    pub wallet: MultisigWallet,
    pub script: MultisigScript,
    /// Participant signing keys in input order
    pub signers: Vec<SignerKey>,
}

impl fmt::Debug for WalletKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletKeys")
            .field("wallet", &self.wallet)
            .field("signers", &self.signers)
            .finish_non_exhaustive()
    }
}

/// Derive every participant and build the wallet.
///
/// The mnemonic list and threshold are checked before any derivation starts.
pub fn create_multisig_wallet<S: AsRef<str>>(
    mnemonics: &[S],
    threshold: usize,
    options: &WalletOptions,
) -> Result<MultisigWallet, MultisigError> {
    create_wallet_with_signers(mnemonics, threshold, options).map(|keys| keys.wallet)
}

/// Build the wallet and keep each participant's signing key, walking every
/// mnemonic down the derivation path once.
pub fn create_wallet_with_signers<S: AsRef<str>>(
    mnemonics: &[S],
    threshold: usize,
    options: &WalletOptions,
) -> Result<WalletKeys, MultisigError> {
    check_threshold(mnemonics.len(), threshold)?;
    let params = options.derivation_params();
    params.validate()?;

    let mut participants = Vec::with_capacity(mnemonics.len());
    let mut signers = Vec::with_capacity(mnemonics.len());
    for mnemonic in mnemonics {
        let mnemonic = mnemonic.as_ref();
        let (account, leaf) = derive_participant(mnemonic, options, &params)?;
        signers.push(signer_for(&leaf)?);
        participants.push(Participant {
            mnemonic: mnemonic.trim().to_string(),
            account_xpub: account.xpub,
            account_xprv: account.xprv,
            derivation_path: leaf.path,
            public_key: hex::encode(leaf.node.public_key_bytes()),
        });
    }

    let public_keys: Vec<_> = signers.iter().map(|s| s.public_key).collect();
    let script = build_multisig_script(&public_keys, threshold, options.network)?;
    log::info!(
        "Created {} multisig wallet {} on {}",
        script.description(),
        script.address,
        options.network
    );

    let wallet = MultisigWallet {
        network: options.network,
        threshold,
        participants,
        redeem_script: script.redeem_script_hex(),
        address: script.address.clone(),
    };
    Ok(WalletKeys {
        wallet,
        script,
        signers,
    })
}

/// Re-derive the private signing keys for the given mnemonics
pub fn derive_signer_keys<S: AsRef<str>>(
    mnemonics: &[S],
    options: &WalletOptions,
) -> Result<Vec<SignerKey>, MultisigError> {
    let params = options.derivation_params();
    params.validate()?;

    mnemonics
        .iter()
        .map(|mnemonic| {
            let (_, leaf) = derive_participant(mnemonic.as_ref(), options, &params)?;
            signer_for(&leaf)
        })
        .collect()
}

fn check_threshold(participants: usize, threshold: usize) -> Result<(), MultisigError> {
    if participants == 0 {
        return Err(MultisigError::NoParticipants);
    }
    if threshold == 0 || threshold > participants || participants > MAX_MULTISIG_KEYS {
        return Err(MultisigError::InvalidThreshold {
            threshold,
            keys: participants,
        });
    }
    Ok(())
}

fn signer_for(leaf: &DerivedKey) -> Result<SignerKey, MultisigError> {
    SignerKey::from_node(&leaf.node)
        .ok_or(MultisigError::Derivation(DerivationError::InvalidDerivedKey))
}

fn derive_participant(
    mnemonic: &str,
    options: &WalletOptions,
    params: &DerivationParams,
) -> Result<(DerivedKey, DerivedKey), MultisigError> {
    let master = master_from_mnemonic(mnemonic, &options.passphrase)?;
    let account = derive_account_node(&master, options.network, options.account)?;
    let leaf = derive_address_node(&account.node, params)?;
    Ok((account, leaf))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MNEMONICS: [&str; 3] = [
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        "legal winner thank year wave sausage worth useful legal winner thank yellow",
        "letter advice cage absurd amount doctor acoustic avoid letter advice cage above",
    ];

    #[test]
    fn test_golden_testnet_wallet() {
        let wallet =
            create_multisig_wallet(&MNEMONICS, 2, &WalletOptions::new(Network::Testnet)).unwrap();

        assert_eq!(wallet.address, "t27YbEKJ8vmLbLiDBhNcKjAnRLKRs2CS9Yn");
        assert_eq!(
            wallet.redeem_script,
            "52210333afb3685e1667d832c7ee4e5f818dc92a350f365ce66c51964c84c9edea8c8b210372f9069d6a7fd1daff3703aa83689f4478f3e09149344fbcbb20ba80adf8ba0d2103bdeb2db4ad5d4c7e88b223cd8263411f34b2987941382d7be71e0544f166f45c53ae"
        );
        assert_eq!(wallet.description(), "2-of-3");

        let first = &wallet.participants[0];
        assert_eq!(first.derivation_path, "m/48'/1'/0'/133000'/0/0");
        assert_eq!(
            first.account_xpub,
            "xpub6EuX7TBEwizTB3Z1yQvTy5VbQP6wE7t3yNfW48Tu6tG1pvYwGsacC6YPjNDe71y8J8eap6uWj7g8JStbtDWZtZHLKWhwFvE4yGSHrrbC4vj"
        );
        assert_eq!(
            wallet.participants[1].account_xpub,
            "xpub6EJB5d3D7eCmnD9pqNxU3NR5p62frS743h7pCBoWFcSs9NTAChh4RQassDbYUGPCcvYJTLH2kr6ryoL8ApJcwjHc6kJjeujnhRCYDzaB4BV"
        );
        assert_eq!(
            wallet.participants[2].account_xpub,
            "xpub6EaCggVGch6pgaDF5XZ3PgQ2RUckvDxMz5J8Y9323ha8pp65cdUXX9iKDNmUmnsXyLzzG4tH7fp5Q4sHBeg6495NxxZ7UcyZ4rBHMe42PF5"
        );
    }

    #[test]
    fn test_golden_mainnet_wallet() {
        let wallet =
            create_multisig_wallet(&MNEMONICS, 2, &WalletOptions::new(Network::Mainnet)).unwrap();
        assert_eq!(wallet.address, "t3UhjobmtGsznahiEvePv4nRtp9fznJuEPr");
        assert_eq!(
            wallet.redeem_script,
            "522102eb016b153e5b10a2a50179fe728443175557952b18b23044a73d17c403c48ebf2103207d86a1542ee76428f20fd4cfd99c577a6fd972c706627223a49857314c10a52103e2178736a92874f61dec0119064808b6e5541e78297a27a5cf1851a831558e8e53ae"
        );
        assert_eq!(wallet.participants[0].derivation_path, "m/48'/133'/0'/133000'/0/0");
    }

    #[test]
    fn test_participant_order_does_not_matter() {
        let options = WalletOptions::new(Network::Testnet);
        let forward = create_multisig_wallet(&MNEMONICS, 2, &options).unwrap();

        let mut reversed = MNEMONICS;
        reversed.reverse();
        let backward = create_multisig_wallet(&reversed, 2, &options).unwrap();

        assert_eq!(forward.address, backward.address);
        assert_eq!(forward.redeem_script, backward.redeem_script);
    }

    #[test]
    fn test_matches_standalone_script_builder() {
        let wallet =
            create_multisig_wallet(&MNEMONICS, 2, &WalletOptions::new(Network::Testnet)).unwrap();
        let script = wallet.script().unwrap();
        assert_eq!(script.address, wallet.address);
        assert_eq!(script.redeem_script_hex(), wallet.redeem_script);
    }

    #[test]
    fn test_rejects_bad_inputs_early() {
        let options = WalletOptions::new(Network::Testnet);
        let none: [&str; 0] = [];
        assert!(matches!(
            create_multisig_wallet(&none, 1, &options),
            Err(MultisigError::NoParticipants)
        ));
        assert!(matches!(
            create_multisig_wallet(&MNEMONICS, 4, &options),
            Err(MultisigError::InvalidThreshold { threshold: 4, keys: 3 })
        ));
        assert!(matches!(
            create_multisig_wallet(&["not a mnemonic", MNEMONICS[1]], 1, &options),
            Err(MultisigError::Derivation(DerivationError::InvalidMnemonic))
        ));
        assert!(matches!(
            create_multisig_wallet(&["", MNEMONICS[1]], 1, &options),
            Err(MultisigError::Derivation(DerivationError::InvalidMnemonic))
        ));

        let bad_change = WalletOptions {
            change: 2,
            ..WalletOptions::new(Network::Testnet)
        };
        assert!(matches!(
            create_multisig_wallet(&MNEMONICS, 2, &bad_change),
            Err(MultisigError::Derivation(
                DerivationError::InvalidDerivationParameter { field: "change", .. }
            ))
        ));
    }

    #[test]
    fn test_duplicate_participant_rejected() {
        let options = WalletOptions::new(Network::Testnet);
        assert!(matches!(
            create_multisig_wallet(&[MNEMONICS[0], MNEMONICS[0]], 2, &options),
            Err(MultisigError::DuplicatePublicKey(_))
        ));
    }

    #[test]
    fn test_serialization_excludes_secrets() {
        let wallet =
            create_multisig_wallet(&MNEMONICS, 2, &WalletOptions::new(Network::Testnet)).unwrap();
        let json = serde_json::to_string(&wallet).unwrap();
        assert!(!json.contains("abandon"));
        assert!(!json.contains("xprv"));
        assert!(json.contains(&wallet.address));

        let debug = format!("{:?}", wallet);
        assert!(!debug.contains("abandon"));
        assert!(!debug.contains("xprv"));
    }

    #[test]
    fn test_signer_keys_match_participants() {
        let options = WalletOptions::new(Network::Testnet);
        let wallet = create_multisig_wallet(&MNEMONICS, 2, &options).unwrap();
        let signers = derive_signer_keys(&MNEMONICS, &options).unwrap();
        for (signer, participant) in signers.iter().zip(&wallet.participants) {
            assert_eq!(hex::encode(signer.public_key), participant.public_key);
        }
    }

    #[test]
    fn test_wallet_with_signers_in_one_pass() {
        let options = WalletOptions::new(Network::Testnet);
        let keys = create_wallet_with_signers(&MNEMONICS, 2, &options).unwrap();

        assert_eq!(keys.wallet.address, "t27YbEKJ8vmLbLiDBhNcKjAnRLKRs2CS9Yn");
        assert_eq!(keys.script.address, keys.wallet.address);
        assert_eq!(keys.script.redeem_script_hex(), keys.wallet.redeem_script);

        let separate = derive_signer_keys(&MNEMONICS, &options).unwrap();
        assert_eq!(keys.signers.len(), 3);
        for (signer, expected) in keys.signers.iter().zip(&separate) {
            assert_eq!(signer.public_key, expected.public_key);
            assert_eq!(signer.secret_key, expected.secret_key);
        }
        assert_eq!(
            hex::encode(keys.signers[0].secret_key.secret_bytes()),
            "7ae1e0a78801df5c8b31e3265039484a2101f0338448418304a747abf32c509f"
        );
    }

    #[test]
    fn test_other_address_index() {
        let options = WalletOptions {
            account: 1,
            change: 1,
            address_index: 5,
            ..WalletOptions::new(Network::Testnet)
        };
        let wallet = create_multisig_wallet(&MNEMONICS, 2, &options).unwrap();
        assert_eq!(wallet.participants[0].derivation_path, "m/48'/1'/1'/133000'/1/5");
        assert_eq!(
            wallet.participants[0].public_key,
            "02d9eafa5bdb5ced048b9c7a7c0e27244e011c352fa10500abf37096f8d0b1704e"
        );
        assert_ne!(wallet.address, "t27YbEKJ8vmLbLiDBhNcKjAnRLKRs2CS9Yn");
    }
}
