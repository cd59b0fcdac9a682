//! ZIP-48 derivation paths for transparent P2SH multisig
//!
//! Account level: `m/48'/coin'/account'/133000'` (all hardened).
//! Address level: `<account>/change/address_index` (non-hardened).

use super::node::{KeyNode, HARDENED_OFFSET};
use super::DerivationError;
use crate::core::network::{Network, ZIP48_PURPOSE, ZIP48_SCRIPT_TYPE};
use std::fmt;

/// Depth of a master node
pub const MASTER_DEPTH: u8 = 0;

/// Depth of a ZIP-48 account node
pub const ACCOUNT_DEPTH: u8 = 4;

/// Parameters selecting one address in a ZIP-48 tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivationParams {
    pub network: Network,
    pub account: u32,
    pub change: u32,
    pub address_index: u32,
}

impl DerivationParams {
    /// Account 0, external chain, first address
    pub fn new(network: Network) -> Self {
        Self {
            network,
            account: 0,
            change: 0,
            address_index: 0,
        }
    }

    pub fn account(mut self, account: u32) -> Self {
        self.account = account;
        self
    }

    pub fn change(mut self, change: u32) -> Self {
        self.change = change;
        self
    }

    pub fn address_index(mut self, address_index: u32) -> Self {
        self.address_index = address_index;
        self
    }

    /// Check every field, reporting the first one out of range
    pub fn validate(&self) -> Result<(), DerivationError> {
        validate_account(self.account)?;
        validate_change(self.change)?;
        validate_address_index(self.address_index)
    }
}

/// A derived node together with its path and serialized extended keys
#[derive(Clone)]
pub struct DerivedKey {
    pub path: String,
    pub node: KeyNode,
    pub xpub: String,
    pub xprv: Option<String>,
}

impl DerivedKey {
    fn from_node(node: KeyNode) -> Self {
        Self {
            path: node.path().to_string(),
            xpub: node.neutered().to_xpub(),
            xprv: node.to_xprv(),
            node,
        }
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("path", &self.path)
            .field("xpub", &self.xpub)
            .field("has_xprv", &self.xprv.is_some())
            .finish()
    }
}

/// Build the ZIP-48 path string, optionally including the change and index leaf
pub fn build_path(params: &DerivationParams, include_leaf: bool) -> Result<String, DerivationError> {
    validate_account(params.account)?;
    let base = format!(
        "m/{}'/{}'/{}'/{}'",
        ZIP48_PURPOSE,
        params.network.coin_type(),
        params.account,
        ZIP48_SCRIPT_TYPE
    );
    if !include_leaf {
        return Ok(base);
    }

    validate_change(params.change)?;
    validate_address_index(params.address_index)?;
    Ok(format!("{}/{}/{}", base, params.change, params.address_index))
}

/// Parse a path such as `m/48'/1'/0'/133000'/0/0` into child indices
pub fn parse_path(path: &str) -> Result<Vec<u32>, DerivationError> {
    let invalid = |value: &str| DerivationError::InvalidDerivationParameter {
        field: "path",
        value: value.to_string(),
    };

    let mut components = path.trim().split('/');
    if components.next() != Some("m") {
        return Err(invalid(path));
    }

    components
        .map(|component| {
            let (digits, hardened) = match component.strip_suffix('\'').or(component.strip_suffix('h')) {
                Some(digits) => (digits, true),
                None => (component, false),
            };
            let index: u32 = digits.parse().map_err(|_| invalid(component))?;
            if index >= HARDENED_OFFSET {
                return Err(invalid(component));
            }
            Ok(if hardened { index + HARDENED_OFFSET } else { index })
        })
        .collect()
}

/// Derive the ZIP-48 account node `m/48'/coin'/account'/133000'` from a master node
pub fn derive_account_node(
    master: &KeyNode,
    network: Network,
    account: u32,
) -> Result<DerivedKey, DerivationError> {
    validate_account(account)?;
    if master.depth() != MASTER_DEPTH {
        return Err(DerivationError::InvalidNodeDepth(master.depth()));
    }

    let path = build_path(&DerivationParams::new(network).account(account), false)?;
    let node = master.derive_indices(&parse_path(&path)?)?;
    log::debug!("Derived account node {}", node.path());

    Ok(DerivedKey::from_node(node))
}

/// Derive the address node `<account>/change/address_index`.
///
/// `node` may be a master node (the account node is derived first) or an
/// already derived account node at depth 4.
pub fn derive_address_node(
    node: &KeyNode,
    params: &DerivationParams,
) -> Result<DerivedKey, DerivationError> {
    params.validate()?;

    let account = match node.depth() {
        MASTER_DEPTH => derive_account_node(node, params.network, params.account)?.node,
        ACCOUNT_DEPTH => node.clone(),
        depth => return Err(DerivationError::InvalidNodeDepth(depth)),
    };

    let path = build_path(params, true)?;
    let leaf = account
        .derive_child(params.change)?
        .derive_child(params.address_index)?
        .with_path(path);
    log::debug!("Derived address node {}", leaf.path());

    Ok(DerivedKey::from_node(leaf))
}

fn validate_account(account: u32) -> Result<(), DerivationError> {
    if account >= HARDENED_OFFSET {
        return Err(DerivationError::InvalidDerivationParameter {
            field: "account",
            value: account.to_string(),
        });
    }
    Ok(())
}

fn validate_change(change: u32) -> Result<(), DerivationError> {
    if change > 1 {
        return Err(DerivationError::InvalidDerivationParameter {
            field: "change",
            value: change.to_string(),
        });
    }
    Ok(())
}

fn validate_address_index(address_index: u32) -> Result<(), DerivationError> {
    if address_index >= HARDENED_OFFSET {
        return Err(DerivationError::InvalidDerivationParameter {
            field: "address_index",
            value: address_index.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hd::seed::derive_seed;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn master() -> KeyNode {
        KeyNode::master(&derive_seed(ABANDON, "").unwrap()).unwrap()
    }

    #[test]
    fn test_build_path() {
        let params = DerivationParams::new(Network::Testnet);
        assert_eq!(build_path(&params, false).unwrap(), "m/48'/1'/0'/133000'");
        assert_eq!(build_path(&params, true).unwrap(), "m/48'/1'/0'/133000'/0/0");

        let params = DerivationParams::new(Network::Mainnet)
            .account(2)
            .change(1)
            .address_index(9);
        assert_eq!(build_path(&params, true).unwrap(), "m/48'/133'/2'/133000'/1/9");
    }

    #[test]
    fn test_parse_path() {
        let indices = parse_path("m/48'/1'/0'/133000'/0/5").unwrap();
        assert_eq!(
            indices,
            vec![
                48 + HARDENED_OFFSET,
                1 + HARDENED_OFFSET,
                HARDENED_OFFSET,
                133_000 + HARDENED_OFFSET,
                0,
                5
            ]
        );
        assert_eq!(parse_path("m/1h").unwrap(), vec![1 + HARDENED_OFFSET]);
        assert!(parse_path("48'/1'").is_err());
        assert!(parse_path("m/abc").is_err());
        assert!(parse_path("m/2147483648").is_err());
    }

    #[test]
    fn test_account_node_golden() {
        let account = derive_account_node(&master(), Network::Testnet, 0).unwrap();
        assert_eq!(account.path, "m/48'/1'/0'/133000'");
        assert_eq!(account.node.depth(), ACCOUNT_DEPTH);
        assert_eq!(
            account.xpub,
            "xpub6EuX7TBEwizTB3Z1yQvTy5VbQP6wE7t3yNfW48Tu6tG1pvYwGsacC6YPjNDe71y8J8eap6uWj7g8JStbtDWZtZHLKWhwFvE4yGSHrrbC4vj"
        );
        assert!(account.xprv.as_deref().unwrap().starts_with("xprv"));
    }

    #[test]
    fn test_address_node_golden() {
        let params = DerivationParams::new(Network::Testnet);
        let leaf = derive_address_node(&master(), &params).unwrap();
        assert_eq!(leaf.path, "m/48'/1'/0'/133000'/0/0");
        assert_eq!(
            hex::encode(leaf.node.public_key_bytes()),
            "0333afb3685e1667d832c7ee4e5f818dc92a350f365ce66c51964c84c9edea8c8b"
        );
        assert_eq!(
            hex::encode(leaf.node.private_key().unwrap().secret_bytes()),
            "7ae1e0a78801df5c8b31e3265039484a2101f0338448418304a747abf32c509f"
        );

        let params = params.account(1).change(1).address_index(5);
        let leaf = derive_address_node(&master(), &params).unwrap();
        assert_eq!(leaf.path, "m/48'/1'/1'/133000'/1/5");
        assert_eq!(
            hex::encode(leaf.node.public_key_bytes()),
            "02d9eafa5bdb5ced048b9c7a7c0e27244e011c352fa10500abf37096f8d0b1704e"
        );
    }

    #[test]
    fn test_master_and_account_paths_agree() {
        let params = DerivationParams::new(Network::Testnet).address_index(3);
        let account = derive_account_node(&master(), Network::Testnet, 0).unwrap();

        let via_master = derive_address_node(&master(), &params).unwrap();
        let via_account = derive_address_node(&account.node, &params).unwrap();
        assert_eq!(via_master.path, via_account.path);
        assert_eq!(
            via_master.node.public_key_bytes(),
            via_account.node.public_key_bytes()
        );
    }

    #[test]
    fn test_deterministic() {
        let params = DerivationParams::new(Network::Mainnet).address_index(11);
        let a = derive_address_node(&master(), &params).unwrap();
        let b = derive_address_node(&master(), &params).unwrap();
        assert_eq!(a.path, b.path);
        assert_eq!(a.node.public_key_bytes(), b.node.public_key_bytes());
        assert_eq!(a.xprv, b.xprv);
    }

    #[test]
    fn test_from_account_xpub() {
        let account = derive_account_node(&master(), Network::Testnet, 0).unwrap();
        let watch_only = KeyNode::from_extended_key(&account.xpub).unwrap();

        let params = DerivationParams::new(Network::Testnet);
        let leaf = derive_address_node(&watch_only, &params).unwrap();
        assert!(leaf.xprv.is_none());
        assert_eq!(leaf.path, "m/48'/1'/0'/133000'/0/0");
        assert_eq!(
            hex::encode(leaf.node.public_key_bytes()),
            "0333afb3685e1667d832c7ee4e5f818dc92a350f365ce66c51964c84c9edea8c8b"
        );
    }

    #[test]
    fn test_public_master_cannot_derive_account() {
        let public_master = master().neutered();
        assert!(matches!(
            derive_account_node(&public_master, Network::Testnet, 0),
            Err(DerivationError::CannotDeriveHardenedFromPublic)
        ));
    }

    #[test]
    fn test_invalid_depth() {
        let depth_one = master().derive_child(HARDENED_OFFSET + 48).unwrap();
        let params = DerivationParams::new(Network::Testnet);
        assert!(matches!(
            derive_address_node(&depth_one, &params),
            Err(DerivationError::InvalidNodeDepth(1))
        ));
        assert!(matches!(
            derive_account_node(&depth_one, Network::Testnet, 0),
            Err(DerivationError::InvalidNodeDepth(1))
        ));
    }

    #[test]
    fn test_parameter_validation_names_field() {
        let m = master();
        let base = DerivationParams::new(Network::Testnet);

        let err = derive_address_node(&m, &base.change(2)).unwrap_err();
        assert!(matches!(
            err,
            DerivationError::InvalidDerivationParameter { field: "change", .. }
        ));

        let err = derive_address_node(&m, &base.address_index(HARDENED_OFFSET)).unwrap_err();
        assert_eq!(
            err,
            DerivationError::InvalidDerivationParameter {
                field: "address_index",
                value: "2147483648".to_string(),
            }
        );

        let err = derive_account_node(&m, Network::Testnet, HARDENED_OFFSET).unwrap_err();
        assert!(matches!(
            err,
            DerivationError::InvalidDerivationParameter { field: "account", .. }
        ));
    }
}
