//! Network parameters for transparent Zcash addresses and derivation
//!
//! Each network fixes its SLIP-44 coin type and the two byte address
//! prefixes. Transaction level consensus parameters live in [`TxParams`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Constants
// =============================================================================

/// ZIP-48 script type for transparent P2SH multisig (hardened in the path)
pub const ZIP48_SCRIPT_TYPE: u32 = 133_000;

/// ZIP-48 purpose field
pub const ZIP48_PURPOSE: u32 = 48;

/// Consensus branch id of NU5
pub const BRANCH_ID_NU5: u32 = 0xC2D6_D0B4;

/// Consensus branch id of NU6
pub const BRANCH_ID_NU6: u32 = 0xC8E7_1055;

/// Consensus branch id of NU6.1
pub const BRANCH_ID_NU6_1: u32 = 0x4DEC_4DF0;

// =============================================================================
// Network
// =============================================================================

/// The chain a wallet lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    /// SLIP-44 coin type used in the derivation path
    pub fn coin_type(&self) -> u32 {
        match self {
            Network::Mainnet => 133,
            Network::Testnet => 1,
        }
    }

    /// Two byte big-endian prefix of P2PKH addresses (`t1` / `tm`)
    pub fn p2pkh_prefix(&self) -> [u8; 2] {
        match self {
            Network::Mainnet => [0x1c, 0xb8],
            Network::Testnet => [0x1d, 0x25],
        }
    }

    /// Two byte big-endian prefix of P2SH addresses (`t3` / `t2`)
    pub fn p2sh_prefix(&self) -> [u8; 2] {
        match self {
            Network::Mainnet => [0x1c, 0xbd],
            Network::Testnet => [0x1c, 0xba],
        }
    }

    /// All known networks, used when classifying decoded addresses
    pub fn all() -> [Network; 2] {
        [Network::Mainnet, Network::Testnet]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

// =============================================================================
// Transaction parameters
// =============================================================================

/// Consensus fields stamped into every transaction this crate builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxParams {
    /// Consensus branch id committed to by the signature hash
    #[serde(default = "default_branch_id")]
    pub consensus_branch_id: u32,
    /// Block height after which the transaction expires (0 = never)
    #[serde(default)]
    pub expiry_height: u32,
    #[serde(default)]
    pub lock_time: u32,
}

fn default_branch_id() -> u32 {
    BRANCH_ID_NU6_1
}

impl Default for TxParams {
    fn default() -> Self {
        Self {
            consensus_branch_id: BRANCH_ID_NU6_1,
            expiry_height: 0,
            lock_time: 0,
        }
    }
}
