//! CLI commands for multisig wallets
//!
//! Implements the command handlers behind the `zmultisig` binary.

use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::core::address::p2pkh_address;
use crate::core::amount::{format_zec, parse_zec};
use crate::crypto::hash160;
use crate::hd::{
    derive_account_node, derive_address_node, generate_mnemonic, master_from_mnemonic, KeyNode,
};
use crate::multisig::{
    build_multisig_script, create_multisig_wallet, MultisigManager, SendOptions, SendResult, Utxo,
};
use crate::rpc::{ChainBackend, OfflineBackend};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Environment variable consulted for the BIP-39 passphrase by default
pub const DEFAULT_PASSPHRASE_ENV: &str = "ZEC_MNEMONIC_PASSPHRASE";

// =============================================================================
// Input helpers
// =============================================================================

/// Collect mnemonics from `--mnemonic` flags and an optional file with one
/// phrase per line (blank lines and `#` comments are skipped)
pub fn read_mnemonics(inline: &[String], file: Option<&Path>) -> CliResult<Vec<String>> {
    let mut mnemonics: Vec<String> = inline.iter().map(|m| m.trim().to_string()).collect();
    if let Some(path) = file {
        let contents = fs::read_to_string(path)?;
        mnemonics.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    if mnemonics.is_empty() {
        return Err("no mnemonics given (use --mnemonic or --mnemonic-file)".into());
    }
    Ok(mnemonics)
}

/// Passphrase from the named environment variable, empty when unset
pub fn read_passphrase(env_var: &str) -> String {
    std::env::var(env_var).unwrap_or_default()
}

/// Parse `txid:vout:amount` (amount in ZEC) for `--utxo`
pub fn parse_utxo(s: &str) -> Result<Utxo, String> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    let [txid, vout, amount] = parts.as_slice() else {
        return Err(format!("expected txid:vout:amount, got {s}"));
    };
    let output_index = vout
        .parse::<u32>()
        .map_err(|_| format!("invalid output index: {vout}"))?;
    let amount = parse_zec(amount).map_err(|e| e.to_string())?;
    if txid.len() != 64 || hex::decode(txid).is_err() {
        return Err(format!("invalid txid: {txid}"));
    }
    Ok(Utxo {
        txid: txid.to_string(),
        output_index,
        amount,
        locking_script: String::new(),
        confirmations: 0,
    })
}

// =============================================================================
// Commands
// =============================================================================

/// Generate a fresh mnemonic
pub fn cmd_mnemonic(words: usize) -> CliResult<()> {
    let phrase = generate_mnemonic(words)?;
    println!("{}", phrase);
    eprintln!("⚠️  Write this down and keep it offline. It will not be shown again.");
    Ok(())
}

/// Create a multisig wallet from participant mnemonics
pub fn cmd_create(
    config: &Config,
    mnemonics: &[String],
    threshold: usize,
    passphrase: &str,
    json: bool,
) -> CliResult<()> {
    let wallet = create_multisig_wallet(mnemonics, threshold, &config.wallet_options(passphrase))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&wallet)?);
        return Ok(());
    }

    println!("🔐 Multisig wallet ({}, {})", wallet.description(), wallet.network);
    println!("   ├─ Address: {}", wallet.address);
    println!("   ├─ Redeem script: {}", wallet.redeem_script);
    println!("   └─ Participants:");
    for (i, participant) in wallet.participants.iter().enumerate() {
        println!("      {}. {}", i + 1, participant.public_key);
        println!("         path: {}", participant.derivation_path);
        println!("         account xpub: {}", participant.account_xpub);
    }
    Ok(())
}

/// Build a multisig address directly from public keys
pub fn cmd_address(config: &Config, public_keys: &[String], threshold: usize) -> CliResult<()> {
    let keys = public_keys
        .iter()
        .map(|k| hex::decode(k.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    let script = build_multisig_script(&keys, threshold, config.network)?;

    println!("🔐 {} on {}", script.description(), config.network);
    println!("   ├─ Address: {}", script.address);
    println!("   └─ Redeem script: {}", script.redeem_script_hex());
    Ok(())
}

/// Show the account and address nodes for a mnemonic or account xpub
pub fn cmd_derive(
    config: &Config,
    mnemonic: Option<&str>,
    xpub: Option<&str>,
    passphrase: &str,
) -> CliResult<()> {
    let params = config.wallet_options(passphrase).derivation_params();

    let source = match (mnemonic, xpub) {
        (Some(mnemonic), None) => {
            let master = master_from_mnemonic(mnemonic, passphrase)?;
            let account = derive_account_node(&master, config.network, config.account)?;
            println!("📂 Account {}", account.path);
            println!("   └─ xpub: {}", account.xpub);
            account.node
        }
        (None, Some(xpub)) => KeyNode::from_extended_key(xpub)?,
        _ => return Err("give exactly one of --mnemonic or --xpub".into()),
    };

    let leaf = derive_address_node(&source, &params)?;
    let public_key = leaf.node.public_key_bytes();
    println!("🔑 Address node {}", leaf.path);
    println!("   ├─ Public key: {}", hex::encode(public_key));
    println!(
        "   └─ P2PKH address: {}",
        p2pkh_address(config.network, &hash160(&public_key))
    );
    Ok(())
}

/// Arguments of the `send` command
#[derive(Debug, Clone)]
pub struct SendArgs {
    /// Defaults to every participant
    pub threshold: Option<usize>,
    pub destination: String,
    /// ZEC, as typed
    pub amount: String,
    /// ZEC, as typed; falls back to the configured fee
    pub fee: Option<String>,
    pub utxos: Vec<Utxo>,
    pub broadcast: bool,
}

/// Build, sign and optionally broadcast a spend
pub async fn cmd_send(
    config: &Config,
    mnemonics: Vec<String>,
    passphrase: &str,
    args: SendArgs,
) -> CliResult<()> {
    let amount = parse_zec(&args.amount)?;
    let fee = match &args.fee {
        Some(fee) => parse_zec(fee)?,
        None => config.fee,
    };

    let options = SendOptions {
        mnemonics,
        threshold: args.threshold,
        wallet: config.wallet_options(passphrase),
        destination: args.destination,
        amount,
        fee,
        utxos: if args.utxos.is_empty() {
            None
        } else {
            Some(args.utxos)
        },
        broadcast: args.broadcast,
    };

    let result = match &config.rpc {
        Some(_) => run_send(config.rpc_backend()?, config, options).await?,
        None => run_send(OfflineBackend, config, options).await?,
    };
    print_send_result(&result);
    Ok(())
}

async fn run_send<B: ChainBackend>(
    backend: B,
    config: &Config,
    options: SendOptions,
) -> CliResult<SendResult> {
    let manager = MultisigManager::new(backend, config.tx);
    Ok(manager.send(options).await?)
}

fn print_send_result(result: &SendResult) {
    if result.broadcast {
        println!("✅ Transaction broadcast!");
    } else {
        println!("✅ Transaction signed (not broadcast)");
    }
    println!("   ├─ TxID: {}", result.txid);
    println!("   ├─ From: {}", result.from_address);
    println!("   ├─ Inputs: {} ({} ZEC)", result.inputs.len(), format_zec(result.total_input));
    println!("   ├─ Amount: {} ZEC", format_zec(result.amount));
    println!("   ├─ Fee: {} ZEC", format_zec(result.fee));
    println!("   ├─ Change: {} ZEC", format_zec(result.change));
    println!("   └─ Raw: {}", result.raw_transaction);
}
