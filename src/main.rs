//! zmultisig CLI Application
//!
//! A command-line interface for transparent Zcash multisig wallets.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zec_multisig::cli::{self, SendArgs};
use zec_multisig::config::Config;
use zec_multisig::core::Network;
use zec_multisig::multisig::Utxo;

#[derive(Parser)]
#[command(name = "zmultisig")]
#[command(version = "0.1.0")]
#[command(about = "ZIP-48 transparent multisig wallets for Zcash", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured network (mainnet or testnet)
    #[arg(short, long, global = true)]
    network: Option<Network>,

    /// Override the ZIP-48 account
    #[arg(long, global = true)]
    account: Option<u32>,

    /// Override the change level (0 external, 1 internal)
    #[arg(long, global = true)]
    change: Option<u32>,

    /// Override the address index
    #[arg(long, global = true)]
    index: Option<u32>,

    /// Environment variable holding the BIP-39 passphrase
    #[arg(long, global = true, default_value = cli::DEFAULT_PASSPHRASE_ENV)]
    passphrase_env: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new BIP-39 mnemonic
    Mnemonic {
        /// Number of words (12, 15, 18, 21 or 24)
        #[arg(short, long, default_value = "24")]
        words: usize,
    },

    /// Create a multisig wallet from participant mnemonics
    Create {
        /// Participant mnemonic (repeat for each participant)
        #[arg(short, long)]
        mnemonic: Vec<String>,

        /// File with one mnemonic per line
        #[arg(short = 'f', long)]
        mnemonic_file: Option<PathBuf>,

        /// Required signatures (M)
        #[arg(short, long)]
        threshold: usize,

        /// Print the wallet as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a multisig address from public keys
    Address {
        /// Compressed public key, hex (repeat for each key)
        #[arg(short, long, required = true)]
        pubkey: Vec<String>,

        /// Required signatures (M)
        #[arg(short, long)]
        threshold: usize,
    },

    /// Show the ZIP-48 account and address nodes of one participant
    Derive {
        /// Participant mnemonic
        #[arg(short, long)]
        mnemonic: Option<String>,

        /// Account-level extended public key
        #[arg(short, long)]
        xpub: Option<String>,
    },

    /// Build, sign and broadcast a spend from the multisig address
    Send {
        /// Participant mnemonic (repeat for each participant)
        #[arg(short, long)]
        mnemonic: Vec<String>,

        /// File with one mnemonic per line
        #[arg(short = 'f', long)]
        mnemonic_file: Option<PathBuf>,

        /// Required signatures (M); defaults to every participant
        #[arg(short, long)]
        threshold: Option<usize>,

        /// Destination address
        #[arg(long)]
        to: String,

        /// Amount in ZEC
        #[arg(short, long)]
        amount: String,

        /// Fee in ZEC (defaults to the configured fee)
        #[arg(long)]
        fee: Option<String>,

        /// Spend this output instead of querying the node (txid:vout:amount)
        #[arg(short, long, value_parser = cli::parse_utxo)]
        utxo: Vec<Utxo>,

        /// Sign only; do not broadcast
        #[arg(long)]
        no_broadcast: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let passphrase = cli::read_passphrase(&cli.passphrase_env);

    match cli.command {
        Commands::Mnemonic { words } => {
            cli::cmd_mnemonic(words)?;
        }

        Commands::Create {
            mnemonic,
            mnemonic_file,
            threshold,
            json,
        } => {
            let mnemonics = cli::read_mnemonics(&mnemonic, mnemonic_file.as_deref())?;
            cli::cmd_create(&config, &mnemonics, threshold, &passphrase, json)?;
        }

        Commands::Address { pubkey, threshold } => {
            cli::cmd_address(&config, &pubkey, threshold)?;
        }

        Commands::Derive { mnemonic, xpub } => {
            cli::cmd_derive(&config, mnemonic.as_deref(), xpub.as_deref(), &passphrase)?;
        }

        Commands::Send {
            mnemonic,
            mnemonic_file,
            threshold,
            to,
            amount,
            fee,
            utxo,
            no_broadcast,
        } => {
            let mnemonics = cli::read_mnemonics(&mnemonic, mnemonic_file.as_deref())?;
            let args = SendArgs {
                threshold,
                destination: to,
                amount,
                fee,
                utxos: utxo,
                broadcast: !no_broadcast,
            };

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::cmd_send(&config, mnemonics, &passphrase, args))?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(account) = cli.account {
        config.account = account;
    }
    if let Some(change) = cli.change {
        config.change = change;
    }
    if let Some(index) = cli.index {
        config.address_index = index;
    }
    Ok(config)
}
