//! Multisig send coordination
//!
//! Wires wallet derivation, watch-only import, UTXO lookup, signing and
//! broadcast together over a [`ChainBackend`]. Every backend call is awaited
//! in turn; nothing is retried except the idempotent watch-only import.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address::TransparentAddress;
use crate::core::network::TxParams;
use crate::multisig::spend::{build_and_sign_spend, SpendRequest, Utxo};
use crate::multisig::wallet::{create_wallet_with_signers, WalletOptions};
use crate::multisig::MultisigError;
use crate::rpc::{import_watch_only_idempotent, ChainBackend};

/// Everything needed for one send
#[derive(Clone)]
pub struct SendOptions {
    /// Mnemonics of every participant; the first `threshold` in sorted-key order sign
    pub mnemonics: Vec<String>,
    /// Required signatures; `None` means every participant
    pub threshold: Option<usize>,
    pub wallet: WalletOptions,
    pub destination: String,
    /// Zatoshi
    pub amount: u64,
    /// Zatoshi
    pub fee: u64,
    /// Spend these instead of asking the backend
    pub utxos: Option<Vec<Utxo>>,
    /// Submit the signed transaction; when false it is only returned
    pub broadcast: bool,
}

impl SendOptions {
    /// N-of-N send that looks up its inputs and broadcasts
    pub fn new(
        mnemonics: Vec<String>,
        wallet: WalletOptions,
        destination: impl Into<String>,
        amount: u64,
        fee: u64,
    ) -> Self {
        Self {
            mnemonics,
            threshold: None,
            wallet,
            destination: destination.into(),
            amount,
            fee,
            utxos: None,
            broadcast: true,
        }
    }

    /// Send from the 1-of-1 wallet of a single mnemonic
    pub fn single(
        mnemonic: impl Into<String>,
        wallet: WalletOptions,
        destination: impl Into<String>,
        amount: u64,
        fee: u64,
    ) -> Self {
        Self::new(vec![mnemonic.into()], wallet, destination, amount, fee)
    }

    pub fn threshold(mut self, threshold: usize) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn effective_threshold(&self) -> usize {
        self.threshold.unwrap_or(self.mnemonics.len())
    }
}

impl fmt::Debug for SendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendOptions")
            .field("participants", &self.mnemonics.len())
            .field("threshold", &self.threshold)
            .field("wallet", &self.wallet)
            .field("destination", &self.destination)
            .field("amount", &self.amount)
            .field("fee", &self.fee)
            .field("utxos", &self.utxos)
            .field("broadcast", &self.broadcast)
            .finish()
    }
}

/// Outcome of a send
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub txid: String,
    pub raw_transaction: String,
    pub from_address: String,
    pub total_input: u64,
    pub amount: u64,
    pub change: u64,
    pub fee: u64,
    pub inputs: Vec<Utxo>,
    pub broadcast: bool,
}

/// Runs multisig sends against a chain backend
pub struct MultisigManager<B: ChainBackend> {
    backend: B,
    tx_params: TxParams,
}

impl<B: ChainBackend> MultisigManager<B> {
    pub fn new(backend: B, tx_params: TxParams) -> Self {
        Self { backend, tx_params }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn tx_params(&self) -> &TxParams {
        &self.tx_params
    }

    /// Build, sign and (optionally) broadcast a spend from the wallet the
    /// mnemonics describe.
    ///
    /// Local validation runs before any derivation or backend call. The
    /// backend is only contacted when UTXOs must be looked up or the
    /// transaction is broadcast.
    pub async fn send(&self, options: SendOptions) -> Result<SendResult, MultisigError> {
        if options.amount == 0 {
            return Err(MultisigError::InvalidAmount { field: "amount" });
        }
        if options.fee == 0 {
            return Err(MultisigError::InvalidAmount { field: "fee" });
        }
        TransparentAddress::decode_for(&options.destination, options.wallet.network)?;

        let keys = create_wallet_with_signers(
            &options.mnemonics,
            options.effective_threshold(),
            &options.wallet,
        )?;
        let wallet = keys.wallet;

        let needs_backend = options.utxos.is_none() || options.broadcast;
        if needs_backend {
            import_watch_only_idempotent(&self.backend, &wallet.address, &wallet.redeem_script)
                .await?;
        }

        let utxos = match options.utxos {
            Some(utxos) => utxos,
            None => self.lookup_utxos(&wallet.address).await?,
        };
        log::info!(
            "Spending {} UTXO(s) from {}",
            utxos.len(),
            wallet.address
        );

        let request = SpendRequest {
            destination: options.destination,
            amount: options.amount,
            fee: options.fee,
        };
        let signed =
            build_and_sign_spend(&keys.script, &keys.signers, &request, &utxos, &self.tx_params)?;

        let txid = if options.broadcast {
            let txid = self.backend.send_raw_transaction(&signed.raw_hex).await?;
            log::info!("Broadcast {}", txid);
            txid
        } else {
            signed.txid.clone()
        };

        Ok(SendResult {
            txid,
            raw_transaction: signed.raw_hex,
            from_address: wallet.address,
            total_input: signed.total_input,
            amount: signed.amount,
            change: signed.change,
            fee: signed.fee,
            inputs: utxos,
            broadcast: options.broadcast,
        })
    }

    async fn lookup_utxos(&self, address: &str) -> Result<Vec<Utxo>, MultisigError> {
        let unspent = self.backend.list_unspent(address).await?;
        let mut utxos = Vec::with_capacity(unspent.len());
        for rpc_utxo in unspent.iter().filter(|u| u.spendable) {
            utxos.push(rpc_utxo.to_utxo()?);
        }
        log::debug!("{} returned {} spendable output(s)", address, utxos.len());
        Ok(utxos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::network::Network;
    use crate::rpc::{BackendError, RpcUtxo};
    use std::collections::HashMap;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const MNEMONICS: [&str; 3] = [
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        "legal winner thank year wave sausage worth useful legal winner thank yellow",
        "letter advice cage absurd amount doctor acoustic avoid letter advice cage above",
    ];
    const WALLET_ADDRESS: &str = "t27YbEKJ8vmLbLiDBhNcKjAnRLKRs2CS9Yn";
    const PREV_TXID: &str = "4db3698dbb4065a8c14d432263880312597e709f09a17b23b935b0edc8873967";
    const DESTINATION: &str = "tmHkUR4sBAdnCME6cVN12faE4FjaHoUhstY";

    /// In-memory chain backend recording every call
    #[derive(Default)]
    struct MemoryBackend {
        unspent: HashMap<String, Vec<RpcUtxo>>,
        import_error: Option<BackendError>,
        imports: Mutex<Vec<(String, bool)>>,
        broadcasts: Mutex<Vec<String>>,
        lookups: Mutex<usize>,
    }

    impl MemoryBackend {
        fn funded() -> Self {
            let mut unspent = HashMap::new();
            unspent.insert(
                WALLET_ADDRESS.to_string(),
                vec![
                    RpcUtxo {
                        txid: PREV_TXID.to_string(),
                        vout: 0,
                        amount: 0.3,
                        confirmations: 80,
                        script_pub_key: "a9140aed7c858271ac74560f3bf028f9935a7b2b229d87".into(),
                        spendable: true,
                    },
                    RpcUtxo {
                        txid: PREV_TXID.to_string(),
                        vout: 1,
                        amount: 5.0,
                        confirmations: 1,
                        script_pub_key: String::new(),
                        spendable: false,
                    },
                ],
            );
            Self {
                unspent,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ChainBackend for MemoryBackend {
        async fn list_unspent(&self, address: &str) -> Result<Vec<RpcUtxo>, BackendError> {
            *self.lookups.lock().unwrap() += 1;
            Ok(self.unspent.get(address).cloned().unwrap_or_default())
        }

        async fn import_watch_only(
            &self,
            script_or_address: &str,
            p2sh: bool,
        ) -> Result<(), BackendError> {
            self.imports
                .lock()
                .unwrap()
                .push((script_or_address.to_string(), p2sh));
            match &self.import_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        async fn send_raw_transaction(&self, raw_hex: &str) -> Result<String, BackendError> {
            self.broadcasts.lock().unwrap().push(raw_hex.to_string());
            Ok("b".repeat(64))
        }
    }

    fn options() -> SendOptions {
        SendOptions {
            mnemonics: MNEMONICS.iter().map(|m| m.to_string()).collect(),
            threshold: Some(2),
            wallet: WalletOptions::new(Network::Testnet),
            destination: DESTINATION.to_string(),
            amount: 2_000_000,
            fee: 10_000,
            utxos: None,
            broadcast: true,
        }
    }

    #[tokio::test]
    async fn test_send_full_flow() {
        let manager = MultisigManager::new(MemoryBackend::funded(), TxParams::default());
        let result = manager.send(options()).await.unwrap();

        assert_eq!(result.from_address, WALLET_ADDRESS);
        assert_eq!(result.txid, "b".repeat(64));
        assert_eq!(result.total_input, 30_000_000);
        assert_eq!(result.change, 27_990_000);
        assert_eq!(result.fee, 10_000);
        assert_eq!(result.inputs.len(), 1);
        assert!(result.broadcast);

        let backend = manager.backend();
        let imports = backend.imports.lock().unwrap().clone();
        assert_eq!(imports.len(), 2);
        assert!(imports[0].1);
        assert_eq!(imports[1], (WALLET_ADDRESS.to_string(), false));
        assert_eq!(
            backend.broadcasts.lock().unwrap().as_slice(),
            &[result.raw_transaction.clone()]
        );
    }

    #[tokio::test]
    async fn test_already_imported_is_not_an_error() {
        let backend = MemoryBackend {
            import_error: Some(BackendError::Rpc {
                code: -4,
                message: "The wallet already contains this script; it is already imported".into(),
            }),
            ..MemoryBackend::funded()
        };
        let manager = MultisigManager::new(backend, TxParams::default());
        assert!(manager.send(options()).await.is_ok());
    }

    #[tokio::test]
    async fn test_import_failure_aborts_before_broadcast() {
        let backend = MemoryBackend {
            import_error: Some(BackendError::Transport("connection refused".into())),
            ..MemoryBackend::funded()
        };
        let manager = MultisigManager::new(backend, TxParams::default());
        let err = manager.send(options()).await.unwrap_err();
        assert!(matches!(err, MultisigError::Backend(BackendError::Transport(_))));
        assert!(manager.backend().broadcasts.lock().unwrap().is_empty());
        assert_eq!(*manager.backend().lookups.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validation_before_backend() {
        let manager = MultisigManager::new(MemoryBackend::funded(), TxParams::default());

        let err = manager
            .send(SendOptions {
                amount: 0,
                ..options()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MultisigError::InvalidAmount { field: "amount" }));

        let err = manager
            .send(SendOptions {
                threshold: Some(4),
                ..options()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MultisigError::InvalidThreshold { .. }));

        let err = manager
            .send(SendOptions {
                destination: "t1notanaddress".into(),
                ..options()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MultisigError::InvalidAddress(_)));

        assert!(manager.backend().imports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_signing_with_supplied_utxos() {
        let manager = MultisigManager::new(MemoryBackend::default(), TxParams::default());
        let utxos = vec![Utxo {
            txid: PREV_TXID.to_string(),
            output_index: 0,
            amount: 30_000_000,
            locking_script: String::new(),
            confirmations: 0,
        }];
        let result = manager
            .send(SendOptions {
                utxos: Some(utxos),
                broadcast: false,
                ..options()
            })
            .await
            .unwrap();

        assert!(!result.broadcast);
        assert_eq!(result.txid.len(), 64);
        assert!(manager.backend().imports.lock().unwrap().is_empty());
        assert!(manager.backend().broadcasts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unfunded_wallet() {
        let manager = MultisigManager::new(MemoryBackend::default(), TxParams::default());
        let err = manager.send(options()).await.unwrap_err();
        assert!(matches!(err, MultisigError::NoInputs));
    }

    #[tokio::test]
    async fn test_threshold_defaults_to_all_participants() {
        let manager = MultisigManager::new(MemoryBackend::default(), TxParams::default());
        let utxo = Utxo {
            txid: PREV_TXID.to_string(),
            output_index: 0,
            amount: 30_000_000,
            locking_script: String::new(),
            confirmations: 0,
        };
        let options = SendOptions {
            utxos: Some(vec![utxo]),
            broadcast: false,
            ..SendOptions::new(
                MNEMONICS.iter().map(|m| m.to_string()).collect(),
                WalletOptions::new(Network::Testnet),
                DESTINATION,
                2_000_000,
                10_000,
            )
        };
        assert_eq!(options.effective_threshold(), 3);

        let all = manager.send(options.clone()).await.unwrap();
        let two = manager.send(options.threshold(2)).await.unwrap();
        assert_ne!(all.from_address, WALLET_ADDRESS);
        assert_eq!(two.from_address, WALLET_ADDRESS);
        // Three signatures make the 3-of-3 scriptSig longer
        assert!(all.raw_transaction.len() > two.raw_transaction.len());
    }

    #[tokio::test]
    async fn test_single_mnemonic_send() {
        let manager = MultisigManager::new(MemoryBackend::default(), TxParams::default());
        let utxo = Utxo {
            txid: PREV_TXID.to_string(),
            output_index: 0,
            amount: 1_000_000,
            locking_script: String::new(),
            confirmations: 0,
        };
        let options = SendOptions {
            utxos: Some(vec![utxo]),
            broadcast: false,
            ..SendOptions::single(
                MNEMONICS[0],
                WalletOptions::new(Network::Testnet),
                DESTINATION,
                500_000,
                10_000,
            )
        };
        assert_eq!(options.effective_threshold(), 1);

        let result = manager.send(options).await.unwrap();
        assert!(result.from_address.starts_with("t2"));
        assert_eq!(result.change, 490_000);
    }

    #[tokio::test]
    async fn test_empty_mnemonics_rejected() {
        let manager = MultisigManager::new(MemoryBackend::funded(), TxParams::default());
        let err = manager
            .send(SendOptions {
                mnemonics: Vec::new(),
                threshold: None,
                ..options()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MultisigError::NoParticipants));
        assert!(manager.backend().imports.lock().unwrap().is_empty());
    }
}
