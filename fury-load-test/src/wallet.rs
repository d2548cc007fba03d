//! Signing wallets
//!
//! A [`Wallet`] owns a secp256k1 key and caches its account sequence. All
//! transactions from one wallet pass through a single async mutex, so
//! concurrent workers sharing a wallet (the minting wallet in particular)
//! never sign with the same sequence twice.

use crate::{
    engine::EngineError,
    lcd::{AccountInfo, ChainClient, FeeOptions},
    tx::{Msg, PubKey, StdFee, StdSignDoc, StdSignature, StdTx, TxResult},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fury_crypto_secp256k1::Secp256k1Keypair;
use std::fmt;
use tokio::sync::Mutex;
use tracing::debug;

/// Bech32 prefix for Terra account addresses
pub const TERRA_HRP: &str = "terra";

pub struct Wallet {
    keypair: Secp256k1Keypair,
    address: String,
    account: Mutex<Option<AccountInfo>>,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Wallet {
    pub fn new(keypair: Secp256k1Keypair, hrp: &str) -> Result<Self, EngineError> {
        let address = keypair.account_address(hrp)?;
        Ok(Self {
            keypair,
            address,
            account: Mutex::new(None),
        })
    }

    /// Restore the first account of a mnemonic.
    pub fn from_mnemonic(phrase: &str, hrp: &str) -> Result<Self, EngineError> {
        let keypair = Secp256k1Keypair::from_mnemonic(phrase, "", 0)?;
        Self::new(keypair, hrp)
    }

    /// Create a wallet from a fresh 24-word mnemonic.
    pub fn generate(hrp: &str) -> Result<Self, EngineError> {
        let (_phrase, keypair) = Secp256k1Keypair::generate()?;
        Self::new(keypair, hrp)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign a transaction for the given account state.
    pub fn sign(
        &self,
        chain_id: &str,
        account: AccountInfo,
        msgs: Vec<Msg>,
        fee: StdFee,
        memo: &str,
    ) -> Result<StdTx, EngineError> {
        let doc = StdSignDoc {
            account_number: account.account_number.to_string(),
            chain_id,
            fee: &fee,
            memo,
            msgs: &msgs,
            sequence: account.sequence.to_string(),
        };
        let signature = self.keypair.sign_sha256(&doc.sign_bytes()?)?;

        Ok(StdTx {
            msg: msgs,
            fee,
            signatures: vec![StdSignature {
                signature: STANDARD.encode(signature),
                pub_key: PubKey::secp256k1(&self.keypair.public_key_compressed()),
            }],
            memo: memo.to_string(),
        })
    }

    /// Estimate (unless `fee` is given), sign and broadcast `msgs`.
    ///
    /// Holds the wallet's sequence guard for the whole round trip. A
    /// successful broadcast advances the cached sequence; any failure
    /// forgets it so the next call reads it from the chain again.
    pub async fn sign_and_broadcast(
        &self,
        client: &dyn ChainClient,
        msgs: Vec<Msg>,
        fee: Option<StdFee>,
        fee_options: &FeeOptions,
        memo: &str,
    ) -> Result<TxResult, EngineError> {
        let mut cached = self.account.lock().await;

        let result = async {
            let account = match *cached {
                Some(account) => account,
                None => {
                    let account = client.account(&self.address).await?;
                    *cached = Some(account);
                    account
                }
            };

            let fee = match fee {
                Some(fee) => fee,
                None => {
                    client
                        .estimate_fee(&self.address, &msgs, fee_options)
                        .await?
                }
            };

            debug!(
                address = %self.address,
                sequence = account.sequence,
                msgs = msgs.len(),
                "Broadcasting transaction"
            );

            let tx = self.sign(client.chain_id(), account, msgs, fee, memo)?;
            let result = client.broadcast(&tx).await?;
            Ok::<_, EngineError>((account, result))
        }
        .await;

        match result {
            Ok((account, result)) => {
                *cached = Some(AccountInfo {
                    sequence: account.sequence + 1,
                    ..account
                });
                Ok(result)
            }
            Err(e) => {
                *cached = None;
                Err(e)
            }
        }
    }

    /// Sequence the next transaction will use, if known.
    pub async fn cached_sequence(&self) -> Option<u64> {
        self.account.lock().await.map(|account| account.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_utils::MockChain, tx::Coins};
    use std::sync::Arc;

    const TEST1: &str = "notice oak worry limit wrap speak medal online prefer cluster roof addict wrist behave treat actual wasp year salad speed social layer crew genius";

    fn options() -> FeeOptions {
        FeeOptions {
            gas_prices: "0.013uluna".parse().unwrap(),
            gas_adjustment: 2.0,
        }
    }

    fn transfer(wallet: &Wallet) -> Vec<Msg> {
        vec![Msg::send(
            wallet.address(),
            "terra1dcegyrekltswvyy0xy69ydgxn9x8x32zdtapd8",
            Coins::new().with("uusd", 1),
        )]
    }

    #[test]
    fn test_from_mnemonic_address() {
        let wallet = Wallet::from_mnemonic(TEST1, TERRA_HRP).unwrap();
        assert_eq!(
            wallet.address(),
            "terra1x46rqay4d3cssq8gxxvqz8xt6nwlz4td20k38v"
        );
    }

    #[tokio::test]
    async fn test_sequence_advances_after_success() {
        let chain = MockChain::new();
        let wallet = Wallet::from_mnemonic(TEST1, TERRA_HRP).unwrap();
        chain.set_account(wallet.address(), 4, 10);

        for _ in 0..3 {
            wallet
                .sign_and_broadcast(&chain, transfer(&wallet), None, &options(), "")
                .await
                .unwrap();
        }

        assert_eq!(wallet.cached_sequence().await, Some(13));
        // one lookup, then served from cache
        assert_eq!(chain.account_lookups(), 1);

        let sequences: Vec<u64> = chain.broadcasts().iter().map(|b| b.sequence).collect();
        assert_eq!(sequences, vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn test_failure_drops_cached_sequence() {
        let chain = MockChain::new();
        let wallet = Wallet::from_mnemonic(TEST1, TERRA_HRP).unwrap();
        chain.fail_broadcasts_from(wallet.address());

        let err = wallet
            .sign_and_broadcast(&chain, transfer(&wallet), None, &options(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Lcd(_)));
        assert_eq!(wallet.cached_sequence().await, None);

        chain.clear_failures();
        wallet
            .sign_and_broadcast(&chain, transfer(&wallet), None, &options(), "")
            .await
            .unwrap();
        assert_eq!(chain.account_lookups(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_use_never_reuses_sequence() {
        let chain = Arc::new(MockChain::new());
        let wallet = Arc::new(Wallet::from_mnemonic(TEST1, TERRA_HRP).unwrap());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let chain = chain.clone();
            let wallet = wallet.clone();
            handles.push(tokio::spawn(async move {
                let msgs = transfer(&wallet);
                wallet
                    .sign_and_broadcast(chain.as_ref(), msgs, None, &options(), "")
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut sequences: Vec<u64> = chain.broadcasts().iter().map(|b| b.sequence).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_explicit_fee_skips_estimation() {
        let chain = MockChain::new();
        let wallet = Wallet::from_mnemonic(TEST1, TERRA_HRP).unwrap();
        let fee = StdFee::new(Coins::new().with("uusd", 5000), 300000);

        wallet
            .sign_and_broadcast(&chain, transfer(&wallet), Some(fee.clone()), &options(), "")
            .await
            .unwrap();

        assert_eq!(chain.fee_estimates(), 0);
        assert_eq!(chain.broadcasts()[0].tx.fee, fee);
    }
}
