//! Load Test Engine
//!
//! The engine owns the chain client, the admin and minting wallets and the
//! deployment addresses. Scenarios are written entirely in terms of its
//! primitives: execute, instantiate, upload, query and funding.

use crate::{
    config::{ChainSettings, Config, ConfigError, Deployment, Network},
    lcd::{fetch_gas_prices, ChainClient, FeeOptions, LcdClient, LcdError},
    tx::{mul_decimal_floor, parse_amount, Coins, Msg, StdFee, TxError, TxResult},
    wallet::Wallet,
};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use serde_json::{json, Value};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lcd(#[from] LcdError),

    #[error(transparent)]
    Tx(#[from] TxError),

    #[error("Key error: {0}")]
    Key(#[from] fury_crypto_secp256k1::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transaction {txhash} has no {attribute} attribute")]
    MissingAttribute {
        txhash: String,
        attribute: &'static str,
    },

    #[error("Unexpected query response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Broadcast counters for one engine
#[derive(Debug, Default)]
pub struct EngineStats {
    broadcasts: AtomicU64,
    failures: AtomicU64,
}

impl EngineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub broadcasts: u64,
    pub failures: u64,
}

#[derive(Clone)]
pub struct Engine {
    config: Arc<Config>,
    settings: ChainSettings,
    client: Arc<dyn ChainClient>,
    deployment: Arc<Deployment>,
    fee_options: FeeOptions,
    admin_wallet: Arc<Wallet>,
    minting_wallet: Arc<Wallet>,
    stats: Arc<EngineStats>,
}

impl Engine {
    /// Connect to the configured network and load the deployment file.
    pub async fn connect(config: Arc<Config>, admin_shift: Option<usize>) -> Result<Self, EngineError> {
        info!("NEW TEST RUN AT {}", chrono::Local::now());

        let settings = config.chain_settings();
        match config.network {
            Network::Local => info!(lcd = %settings.lcd_url, "Local network"),
            Network::Testnet => info!(lcd = %settings.lcd_url, "Test-Net"),
        }

        let client = LcdClient::new(&settings.lcd_url, &settings.chain_id, settings.request_timeout)?;
        let fee_options = resolve_fee_options(&config, &settings).await?;
        let deployment = Deployment::load(&config.deployment_file)?;

        Self::from_parts(config, Arc::new(client), deployment, fee_options, admin_shift)
    }

    /// Assemble an engine around an existing client.
    pub fn from_parts(
        config: Arc<Config>,
        client: Arc<dyn ChainClient>,
        deployment: Deployment,
        fee_options: FeeOptions,
        admin_shift: Option<usize>,
    ) -> Result<Self, EngineError> {
        let settings = config.chain_settings();
        let admin_wallet = Wallet::from_mnemonic(
            config.admin_mnemonic(admin_shift)?,
            &settings.address_prefix,
        )?;
        let minting_wallet =
            Wallet::from_mnemonic(&config.wallets.minting_mnemonic, &settings.address_prefix)?;

        info!("Current Admin Address: {}", admin_wallet.address());

        Ok(Self {
            config,
            settings,
            client,
            deployment: Arc::new(deployment),
            fee_options,
            admin_wallet: Arc::new(admin_wallet),
            minting_wallet: Arc::new(minting_wallet),
            stats: Arc::new(EngineStats::default()),
        })
    }

    /// Same client and minting wallet, different admin account.
    ///
    /// The returned engine counts its own broadcasts.
    pub fn with_admin_shift(&self, admin_shift: usize) -> Result<Self, EngineError> {
        let admin_wallet = Wallet::from_mnemonic(
            self.config.admin_mnemonic(Some(admin_shift))?,
            &self.settings.address_prefix,
        )?;
        info!(admin_shift, "Current Admin Address: {}", admin_wallet.address());

        Ok(Self {
            admin_wallet: Arc::new(admin_wallet),
            stats: Arc::new(EngineStats::default()),
            ..self.clone()
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }

    pub fn client(&self) -> &dyn ChainClient {
        self.client.as_ref()
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn fee_options(&self) -> &FeeOptions {
        &self.fee_options
    }

    pub fn admin_wallet(&self) -> &Arc<Wallet> {
        &self.admin_wallet
    }

    pub fn minting_wallet(&self) -> &Arc<Wallet> {
        &self.minting_wallet
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Sign and broadcast `msgs` from `wallet`, estimating the fee when none is given.
    pub async fn broadcast(
        &self,
        wallet: &Wallet,
        msgs: Vec<Msg>,
        fee: Option<StdFee>,
    ) -> Result<TxResult, EngineError> {
        self.stats.broadcasts.fetch_add(1, Ordering::Relaxed);

        let result = wallet
            .sign_and_broadcast(self.client.as_ref(), msgs, fee, &self.fee_options, "")
            .await;

        match result {
            Ok(result) => {
                debug!(txhash = %result.txhash, height = result.height, "Transaction included");
                Ok(result)
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    pub async fn execute(
        &self,
        wallet: &Wallet,
        contract: &str,
        execute_msg: Value,
        coins: Coins,
    ) -> Result<TxResult, EngineError> {
        let msg = Msg::execute(wallet.address(), contract, execute_msg, coins);
        self.broadcast(wallet, vec![msg], None).await
    }

    /// Send several execute messages to one contract in a single transaction.
    pub async fn sign_and_execute_contract(
        &self,
        wallet: &Wallet,
        contract: &str,
        messages: Vec<Value>,
        fee: Option<StdFee>,
    ) -> Result<TxResult, EngineError> {
        let msgs = messages
            .into_iter()
            .map(|message| Msg::execute(wallet.address(), contract, message, Coins::new()))
            .collect();
        self.broadcast(wallet, msgs, fee).await
    }

    /// Instantiate `code_id` and return the new contract address.
    pub async fn instantiate(
        &self,
        wallet: &Wallet,
        code_id: u64,
        init_msg: Value,
        init_coins: Coins,
    ) -> Result<String, EngineError> {
        let msg = Msg::instantiate(wallet.address(), code_id, init_msg, init_coins);
        let result = self.broadcast(wallet, vec![msg], None).await?;

        let address = result
            .contract_address()
            .ok_or_else(|| EngineError::MissingAttribute {
                txhash: result.txhash.clone(),
                attribute: "contract_address",
            })?
            .to_string();
        info!("New Contract Address:{}", address);
        Ok(address)
    }

    /// Store a wasm artifact and return its code id.
    pub async fn upload_wasm(&self, wallet: &Wallet, artifact_path: &Path) -> Result<u64, EngineError> {
        let bytes = tokio::fs::read(artifact_path)
            .await
            .map_err(|source| EngineError::Io {
                path: artifact_path.to_path_buf(),
                source,
            })?;

        let msg = Msg::store_code(wallet.address(), &bytes);
        let result = self.broadcast(wallet, vec![msg], None).await?;

        let code_id = result.code_id().ok_or_else(|| EngineError::MissingAttribute {
            txhash: result.txhash.clone(),
            attribute: "code_id",
        })?;
        info!("New Code ID:{}", code_id);
        Ok(code_id)
    }

    pub async fn query_contract(&self, contract: &str, query: Value) -> Result<Value, EngineError> {
        debug!(contract, %query, "Querying contract");
        Ok(self.client.contract_query(contract, &query).await?)
    }

    /// Restore a wallet from `mnemonic`, or create a fresh one.
    pub fn generate_wallet(&self, mnemonic: Option<&str>) -> Result<Arc<Wallet>, EngineError> {
        let wallet = match mnemonic {
            Some(phrase) => Wallet::from_mnemonic(phrase, &self.settings.address_prefix)?,
            None => Wallet::generate(&self.settings.address_prefix)?,
        };
        Ok(Arc::new(wallet))
    }

    pub fn generate_wallets(&self, number: usize) -> Result<Vec<Arc<Wallet>>, EngineError> {
        (0..number).map(|_| self.generate_wallet(None)).collect()
    }

    /// Wait the network's step delay.
    pub async fn sleep(&self) {
        if !self.settings.step_delay.is_zero() {
            tokio::time::sleep(self.settings.step_delay).await;
        }
    }

    /// CW20 transfer of `amount` FURY from the minting wallet.
    pub async fn load_fury(&self, to_address: &str, amount: &str) -> Result<TxResult, EngineError> {
        info!("Loading Fury Balance of {} to {}", amount, to_address);

        let response = self
            .execute(
                &self.minting_wallet,
                &self.deployment.fury_contract_address,
                fury_transfer(to_address, amount),
                Coins::new(),
            )
            .await?;

        info!("Load Fury Balance Response Hash {}", response.txhash);
        Ok(response)
    }

    /// Send `amount` uusd plus the configured uluna from the admin wallet.
    pub async fn load_ust(&self, to_address: &str, amount: &str) -> Result<TxResult, EngineError> {
        info!("Loading UST Balance of {} to {}", amount, to_address);

        let msg = Msg::send(
            self.admin_wallet.address(),
            to_address,
            self.native_funding(amount),
        );
        let response = self.broadcast(&self.admin_wallet, vec![msg], None).await?;

        info!("Response Hash From UST Transfer:{}", response.txhash);
        Ok(response)
    }

    /// Fund one address with FURY, UST and LUNA.
    pub async fn fund_wallet(&self, address: &str) -> Result<(), EngineError> {
        info!("Funding Wallet {}", address);

        let funding = &self.config.funding;
        self.load_fury(address, &funding.fury_amount).await?;
        self.load_ust(address, &funding.uusd_amount).await?;
        Ok(())
    }

    /// Fund many addresses, `batch_size` recipients per transaction.
    ///
    /// Each batch is one minting wallet transaction with a CW20 transfer
    /// per address and one admin transaction with a bank send per address.
    pub async fn fund_wallets(&self, addresses: &[String]) -> Result<(), EngineError> {
        let funding = &self.config.funding;
        let batches = Self::divide_to_batches(addresses, funding.batch_size)?;
        info!(
            wallets = addresses.len(),
            batches = batches.len(),
            "Funding wallets in batches"
        );

        for batch in batches {
            let transfers = batch
                .iter()
                .map(|address| {
                    Msg::execute(
                        self.minting_wallet.address(),
                        &self.deployment.fury_contract_address,
                        fury_transfer(address, &funding.fury_amount),
                        Coins::new(),
                    )
                })
                .collect();
            let response = self.broadcast(&self.minting_wallet, transfers, None).await?;
            info!("Load Fury Balance Response Hash {}", response.txhash);

            let sends = batch
                .iter()
                .map(|address| {
                    Msg::send(
                        self.admin_wallet.address(),
                        address,
                        self.native_funding(&funding.uusd_amount),
                    )
                })
                .collect();
            let response = self.broadcast(&self.admin_wallet, sends, None).await?;
            info!("Response Hash From UST Transfer:{}", response.txhash);
        }

        Ok(())
    }

    fn native_funding(&self, uusd: &str) -> Coins {
        Coins::new()
            .with("uusd", uusd)
            .with("uluna", &self.config.funding.uluna_amount)
    }

    pub async fn estimate_fee(&self, msgs: &[Msg], wallet: &Wallet) -> Result<StdFee, EngineError> {
        Ok(self
            .client
            .estimate_fee(wallet.address(), msgs, &self.fee_options)
            .await?)
    }

    /// Split `list` into consecutive chunks of `chunk_size`; the last may be shorter.
    pub fn divide_to_batches<T>(list: &[T], chunk_size: usize) -> Result<Vec<&[T]>, EngineError> {
        if chunk_size == 0 {
            return Err(EngineError::InvalidArgument(
                "chunk size must be at least 1".to_string(),
            ));
        }
        Ok(list.chunks(chunk_size).collect())
    }

    pub async fn get_fury_equivalent_to_ust(&self, ust_count: &str) -> Result<Value, EngineError> {
        self.query_contract(
            &self.deployment.proxy_contract_address,
            json!({ "get_fury_equivalent_to_ust": { "ust_count": ust_count } }),
        )
        .await
    }

    pub async fn get_ust_equivalent_to_fury(&self, fury_count: &str) -> Result<Value, EngineError> {
        self.query_contract(
            &self.deployment.proxy_contract_address,
            json!({ "get_ust_equivalent_to_fury": { "fury_count": fury_count } }),
        )
        .await
    }

    /// Let `spender` move `amount` of the sender's FURY.
    pub async fn increase_allowance(
        &self,
        sender: &Wallet,
        spender: &str,
        amount: &str,
    ) -> Result<TxResult, EngineError> {
        info!(
            "Performing Increase Allowance From {} to {} for {} $FURY",
            sender.address(),
            spender,
            amount
        );

        let response = self
            .sign_and_execute_contract(
                sender,
                &self.deployment.fury_contract_address,
                vec![json!({
                    "increase_allowance": { "spender": spender, "amount": amount }
                })],
                None,
            )
            .await?;

        info!("Increase Allowance Response Hash :{}", response.txhash);
        Ok(response)
    }

    /// URL-safe base64 of a JSON value, as contracts expect for hook messages.
    pub fn base64_encode_json(value: &Value) -> Result<String, EngineError> {
        let text = serde_json::to_string(value).map_err(TxError::from)?;
        Ok(URL_SAFE.encode(text))
    }

    /// Stability tax owed on a uusd transfer: `min(amount * rate, cap)`.
    pub async fn compute_tax(&self, amount: u128) -> Result<u128, EngineError> {
        let rate = self.client.tax_rate().await?;
        let cap = self.client.tax_cap("uusd").await?;

        let tax = mul_decimal_floor(amount, rate).ok_or_else(|| {
            EngineError::InvalidArgument(format!("tax on {amount} uusd overflows"))
        })?;
        Ok(tax.min(cap))
    }

    /// `amount` plus the tax owed on it, as sent alongside a uusd transfer.
    pub async fn amount_with_tax(&self, amount: u128) -> Result<u128, EngineError> {
        let tax = self.compute_tax(amount).await?;
        info!("tax = {}", tax);
        amount.checked_add(tax).ok_or_else(|| {
            EngineError::InvalidArgument(format!("{amount} uusd plus {tax} tax overflows"))
        })
    }

    /// Provide uusd/FURY liquidity to the proxy pair from `provider`.
    pub async fn seed_liquidity(
        &self,
        provider: &Wallet,
        uusd_amount: &str,
        fury_amount: &str,
    ) -> Result<TxResult, EngineError> {
        let proxy = &self.deployment.proxy_contract_address;
        info!("Seeding liquidity of {} uusd and {} FURY from {}", uusd_amount, fury_amount, provider.address());

        let uusd = self.amount_with_tax(parse_amount(uusd_amount)?).await?;

        self.increase_allowance(provider, proxy, fury_amount).await?;

        let msg = json!({
            "provide_liquidity": {
                "assets": [
                    native_asset("uusd", uusd_amount),
                    token_asset(&self.deployment.fury_contract_address, fury_amount),
                ]
            }
        });

        let response = self
            .execute(provider, proxy, msg, Coins::new().with("uusd", uusd))
            .await?;
        info!("Provide Liquidity Response Hash {}", response.txhash);
        Ok(response)
    }
}

async fn resolve_fee_options(
    config: &Config,
    settings: &ChainSettings,
) -> Result<FeeOptions, EngineError> {
    let mut gas_prices: Coins = config.fee.gas_prices.parse()?;

    if let Some(url) = &settings.gas_prices_url {
        match fetch_gas_prices(url, settings.request_timeout).await {
            Ok(prices) => {
                let selected = prices.filter_denom(&config.fee.fee_denom);
                if selected.is_empty() {
                    warn!(denom = %config.fee.fee_denom, "Fetched gas prices lack fee denom, using configured prices");
                } else {
                    gas_prices = selected;
                }
            }
            Err(e) => warn!("Failed to fetch gas prices, using configured prices: {}", e),
        }
    }

    info!(gas_prices = %gas_prices, "Fee settings");
    Ok(FeeOptions {
        gas_prices,
        gas_adjustment: config.fee.gas_adjustment,
    })
}

fn fury_transfer(recipient: &str, amount: &str) -> Value {
    json!({ "transfer": { "amount": amount, "recipient": recipient } })
}

/// Asset entry for a native denomination
pub fn native_asset(denom: &str, amount: &str) -> Value {
    json!({ "info": { "native_token": { "denom": denom } }, "amount": amount })
}

/// Asset entry for a CW20 token
pub fn token_asset(contract: &str, amount: &str) -> Value {
    json!({ "info": { "token": { "contract_addr": contract } }, "amount": amount })
}

/// Read a token amount from a query response (`"123"` or `123`).
pub fn amount_from_value(value: &Value) -> Result<u128, EngineError> {
    match value {
        Value::String(s) => parse_amount(s).map_err(EngineError::from),
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| EngineError::UnexpectedResponse(value.to_string())),
        Value::Object(map) => map
            .get("amount")
            .map(amount_from_value)
            .unwrap_or_else(|| Err(EngineError::UnexpectedResponse(value.to_string()))),
        _ => Err(EngineError::UnexpectedResponse(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_config, test_engine, MockChain};
    use std::io::Write;

    #[test]
    fn test_divide_to_batches() {
        let list: Vec<u32> = (1..=7).collect();
        let batches = Engine::divide_to_batches(&list, 3).unwrap();
        assert_eq!(batches, vec![&[1, 2, 3][..], &[4, 5, 6][..], &[7][..]]);

        let empty: Vec<u32> = Vec::new();
        assert!(Engine::divide_to_batches(&empty, 3).unwrap().is_empty());

        assert!(matches!(
            Engine::divide_to_batches(&list, 0),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_base64_encode_json_is_url_safe() {
        let encoded = Engine::base64_encode_json(&json!({"msg": "???>>>"})).unwrap();
        assert!(!encoded.contains('+') && !encoded.contains('/'));

        let decoded = URL_SAFE.decode(encoded).unwrap();
        let value: Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value, json!({"msg": "???>>>"}));
    }

    #[test]
    fn test_amount_from_value() {
        assert_eq!(amount_from_value(&json!("1500")).unwrap(), 1500);
        assert_eq!(amount_from_value(&json!(42)).unwrap(), 42);
        assert_eq!(amount_from_value(&json!({"amount": "7"})).unwrap(), 7);
        assert!(amount_from_value(&json!(null)).is_err());
        assert!(amount_from_value(&json!("-1")).is_err());
    }

    #[test]
    fn test_admin_shift_selects_distinct_admin() {
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain, test_config(3));

        let second = engine.with_admin_shift(2).unwrap();
        let third = engine.with_admin_shift(3).unwrap();
        assert_ne!(engine.admin_wallet().address(), second.admin_wallet().address());
        assert_ne!(second.admin_wallet().address(), third.admin_wallet().address());
        // minting wallet is shared, not re-derived
        assert!(Arc::ptr_eq(engine.minting_wallet(), third.minting_wallet()));

        assert!(matches!(
            engine.with_admin_shift(4),
            Err(EngineError::Config(ConfigError::MissingAdmin { .. }))
        ));
    }

    #[tokio::test]
    async fn test_fund_wallet() {
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain.clone(), test_config(1));

        engine.fund_wallet("terra1recipient").await.unwrap();

        let broadcasts = chain.broadcasts();
        assert_eq!(broadcasts.len(), 2);
        assert_eq!(broadcasts[0].signer, engine.minting_wallet().address());
        assert_eq!(
            chain.executed("transfer"),
            vec![json!({"amount": "100000000", "recipient": "terra1recipient"})]
        );

        match &broadcasts[1].tx.msg[0] {
            Msg::Send { from_address, to_address, amount } => {
                assert_eq!(from_address, engine.admin_wallet().address());
                assert_eq!(to_address, "terra1recipient");
                assert_eq!(amount.to_string(), "100000000uluna,50000000uusd");
            }
            other => panic!("unexpected msg {other:?}"),
        }
        assert_eq!(engine.stats(), StatsSnapshot { broadcasts: 2, failures: 0 });
    }

    #[tokio::test]
    async fn test_fund_wallets_batches() {
        let chain = Arc::new(MockChain::new());
        let mut config = test_config(1);
        config.funding.batch_size = 2;
        let engine = test_engine(chain.clone(), config);

        let addresses: Vec<String> = (0..5).map(|i| format!("terra1user{i}")).collect();
        engine.fund_wallets(&addresses).await.unwrap();

        // three batches, two transactions each
        let broadcasts = chain.broadcasts();
        assert_eq!(broadcasts.len(), 6);
        let sizes: Vec<usize> = broadcasts.iter().map(|b| b.tx.msg.len()).collect();
        assert_eq!(sizes, vec![2, 2, 2, 2, 1, 1]);
        assert_eq!(chain.executed("transfer").len(), 5);
    }

    #[tokio::test]
    async fn test_upload_and_instantiate() {
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain.clone(), test_config(1));

        let mut artifact = tempfile::NamedTempFile::new().unwrap();
        artifact.write_all(b"\0asm\x01\0\0\0").unwrap();

        let admin = engine.admin_wallet().clone();
        let code_id = engine.upload_wasm(&admin, artifact.path()).await.unwrap();
        assert_eq!(code_id, 1);

        let address = engine
            .instantiate(&admin, code_id, json!({"count": 0}), Coins::new())
            .await
            .unwrap();
        assert!(address.starts_with("terra1"));

        let missing = engine
            .upload_wasm(&admin, Path::new("/nonexistent/contract.wasm"))
            .await;
        assert!(matches!(missing, Err(EngineError::Io { .. })));
    }

    #[tokio::test]
    async fn test_failed_broadcast_is_counted() {
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain.clone(), test_config(1));
        chain.fail_broadcasts_from(engine.admin_wallet().address());

        assert!(engine.load_ust("terra1x", "5").await.is_err());
        assert_eq!(engine.stats(), StatsSnapshot { broadcasts: 1, failures: 1 });
    }

    #[tokio::test]
    async fn test_increase_allowance_message() {
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain.clone(), test_config(1));
        let admin = engine.admin_wallet().clone();

        engine.increase_allowance(&admin, "terra1spender", "250").await.unwrap();

        assert_eq!(
            chain.executed("increase_allowance"),
            vec![json!({"spender": "terra1spender", "amount": "250"})]
        );
        assert_eq!(
            chain.broadcasts()[0].contract(),
            Some(engine.deployment().fury_contract_address.as_str())
        );
    }

    #[tokio::test]
    async fn test_compute_tax_is_capped() {
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain.clone(), test_config(1));

        // mock rate 0.001, cap 1400000
        assert_eq!(engine.compute_tax(500_000_000).await.unwrap(), 500_000);
        assert_eq!(engine.compute_tax(10_000_000_000).await.unwrap(), 1_400_000);
        assert_eq!(engine.compute_tax(999).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_seed_liquidity() {
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain.clone(), test_config(1));
        let admin = engine.admin_wallet().clone();

        engine
            .seed_liquidity(&admin, "500000000", "5000000000")
            .await
            .unwrap();

        let provide = chain.executed("provide_liquidity");
        assert_eq!(provide.len(), 1);
        assert_eq!(provide[0]["assets"][0]["info"]["native_token"]["denom"], "uusd");
        assert_eq!(provide[0]["assets"][1]["amount"], "5000000000");

        let last = chain.broadcasts().pop().unwrap();
        match &last.tx.msg[0] {
            Msg::ExecuteContract { coins, .. } => {
                assert_eq!(coins.to_string(), "500500000uusd");
            }
            other => panic!("unexpected msg {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_seed_liquidity_rejects_overflowing_amount() {
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain.clone(), test_config(1));
        let admin = engine.admin_wallet().clone();

        let err = engine
            .seed_liquidity(&admin, &u128::MAX.to_string(), "1")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
        // rejected before the allowance was granted
        assert!(chain.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn test_amount_with_tax() {
        let engine = test_engine(Arc::new(MockChain::new()), test_config(1));

        assert_eq!(engine.amount_with_tax(10_000).await.unwrap(), 10_010);
        assert_eq!(
            engine.amount_with_tax(u128::MAX - 1_400_000).await.unwrap(),
            u128::MAX
        );
        assert!(matches!(
            engine.amount_with_tax(u128::MAX - 1_399_999).await,
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_estimate_fee_uses_gas_prices() {
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain.clone(), test_config(1));
        let admin = engine.admin_wallet().clone();

        let msgs = vec![
            Msg::execute(admin.address(), "terra1furytokencontract", json!({"a": {}}), Coins::new()),
            Msg::execute(admin.address(), "terra1furytokencontract", json!({"b": {}}), Coins::new()),
        ];
        let fee = engine.estimate_fee(&msgs, &admin).await.unwrap();

        assert_eq!(fee.gas, "300000");
        assert_eq!(fee.amount.to_string(), "6000uluna");
        assert_eq!(chain.fee_estimates(), 1);
        assert!(chain.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn test_get_ust_equivalent_to_fury() {
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain.clone(), test_config(1));

        let result = engine.get_ust_equivalent_to_fury("500").await.unwrap();
        assert_eq!(result, json!("1000"));
        assert_eq!(
            chain.queries(),
            vec![(
                "terra1furyswapproxy".to_string(),
                json!({"get_ust_equivalent_to_fury": {"fury_count": "500"}})
            )]
        );
    }

    #[tokio::test]
    async fn test_sign_and_execute_contract_batches_messages() {
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain.clone(), test_config(1));
        let admin = engine.admin_wallet().clone();

        let messages: Vec<Value> = (0..3)
            .map(|i| json!({"transfer": {"recipient": "terra1recipient", "amount": i.to_string()}}))
            .collect();
        engine
            .sign_and_execute_contract(&admin, "terra1furytokencontract", messages.clone(), None)
            .await
            .unwrap();

        let broadcasts = chain.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].tx.msg.len(), 3);
        for (msg, expected) in broadcasts[0].tx.msg.iter().zip(&messages) {
            match msg {
                Msg::ExecuteContract { sender, contract, execute_msg, coins } => {
                    assert_eq!(sender, admin.address());
                    assert_eq!(contract, "terra1furytokencontract");
                    assert_eq!(execute_msg, expected);
                    assert!(coins.is_empty());
                }
                other => panic!("unexpected msg {other:?}"),
            }
        }
        // one estimate covers the whole batch
        assert_eq!(chain.fee_estimates(), 1);
        assert_eq!(broadcasts[0].tx.fee.gas, "450000");
    }

    #[tokio::test]
    async fn test_sign_and_execute_contract_with_explicit_fee() {
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain.clone(), test_config(1));
        let admin = engine.admin_wallet().clone();

        let fee = StdFee::new(Coins::new().with("uusd", 30_000), 200_000);
        engine
            .sign_and_execute_contract(
                &admin,
                "terra1furytokencontract",
                vec![json!({"burn": {"amount": "1"}})],
                Some(fee.clone()),
            )
            .await
            .unwrap();

        assert_eq!(chain.fee_estimates(), 0);
        let broadcasts = chain.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].tx.fee, fee);
    }
}
