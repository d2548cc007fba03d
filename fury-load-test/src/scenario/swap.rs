//! UST/FURY swaps through the proxy pair.

use super::{funded_users, Scenario};
use crate::{
    engine::{native_asset, token_asset, Engine, EngineError},
    tx::{parse_amount, Coins, TxResult},
    wallet::Wallet,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub struct SwapScenario {
    engine: Engine,
    provider: Arc<Wallet>,
}

impl SwapScenario {
    /// Seed the pair with liquidity from the liquidity wallet, or the admin.
    pub async fn setup(engine: Engine) -> Result<Self, EngineError> {
        info!("Swap Test Instantiated");
        let config = engine.config();

        let provider = match &config.wallets.liquidity_mnemonic {
            Some(phrase) => engine.generate_wallet(Some(phrase.as_str()))?,
            None => engine.admin_wallet().clone(),
        };
        engine
            .seed_liquidity(
                &provider,
                &config.swap.liquidity_uusd,
                &config.swap.liquidity_fury,
            )
            .await?;
        engine.sleep().await;

        Ok(Self { engine, provider })
    }

    pub fn provider(&self) -> &Wallet {
        &self.provider
    }

    /// Ask the proxy what `offer_asset` would return.
    pub async fn simulate(&self, offer_asset: Value) -> Result<Value, EngineError> {
        let result = self
            .engine
            .query_contract(
                &self.engine.deployment().proxy_contract_address,
                json!({ "simulation": { "offer_asset": offer_asset } }),
            )
            .await?;
        info!("Simulation result {}", result);
        Ok(result)
    }

    pub async fn buy_fury(&self, wallet: &Wallet, uusd: &str) -> Result<TxResult, EngineError> {
        let offer = native_asset("uusd", uusd);
        self.simulate(offer.clone()).await?;

        let amount = self.engine.amount_with_tax(parse_amount(uusd)?).await?;

        let response = self
            .engine
            .execute(
                wallet,
                &self.engine.deployment().proxy_contract_address,
                json!({ "swap": { "sender": wallet.address(), "offer_asset": offer } }),
                Coins::new().with("uusd", amount),
            )
            .await?;
        info!("Buy Fury swap response tx hash = {}", response.txhash);
        Ok(response)
    }

    pub async fn sell_fury(&self, wallet: &Wallet, fury: &str) -> Result<TxResult, EngineError> {
        let deployment = self.engine.deployment();
        let offer = token_asset(&deployment.fury_contract_address, fury);
        self.simulate(offer.clone()).await?;

        let hook = Engine::base64_encode_json(&json!({
            "swap": { "sender": wallet.address(), "offer_asset": offer }
        }))?;

        let response = self
            .engine
            .execute(
                wallet,
                &deployment.fury_contract_address,
                json!({
                    "send": {
                        "contract": deployment.proxy_contract_address,
                        "amount": fury,
                        "msg": hook,
                    }
                }),
                Coins::new(),
            )
            .await?;
        info!("Sell Fury swap response tx hash = {}", response.txhash);
        Ok(response)
    }
}

#[async_trait]
impl Scenario for SwapScenario {
    fn name(&self) -> &'static str {
        "swap"
    }

    fn engine(&self) -> &Engine {
        &self.engine
    }

    async fn run(&mut self, number_of_users: usize) -> Result<(), EngineError> {
        let users = funded_users(&self.engine, number_of_users).await?;
        let swap = &self.engine.config().swap;

        for user in &users {
            self.buy_fury(user, &swap.buy_uusd).await?;
            self.sell_fury(user, &swap.sell_fury).await?;
        }

        Ok(())
    }
}
