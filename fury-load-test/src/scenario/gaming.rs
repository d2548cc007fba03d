//! Gaming pools: gamers bid into head-to-head pools, the admin locks the
//! game and distributes rewards, gamers claim.

use super::{funded_users, uusd, Scenario};
use crate::{
    engine::{amount_from_value, Engine, EngineError},
    tx::{parse_amount, Coins, TxResult},
    wallet::Wallet,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub struct GamingScenario {
    engine: Engine,
    gaming_address: String,
}

impl GamingScenario {
    /// Upload and instantiate the gaming pool contract and set pool parameters.
    pub async fn setup(engine: Engine) -> Result<Self, EngineError> {
        info!("Gaming Test Instantiated");
        let config = engine.config();
        let gaming = &config.gaming;
        let deployment = engine.deployment();
        let admin = engine.admin_wallet().clone();

        let code_id = engine
            .upload_wasm(&admin, &config.contracts.gaming_pool_wasm)
            .await?;

        let init_msg = json!({
            "minting_contract_address": deployment.fury_contract_address,
            "admin_address": admin.address(),
            "platform_fee": gaming.platform_fee,
            "transaction_fee": gaming.transaction_fee,
            "game_id": gaming.game_id,
            "platform_fees_collector_wallet": deployment.proxy_contract_address,
            "astro_proxy_address": deployment.proxy_contract_address,
        });
        let gaming_address = engine
            .instantiate(&admin, code_id, init_msg, Coins::new())
            .await?;
        engine.sleep().await;

        let scenario = Self {
            engine,
            gaming_address,
        };
        scenario.set_pool_type_params().await?;
        Ok(scenario)
    }

    pub fn gaming_address(&self) -> &str {
        &self.gaming_address
    }

    pub async fn set_pool_type_params(&self) -> Result<TxResult, EngineError> {
        let gaming = &self.engine.config().gaming;
        let admin = self.engine.admin_wallet();

        let response = self
            .engine
            .execute(
                admin,
                &self.gaming_address,
                json!({
                    "set_pool_type_params": {
                        "pool_type": gaming.pool_type,
                        "pool_fee": gaming.pool_fee,
                        "min_teams_for_pool": gaming.min_teams_for_pool,
                        "max_teams_for_pool": gaming.max_teams_for_pool,
                        "max_teams_for_gamer": gaming.max_teams_for_gamer,
                        "wallet_percentages": [{
                            "wallet_address": admin.address(),
                            "wallet_name": "rake_1",
                            "percentage": 100,
                        }],
                    }
                }),
                Coins::new(),
            )
            .await?;
        info!("Set Pool Type Params TX : {}", response.txhash);
        Ok(response)
    }

    /// Create a pool of the configured type and return its id.
    pub async fn create_pool(&self) -> Result<String, EngineError> {
        let response = self
            .engine
            .execute(
                self.engine.admin_wallet(),
                &self.gaming_address,
                json!({ "create_pool": { "pool_type": self.engine.config().gaming.pool_type } }),
                Coins::new(),
            )
            .await?;
        info!("Pool Create TX : {}", response.txhash);

        let pool_id = response
            .find_any_attribute("pool_id")
            .ok_or_else(|| EngineError::MissingAttribute {
                txhash: response.txhash.clone(),
                attribute: "pool_id",
            })?
            .to_string();
        info!("New Pool ID  {}", pool_id);
        Ok(pool_id)
    }

    pub async fn submit_bid(
        &self,
        gamer: &Wallet,
        pool_id: &str,
        team_id: &str,
    ) -> Result<TxResult, EngineError> {
        let gaming = &self.engine.config().gaming;

        let fury = amount_from_value(
            &self
                .engine
                .get_fury_equivalent_to_ust(&gaming.pool_fee)
                .await?,
        )?;
        info!("Pool fee of {} uusd is {} FURY", gaming.pool_fee, fury);

        self.engine
            .increase_allowance(gamer, &self.gaming_address, &(fury * 2).to_string())
            .await?;

        let response = self
            .engine
            .execute(
                gamer,
                &self.gaming_address,
                json!({
                    "game_pool_bid_submit_command": {
                        "gamer": gamer.address(),
                        "pool_type": gaming.pool_type,
                        "pool_id": pool_id,
                        "team_id": team_id,
                        "amount": fury.to_string(),
                    }
                }),
                uusd(parse_amount(&gaming.bid_uusd)?),
            )
            .await?;
        info!("Bid Submit TX for {} in pool {} : {}", gamer.address(), pool_id, response.txhash);
        Ok(response)
    }

    pub async fn lock_game(&self) -> Result<TxResult, EngineError> {
        let response = self
            .engine
            .execute(
                self.engine.admin_wallet(),
                &self.gaming_address,
                json!({ "lock_game": {} }),
                Coins::new(),
            )
            .await?;
        info!("Lock Game TX : {}", response.txhash);
        Ok(response)
    }

    /// Rank `winners` in order and pay each the configured reward.
    pub async fn distribute_rewards(
        &self,
        pool_id: &str,
        winners: &[Arc<Wallet>],
    ) -> Result<TxResult, EngineError> {
        let gaming = &self.engine.config().gaming;

        let game_winners: Vec<Value> = winners
            .iter()
            .enumerate()
            .map(|(rank, gamer)| {
                json!({
                    "gamer_address": gamer.address(),
                    "game_id": gaming.game_id,
                    "team_id": team_id(rank),
                    "team_rank": rank + 1,
                    "team_points": 100u64.saturating_sub(10 * rank as u64),
                    "reward_amount": gaming.reward_amount,
                    "refund_amount": "0",
                })
            })
            .collect();

        let response = self
            .engine
            .execute(
                self.engine.admin_wallet(),
                &self.gaming_address,
                json!({
                    "game_pool_reward_distribute": {
                        "pool_id": pool_id,
                        "game_winners": game_winners,
                    }
                }),
                Coins::new(),
            )
            .await?;
        info!("Reward Distribution TX for pool {} : {}", pool_id, response.txhash);
        Ok(response)
    }

    pub async fn claim_reward(&self, gamer: &Wallet) -> Result<TxResult, EngineError> {
        let expected = self
            .engine
            .query_contract(
                &self.gaming_address,
                json!({ "query_reward": { "gamer": gamer.address() } }),
            )
            .await?;
        info!("Expected Reward Amount  {}", expected);

        let response = self
            .engine
            .execute(
                gamer,
                &self.gaming_address,
                json!({ "claim_reward": { "gamer": gamer.address() } }),
                Coins::new(),
            )
            .await?;
        info!("Claim Reward TX : {}", response.txhash);
        Ok(response)
    }
}

fn team_id(index: usize) -> String {
    format!("Team{:03}", index + 1)
}

#[async_trait]
impl Scenario for GamingScenario {
    fn name(&self) -> &'static str {
        "gaming"
    }

    fn engine(&self) -> &Engine {
        &self.engine
    }

    async fn run(&mut self, number_of_users: usize) -> Result<(), EngineError> {
        let gamers = funded_users(&self.engine, number_of_users).await?;
        let pool_size = self.engine.config().gaming.max_teams_for_pool as usize;

        let mut pools = Vec::new();
        for members in Engine::divide_to_batches(&gamers, pool_size)? {
            let pool_id = self.create_pool().await?;
            for (index, gamer) in members.iter().enumerate() {
                self.submit_bid(gamer, &pool_id, &team_id(index)).await?;
            }
            pools.push((pool_id, members));
            self.engine.sleep().await;
        }

        self.lock_game().await?;
        self.engine.sleep().await;

        for (pool_id, members) in &pools {
            self.distribute_rewards(pool_id, members).await?;
        }
        self.engine.sleep().await;

        for gamer in &gamers {
            self.claim_reward(gamer).await?;
        }

        Ok(())
    }
}
