//! Club staking: owners buy clubs, users stake FURY on every club.

use super::{funded_users, uusd, Scenario};
use crate::{
    engine::{amount_from_value, Engine, EngineError},
    tx::TxResult,
    wallet::Wallet,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::info;

pub struct StakingScenario {
    engine: Engine,
    club_owners: Vec<Arc<Wallet>>,
    club_staking_address: String,
}

impl StakingScenario {
    /// Fund the club owners, then upload and instantiate the staking contract.
    pub async fn setup(engine: Engine) -> Result<Self, EngineError> {
        info!("Staking Test Instantiated, Setting new Club owners");
        let config = engine.config();

        let club_owners = engine.generate_wallets(config.staking.club_owners)?;
        let owner_addresses: Vec<String> =
            club_owners.iter().map(|w| w.address().to_string()).collect();
        engine.fund_wallets(&owner_addresses).await?;

        let admin = engine.admin_wallet().clone();
        let code_id = engine
            .upload_wasm(&admin, &config.contracts.club_staking_wasm)
            .await?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let init_msg = config.club_staking_init(
            admin.address(),
            &engine.deployment().fury_contract_address,
            now,
        );
        let club_staking_address = engine
            .instantiate(&admin, code_id, init_msg, Default::default())
            .await?;
        engine.sleep().await;

        Ok(Self {
            engine,
            club_owners,
            club_staking_address,
        })
    }

    pub fn club_staking_address(&self) -> &str {
        &self.club_staking_address
    }

    pub fn club_owners(&self) -> &[Arc<Wallet>] {
        &self.club_owners
    }

    pub fn club_name(owner: &Wallet) -> String {
        format!("Club_{}", owner.address())
    }

    /// Ask the contract what the platform charges for `request`.
    async fn platform_fees(&self, request: &Value) -> Result<u128, EngineError> {
        let response = self
            .engine
            .query_contract(
                &self.club_staking_address,
                json!({
                    "query_platform_fees": { "msg": Engine::base64_encode_json(request)? }
                }),
            )
            .await?;
        amount_from_value(&response)
    }

    pub async fn buy_club(&self, wallet: &Wallet) -> Result<TxResult, EngineError> {
        let staking = &self.engine.config().staking;
        let club_name = Self::club_name(wallet);

        self.engine
            .increase_allowance(wallet, &self.club_staking_address, &staking.club_price)
            .await?;

        let request = json!({
            "buyer": wallet.address(),
            "club_name": club_name,
            "auto_stake": staking.auto_stake,
        });
        info!("Getting Platform Fees for the Purchase");
        let platform_fees = self.platform_fees(&request).await?;
        info!("Platform Fee For The Purchase {}", platform_fees);

        info!("Buying Club {} With {}", club_name, wallet.address());
        let response = self
            .engine
            .execute(
                wallet,
                &self.club_staking_address,
                json!({
                    "buy_a_club": {
                        "buyer": wallet.address(),
                        "seller": null,
                        "club_name": club_name,
                        "auto_stake": staking.auto_stake,
                    }
                }),
                uusd(platform_fees),
            )
            .await?;
        info!("Buy a club response: {}", response.txhash);
        Ok(response)
    }

    /// Every owner buys their own club.
    pub async fn setup_clubs(&self) -> Result<(), EngineError> {
        for owner in &self.club_owners {
            self.buy_club(owner).await?;
        }
        Ok(())
    }

    pub async fn stake_to_club(
        &self,
        wallet: &Wallet,
        club_name: &str,
    ) -> Result<TxResult, EngineError> {
        let staking = &self.engine.config().staking;
        info!("Initiating Staking for {} On Club {}", wallet.address(), club_name);

        self.engine
            .increase_allowance(
                wallet,
                &self.club_staking_address,
                &staking.amount_to_stake_per_club,
            )
            .await?;

        let stake_msg = json!({
            "stake_on_a_club": {
                "staker": wallet.address(),
                "club_name": club_name,
                "amount": staking.amount_to_stake_per_club,
                "auto_stake": staking.auto_stake,
            }
        });
        info!("Getting Platform Fees For Staking On The Club");
        let platform_fees = self.platform_fees(&stake_msg).await?;
        info!("Response Of Platform Fees {}", platform_fees);

        info!("Executing Stake On a Club");
        let response = self
            .engine
            .execute(wallet, &self.club_staking_address, stake_msg, uusd(platform_fees))
            .await?;
        info!("Staking On a Club TX Hash {}", response.txhash);
        Ok(response)
    }
}

#[async_trait]
impl Scenario for StakingScenario {
    fn name(&self) -> &'static str {
        "staking"
    }

    fn engine(&self) -> &Engine {
        &self.engine
    }

    async fn run(&mut self, number_of_users: usize) -> Result<(), EngineError> {
        self.setup_clubs().await?;

        let users = funded_users(&self.engine, number_of_users).await?;
        let clubs: Vec<String> = self.club_owners.iter().map(|o| Self::club_name(o)).collect();

        for user in &users {
            for club in &clubs {
                self.stake_to_club(user, club).await?;
            }
            self.engine.sleep().await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_config, test_engine, MockChain};
    use std::io::Write;

    fn config_with_artifact(artifact: &tempfile::NamedTempFile) -> crate::config::Config {
        let mut config = test_config(1);
        config.contracts.club_staking_wasm = artifact.path().to_path_buf();
        config
    }

    fn artifact() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\0asm").unwrap();
        file
    }

    #[tokio::test]
    async fn test_setup_instantiates_with_admin_roles() {
        let wasm = artifact();
        let chain = Arc::new(MockChain::new());
        let engine = test_engine(chain.clone(), config_with_artifact(&wasm));
        let admin = engine.admin_wallet().address().to_string();

        let scenario = StakingScenario::setup(engine).await.unwrap();
        assert_eq!(scenario.club_owners().len(), 2);
        assert!(scenario.club_staking_address().starts_with("terra1"));

        let instantiate = chain
            .broadcasts()
            .into_iter()
            .flat_map(|b| b.tx.msg)
            .find_map(|msg| match msg {
                crate::tx::Msg::InstantiateContract { init_msg, .. } => Some(init_msg),
                _ => None,
            })
            .unwrap();
        assert_eq!(instantiate["admin_address"], admin.as_str());
        assert_eq!(instantiate["club_fee_collector_wallet"], admin.as_str());
        assert_eq!(instantiate["platform_fees_collector_wallet"], admin.as_str());
        assert_eq!(instantiate["minting_contract_address"], "terra1furytokencontract");
    }

    #[tokio::test]
    async fn test_run_stakes_every_user_on_every_club() {
        let wasm = artifact();
        let chain = Arc::new(MockChain::with_query_handler(|_, query| {
            if query.get("query_platform_fees").is_some() {
                json!("2500")
            } else {
                json!(null)
            }
        }));
        let engine = test_engine(chain.clone(), config_with_artifact(&wasm));

        let mut scenario = StakingScenario::setup(engine).await.unwrap();
        scenario.run(3).await.unwrap();

        let buys = chain.executed_with_sender("buy_a_club");
        assert_eq!(buys.len(), 2);
        for (sender, body) in &buys {
            assert_eq!(body["buyer"], sender.as_str());
            assert_eq!(body["club_name"], format!("Club_{sender}"));
            assert!(body["seller"].is_null());
        }

        let stakes = chain.executed("stake_on_a_club");
        assert_eq!(stakes.len(), 6);
        assert!(stakes.iter().all(|s| s["amount"] == "100000"));

        // one allowance per purchase and per stake
        assert_eq!(chain.executed("increase_allowance").len(), 8);

        // platform fee is attached as uusd
        let fee_paid = chain.broadcasts().iter().any(|b| {
            b.tx.msg.iter().any(|m| match m {
                crate::tx::Msg::ExecuteContract { execute_msg, coins, .. } => {
                    execute_msg.get("stake_on_a_club").is_some()
                        && coins.to_string() == "2500uusd"
                }
                _ => false,
            })
        });
        assert!(fee_paid);

        // the fee query carries the base64 request
        let fee_queries: Vec<_> = chain
            .queries()
            .into_iter()
            .filter(|(_, q)| q.get("query_platform_fees").is_some())
            .collect();
        assert_eq!(fee_queries.len(), 8);
        assert_eq!(scenario.engine().stats().failures, 0);
    }

    #[tokio::test]
    async fn test_unexpected_fee_response_stops_run() {
        let wasm = artifact();
        let chain = Arc::new(MockChain::with_query_handler(|_, _| json!({"weird": true})));
        let engine = test_engine(chain.clone(), config_with_artifact(&wasm));

        let mut scenario = StakingScenario::setup(engine).await.unwrap();
        let err = scenario.run(1).await.unwrap_err();
        assert!(matches!(err, EngineError::UnexpectedResponse(_)));
        assert!(chain.executed("buy_a_club").is_empty());
    }
}
