//! Load Test Scenarios
//!
//! Each scenario deploys or prepares what it needs during setup, then
//! drives a number of synthetic users through one business flow.

mod gaming;
mod staking;
mod swap;

pub use gaming::GamingScenario;
pub use staking::StakingScenario;
pub use swap::SwapScenario;

use crate::{
    engine::{Engine, EngineError},
    tx::Coins,
    wallet::Wallet,
};
use async_trait::async_trait;
use std::{fmt, str::FromStr, sync::Arc};
use tracing::info;

#[async_trait]
pub trait Scenario: Send {
    fn name(&self) -> &'static str;

    fn engine(&self) -> &Engine;

    /// Drive `number_of_users` fresh wallets through the flow.
    async fn run(&mut self, number_of_users: usize) -> Result<(), EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    Staking,
    Gaming,
    Swap,
}

impl ScenarioKind {
    /// Run the scenario's setup against `engine`.
    pub async fn setup(self, engine: Engine) -> Result<Box<dyn Scenario>, EngineError> {
        Ok(match self {
            ScenarioKind::Staking => Box::new(StakingScenario::setup(engine).await?),
            ScenarioKind::Gaming => Box::new(GamingScenario::setup(engine).await?),
            ScenarioKind::Swap => Box::new(SwapScenario::setup(engine).await?),
        })
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioKind::Staking => write!(f, "staking"),
            ScenarioKind::Gaming => write!(f, "gaming"),
            ScenarioKind::Swap => write!(f, "swap"),
        }
    }
}

impl FromStr for ScenarioKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staking" => Ok(ScenarioKind::Staking),
            "gaming" => Ok(ScenarioKind::Gaming),
            "swap" => Ok(ScenarioKind::Swap),
            other => Err(EngineError::InvalidArgument(format!(
                "unknown scenario {other:?}"
            ))),
        }
    }
}

/// Generate `number` wallets and fund them in batches.
pub(crate) async fn funded_users(
    engine: &Engine,
    number: usize,
) -> Result<Vec<Arc<Wallet>>, EngineError> {
    info!("Loading {} Users for Test", number);

    let wallets = engine.generate_wallets(number)?;
    let addresses: Vec<String> = wallets.iter().map(|w| w.address().to_string()).collect();
    engine.fund_wallets(&addresses).await?;
    engine.sleep().await;

    Ok(wallets)
}

/// uusd coins for a fee, empty when nothing is owed.
pub(crate) fn uusd(amount: u128) -> Coins {
    if amount == 0 {
        Coins::new()
    } else {
        Coins::new().with("uusd", amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_kind_names() {
        for kind in [ScenarioKind::Staking, ScenarioKind::Gaming, ScenarioKind::Swap] {
            assert_eq!(kind.to_string().parse::<ScenarioKind>().unwrap(), kind);
        }
        assert!("lottery".parse::<ScenarioKind>().is_err());
    }

    #[test]
    fn test_uusd_skips_zero() {
        assert!(uusd(0).is_empty());
        assert_eq!(uusd(12).to_string(), "12uusd");
    }
}
