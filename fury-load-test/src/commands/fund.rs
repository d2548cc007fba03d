//! Fund a single address

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::engine::Engine;

use super::print_success;

/// Run the fund command
pub async fn run(config: Arc<Config>, address: &str) -> Result<()> {
    let engine = Engine::connect(config, None).await?;
    let funding = &engine.config().funding;

    engine
        .fund_wallet(address)
        .await
        .with_context(|| format!("Failed to fund {}", address))?;

    print_success(&format!(
        "Funded {} with {} FURY, {} uusd and {} uluna",
        address, funding.fury_amount, funding.uusd_amount, funding.uluna_amount
    ));
    Ok(())
}
