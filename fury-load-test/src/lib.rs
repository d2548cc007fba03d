//! Fury Load Test
//!
//! Load testing harness for the Fury gaming pool and club staking
//! contracts on Terra. Drives synthetic users through staking, gaming and
//! swap flows against LocalTerra or the public testnet, optionally from
//! several admin accounts in parallel.
//!
//! ## Structure
//!
//! - [`lcd`] talks to the chain over the legacy LCD REST API
//! - [`wallet`] signs transactions and guards each account's sequence
//! - [`engine`] offers the execute/instantiate/fund primitives scenarios use
//! - [`scenario`] holds the staking, gaming and swap flows
//! - [`driver`] runs one scenario per worker, each with its own admin

pub mod config;
pub mod driver;
pub mod engine;
pub mod lcd;
pub mod logging;
pub mod scenario;
pub mod tx;
pub mod wallet;

pub mod commands;

#[cfg(test)]
mod test_utils;

pub use config::{Config, Deployment, Network};
pub use driver::{run_concurrent, run_single, RunReport};
pub use engine::{Engine, EngineError};
pub use lcd::{ChainClient, LcdClient};
pub use scenario::{Scenario, ScenarioKind};
pub use wallet::Wallet;
