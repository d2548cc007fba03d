//! Fury Load Test CLI
//!
//! Drives staking, gaming and swap scenarios against a Terra LCD.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};

use fury_load_test::{
    commands::{self, print_warning},
    config::{default_config_path, Config, Network},
    logging,
    scenario::ScenarioKind,
};

#[derive(Parser)]
#[command(name = "fury-load-test")]
#[command(about = "Load test the Fury gaming pool and club staking contracts")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Target network (local or testnet), overriding the config file
    #[arg(short, long, global = true)]
    network: Option<Network>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Buy clubs and stake on them
    Staking {
        /// Users per worker
        #[arg(short, long, default_value = "10")]
        users: usize,

        /// Parallel workers, each with its own admin account
        #[arg(short, long, default_value = "1")]
        workers: usize,
    },

    /// Create pools, bid, lock, distribute and claim rewards
    Gaming {
        /// Users per worker
        #[arg(short, long, default_value = "10")]
        users: usize,

        /// Parallel workers, each with its own admin account
        #[arg(short, long, default_value = "1")]
        workers: usize,
    },

    /// Buy and sell FURY through the proxy pair
    Swap {
        /// Users per worker
        #[arg(short, long, default_value = "10")]
        users: usize,

        /// Parallel workers, each with its own admin account
        #[arg(short, long, default_value = "1")]
        workers: usize,
    },

    /// Send FURY, UST and LUNA to an address
    Fund {
        /// Recipient address
        address: String,
    },

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if Config::exists(&cli.config) {
        Config::load(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
    } else {
        print_warning(&format!(
            "{} not found, using LocalTerra defaults",
            cli.config.display()
        ));
        Config::default()
    };

    if let Some(network) = cli.network {
        config.network = network;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { force } = cli.command {
        let _guard = logging::init(cli.verbose, None)?;
        return commands::init_config::run(&cli.config, cli.network, force).await;
    }

    let config = load_config(&cli)?;
    let _guard = logging::init(cli.verbose, config.log_file.as_deref())?;
    let config = Arc::new(config);

    match cli.command {
        Commands::Staking { users, workers } => {
            commands::run::run(config, ScenarioKind::Staking, users, workers).await
        }
        Commands::Gaming { users, workers } => {
            commands::run::run(config, ScenarioKind::Gaming, users, workers).await
        }
        Commands::Swap { users, workers } => {
            commands::run::run(config, ScenarioKind::Swap, users, workers).await
        }
        Commands::Fund { address } => commands::fund::run(config, &address).await,
        Commands::InitConfig { .. } => Ok(()),
    }
}
