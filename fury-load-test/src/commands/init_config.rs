//! Write a default config file

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{Config, Network};

use super::{print_error, print_success, print_warning};

/// Run the init-config command
pub async fn run(path: &Path, network: Option<Network>, force: bool) -> Result<()> {
    if Config::exists(path) {
        if !force {
            print_error("Config already exists at this location");
            println!("Path: {}", path.display());
            println!("Use --force to overwrite it.");
            return Ok(());
        }
        print_warning("Existing config will be overwritten!");
    }

    let config = Config {
        network: network.unwrap_or_default(),
        ..Config::default()
    };
    config
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    print_success("Config written");
    println!("Path: {}", path.display());
    println!();
    print_warning("The default mnemonics are the public LocalTerra test accounts.");
    Ok(())
}
