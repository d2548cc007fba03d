//! Scenario run command

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::driver::{self, RunReport};
use crate::engine::Engine;
use crate::scenario::ScenarioKind;

use super::{print_error, print_success};

/// Run the scenario command
pub async fn run(config: Arc<Config>, kind: ScenarioKind, users: usize, workers: usize) -> Result<()> {
    driver::validate_workers(&config, workers)?;
    let engine = Engine::connect(config, None).await?;

    let report = if workers == 1 {
        driver::run_single(&engine, kind, users).await
    } else {
        driver::run_concurrent(&engine, kind, workers, users).await?
    };
    report.log_summary();
    print_report(&report);

    if !report.is_success() {
        bail!("{} of {} workers failed", report.failed(), report.outcomes.len());
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("Scenario:     {}", report.scenario);
    println!("Workers:      {}", report.outcomes.len());
    println!("Broadcasts:   {}", report.total_broadcasts());
    println!("Elapsed:      {:.1}s", report.elapsed.as_secs_f64());
    println!();

    for outcome in &report.outcomes {
        match &outcome.error {
            None => println!(
                "  worker {:>2}  {}  {:>5} txs  {:.1}s",
                outcome.worker,
                outcome.admin_address,
                outcome.stats.broadcasts,
                outcome.elapsed.as_secs_f64()
            ),
            Some(e) => print_error(&format!("worker {} ({}): {}", outcome.worker, outcome.admin_address, e)),
        }
    }

    println!();
    if report.is_success() {
        print_success(&format!("{} scenario completed", report.scenario));
    }
}
