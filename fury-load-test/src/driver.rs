//! Worker pool driving scenarios from several admin accounts at once.
//!
//! Worker `i` (1-based) gets an engine bound to admin shift `i`, so no two
//! workers ever sign with the same admin key. The minting wallet is shared
//! and its sequence guard serializes the funding transactions.

use crate::{
    config::{Config, ConfigError},
    engine::{Engine, EngineError, StatsSnapshot},
    scenario::ScenarioKind,
};
use futures::future::join_all;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, Instrument};

/// Result of one worker's run
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    pub worker: usize,
    pub admin_address: String,
    pub elapsed: Duration,
    pub stats: StatsSnapshot,
    pub error: Option<String>,
}

impl WorkerOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub scenario: ScenarioKind,
    pub outcomes: Vec<WorkerOutcome>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn total_broadcasts(&self) -> u64 {
        self.outcomes.iter().map(|o| o.stats.broadcasts).sum()
    }

    pub fn log_summary(&self) {
        info!(
            scenario = %self.scenario,
            workers = self.outcomes.len(),
            succeeded = self.succeeded(),
            failed = self.failed(),
            broadcasts = self.total_broadcasts(),
            elapsed_secs = self.elapsed.as_secs_f64(),
            "Load test finished"
        );
        for outcome in &self.outcomes {
            match &outcome.error {
                None => info!(
                    worker = outcome.worker,
                    admin = %outcome.admin_address,
                    broadcasts = outcome.stats.broadcasts,
                    "Worker completed in {:?}",
                    outcome.elapsed
                ),
                Some(e) => error!(
                    worker = outcome.worker,
                    admin = %outcome.admin_address,
                    broadcasts = outcome.stats.broadcasts,
                    failures = outcome.stats.failures,
                    "Worker failed: {}",
                    e
                ),
            }
        }
    }
}

async fn run_worker(
    worker: usize,
    engine: Engine,
    kind: ScenarioKind,
    users: usize,
) -> WorkerOutcome {
    let start = Instant::now();
    let admin_address = engine.admin_wallet().address().to_string();

    let result = async {
        let mut scenario = kind.setup(engine.clone()).await?;
        info!("Running {} scenario with {} users", scenario.name(), users);
        scenario.run(users).await
    }
    .await;

    let error = match result {
        Ok(()) => None,
        Err(e) => {
            error!("Scenario failed: {}", e);
            Some(e.to_string())
        }
    };

    WorkerOutcome {
        worker,
        admin_address,
        elapsed: start.elapsed(),
        stats: engine.stats(),
        error,
    }
}

/// Run one scenario instance on `engine`.
pub async fn run_single(engine: &Engine, kind: ScenarioKind, users: usize) -> RunReport {
    let start = Instant::now();
    let outcome = run_worker(1, engine.clone(), kind, users)
        .instrument(info_span!("worker", worker = 1))
        .await;

    RunReport {
        scenario: kind,
        outcomes: vec![outcome],
        elapsed: start.elapsed(),
    }
}

/// Check a worker count against the configured admin accounts.
///
/// Each worker needs its own admin, so the count must be between 1 and
/// the number of admin mnemonics, and a single explicit admin only allows
/// one worker.
pub fn validate_workers(config: &Config, workers: usize) -> Result<(), EngineError> {
    if workers == 0 {
        return Err(EngineError::InvalidArgument(
            "at least one worker is required".to_string(),
        ));
    }

    if config.wallets.admin_mnemonic.is_some() && workers > 1 {
        return Err(ConfigError::Invalid {
            field: "wallets.admin_mnemonic",
            reason: "a single explicit admin cannot be shared between workers".to_string(),
        }
        .into());
    }
    let available = config.admin_count();
    if workers > available {
        return Err(ConfigError::MissingAdmin {
            shift: workers,
            available,
        }
        .into());
    }
    Ok(())
}

/// Run `workers` scenario instances in parallel, one per admin account.
///
/// Every engine is built before any task starts, so a missing admin
/// account fails the whole run up front.
pub async fn run_concurrent(
    base: &Engine,
    kind: ScenarioKind,
    workers: usize,
    users_per_worker: usize,
) -> Result<RunReport, EngineError> {
    validate_workers(base.config(), workers)?;

    let engines = (1..=workers)
        .map(|shift| base.with_admin_shift(shift))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        scenario = %kind,
        workers,
        users_per_worker,
        "Starting concurrent load test"
    );
    let start = Instant::now();

    let handles: Vec<_> = engines
        .into_iter()
        .enumerate()
        .map(|(index, engine)| {
            let worker = index + 1;
            let admin_address = engine.admin_wallet().address().to_string();
            let span = info_span!("worker", worker, admin = %admin_address);
            let handle = tokio::spawn(
                run_worker(worker, engine, kind, users_per_worker).instrument(span),
            );
            (worker, admin_address, handle)
        })
        .collect();

    let outcomes = join_all(handles.into_iter().map(|(worker, admin_address, handle)| async move {
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(worker, "Worker task aborted: {}", e);
                WorkerOutcome {
                    worker,
                    admin_address,
                    elapsed: Duration::ZERO,
                    stats: StatsSnapshot::default(),
                    error: Some(e.to_string()),
                }
            }
        }
    }))
    .await;

    Ok(RunReport {
        scenario: kind,
        outcomes,
        elapsed: start.elapsed(),
    })
}
