//! Recurring runs
//!
//! Each tick awaits a full `run_all`, so runs never overlap. Ticks that fall
//! due while a run is in flight are skipped rather than queued. A shutdown
//! signal is only observed between runs.

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::SearchQuery;
use crate::pipeline::orchestrator::Orchestrator;

/// Fixed-interval trigger for `run_all`
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    every: Duration,
}

impl Schedule {
    pub fn new(every: Duration) -> Result<Self> {
        if every.is_zero() {
            return Err(Error::config("schedule interval must be greater than zero"));
        }
        Ok(Self { every })
    }

    pub fn interval(&self) -> Duration {
        self.every
    }

    /// Run until Ctrl-C, returning the number of completed runs
    pub async fn run(&self, orchestrator: &mut Orchestrator, query: &SearchQuery) -> usize {
        self.run_until(orchestrator, query, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` resolves; the first run starts immediately
    pub async fn run_until<F>(&self, orchestrator: &mut Orchestrator, query: &SearchQuery, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(interval_secs = self.every.as_secs(), "Schedule started");

        let mut runs = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(runs, "Shutdown requested, schedule stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let summary = orchestrator.run_all(query).await;
                    runs += 1;
                    info!(run = runs, clean = summary.is_clean(), "Scheduled run finished");
                }
            }
        }
        runs
    }
}
