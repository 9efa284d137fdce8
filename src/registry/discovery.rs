//! Careers-URL discovery
//!
//! Every unresolved employer is offered first to a pluggable
//! [`CareersLookup`], then to the configured [`HeuristicTable`]. The first
//! non-empty answer resolves the employer. Misses bump the employer's
//! attempt counter and it is tried again on the next run, unless
//! `discovery.max_attempts` has been reached.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{DiscoveryConfig, HeuristicEntry};
use crate::error::Result;
use crate::models::Employer;
use crate::storage::{EmployerStore, SharedStore};
use crate::utils::Clock;

/// External careers-URL resolver, such as a web search
#[async_trait]
pub trait CareersLookup: Send + Sync {
    /// Careers URL for an employer, `None` when unknown
    async fn lookup(&self, employer: &Employer) -> Result<Option<String>>;
}

/// Lookup that never knows anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLookup;

#[async_trait]
impl CareersLookup for NoopLookup {
    async fn lookup(&self, _employer: &Employer) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Ordered (lowercase substring, URL) table
#[derive(Debug, Clone, Default)]
pub struct HeuristicTable {
    entries: Vec<HeuristicEntry>,
}

impl HeuristicTable {
    pub fn new(entries: &[HeuristicEntry]) -> Self {
        Self {
            entries: entries
                .iter()
                .filter(|e| !e.pattern.trim().is_empty() && !e.url.trim().is_empty())
                .map(|e| HeuristicEntry::new(&e.pattern.trim().to_lowercase(), e.url.trim()))
                .collect(),
        }
    }

    /// URL of the first entry whose pattern occurs in the lowercased name
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let lowered = name.to_lowercase();
        self.entries
            .iter()
            .find(|e| lowered.contains(e.pattern.as_str()))
            .map(|e| e.url.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of one discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub candidates: usize,
    pub resolved_by_lookup: usize,
    pub resolved_by_heuristic: usize,
    pub missed: usize,
    pub lookup_errors: usize,
    /// Employers whose outcome could not be written
    pub store_errors: usize,
}

impl DiscoveryReport {
    pub fn resolved(&self) -> usize {
        self.resolved_by_lookup + self.resolved_by_heuristic
    }
}

/// Discovery stage
pub struct Discovery {
    store: SharedStore,
    clock: Clock,
    lookup: Box<dyn CareersLookup>,
    heuristics: HeuristicTable,
    max_attempts: Option<u32>,
}

impl Discovery {
    pub fn new(config: &DiscoveryConfig, store: SharedStore, clock: Clock) -> Self {
        Self {
            store,
            clock,
            lookup: Box::new(NoopLookup),
            heuristics: HeuristicTable::new(&config.heuristics),
            max_attempts: config.max_attempts,
        }
    }

    /// Replace the default no-op lookup
    pub fn with_lookup(mut self, lookup: Box<dyn CareersLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    async fn ask_lookup(&self, employer: &Employer, report: &mut DiscoveryReport) -> Option<String> {
        match self.lookup.lookup(employer).await {
            Ok(url) => url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
            Err(e) => {
                warn!(employer = %employer.name, error = %e, "Careers lookup failed");
                report.lookup_errors += 1;
                None
            }
        }
    }

    /// Resolve every eligible unknown employer
    pub async fn run(&self) -> Result<DiscoveryReport> {
        let employers = self.store.unresolved_employers(self.max_attempts)?;
        let mut report = DiscoveryReport {
            candidates: employers.len(),
            ..Default::default()
        };

        for employer in &employers {
            let now = (self.clock)();

            if let Some(url) = self.ask_lookup(employer, &mut report).await {
                match self.store.set_careers_url(employer.id, &url, now) {
                    Ok(()) => {
                        debug!(employer = %employer.name, url = %url, "Resolved by lookup");
                        report.resolved_by_lookup += 1;
                    }
                    Err(e) => {
                        warn!(employer = %employer.name, error = %e, "Failed to store careers url");
                        report.store_errors += 1;
                    }
                }
                continue;
            }

            if let Some(url) = self.heuristics.resolve(&employer.name) {
                match self.store.set_careers_url(employer.id, url, now) {
                    Ok(()) => {
                        debug!(employer = %employer.name, url = %url, "Resolved by heuristic");
                        report.resolved_by_heuristic += 1;
                    }
                    Err(e) => {
                        warn!(employer = %employer.name, error = %e, "Failed to store careers url");
                        report.store_errors += 1;
                    }
                }
                continue;
            }

            match self.store.record_discovery_miss(employer.id, now) {
                Ok(attempts) => {
                    debug!(employer = %employer.name, attempts, "Careers url not found");
                    report.missed += 1;
                }
                Err(e) => {
                    warn!(employer = %employer.name, error = %e, "Failed to record discovery miss");
                    report.store_errors += 1;
                }
            }
        }

        info!(
            candidates = report.candidates,
            resolved = report.resolved(),
            missed = report.missed,
            store_errors = report.store_errors,
            "Discovery complete"
        );
        Ok(report)
    }
}
