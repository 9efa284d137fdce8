//! Stage orchestration
//!
//! The orchestrator owns control flow. Stages run strictly in sequence:
//!
//! ```text
//! fetch_employers -> discover_urls -> scrape_jobs -> export
//! ```
//!
//! Inside `scrape_jobs` every connector runs to completion and is ingested
//! before the next one starts; the careers-page harvest comes last. A
//! connector that errors or panics is contained here and recorded in its
//! report, and `run_all` carries on past a failed stage.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::connectors::{build_connectors, Connector, EmployerSiteHarvester};
use crate::crawler::{http_driver, PageDriver};
use crate::error::{Error, Result};
use crate::export::{ExportReport, Exporter};
use crate::models::{PostingOrigin, SearchQuery, CAREERS_PAGE_SOURCE};
use crate::registry::{CareersLookup, Discovery, DiscoveryReport, EmployerFetchReport, EmployerFetcher};
use crate::storage::{EmployerStore, IngestReport, JobIngestor, SharedStore};
use crate::utils::error::ConnectorError;
use crate::utils::{system_clock, Clock};

/// Outcome of one connector (or the harvest) within `scrape_jobs`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorReport {
    pub name: String,
    pub found: usize,
    pub ingest: IngestReport,
    pub error: Option<String>,
}

impl ConnectorReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// A stage that returned an error inside `run_all`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: &'static str,
    pub error: String,
}

/// Per-stage reports of one `run_all`
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub employers: Option<EmployerFetchReport>,
    pub discovery: Option<DiscoveryReport>,
    pub connectors: Vec<ConnectorReport>,
    pub export: Option<ExportReport>,
    pub failures: Vec<StageFailure>,
}

impl RunSummary {
    fn start(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            finished_at: now,
            employers: None,
            discovery: None,
            connectors: Vec::new(),
            export: None,
            failures: Vec::new(),
        }
    }

    /// Totals over every connector
    pub fn ingest_totals(&self) -> IngestReport {
        let mut total = IngestReport::default();
        for report in &self.connectors {
            total.absorb(report.ingest);
        }
        total
    }

    /// True when no stage and no connector failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.connectors.iter().any(ConnectorReport::failed)
    }

    fn record<T>(&mut self, stage: &'static str, result: Result<T>) -> Option<T> {
        match result {
            Ok(report) => Some(report),
            Err(e) => {
                error!(stage, error = %e, "Stage failed, continuing");
                self.failures.push(StageFailure {
                    stage,
                    error: e.to_string(),
                });
                None
            }
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run {} -> {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.finished_at.format("%H:%M:%S")
        )?;
        if let Some(r) = &self.employers {
            writeln!(
                f,
                "  employers: {} new, {} existing, {} resolved from seed, {} store errors",
                r.inserted, r.existing, r.resolved_from_seed, r.store_errors
            )?;
        }
        if let Some(r) = &self.discovery {
            writeln!(
                f,
                "  discovery: {} resolved, {} missed of {}, {} store errors",
                r.resolved(),
                r.missed,
                r.candidates,
                r.store_errors
            )?;
        }
        for c in &self.connectors {
            match &c.error {
                Some(e) => writeln!(f, "  {}: FAILED ({e})", c.name)?,
                None => writeln!(f, "  {}: found {} ({})", c.name, c.found, c.ingest)?,
            }
        }
        if let Some(r) = &self.export {
            writeln!(f, "  export: {} rows -> {}", r.rows, r.csv_path.display())?;
        }
        for failure in &self.failures {
            writeln!(f, "  stage {} failed: {}", failure.stage, failure.error)?;
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one connector with error and panic containment, then ingest its output
async fn run_connector(
    connector: &mut dyn Connector,
    query: &SearchQuery,
    ingestor: &JobIngestor,
) -> ConnectorReport {
    let name = connector.name().to_string();
    let mut report = ConnectorReport::new(&name);

    let outcome = AssertUnwindSafe(connector.scrape(query)).catch_unwind().await;
    let postings = match outcome {
        Ok(Ok(postings)) => postings,
        Ok(Err(e)) => {
            error!(connector = %name, error = %e, "Connector failed");
            report.error = Some(e.to_string());
            return report;
        }
        Err(payload) => {
            let e = ConnectorError::Panicked(name.clone());
            error!(connector = %name, panic = %panic_message(payload.as_ref()), "Connector panicked");
            report.error = Some(e.to_string());
            return report;
        }
    };

    report.found = postings.len();
    report.ingest = ingestor.ingest(&PostingOrigin::connector(&name), &postings);
    report
}

/// Pipeline orchestrator
pub struct Orchestrator {
    store: SharedStore,
    clock: Clock,
    ingestor: JobIngestor,
    connectors: Vec<Box<dyn Connector>>,
    employer_fetcher: EmployerFetcher,
    discovery: Discovery,
    harvester: Option<EmployerSiteHarvester>,
    exporter: Exporter,
}

impl Orchestrator {
    pub fn builder(config: Config, store: SharedStore) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config, store)
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn connector_names(&self) -> Vec<String> {
        self.connectors.iter().map(|c| c.name().to_string()).collect()
    }

    /// Fill the employer registry
    pub async fn fetch_employers(&mut self) -> Result<EmployerFetchReport> {
        self.employer_fetcher.fetch().await
    }

    /// Resolve missing careers URLs
    pub async fn discover_urls(&self) -> Result<DiscoveryReport> {
        self.discovery.run().await
    }

    /// Run every connector in order, then the careers-page harvest
    pub async fn scrape_jobs(&mut self, query: &SearchQuery) -> Result<Vec<ConnectorReport>> {
        let mut reports = Vec::with_capacity(self.connectors.len() + 1);

        for connector in self.connectors.iter_mut() {
            let report = run_connector(connector.as_mut(), query, &self.ingestor).await;
            reports.push(report);
        }

        if let Some(harvester) = self.harvester.as_mut() {
            reports.push(harvest(harvester, &self.store, &self.ingestor).await);
        }

        let totals = reports.iter().fold(IngestReport::default(), |mut acc, r| {
            acc.absorb(r.ingest);
            acc
        });
        info!(
            connectors = reports.len(),
            inserted = totals.inserted,
            updated = totals.updated,
            skipped = totals.skipped,
            "Scrape complete"
        );
        Ok(reports)
    }

    /// Write workbook and CSV snapshots
    pub async fn export(&self) -> Result<ExportReport> {
        Ok(self.exporter.export()?)
    }

    /// Every stage in order; a failed stage does not stop the next
    pub async fn run_all(&mut self, query: &SearchQuery) -> RunSummary {
        let mut summary = RunSummary::start((self.clock)());
        info!(keywords = %query.keywords, location = %query.location, "Run started");

        let result = self.fetch_employers().await;
        summary.employers = summary.record("fetch_employers", result);

        let result = self.discover_urls().await;
        summary.discovery = summary.record("discover_urls", result);

        let result = self.scrape_jobs(query).await;
        summary.connectors = summary.record("scrape_jobs", result).unwrap_or_default();

        let result = self.export().await;
        summary.export = summary.record("export", result);

        summary.finished_at = (self.clock)();
        let totals = summary.ingest_totals();
        info!(
            inserted = totals.inserted,
            updated = totals.updated,
            skipped = totals.skipped,
            failures = summary.failures.len(),
            "Run finished"
        );
        summary
    }
}

/// Harvest every resolved employer into one report
async fn harvest(
    harvester: &mut EmployerSiteHarvester,
    store: &SharedStore,
    ingestor: &JobIngestor,
) -> ConnectorReport {
    let mut report = ConnectorReport::new(CAREERS_PAGE_SOURCE);

    let employers = match store.resolved_employers() {
        Ok(employers) => employers,
        Err(e) => {
            error!(connector = CAREERS_PAGE_SOURCE, error = %e, "Failed to list resolved employers");
            report.error = Some(e.to_string());
            return report;
        }
    };

    for employer in employers {
        let outcome = AssertUnwindSafe(harvester.harvest(&employer)).catch_unwind().await;
        let postings = match outcome {
            Ok(postings) => postings,
            Err(payload) => {
                warn!(
                    employer = %employer.name,
                    panic = %panic_message(payload.as_ref()),
                    "Harvest panicked, skipping employer"
                );
                continue;
            }
        };

        report.found += postings.len();
        report
            .ingest
            .absorb(ingestor.ingest(&PostingOrigin::careers_page(&employer), &postings));
    }

    report
}

/// Assembles an [`Orchestrator`], defaulting every part from config
pub struct OrchestratorBuilder {
    config: Config,
    store: SharedStore,
    clock: Clock,
    connectors: Option<Vec<Box<dyn Connector>>>,
    employer_driver: Option<Box<dyn PageDriver>>,
    harvest_driver: Option<Box<dyn PageDriver>>,
    lookup: Option<Box<dyn CareersLookup>>,
}

impl OrchestratorBuilder {
    pub fn new(config: Config, store: SharedStore) -> Self {
        Self {
            config,
            store,
            clock: system_clock(),
            connectors: None,
            employer_driver: None,
            harvest_driver: None,
            lookup: None,
        }
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Use these connectors instead of the configured ones
    pub fn connectors(mut self, connectors: Vec<Box<dyn Connector>>) -> Self {
        self.connectors = Some(connectors);
        self
    }

    /// Driver for ranking pages
    pub fn employer_driver(mut self, driver: Box<dyn PageDriver>) -> Self {
        self.employer_driver = Some(driver);
        self
    }

    /// Driver for careers pages
    pub fn harvest_driver(mut self, driver: Box<dyn PageDriver>) -> Self {
        self.harvest_driver = Some(driver);
        self
    }

    pub fn lookup(mut self, lookup: Box<dyn CareersLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Export directory override
    pub fn export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.export.dir = dir.into();
        self
    }

    fn driver_or_http(&self, driver: Option<Box<dyn PageDriver>>) -> Result<Box<dyn PageDriver>> {
        match driver {
            Some(driver) => Ok(driver),
            None => http_driver(&self.config).map_err(Error::from),
        }
    }

    pub fn build(mut self) -> Result<Orchestrator> {
        let clock = self.clock.clone();

        let connectors = match self.connectors.take() {
            Some(connectors) => connectors,
            None => build_connectors(&self.config)?,
        };

        let employer_driver = self.employer_driver.take();
        let employer_driver = self.driver_or_http(employer_driver)?;
        let employer_fetcher = EmployerFetcher::new(
            &self.config.employers,
            employer_driver,
            self.store.clone(),
            clock.clone(),
        )?;

        let harvester = if self.config.harvester.enabled {
            let harvest_driver = self.harvest_driver.take();
            let driver = self.driver_or_http(harvest_driver)?;
            Some(EmployerSiteHarvester::new(&self.config.harvester, driver))
        } else {
            None
        };

        let mut discovery = Discovery::new(&self.config.discovery, self.store.clone(), clock.clone());
        if let Some(lookup) = self.lookup.take() {
            discovery = discovery.with_lookup(lookup);
        }

        let exporter = Exporter::new(self.store.clone(), self.config.export.dir.clone(), clock.clone());
        let ingestor = JobIngestor::with_clock(self.store.clone(), clock.clone());

        Ok(Orchestrator {
            store: self.store,
            clock,
            ingestor,
            connectors,
            employer_fetcher,
            discovery,
            harvester,
            exporter,
        })
    }
}
