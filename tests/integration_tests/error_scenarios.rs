//! Error scenario integration tests
//!
//! Tests the failure modes the orchestrator must contain:
//! 1. Connectors that return errors
//! 2. Connectors that panic
//! 3. Unreachable boards
//! 4. A failing stage inside `run_all`
//! 5. A store that cannot list employers for the harvest

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use jobharvest::config::{Config, HttpConfig};
use jobharvest::connectors::{BoardConnector, Connector};
use jobharvest::crawler::{HttpPageDriver, PacingPolicy, PageFetcher, StaticPageDriver};
use jobharvest::models::{RawPosting, SearchQuery, CAREERS_PAGE_SOURCE};
use jobharvest::pipeline::Orchestrator;
use jobharvest::storage::{JobStore, MemoryStore, SharedStore};
use jobharvest::utils::error::ConnectorError;
use tempfile::TempDir;

use super::fixtures::board_profile;
use crate::common::{posting, stepping_clock, FaultyStore};

/// Connector with scripted behaviour
struct Scripted {
    name: String,
    behaviour: Behaviour,
    calls: Arc<AtomicUsize>,
}

enum Behaviour {
    Yield(Vec<RawPosting>),
    Fail,
    Panic,
}

impl Scripted {
    fn boxed(name: &str, behaviour: Behaviour, calls: &Arc<AtomicUsize>) -> Box<dyn Connector> {
        Box::new(Self {
            name: name.to_string(),
            behaviour,
            calls: Arc::clone(calls),
        })
    }
}

#[async_trait]
impl Connector for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&mut self, _query: &SearchQuery) -> Result<Vec<RawPosting>, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Yield(postings) => Ok(postings.clone()),
            Behaviour::Fail => Err(ConnectorError::misconfigured(&self.name, "bad template")),
            Behaviour::Panic => panic!("connector {} blew up", self.name),
        }
    }
}

fn offline_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.employers.ranking_urls = Vec::new();
    config.harvester.enabled = false;
    config.export.dir = dir.path().join("out");
    config
}

fn orchestrator(config: Config, store: SharedStore, connectors: Vec<Box<dyn Connector>>) -> Orchestrator {
    Orchestrator::builder(config, store)
        .clock(stepping_clock())
        .connectors(connectors)
        .employer_driver(Box::new(StaticPageDriver::new()))
        .build()
        .unwrap()
}

// ============================================================================
// Connector Containment Tests
// ============================================================================

#[tokio::test]
async fn test_failing_and_panicking_connectors_are_contained() {
    let dir = TempDir::new().unwrap();
    let store: SharedStore = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let connectors = vec![
        Scripted::boxed(
            "alpha",
            Behaviour::Yield(vec![posting("Graduate Analyst", "https://a.test/jobs/1")]),
            &calls,
        ),
        Scripted::boxed("broken", Behaviour::Fail, &calls),
        Scripted::boxed("explosive", Behaviour::Panic, &calls),
        Scripted::boxed(
            "omega",
            Behaviour::Yield(vec![posting("Graduate Engineer", "https://o.test/jobs/9")]),
            &calls,
        ),
    ];
    let mut orchestrator = orchestrator(offline_config(&dir), store.clone(), connectors);

    let summary = orchestrator.run_all(&SearchQuery::default()).await;

    assert_eq!(calls.load(Ordering::SeqCst), 4, "every connector must run");
    assert!(summary.failures.is_empty(), "stages themselves succeeded");
    assert!(!summary.is_clean());

    let reports = &summary.connectors;
    assert_eq!(reports.len(), 4);
    assert!(!reports[0].failed());
    assert!(reports[1].failed());
    assert!(reports[1].error.as_deref().unwrap().contains("misconfigured"));
    assert!(reports[2].failed());
    assert!(reports[2].error.as_deref().unwrap().contains("panicked"));
    assert!(!reports[3].failed());

    assert_eq!(summary.ingest_totals().inserted, 2);
    assert_eq!(store.count_jobs().unwrap(), 2);
    assert_eq!(summary.export.as_ref().unwrap().rows, 2);
}

#[tokio::test]
async fn test_panicking_connector_runs_again_next_time() {
    let dir = TempDir::new().unwrap();
    let store: SharedStore = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let connectors = vec![Scripted::boxed("explosive", Behaviour::Panic, &calls)];
    let mut orchestrator = orchestrator(offline_config(&dir), store, connectors);

    orchestrator.scrape_jobs(&SearchQuery::default()).await.unwrap();
    orchestrator.scrape_jobs(&SearchQuery::default()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unreachable_board_yields_empty_batch() {
    let http = HttpConfig {
        timeout_secs: 2,
        ..Default::default()
    };
    let driver = HttpPageDriver::new(PageFetcher::new(&http).unwrap(), &PacingPolicy::None);
    let profile = board_profile("http://127.0.0.1:1/search?q={keywords}&l={location}");
    let mut board = BoardConnector::new("offline", profile, Box::new(driver)).unwrap();

    let postings = board.scrape(&SearchQuery::default()).await.unwrap();
    assert!(postings.is_empty());
}

#[tokio::test]
async fn test_invalid_search_template_is_an_error() {
    let profile = board_profile("not a url {keywords}");
    let mut board = BoardConnector::new("broken", profile, Box::new(StaticPageDriver::new())).unwrap();

    let result = board.scrape(&SearchQuery::default()).await;
    assert!(matches!(result, Err(ConnectorError::Misconfigured { .. })));
}

// ============================================================================
// Stage Failure Tests
// ============================================================================

#[tokio::test]
async fn test_failed_export_stage_does_not_hide_earlier_stages() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "occupied").unwrap();

    let mut config = offline_config(&dir);
    config.export.dir = blocker;

    let store: SharedStore = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let connectors = vec![Scripted::boxed(
        "alpha",
        Behaviour::Yield(vec![posting("Graduate Analyst", "https://a.test/jobs/1")]),
        &calls,
    )];
    let mut orchestrator = orchestrator(config, store.clone(), connectors);

    let summary = orchestrator.run_all(&SearchQuery::default()).await;

    assert!(summary.employers.is_some());
    assert!(summary.discovery.is_some());
    assert_eq!(summary.connectors.len(), 1);
    assert!(summary.export.is_none());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].stage, "export");
    assert_eq!(store.count_jobs().unwrap(), 1);
}

#[tokio::test]
async fn test_harvest_listing_failure_keeps_connector_reports() {
    let dir = TempDir::new().unwrap();
    let mut config = offline_config(&dir);
    config.harvester.enabled = true;

    let store: SharedStore = Arc::new(FaultyStore {
        fail_resolved: true,
        ..Default::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let connectors = vec![Scripted::boxed(
        "alpha",
        Behaviour::Yield(vec![posting("Graduate Analyst", "https://a.test/jobs/1")]),
        &calls,
    )];
    let mut orchestrator = Orchestrator::builder(config, store.clone())
        .clock(stepping_clock())
        .connectors(connectors)
        .employer_driver(Box::new(StaticPageDriver::new()))
        .harvest_driver(Box::new(StaticPageDriver::new()))
        .build()
        .unwrap();

    let summary = orchestrator.run_all(&SearchQuery::default()).await;

    assert!(summary.failures.is_empty(), "unexpected failures: {:?}", summary.failures);
    let reports = &summary.connectors;
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].name, "alpha");
    assert_eq!(reports[0].ingest.inserted, 1);
    assert_eq!(reports[1].name, CAREERS_PAGE_SOURCE);
    assert!(reports[1].failed());
    assert_eq!(store.count_jobs().unwrap(), 1);
}
