//! End-to-end pipeline integration tests
//!
//! Tests the complete workflow over static pages:
//! 1. Employer fetch from a ranking page and seed file
//! 2. Careers-URL discovery
//! 3. Board scrape and careers-page harvest
//! 4. Export snapshots

use std::time::Duration;

use jobharvest::config::Config;
use jobharvest::connectors::{BoardConnector, Connector};
use jobharvest::crawler::StaticPageDriver;
use jobharvest::models::{DiscoveryStatus, NewEmployer, SearchQuery, CAREERS_PAGE_SOURCE};
use jobharvest::pipeline::{Orchestrator, Schedule};
use jobharvest::storage::{EmployerStore, JobStore, SharedStore};
use tempfile::TempDir;

use super::fixtures::{
    board_profile, ACME_CAREERS_URL, BOARD_RESULTS_HTML, BOARD_SEARCH_TEMPLATE, BOARD_SEARCH_URL,
    RANKING_HTML, RANKING_URL,
};
use crate::common::{sqlite_store, stepping_clock, ACME_CAREERS_HTML};

fn query() -> SearchQuery {
    SearchQuery {
        keywords: "graduate".to_string(),
        location: "London".to_string(),
        max_results: 25,
    }
}

fn config(dir: &TempDir) -> Config {
    let seed = dir.path().join("seed.csv");
    std::fs::write(
        &seed,
        format!("name,careers_url\nacme,{ACME_CAREERS_URL}\nInitrode,not a url\n"),
    )
    .unwrap();

    let mut config = Config::default();
    config.employers.ranking_urls = vec![RANKING_URL.to_string()];
    config.employers.seed_file = Some(seed);
    config.export.dir = dir.path().join("out");
    config
}

fn board() -> Box<dyn Connector> {
    let driver = StaticPageDriver::new().with_page(BOARD_SEARCH_URL, BOARD_RESULTS_HTML);
    Box::new(BoardConnector::new("board", board_profile(BOARD_SEARCH_TEMPLATE), Box::new(driver)).unwrap())
}

fn orchestrator(config: Config, store: SharedStore) -> Orchestrator {
    let employer_driver = StaticPageDriver::new().with_page(RANKING_URL, RANKING_HTML);
    let harvest_driver = StaticPageDriver::new().with_page(ACME_CAREERS_URL, ACME_CAREERS_HTML);

    Orchestrator::builder(config, store)
        .clock(stepping_clock())
        .connectors(vec![board()])
        .employer_driver(Box::new(employer_driver))
        .harvest_driver(Box::new(harvest_driver))
        .build()
        .unwrap()
}

// ============================================================================
// Complete Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_run_all_end_to_end() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let (_db_dir, store) = sqlite_store();
    let mut orchestrator = orchestrator(config(&dir), store.clone());

    // Act
    let summary = orchestrator.run_all(&query()).await;

    // Assert: every stage reported and nothing failed
    assert!(summary.is_clean(), "unexpected failures: {:?}", summary.failures);

    let employers = summary.employers.as_ref().unwrap();
    assert_eq!(employers.pages_fetched, 1);
    assert_eq!(employers.seed_rows, 2);
    assert_eq!(employers.dropped, 1);
    assert_eq!(employers.inserted, 4);

    let discovery = summary.discovery.as_ref().unwrap();
    assert_eq!(discovery.candidates, 3);
    assert_eq!(discovery.resolved_by_heuristic, 1);
    assert_eq!(discovery.missed, 2);

    let names: Vec<&str> = summary.connectors.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["board", CAREERS_PAGE_SOURCE]);
    assert_eq!(summary.connectors[0].found, 2);
    assert_eq!(summary.connectors[0].ingest.inserted, 2);
    assert_eq!(summary.connectors[1].found, 2);
    assert_eq!(summary.connectors[1].ingest.inserted, 2);

    let export = summary.export.as_ref().unwrap();
    assert_eq!(export.rows, 4);
    assert!(export.workbook_path.exists());
    assert!(export.csv_path.exists());

    assert_eq!(store.count_jobs().unwrap(), 4);
}

#[tokio::test]
async fn test_employer_registry_after_run() {
    let dir = TempDir::new().unwrap();
    let (_db_dir, store) = sqlite_store();
    let mut orchestrator = orchestrator(config(&dir), store.clone());

    orchestrator.run_all(&query()).await;

    let acme = store.find_employer("ACME").unwrap().unwrap();
    assert_eq!(acme.name, "Acme");
    assert_eq!(acme.careers_url.as_deref(), Some(ACME_CAREERS_URL));

    let amazon = store.find_employer("Amazon Studios Ltd").unwrap().unwrap();
    assert_eq!(amazon.careers_url.as_deref(), Some("https://www.amazon.jobs/en/"));

    let globex = store.find_employer("Globex Corporation").unwrap().unwrap();
    assert_eq!(globex.status(), DiscoveryStatus::Unknown);
    assert_eq!(globex.discovery_attempts, 1);

    let initrode = store.find_employer("Initrode").unwrap().unwrap();
    assert!(initrode.careers_url.is_none(), "invalid seed url must be dropped");
}

#[tokio::test]
async fn test_harvested_posting_carries_employer() {
    let dir = TempDir::new().unwrap();
    let (_db_dir, store) = sqlite_store();
    let mut orchestrator = orchestrator(config(&dir), store.clone());

    orchestrator.run_all(&query()).await;

    let acme = store.find_employer("Acme").unwrap().unwrap();
    let job = store
        .get_job("https://acme.test/careers/graduate-analyst")
        .unwrap()
        .expect("harvested posting keyed by its normalized url");

    assert_eq!(job.source, CAREERS_PAGE_SOURCE);
    assert_eq!(job.employer_id, Some(acme.id));
    assert_eq!(job.employer_name, "Acme");
    assert_eq!(job.source_careers_url.as_deref(), Some(ACME_CAREERS_URL));
    assert_eq!(job.location, "Unknown");
    assert_eq!(job.title, "Graduate Analyst Programme");

    let board_job = store.get_job("https://board.test/jobs/101").unwrap().unwrap();
    assert_eq!(board_job.source, "board");
    assert_eq!(board_job.employer_name, "Initech");
    assert!(board_job.source_careers_url.is_none());
}

#[tokio::test]
async fn test_second_run_updates_instead_of_inserting() {
    let dir = TempDir::new().unwrap();
    let (_db_dir, store) = sqlite_store();
    let mut orchestrator = orchestrator(config(&dir), store.clone());

    let first = orchestrator.run_all(&query()).await;
    let second = orchestrator.run_all(&query()).await;

    assert_eq!(first.ingest_totals().inserted, 4);
    let totals = second.ingest_totals();
    assert_eq!(totals.inserted, 0);
    assert_eq!(totals.updated, 4);

    let employers = second.employers.as_ref().unwrap();
    assert_eq!(employers.inserted, 0);
    assert_eq!(employers.existing, 4);

    assert_eq!(store.count_jobs().unwrap(), 4);
    for job in store.list_jobs().unwrap() {
        assert_eq!(job.sighting_count, 2, "job {} seen twice", job.id);
        assert!(job.last_seen_at > job.first_seen_at);
    }

    let globex = store.find_employer("Globex Corporation").unwrap().unwrap();
    assert_eq!(globex.discovery_attempts, 2);
}

const ACME_CORP_CAREERS_URL: &str = "https://acmecorp.test/careers";

const ACME_CORP_CAREERS_HTML: &str = r#"
<html><body>
    <a href="/careers/graduate-analyst">Graduate Analyst Programme</a>
    <a href="/about">About Us</a>
    <a href="/careers/summer-intern-data">Summer Intern – Data</a>
</body></html>
"#;

#[tokio::test]
async fn test_careers_page_rerun_advances_last_seen_only() {
    let dir = TempDir::new().unwrap();
    let (_db_dir, store) = sqlite_store();
    store
        .insert_employer(
            &NewEmployer {
                name: "Acme Corp".to_string(),
                careers_url: Some(ACME_CORP_CAREERS_URL.to_string()),
                source: "seed".to_string(),
            },
            crate::common::t0(),
        )
        .unwrap();

    let mut config = Config::default();
    config.employers.ranking_urls = Vec::new();
    config.export.dir = dir.path().join("out");
    let harvest_driver =
        StaticPageDriver::new().with_page(ACME_CORP_CAREERS_URL, ACME_CORP_CAREERS_HTML);
    let mut orchestrator = Orchestrator::builder(config, store.clone())
        .clock(stepping_clock())
        .connectors(Vec::new())
        .employer_driver(Box::new(StaticPageDriver::new()))
        .harvest_driver(Box::new(harvest_driver))
        .build()
        .unwrap();

    // First sighting
    let reports = orchestrator.scrape_jobs(&query()).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].ingest.inserted, 2);

    let first = store.list_jobs().unwrap();
    assert_eq!(first.len(), 2);
    let mut titles: Vec<&str> = first.iter().map(|j| j.title.as_str()).collect();
    titles.sort();
    assert_eq!(titles, vec!["Graduate Analyst Programme", "Summer Intern – Data"]);
    for job in &first {
        assert_eq!(job.employer_name, "Acme Corp");
        assert_eq!(job.first_seen_at, job.last_seen_at);
        assert_eq!(job.sighting_count, 1);
    }

    // Re-run over the same page
    let reports = orchestrator.scrape_jobs(&query()).await.unwrap();
    assert_eq!(reports[0].ingest.updated, 2);

    let second = store.list_jobs().unwrap();
    assert_eq!(second.len(), 2);
    for job in &second {
        let before = first.iter().find(|j| j.id == job.id).unwrap();
        assert_eq!(job.first_seen_at, before.first_seen_at);
        assert!(job.last_seen_at > before.last_seen_at);
        assert_eq!(job.sighting_count, 2);
    }
}

#[tokio::test]
async fn test_export_csv_has_union_columns() {
    let dir = TempDir::new().unwrap();
    let (_db_dir, store) = sqlite_store();
    let mut orchestrator = orchestrator(config(&dir), store);

    let summary = orchestrator.run_all(&query()).await;
    let export = summary.export.unwrap();

    let mut reader = csv::Reader::from_path(&export.csv_path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert!(headers.contains(&"source_careers_url".to_string()));
    assert!(headers.contains(&"employer_id".to_string()));
    assert_eq!(headers.len(), export.columns);
    assert_eq!(reader.records().count(), 4);
}

#[tokio::test]
async fn test_harvester_disabled() {
    let dir = TempDir::new().unwrap();
    let (_db_dir, store) = sqlite_store();
    let mut config = config(&dir);
    config.harvester.enabled = false;

    let employer_driver = StaticPageDriver::new().with_page(RANKING_URL, RANKING_HTML);
    let mut orchestrator = Orchestrator::builder(config, store)
        .clock(stepping_clock())
        .connectors(vec![board()])
        .employer_driver(Box::new(employer_driver))
        .build()
        .unwrap();

    let reports = orchestrator.scrape_jobs(&query()).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].name, "board");
}

// ============================================================================
// Schedule Tests
// ============================================================================

#[tokio::test]
async fn test_schedule_runs_immediately_then_stops() {
    let dir = TempDir::new().unwrap();
    let (_db_dir, store) = sqlite_store();
    let mut orchestrator = orchestrator(config(&dir), store.clone());

    let schedule = Schedule::new(Duration::from_secs(3600)).unwrap();
    let runs = schedule
        .run_until(
            &mut orchestrator,
            &query(),
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;

    assert_eq!(runs, 1);
    assert_eq!(store.count_jobs().unwrap(), 4);
}
