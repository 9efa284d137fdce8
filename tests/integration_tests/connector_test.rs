//! HTTP connector integration tests
//!
//! Board scraping over the HTTP page driver and the job-search API
//! connector, both against a mock server.

use std::sync::Arc;

use jobharvest::config::{ApiConfig, HttpConfig};
use jobharvest::connectors::{ApiConnector, BoardConnector, BoardProfile, Connector};
use jobharvest::crawler::{HttpPageDriver, PacingPolicy, PageFetcher, StaticPageDriver};
use jobharvest::models::{PostingOrigin, SearchQuery};
use jobharvest::storage::{JobIngestor, JobStore, MemoryStore, SharedStore, HASH_KEY_PREFIX};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{
    board_profile, API_RESPONSE_JSON, BOARD_DETAIL_HTML, BOARD_PAGE_ONE_HTML, BOARD_PAGE_TWO_HTML,
};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

fn query(max_results: usize) -> SearchQuery {
    SearchQuery {
        keywords: "graduate".to_string(),
        location: "London".to_string(),
        max_results,
    }
}

fn http_board(server: &MockServer) -> BoardConnector {
    let template = format!("{}/search?q={{keywords}}&l={{location}}", server.uri());
    let fetcher = PageFetcher::new(&HttpConfig::default()).unwrap();
    let driver = HttpPageDriver::new(fetcher, &PacingPolicy::None);
    BoardConnector::new("mockboard", board_profile(&template), Box::new(driver)).unwrap()
}

async fn mount_board(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "graduate"))
        .and(query_param_is_missing("page"))
        .respond_with(html(BOARD_PAGE_ONE_HTML))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .respond_with(html(BOARD_PAGE_TWO_HTML))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs/1"))
        .respond_with(html(BOARD_DETAIL_HTML))
        .mount(server)
        .await;
}

fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: server.uri(),
        app_id: Some("test-id".to_string()),
        app_key: Some("test-key".to_string()),
        ..Default::default()
    }
}

// ============================================================================
// Board Connector Tests
// ============================================================================

#[tokio::test]
async fn test_board_follows_next_page_and_enriches() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    let mut board = http_board(&server);

    let postings = board.scrape(&query(25)).await.unwrap();

    let titles: Vec<&str> = postings.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Graduate Analyst", "Graduate Engineer", "Trainee Actuary"]
    );
    assert_eq!(postings[0].url, format!("{}/jobs/1", server.uri()));
    assert_eq!(postings[0].description, "Join our graduate analyst programme.");
    assert_eq!(postings[1].description, "Build things");
    assert_eq!(postings[2].company, "Initech");
}

#[tokio::test]
async fn test_board_respects_max_results() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    let mut board = http_board(&server);

    let postings = board.scrape(&query(2)).await.unwrap();

    assert_eq!(postings.len(), 2);
    assert_eq!(postings[1].title, "Graduate Engineer");
}

#[tokio::test]
async fn test_board_retries_transient_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html(BOARD_PAGE_TWO_HTML))
        .mount(&server)
        .await;

    let http = HttpConfig {
        max_retries: 2,
        retry_base_delay_ms: 10,
        retry_max_delay_ms: 20,
        ..Default::default()
    };
    let template = format!("{}/search?q={{keywords}}&l={{location}}", server.uri());
    let driver = HttpPageDriver::new(PageFetcher::new(&http).unwrap(), &PacingPolicy::None);
    let mut board = BoardConnector::new("retrying", board_profile(&template), Box::new(driver)).unwrap();

    let postings = board.scrape(&query(25)).await.unwrap();

    assert_eq!(postings.len(), 1);
    assert_eq!(postings[0].title, "Trainee Actuary");
}

// ============================================================================
// API Connector Tests
// ============================================================================

#[tokio::test]
async fn test_api_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gb/search/1"))
        .and(query_param("app_id", "test-id"))
        .and(query_param("app_key", "test-key"))
        .and(query_param("what", "graduate"))
        .and(query_param("where", "London"))
        .and(query_param("results_per_page", "25"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(API_RESPONSE_JSON),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(&HttpConfig::default()).unwrap();
    let mut api = ApiConnector::from_config(&api_config(&server), fetcher).unwrap();

    let postings = api.scrape(&query(25)).await.unwrap();

    assert_eq!(postings.len(), 2);
    assert_eq!(postings[0].title, "Graduate Data Scientist");
    assert_eq!(postings[0].company, "Hooli");
    assert_eq!(postings[0].employment_type, "full_time");
    assert_eq!(postings[1].url, "");

    // Postings without a URL fall back to a content-hash identity
    let store: SharedStore = Arc::new(MemoryStore::new());
    let ingestor = JobIngestor::new(store.clone());
    let report = ingestor.ingest(&PostingOrigin::connector(api.name()), &postings);
    assert_eq!(report.inserted, 2);

    let jobs = store.list_jobs().unwrap();
    assert!(jobs.iter().any(|j| j.id.starts_with(HASH_KEY_PREFIX)));
    assert!(jobs.iter().all(|j| j.source == "adzuna"));
}

#[tokio::test]
async fn test_api_server_error_yields_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(&HttpConfig::default()).unwrap();
    let mut api = ApiConnector::from_config(&api_config(&server), fetcher).unwrap();

    let postings = api.scrape(&query(25)).await.unwrap();
    assert!(postings.is_empty());
}

#[tokio::test]
async fn test_api_malformed_body_yields_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(&HttpConfig::default()).unwrap();
    let mut api = ApiConnector::from_config(&api_config(&server), fetcher).unwrap();

    assert!(api.scrape(&query(25)).await.unwrap().is_empty());
}

fn indeed_results(session: &str) -> String {
    format!(
        r#"<html><body>
        <div class="job_seen_beacon">
            <h2 class="jobTitle"><a class="jcs-JobTitle"
                href="/rc/clk?jk=abc123&amp;bb={session}&amp;xkcb=So{session}&amp;fccid=f1&amp;vjs=3">
                <span title="Graduate Analyst">Graduate Analyst</span></a></h2>
            <span data-testid="company-name">Acme</span>
            <div data-testid="text-location">London</div>
        </div>
        </body></html>"#
    )
}

#[tokio::test]
async fn test_indeed_identity_stable_across_sessions() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let ingestor = JobIngestor::new(store.clone());
    let origin = PostingOrigin::connector("indeed");
    let search = "https://uk.indeed.com/jobs?q=graduate&l=London";

    let mut reports = Vec::new();
    for session in ["TOKENONE", "TOKENTWO"] {
        let mut profile = BoardProfile::indeed();
        profile.scroll_cycles = 0;
        let driver = StaticPageDriver::new().with_page(search, &indeed_results(session));
        let mut connector = BoardConnector::new("indeed", profile, Box::new(driver)).unwrap();

        let postings = connector.scrape(&query(10)).await.unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].url, "https://uk.indeed.com/rc/clk?jk=abc123");
        reports.push(ingestor.ingest(&origin, &postings));
    }

    assert_eq!(reports[0].inserted, 1);
    assert_eq!(reports[1].updated, 1);
    assert_eq!(store.count_jobs().unwrap(), 1);
}
