//! Employer fetch stage
//!
//! Collects employer names from ranking pages and an optional seed CSV,
//! normalizes and deduplicates them, and inserts the new ones into the
//! registry. Existing employers are never overwritten; the one exception is
//! a seed row carrying a careers URL for an employer that has none yet.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::EmployersConfig;
use crate::crawler::url::parse_http_url;
use crate::crawler::PageDriver;
use crate::error::Result;
use crate::models::{DiscoveryStatus, NewEmployer};
use crate::parser::sanitize::{char_len, collapse_inline};
use crate::parser::selectors::ContainerSelector;
use crate::storage::{EmployerStore, SharedStore};
use crate::utils::error::StorageResult;
use crate::utils::Clock;

/// Source label of employers read from ranking pages
pub const RANKING_SOURCE: &str = "ranking";

/// Source label of employers read from the seed file
pub const SEED_SOURCE: &str = "seed";

/// One row of the seed CSV (`name,careers_url`)
#[derive(Debug, Deserialize)]
struct SeedRow {
    name: String,
    #[serde(default)]
    careers_url: Option<String>,
}

/// Read `name,careers_url` rows from a CSV file
pub fn read_seed_file(path: impl AsRef<Path>) -> std::result::Result<Vec<NewEmployer>, csv::Error> {
    let file = std::fs::File::open(path)?;
    read_seed(file)
}

/// Read `name,careers_url` rows from any reader
pub fn read_seed<R: Read>(reader: R) -> std::result::Result<Vec<NewEmployer>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut employers = Vec::new();
    for record in csv_reader.deserialize::<SeedRow>() {
        let row = record?;
        let careers_url = row.careers_url.filter(|url| !url.is_empty()).and_then(|url| {
            match parse_http_url(&url) {
                Ok(parsed) => Some(parsed.to_string()),
                Err(e) => {
                    warn!(employer = %row.name, error = %e, "Ignoring invalid seed careers url");
                    None
                }
            }
        });
        employers.push(NewEmployer {
            name: row.name,
            careers_url,
            source: SEED_SOURCE.to_string(),
        });
    }
    Ok(employers)
}

/// Outcome of one employer fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployerFetchReport {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub seed_rows: usize,
    /// Names dropped by the length filter
    pub dropped: usize,
    pub inserted: usize,
    pub existing: usize,
    /// Existing unresolved employers resolved by a seed row
    pub resolved_from_seed: usize,
    /// Candidates whose write failed
    pub store_errors: usize,
}

/// Case-insensitive, order-preserving candidate set
#[derive(Default)]
struct Candidates {
    items: Vec<NewEmployer>,
    index: HashMap<String, usize>,
}

impl Candidates {
    fn push(&mut self, employer: NewEmployer) {
        let key = employer.name.to_lowercase();
        match self.index.get(&key).copied() {
            Some(i) => {
                let kept = &mut self.items[i];
                if kept.careers_url.is_none() && employer.careers_url.is_some() {
                    kept.careers_url = employer.careers_url;
                }
            }
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(employer);
            }
        }
    }
}

/// Fetches employers into the registry
pub struct EmployerFetcher {
    config: EmployersConfig,
    names: ContainerSelector,
    driver: Box<dyn PageDriver>,
    store: SharedStore,
    clock: Clock,
}

impl EmployerFetcher {
    pub fn new(
        config: &EmployersConfig,
        driver: Box<dyn PageDriver>,
        store: SharedStore,
        clock: Clock,
    ) -> Result<Self> {
        Ok(Self {
            names: ContainerSelector::parse("employers.name_selectors", &config.name_selectors)?,
            config: config.clone(),
            driver,
            store,
            clock,
        })
    }

    /// Whitespace-normalized name, or `None` if outside the length window
    fn normalize_name(&self, raw: &str) -> Option<String> {
        let name = collapse_inline(raw);
        let len = char_len(&name);
        (len >= self.config.min_name_len && len <= self.config.max_name_len).then_some(name)
    }

    /// Names listed on one ranking page
    async fn ranking_names(&mut self, raw_url: &str) -> Option<Vec<String>> {
        let url = match parse_http_url(raw_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %raw_url, error = %e, "Invalid ranking url");
                return None;
            }
        };

        if let Err(e) = self.driver.navigate(&url).await {
            warn!(url = %url, error = %e, "Ranking page navigation failed");
            return None;
        }

        let snapshot = self.driver.snapshot()?;
        let names = snapshot.collect_cards(&self.names, usize::MAX, |element, _| {
            Some(element.text().collect::<Vec<_>>().join(" "))
        });
        debug!(url = %url, count = names.len(), "Ranking page parsed");
        Some(names)
    }

    /// Run the stage
    pub async fn fetch(&mut self) -> Result<EmployerFetchReport> {
        let mut report = EmployerFetchReport::default();
        let mut candidates = Candidates::default();

        for url in self.config.ranking_urls.clone() {
            let Some(names) = self.ranking_names(&url).await else {
                report.pages_failed += 1;
                continue;
            };
            report.pages_fetched += 1;

            for raw in names {
                match self.normalize_name(&raw) {
                    Some(name) => candidates.push(NewEmployer {
                        name,
                        careers_url: None,
                        source: RANKING_SOURCE.to_string(),
                    }),
                    None => report.dropped += 1,
                }
            }
        }

        if let Some(path) = self.config.seed_file.clone() {
            match read_seed_file(&path) {
                Ok(rows) => {
                    report.seed_rows = rows.len();
                    for mut row in rows {
                        match self.normalize_name(&row.name) {
                            Some(name) => {
                                row.name = name;
                                candidates.push(row);
                            }
                            None => report.dropped += 1,
                        }
                    }
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to read seed file"),
            }
        }

        let now = (self.clock)();
        for candidate in &candidates.items {
            if let Err(e) = self.store_candidate(candidate, now, &mut report) {
                warn!(employer = %candidate.name, error = %e, "Failed to store employer");
                report.store_errors += 1;
            }
        }

        info!(
            pages = report.pages_fetched,
            failed_pages = report.pages_failed,
            seed_rows = report.seed_rows,
            inserted = report.inserted,
            existing = report.existing,
            dropped = report.dropped,
            store_errors = report.store_errors,
            "Employer fetch complete"
        );
        Ok(report)
    }

    /// Insert one candidate, or let its seed URL resolve an existing unknown employer
    fn store_candidate(
        &self,
        candidate: &NewEmployer,
        now: DateTime<Utc>,
        report: &mut EmployerFetchReport,
    ) -> StorageResult<()> {
        if self.store.insert_employer(candidate, now)?.is_some() {
            debug!(employer = %candidate.name, source = %candidate.source, "Employer added");
            report.inserted += 1;
            return Ok(());
        }

        report.existing += 1;
        let Some(url) = candidate.careers_url.as_deref() else {
            return Ok(());
        };
        if let Some(existing) = self.store.find_employer(&candidate.name)? {
            if existing.status() == DiscoveryStatus::Unknown {
                self.store.set_careers_url(existing.id, url, now)?;
                report.resolved_from_seed += 1;
            }
        }
        Ok(())
    }
}
