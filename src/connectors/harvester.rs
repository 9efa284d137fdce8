//! Employer careers-page harvester
//!
//! Scans the anchors of a resolved employer's careers page and keeps those
//! whose visible text looks like a vacancy: a length inside the configured
//! window and at least one configured keyword. Nothing beyond the first
//! page is followed, and links repeated on the page are emitted once.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::HarvesterConfig;
use crate::crawler::url::{normalize_url, parse_http_url};
use crate::crawler::PageDriver;
use crate::models::{Employer, RawPosting};
use crate::parser::sanitize::char_len;

/// Keyword and length filter over anchor texts
#[derive(Debug, Clone)]
pub struct AnchorFilter {
    keywords: Vec<String>,
    min_len: usize,
    max_len: usize,
}

impl AnchorFilter {
    pub fn new(config: &HarvesterConfig) -> Self {
        Self {
            keywords: config
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            min_len: config.min_text_len,
            max_len: config.max_text_len,
        }
    }

    /// True if the (already collapsed) anchor text looks like a vacancy
    pub fn accepts(&self, text: &str) -> bool {
        let len = char_len(text);
        if len < self.min_len || len > self.max_len {
            return false;
        }
        let lowered = text.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// Harvests postings from employer careers pages
pub struct EmployerSiteHarvester {
    driver: Box<dyn PageDriver>,
    filter: AnchorFilter,
    unknown_location: String,
}

impl EmployerSiteHarvester {
    pub fn new(config: &HarvesterConfig, driver: Box<dyn PageDriver>) -> Self {
        Self {
            driver,
            filter: AnchorFilter::new(config),
            unknown_location: config.unknown_location.clone(),
        }
    }

    /// Postings found on one employer's careers page
    ///
    /// Failures are logged and yield an empty batch so one broken site does
    /// not stop the harvest.
    pub async fn harvest(&mut self, employer: &Employer) -> Vec<RawPosting> {
        let Some(careers_url) = employer.careers_url.as_deref().filter(|u| !u.trim().is_empty())
        else {
            debug!(employer = %employer.name, "No careers url, skipping");
            return Vec::new();
        };

        let url = match parse_http_url(careers_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(employer = %employer.name, error = %e, "Unusable careers url");
                return Vec::new();
            }
        };

        if let Err(e) = self.driver.navigate(&url).await {
            warn!(employer = %employer.name, url = %url, error = %e, "Careers page navigation failed");
            return Vec::new();
        }

        let Some(snapshot) = self.driver.snapshot() else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let postings: Vec<RawPosting> = snapshot
            .anchors()
            .into_iter()
            .filter(|anchor| self.filter.accepts(&anchor.text))
            .filter(|anchor| {
                let key = normalize_url(&anchor.href).unwrap_or_else(|| anchor.href.clone());
                seen.insert(key)
            })
            .map(|anchor| RawPosting {
                title: anchor.text.clone(),
                company: employer.name.clone(),
                location: self.unknown_location.clone(),
                url: anchor.href,
                description: anchor.text.clone(),
                snippet: anchor.text,
                ..Default::default()
            })
            .collect();

        info!(employer = %employer.name, found = postings.len(), "Careers page harvested");
        postings
    }
}
