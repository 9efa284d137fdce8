// Core data structures for the jobharvest pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source label used for postings harvested from employer career pages
pub const CAREERS_PAGE_SOURCE: &str = "careers_page";

/// A posting as extracted from a source, before identity and persistence
///
/// Every field defaults to the empty string when extraction misses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub description: String,
    pub logo: String,
    pub posted_at: String,
    pub snippet: String,
    pub employment_type: String,
    pub closing_date: String,
}

impl RawPosting {
    /// Cards without a title and without a URL carry nothing worth keeping
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.url.trim().is_empty()
    }
}

/// Search parameters handed to every connector for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub keywords: String,
    pub location: String,
    pub max_results: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            keywords: String::from("graduate"),
            location: String::from("United Kingdom"),
            max_results: 25,
        }
    }
}

/// Where a batch of postings came from
///
/// Connectors tag their output with their own name; the harvester tags
/// each batch with the employer it scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingOrigin {
    pub source: String,
    pub employer_id: Option<i64>,
    pub employer_name: Option<String>,
    pub source_careers_url: Option<String>,
}

impl PostingOrigin {
    /// Origin for a board or API connector
    pub fn connector(name: impl Into<String>) -> Self {
        Self {
            source: name.into(),
            ..Default::default()
        }
    }

    /// Origin for a harvested employer careers page
    pub fn careers_page(employer: &Employer) -> Self {
        Self {
            source: CAREERS_PAGE_SOURCE.to_string(),
            employer_id: Some(employer.id),
            employer_name: Some(employer.name.clone()),
            source_careers_url: employer.careers_url.clone(),
        }
    }
}

/// Careers-URL resolution state of an employer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscoveryStatus {
    Unknown,
    Resolved,
}

impl DiscoveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for DiscoveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical employer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employer {
    pub id: i64,
    pub name: String,
    pub careers_url: Option<String>,
    pub source: String,
    pub updated_at: DateTime<Utc>,
    pub discovery_attempts: u32,
}

impl Employer {
    /// Resolved once a non-empty careers URL is known
    pub fn status(&self) -> DiscoveryStatus {
        match self.careers_url.as_deref() {
            Some(url) if !url.trim().is_empty() => DiscoveryStatus::Resolved,
            _ => DiscoveryStatus::Unknown,
        }
    }
}

/// Employer observed by a fetch stage, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployer {
    pub name: String,
    pub careers_url: Option<String>,
    pub source: String,
}

/// Write model for one job sighting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobUpsert {
    pub id: String,
    pub employer_id: Option<i64>,
    pub employer_name: String,
    pub title: String,
    pub location: String,
    pub job_url: String,
    pub source: String,
    pub source_careers_url: Option<String>,
    pub employment_type: String,
    pub description: String,
    pub posted_at: String,
    pub closing_date: String,
    pub raw_text_snippet: String,
}

impl JobUpsert {
    /// Build the write model for a raw posting; the identity key is set by the caller
    pub fn from_raw(raw: &RawPosting, origin: &PostingOrigin) -> Self {
        let employer_name = if raw.company.trim().is_empty() {
            origin.employer_name.clone().unwrap_or_default()
        } else {
            raw.company.trim().to_string()
        };

        Self {
            id: String::new(),
            employer_id: origin.employer_id,
            employer_name,
            title: raw.title.trim().to_string(),
            location: raw.location.trim().to_string(),
            job_url: raw.url.trim().to_string(),
            source: origin.source.clone(),
            source_careers_url: origin.source_careers_url.clone(),
            employment_type: raw.employment_type.trim().to_string(),
            description: raw.description.trim().to_string(),
            posted_at: raw.posted_at.trim().to_string(),
            closing_date: raw.closing_date.trim().to_string(),
            raw_text_snippet: raw.snippet.trim().to_string(),
        }
    }
}

/// Stored job row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub employer_id: Option<i64>,
    pub employer_name: String,
    pub title: String,
    pub location: String,
    pub job_url: Option<String>,
    pub source: String,
    pub source_careers_url: Option<String>,
    pub employment_type: String,
    pub description: String,
    pub posted_at: String,
    pub closing_date: String,
    pub raw_text_snippet: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub sighting_count: u32,
}

/// Result of a single atomic upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl UpsertOutcome {
    /// First sighting returns a count of exactly one
    pub fn from_sighting_count(count: i64) -> Self {
        if count <= 1 {
            Self::Inserted
        } else {
            Self::Updated
        }
    }
}
