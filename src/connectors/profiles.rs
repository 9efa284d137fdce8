//! Board profiles
//!
//! A profile is the configuration of one job board: its search URL template,
//! the container fallback list for result cards, per-field strategy lists
//! and the optional detail-page description selectors. The built-in
//! `linkedin` and `indeed` profiles target the public, logged-out search
//! pages; a TOML file can override them or add new boards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::parser::extract::{FieldExtractor, Normalize};
use crate::parser::selectors::ContainerSelector;
use crate::utils::error::ExtractError;

/// Strategy lists for the fields of one result card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardSelectors {
    pub title: Vec<String>,
    pub company: Vec<String>,
    pub location: Vec<String>,
    pub url: Vec<String>,
    pub description: Vec<String>,
    pub logo: Vec<String>,
    pub posted_at: Vec<String>,
    pub snippet: Vec<String>,
}

/// Configuration of one board-scraper connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardProfile {
    pub enabled: bool,
    /// Search URL with `{keywords}` and `{location}` placeholders
    pub search_url: String,
    /// Container fallback list; the first entry is also the wait target
    pub containers: Vec<String>,
    pub fields: CardSelectors,
    /// Description selectors on the posting's own page
    pub detail_description: Vec<String>,
    /// Query parameters that identify a posting; when set, card URLs keep
    /// only these
    pub posting_params: Vec<String>,
    pub scroll_cycles: u32,
    pub scroll_pause_ms: u64,
    pub wait_timeout_ms: u64,
}

impl Default for BoardProfile {
    fn default() -> Self {
        Self {
            enabled: true,
            search_url: String::new(),
            containers: Vec::new(),
            fields: CardSelectors::default(),
            detail_description: Vec::new(),
            posting_params: Vec::new(),
            scroll_cycles: 2,
            scroll_pause_ms: 1000,
            wait_timeout_ms: 10_000,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl BoardProfile {
    /// LinkedIn public job search
    pub fn linkedin() -> Self {
        Self {
            search_url: "https://www.linkedin.com/jobs/search?keywords={keywords}&location={location}"
                .to_string(),
            containers: strings(&[
                "ul.jobs-search__results-list > li",
                "div.base-search-card",
                "div.job-search-card",
            ]),
            fields: CardSelectors {
                title: strings(&[
                    "h3.base-search-card__title",
                    "a.base-card__full-link span.sr-only",
                    "h3",
                ]),
                company: strings(&[
                    "h4.base-search-card__subtitle a",
                    "h4.base-search-card__subtitle",
                    "a.hidden-nested-link",
                ]),
                location: strings(&[
                    "span.job-search-card__location",
                    "div.base-search-card__metadata span",
                ]),
                url: strings(&[
                    "a.base-card__full-link@href",
                    "a.base-search-card--link@href",
                    "a@href",
                    "@href",
                ]),
                description: Vec::new(),
                logo: strings(&[
                    "img.artdeco-entity-image@data-delayed-url",
                    "img@src",
                ]),
                posted_at: strings(&["time@datetime", "time"]),
                snippet: strings(&["div.base-search-card__metadata"]),
            },
            detail_description: strings(&[
                "div.show-more-less-html__markup",
                "div.description__text",
                "section.description",
            ]),
            ..Self::default()
        }
    }

    /// Indeed UK job search
    pub fn indeed() -> Self {
        Self {
            search_url: "https://uk.indeed.com/jobs?q={keywords}&l={location}".to_string(),
            containers: strings(&[
                "div.job_seen_beacon",
                "td.resultContent",
                "div.cardOutline",
                "a.tapItem",
            ]),
            fields: CardSelectors {
                title: strings(&[
                    "h2.jobTitle span[title]@title",
                    "h2.jobTitle span",
                    "a.jcs-JobTitle",
                    "h2",
                ]),
                company: strings(&[
                    "span[data-testid='company-name']",
                    "span.companyName",
                ]),
                location: strings(&[
                    "div[data-testid='text-location']",
                    "div.companyLocation",
                ]),
                url: strings(&["h2.jobTitle a@href", "a.jcs-JobTitle@href", "a@href"]),
                description: Vec::new(),
                logo: strings(&["img.companyAvatar@src"]),
                posted_at: strings(&[
                    "span[data-testid='myJobsStateDate']",
                    "span.date",
                ]),
                snippet: strings(&["div.job-snippet", "ul"]),
            },
            detail_description: strings(&[
                "div#jobDescriptionText",
                "div.jobsearch-jobDescriptionText",
            ]),
            posting_params: strings(&["jk"]),
            ..Self::default()
        }
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Parse every selector in the profile
    pub fn compile(&self, name: &str) -> Result<CardExtractor, ExtractError> {
        let fields = &self.fields;
        let field = |field: &str| format!("{name}.{field}");

        Ok(CardExtractor {
            containers: ContainerSelector::parse(&field("containers"), &self.containers)?,
            title: FieldExtractor::optional(&field("title"), &fields.title, Normalize::Text)?,
            company: FieldExtractor::optional(&field("company"), &fields.company, Normalize::Text)?,
            location: FieldExtractor::optional(&field("location"), &fields.location, Normalize::Text)?,
            url: FieldExtractor::optional(&field("url"), &fields.url, Normalize::Url)?,
            description: FieldExtractor::optional(
                &field("description"),
                &fields.description,
                Normalize::Text,
            )?,
            logo: FieldExtractor::optional(&field("logo"), &fields.logo, Normalize::Url)?,
            posted_at: FieldExtractor::optional(&field("posted_at"), &fields.posted_at, Normalize::Raw)?,
            snippet: FieldExtractor::optional(&field("snippet"), &fields.snippet, Normalize::Text)?,
            detail_description: FieldExtractor::optional(
                &field("detail_description"),
                &self.detail_description,
                Normalize::Text,
            )?,
        })
    }
}

/// Built-in board profiles keyed by connector name
pub fn builtin_profiles() -> BTreeMap<String, BoardProfile> {
    BTreeMap::from([
        ("linkedin".to_string(), BoardProfile::linkedin()),
        ("indeed".to_string(), BoardProfile::indeed()),
    ])
}

/// Compiled extractors for one profile
#[derive(Debug, Clone)]
pub struct CardExtractor {
    pub containers: ContainerSelector,
    pub title: Option<FieldExtractor>,
    pub company: Option<FieldExtractor>,
    pub location: Option<FieldExtractor>,
    pub url: Option<FieldExtractor>,
    pub description: Option<FieldExtractor>,
    pub logo: Option<FieldExtractor>,
    pub posted_at: Option<FieldExtractor>,
    pub snippet: Option<FieldExtractor>,
    pub detail_description: Option<FieldExtractor>,
}
