//! Configuration management for jobharvest
//!
//! This module handles loading and validating configuration from a TOML
//! file and environment variables. Command-line flags are applied on top
//! by the binary. Every heuristic table the pipeline uses (board selectors,
//! careers-URL heuristics, harvester keywords, delays) lives here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::connectors::profiles::{builtin_profiles, BoardProfile};
use crate::crawler::pacing::PacingPolicy;
use crate::error::{Error, Result};
use crate::models::SearchQuery;
use crate::parser::selectors::ContainerSelector;
use crate::utils::retry::RetryConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,

    /// Default search query
    pub search: SearchQuery,

    pub http: HttpConfig,

    /// Spacing between navigations of one driver
    pub pacing: PacingPolicy,

    /// Board-scraper profiles keyed by connector name
    pub boards: BTreeMap<String, BoardProfile>,

    /// Job-search API connector
    pub api: ApiConfig,

    pub employers: EmployersConfig,

    pub discovery: DiscoveryConfig,

    pub harvester: HarvesterConfig,

    pub export: ExportConfig,

    pub schedule: ScheduleConfig,

    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            search: SearchQuery::default(),
            http: HttpConfig::default(),
            pacing: PacingPolicy::default(),
            boards: builtin_profiles(),
            api: ApiConfig::default(),
            employers: EmployersConfig::default(),
            discovery: DiscoveryConfig::default(),
            harvester: HarvesterConfig::default(),
            export: ExportConfig::default(),
            schedule: ScheduleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/jobs.db"),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Fixed User-Agent; rotates through a built-in pool when unset
    pub user_agent: Option<String>,

    /// Retries after the first attempt; 0 means a single attempt
    pub max_retries: u32,

    pub retry_base_delay_ms: u64,

    pub retry_max_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
            max_retries: 0,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 30_000,
        }
    }
}

impl HttpConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::with_delays(
            self.max_retries,
            self.retry_base_delay_ms,
            self.retry_max_delay_ms,
        )
    }
}

/// Job-search API configuration (Adzuna-style `search` endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,

    /// Connector name, also used as the `source` of its postings
    pub name: String,

    pub base_url: String,

    /// Country segment of the endpoint path
    pub country: String,

    pub app_id: Option<String>,

    pub app_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: String::from("adzuna"),
            base_url: String::from("https://api.adzuna.com/v1/api/jobs"),
            country: String::from("gb"),
            app_id: None,
            app_key: None,
        }
    }
}

impl ApiConfig {
    /// Credentials, if both halves are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.app_id.as_deref(), self.app_key.as_deref()) {
            (Some(id), Some(key)) if !id.trim().is_empty() && !key.trim().is_empty() => {
                Some((id, key))
            }
            _ => None,
        }
    }
}

/// Employer fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployersConfig {
    /// Ranking pages listing employer names
    pub ranking_urls: Vec<String>,

    /// Fallback list locating one employer name on a ranking page
    pub name_selectors: Vec<String>,

    /// Optional `name,careers_url` CSV
    pub seed_file: Option<PathBuf>,

    pub min_name_len: usize,

    pub max_name_len: usize,
}

impl Default for EmployersConfig {
    fn default() -> Self {
        Self {
            ranking_urls: vec![String::from("https://www.top100graduateemployers.com/")],
            name_selectors: vec![
                String::from("td.employer-name"),
                String::from(".employer-name"),
                String::from("table tbody tr td:nth-child(2)"),
                String::from("li.employer h3"),
            ],
            seed_file: None,
            min_name_len: 2,
            max_name_len: 120,
        }
    }
}

/// One careers-URL heuristic: lowercase name substring to URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicEntry {
    pub pattern: String,
    pub url: String,
}

impl HeuristicEntry {
    pub fn new(pattern: &str, url: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            url: url.to_string(),
        }
    }
}

/// Careers-URL discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Stop retrying an employer after this many misses; unlimited when unset
    pub max_attempts: Option<u32>,

    /// Ordered heuristic table; the first matching pattern wins
    pub heuristics: Vec<HeuristicEntry>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            heuristics: vec![
                HeuristicEntry::new("amazon", "https://www.amazon.jobs/en/"),
                HeuristicEntry::new("google", "https://careers.google.com/jobs/results/"),
                HeuristicEntry::new("microsoft", "https://careers.microsoft.com/"),
                HeuristicEntry::new("deloitte", "https://www2.deloitte.com/uk/en/careers/careers.html"),
                HeuristicEntry::new("pwc", "https://www.pwc.co.uk/careers.html"),
                HeuristicEntry::new("kpmg", "https://www.kpmgcareers.co.uk/"),
                HeuristicEntry::new("ernst & young", "https://www.ey.com/en_uk/careers"),
                HeuristicEntry::new("goldman sachs", "https://www.goldmansachs.com/careers/"),
                HeuristicEntry::new("jp morgan", "https://careers.jpmorgan.com/"),
                HeuristicEntry::new("unilever", "https://careers.unilever.com/"),
                HeuristicEntry::new("bbc", "https://careers.bbc.co.uk/"),
                HeuristicEntry::new("accenture", "https://www.accenture.com/gb-en/careers"),
            ],
        }
    }
}

/// Employer-site harvester configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvesterConfig {
    pub enabled: bool,

    /// Anchor text must contain one of these (lowercase match)
    pub keywords: Vec<String>,

    pub min_text_len: usize,

    pub max_text_len: usize,

    /// Location recorded for harvested postings
    pub unknown_location: String,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keywords: [
                "graduate",
                "intern",
                "placement",
                "analyst",
                "trainee",
                "apprentice",
                "entry level",
                "junior",
                "early career",
                "scheme",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_text_len: 6,
            max_text_len: 100,
            unknown_location: String::from("Unknown"),
        }
    }
}

/// Snapshot export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

/// Recurring trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 24 * 60 * 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// Built-in board profiles that the file does not mention are kept.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::with_source(format!("Failed to read config file: {}", path.display()), e)
        })?;

        Self::from_toml(&content)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse TOML config: {e}")))?;

        for (name, profile) in builtin_profiles() {
            config.boards.entry(name).or_insert(profile);
        }
        Ok(config)
    }

    /// File (if given) or defaults, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `JOBHARVEST_*` and API credential variables
    ///
    /// Unparseable numeric values are ignored.
    pub fn apply_env(&mut self) {
        if let Some(keywords) = env_string("JOBHARVEST_KEYWORDS") {
            self.search.keywords = keywords;
        }
        if let Some(location) = env_string("JOBHARVEST_LOCATION") {
            self.search.location = location;
        }
        if let Some(max) = env_string("JOBHARVEST_MAX_RESULTS").and_then(|v| v.trim().parse().ok()) {
            self.search.max_results = max;
        }
        if let Some(path) = env_string("JOBHARVEST_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(dir) = env_string("JOBHARVEST_EXPORT_DIR") {
            self.export.dir = PathBuf::from(dir);
        }
        if let Some(level) = env_string("JOBHARVEST_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = env_string("JOBHARVEST_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(app_id) = env_string("ADZUNA_APP_ID") {
            self.api.app_id = Some(app_id);
        }
        if let Some(app_key) = env_string("ADZUNA_APP_KEY") {
            self.api.app_key = Some(app_key);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.search.max_results == 0 {
            return Err(Error::config("search.max_results must be greater than 0"));
        }

        if self.http.timeout_secs == 0 {
            return Err(Error::config("http.timeout_secs must be greater than 0"));
        }

        if let PacingPolicy::RateLimited { per_second: 0 } = self.pacing {
            return Err(Error::config("pacing.per_second must be greater than 0"));
        }

        if self.schedule.interval_secs == 0 {
            return Err(Error::config("schedule.interval_secs must be greater than 0"));
        }

        let harvester = &self.harvester;
        if harvester.min_text_len > harvester.max_text_len {
            return Err(Error::config(format!(
                "harvester.min_text_len ({}) exceeds max_text_len ({})",
                harvester.min_text_len, harvester.max_text_len
            )));
        }
        if harvester.enabled && harvester.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(Error::config("harvester.keywords must not be empty"));
        }

        if self.employers.min_name_len > self.employers.max_name_len {
            return Err(Error::config("employers.min_name_len exceeds max_name_len"));
        }
        ContainerSelector::parse("employers.name_selectors", &self.employers.name_selectors)?;

        for (name, profile) in self.boards.iter().filter(|(_, p)| p.enabled) {
            if !profile.search_url.starts_with("http") {
                return Err(Error::config(format!(
                    "boards.{name}.search_url must be an absolute http(s) URL"
                )));
            }
            profile.compile(name)?;
        }

        for entry in &self.discovery.heuristics {
            if entry.pattern.trim().is_empty() {
                return Err(Error::config("discovery heuristic with empty pattern"));
            }
            if url::Url::parse(&entry.url).is_err() {
                return Err(Error::config(format!(
                    "discovery heuristic '{}' has invalid url '{}'",
                    entry.pattern, entry.url
                )));
            }
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(Error::config(format!(
                "logging.format must be 'text' or 'json', got '{}'",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Schedule interval as Duration
    #[must_use]
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_secs)
    }
}
