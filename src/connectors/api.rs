//! Job-search API connector
//!
//! One authenticated GET against an Adzuna-style `search` endpoint per
//! query. Any request or decode failure is logged and yields an empty batch;
//! the API is never retried beyond what the fetcher's retry policy does.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::connectors::Connector;
use crate::crawler::url::parse_http_url;
use crate::crawler::PageFetcher;
use crate::models::{RawPosting, SearchQuery};
use crate::parser::sanitize::{collapse_inline, markup_to_text};
use crate::utils::error::ConnectorError;

/// Search response envelope
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub results: Vec<ApiJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiJob {
    pub title: String,
    pub company: DisplayName,
    pub location: DisplayName,
    pub redirect_url: String,
    pub description: String,
    pub created: String,
    pub contract_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DisplayName {
    pub display_name: String,
}

impl From<ApiJob> for RawPosting {
    fn from(job: ApiJob) -> Self {
        let description = markup_to_text(&job.description);
        Self {
            title: collapse_inline(&markup_to_text(&job.title)),
            company: collapse_inline(&job.company.display_name),
            location: collapse_inline(&job.location.display_name),
            url: job.redirect_url.trim().to_string(),
            snippet: description.clone(),
            description,
            posted_at: job.created.trim().to_string(),
            employment_type: job.contract_time.unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// API connector
pub struct ApiConnector {
    name: String,
    base_url: String,
    country: String,
    app_id: String,
    app_key: String,
    fetcher: PageFetcher,
}

impl ApiConnector {
    /// Build the connector if credentials are configured
    pub fn from_config(config: &ApiConfig, fetcher: PageFetcher) -> Option<Self> {
        let (app_id, app_key) = config.credentials()?;
        Some(Self {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            country: config.country.clone(),
            app_id: app_id.to_string(),
            app_key: app_key.to_string(),
            fetcher,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/search/1", self.base_url, self.country)
    }
}

#[async_trait]
impl Connector for ApiConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&mut self, query: &SearchQuery) -> Result<Vec<RawPosting>, ConnectorError> {
        let endpoint = self.endpoint();
        let url = parse_http_url(&endpoint)
            .map_err(|e| ConnectorError::misconfigured(&self.name, e.to_string()))?;

        let per_page = query.max_results.to_string();
        let params = [
            ("app_id", self.app_id.as_str()),
            ("app_key", self.app_key.as_str()),
            ("what", query.keywords.as_str()),
            ("where", query.location.as_str()),
            ("results_per_page", per_page.as_str()),
            ("content-type", "application/json"),
        ];

        info!(connector = %self.name, url = %url, "Querying job API");

        let response: SearchResponse = match self.fetcher.get_json(&url, &params).await {
            Ok(response) => response,
            Err(e) => {
                warn!(connector = %self.name, error = %e, "Job API request failed");
                return Ok(Vec::new());
            }
        };

        let postings: Vec<RawPosting> = response
            .results
            .into_iter()
            .take(query.max_results)
            .map(RawPosting::from)
            .collect();

        info!(connector = %self.name, found = postings.len(), "API scrape complete");
        Ok(postings)
    }
}
