//! Source connectors
//!
//! A connector turns one [`SearchQuery`] into a batch of [`RawPosting`]s.
//! Board scrapers drive a [`PageDriver`](crate::crawler::PageDriver) through
//! a configured [`BoardProfile`]; the API connector talks JSON. The employer
//! site harvester lives here too, but runs per employer rather than per
//! query and is not a [`Connector`].

pub mod api;
pub mod board;
pub mod harvester;
pub mod profiles;

pub use api::ApiConnector;
pub use board::BoardConnector;
pub use harvester::EmployerSiteHarvester;
pub use profiles::{builtin_profiles, BoardProfile, CardExtractor, CardSelectors};

use async_trait::async_trait;

use crate::config::Config;
use crate::crawler::{http_driver, PageFetcher};
use crate::error::Result;
use crate::models::{RawPosting, SearchQuery};
use crate::utils::error::ConnectorError;

/// A source of raw job postings
///
/// `scrape` returns `Err` only for misconfiguration. Navigation and request
/// failures are logged and yield an empty batch.
#[async_trait]
pub trait Connector: Send {
    /// Source label written to every posting
    fn name(&self) -> &str;

    async fn scrape(&mut self, query: &SearchQuery) -> std::result::Result<Vec<RawPosting>, ConnectorError>;
}

/// Build every enabled connector from config, boards first, in name order
pub fn build_connectors(config: &Config) -> Result<Vec<Box<dyn Connector>>> {
    let mut connectors: Vec<Box<dyn Connector>> = Vec::new();

    for (name, profile) in config.boards.iter().filter(|(_, p)| p.enabled) {
        let driver = http_driver(config)?;
        connectors.push(Box::new(BoardConnector::new(name, profile.clone(), driver)?));
    }

    if config.api.enabled {
        match ApiConnector::from_config(&config.api, PageFetcher::new(&config.http)?) {
            Some(api) => connectors.push(Box::new(api)),
            None => tracing::info!(
                connector = %config.api.name,
                "API credentials not configured, connector disabled"
            ),
        }
    }

    tracing::debug!(count = connectors.len(), "Connectors built");
    Ok(connectors)
}
