//! Board scraper connector
//!
//! Drives a [`PageDriver`] through one search:
//!
//! 1. render the profile's search URL and navigate to it
//! 2. wait for result cards (a miss is not fatal)
//! 3. scroll up to `scroll_cycles` times to load more results
//! 4. extract up to `max_results` cards in document order
//! 5. visit each posting without a description and read it from the detail page

use async_trait::async_trait;
use scraper::ElementRef;
use tracing::{debug, info, warn};
use url::Url;

use crate::connectors::profiles::{BoardProfile, CardExtractor};
use crate::connectors::Connector;
use crate::crawler::url::{render_search_url, retain_query_params};
use crate::crawler::PageDriver;
use crate::models::{RawPosting, SearchQuery};
use crate::parser::extract::FieldExtractor;
use crate::utils::error::ConnectorError;

/// Connector for one configured job board
pub struct BoardConnector {
    name: String,
    profile: BoardProfile,
    extractor: CardExtractor,
    driver: Box<dyn PageDriver>,
}

impl BoardConnector {
    /// Compile the profile's selectors and bind the connector to a driver
    pub fn new(
        name: &str,
        profile: BoardProfile,
        driver: Box<dyn PageDriver>,
    ) -> Result<Self, ConnectorError> {
        let extractor = profile.compile(name)?;
        Ok(Self {
            name: name.to_string(),
            profile,
            extractor,
            driver,
        })
    }

    pub fn profile(&self) -> &BoardProfile {
        &self.profile
    }

    /// Load extra result pages into the current snapshot
    async fn scroll_results(&mut self) {
        let pause = self.profile.scroll_pause();

        for cycle in 1..=self.profile.scroll_cycles {
            match self.driver.scroll().await {
                Ok(true) => {
                    debug!(connector = %self.name, cycle, "Loaded more results");
                    tokio::time::sleep(pause).await;
                }
                Ok(false) => {
                    debug!(connector = %self.name, cycle, "No more results to load");
                    break;
                }
                Err(e) => {
                    warn!(connector = %self.name, cycle, error = %e, "Scroll failed, keeping loaded results");
                    break;
                }
            }
        }
    }

    /// Read every card of the current snapshot
    fn extract_cards(&self, limit: usize) -> Vec<RawPosting> {
        let Some(snapshot) = self.driver.snapshot() else {
            return Vec::new();
        };

        let keep = &self.profile.posting_params;
        snapshot.collect_cards(&self.extractor.containers, limit, |card, base| {
            let mut posting = read_card(&self.extractor, card, base);
            posting.url = retain_query_params(&posting.url, keep);
            if posting.is_blank() {
                debug!(connector = %self.name, "Dropping card without title or url");
                None
            } else {
                Some(posting)
            }
        })
    }

    /// Fill empty descriptions from each posting's own page
    async fn enrich_descriptions(&mut self, postings: &mut [RawPosting]) {
        let Some(detail) = self.extractor.detail_description.clone() else {
            return;
        };

        for posting in postings.iter_mut().filter(|p| p.description.is_empty()) {
            let Ok(url) = Url::parse(&posting.url) else {
                debug!(connector = %self.name, title = %posting.title, "No detail url");
                continue;
            };

            match self.driver.navigate(&url).await {
                Ok(()) => {
                    posting.description = self
                        .driver
                        .snapshot()
                        .map(|snapshot| snapshot.extract_field(&detail))
                        .unwrap_or_default();
                }
                Err(e) => {
                    warn!(connector = %self.name, url = %url, error = %e, "Detail fetch failed, keeping posting");
                }
            }
        }
    }
}

fn read(field: &Option<FieldExtractor>, card: ElementRef<'_>, base: &Url) -> String {
    field
        .as_ref()
        .map(|field| field.extract(card, Some(base)))
        .unwrap_or_default()
}

fn read_card(extractor: &CardExtractor, card: ElementRef<'_>, base: &Url) -> RawPosting {
    RawPosting {
        title: read(&extractor.title, card, base),
        company: read(&extractor.company, card, base),
        location: read(&extractor.location, card, base),
        url: read(&extractor.url, card, base),
        description: read(&extractor.description, card, base),
        logo: read(&extractor.logo, card, base),
        posted_at: read(&extractor.posted_at, card, base),
        snippet: read(&extractor.snippet, card, base),
        ..Default::default()
    }
}

#[async_trait]
impl Connector for BoardConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&mut self, query: &SearchQuery) -> Result<Vec<RawPosting>, ConnectorError> {
        let url = render_search_url(&self.profile.search_url, &query.keywords, &query.location)
            .map_err(|e| ConnectorError::misconfigured(&self.name, e.to_string()))?;

        info!(connector = %self.name, url = %url, "Searching board");

        if let Err(e) = self.driver.navigate(&url).await {
            warn!(connector = %self.name, url = %url, error = %e, "Search page navigation failed");
            return Ok(Vec::new());
        }

        let timeout = self.profile.wait_timeout();
        if !self.driver.wait_for(&self.extractor.containers, timeout).await {
            debug!(
                connector = %self.name,
                selector = %self.extractor.containers.primary(),
                "Result container not found, continuing"
            );
        }

        self.scroll_results().await;

        let mut postings = self.extract_cards(query.max_results);
        self.enrich_descriptions(&mut postings).await;

        info!(connector = %self.name, found = postings.len(), "Board scrape complete");
        Ok(postings)
    }
}
