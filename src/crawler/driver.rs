//! Page driver abstraction
//!
//! Connectors talk to pages through the narrow [`PageDriver`] interface:
//! navigate, wait for an element, scroll, and read the current snapshot.
//! Two implementations ship with the crate:
//!
//! - [`HttpPageDriver`] loads pages over HTTP. Scrolling follows the page's
//!   `rel="next"` link and appends that document, which gives limited
//!   pagination on boards that render server-side.
//! - [`StaticPageDriver`] serves documents from an in-memory map, used for
//!   tests and offline replay of saved pages.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::pacing::{Pacer, PacingPolicy};
use crate::parser::extract::{FieldExtractor, Normalize};
use crate::parser::page::PageSnapshot;
use crate::parser::selectors::ContainerSelector;
use crate::utils::error::FetchError;

/// Strategies used to find the next page of a listing
const NEXT_PAGE_STRATEGIES: &[&str] = &[
    "link[rel='next']@href",
    "a[rel='next']@href",
    "a[aria-label='Next']@href",
    "a[data-testid='pagination-page-next']@href",
];

/// Narrow navigation interface the connectors run on
#[async_trait]
pub trait PageDriver: Send {
    /// Load `url`, replacing the current snapshot
    async fn navigate(&mut self, url: &Url) -> Result<(), FetchError>;

    /// Wait up to `timeout` for any of the container selectors to appear
    async fn wait_for(&mut self, containers: &ContainerSelector, timeout: Duration) -> bool;

    /// Load more results into the current snapshot
    ///
    /// Returns `Ok(false)` when there is nothing more to load.
    async fn scroll(&mut self) -> Result<bool, FetchError>;

    /// Owned HTML of the current page
    fn snapshot(&self) -> Option<&PageSnapshot>;
}

/// Next-page URL advertised by a listing document
fn next_page_url(base: &Url, document: &str) -> Option<Url> {
    let field = FieldExtractor::new("next_page", NEXT_PAGE_STRATEGIES, Normalize::Url).ok()?;
    let page = PageSnapshot::new(base.clone(), document);
    Url::parse(&page.extract_field(&field)).ok()
}

/// Tracks which listing pages have been appended to the snapshot
#[derive(Default)]
struct ScrollState {
    visited: HashSet<String>,
    last_url: Option<Url>,
}

impl ScrollState {
    fn reset(&mut self, url: &Url) {
        self.visited.clear();
        self.visited.insert(url.to_string());
        self.last_url = Some(url.clone());
    }

    /// Next URL to load, unless it was already appended
    fn next(&mut self, snapshot: &PageSnapshot) -> Option<Url> {
        let base = self.last_url.as_ref().unwrap_or(&snapshot.url);
        let next = next_page_url(base, snapshot.documents.last()?)?;
        if !self.visited.insert(next.to_string()) {
            return None;
        }
        self.last_url = Some(next.clone());
        Some(next)
    }
}

/// HTTP-backed page driver
pub struct HttpPageDriver {
    fetcher: PageFetcher,
    pacer: Pacer,
    current: Option<PageSnapshot>,
    scroll: ScrollState,
}

impl HttpPageDriver {
    pub fn new(fetcher: PageFetcher, pacing: &PacingPolicy) -> Self {
        Self {
            fetcher,
            pacer: Pacer::new(pacing),
            current: None,
            scroll: ScrollState::default(),
        }
    }
}

#[async_trait]
impl PageDriver for HttpPageDriver {
    async fn navigate(&mut self, url: &Url) -> Result<(), FetchError> {
        self.pacer.pace().await;
        self.current = None;

        let html = self.fetcher.fetch_html(url, None).await?;
        debug!(url = %url, bytes = html.len(), "Page loaded");

        self.current = Some(PageSnapshot::new(url.clone(), html));
        self.scroll.reset(url);
        Ok(())
    }

    async fn wait_for(&mut self, containers: &ContainerSelector, _timeout: Duration) -> bool {
        // Server-rendered documents do not change after loading, so one check is final.
        self.current
            .as_ref()
            .is_some_and(|snapshot| snapshot.contains(containers))
    }

    async fn scroll(&mut self) -> Result<bool, FetchError> {
        let Some(snapshot) = self.current.as_ref() else {
            return Err(FetchError::NoPage);
        };
        let Some(next) = self.scroll.next(snapshot) else {
            return Ok(false);
        };
        let referer = snapshot.url.clone();

        self.pacer.pace().await;
        let html = self.fetcher.fetch_html(&next, Some(&referer)).await?;
        debug!(url = %next, bytes = html.len(), "Next page appended");

        if let Some(snapshot) = self.current.as_mut() {
            snapshot.documents.push(html);
        }
        Ok(true)
    }

    fn snapshot(&self) -> Option<&PageSnapshot> {
        self.current.as_ref()
    }
}

/// Canned response for a static driver URL
#[derive(Debug, Clone)]
enum StaticPage {
    Html(String),
    Status(u16),
}

/// In-memory page driver serving pre-registered documents
///
/// Every navigation and scroll target is appended to a shared visit log
/// that stays readable after the driver has been boxed into a connector.
#[derive(Default)]
pub struct StaticPageDriver {
    pages: HashMap<String, StaticPage>,
    current: Option<PageSnapshot>,
    scroll: ScrollState,
    visits: Arc<Mutex<Vec<String>>>,
}

impl StaticPageDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`
    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(key(url), StaticPage::Html(html.into()));
        self
    }

    /// Answer `url` with an HTTP error status
    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(key(url), StaticPage::Status(status));
        self
    }

    /// Shared log of every URL requested, in order
    pub fn visit_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.visits)
    }

    fn load(&self, url: &Url) -> Result<String, FetchError> {
        if let Ok(mut visits) = self.visits.lock() {
            visits.push(url.to_string());
        }

        match self.pages.get(&key(url.as_str())) {
            Some(StaticPage::Html(html)) => Ok(html.clone()),
            Some(StaticPage::Status(status)) => Err(FetchError::ServerError(*status)),
            None => Err(FetchError::NotFound(url.to_string())),
        }
    }
}

fn key(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl PageDriver for StaticPageDriver {
    async fn navigate(&mut self, url: &Url) -> Result<(), FetchError> {
        self.current = None;
        let html = self.load(url)?;
        self.current = Some(PageSnapshot::new(url.clone(), html));
        self.scroll.reset(url);
        Ok(())
    }

    async fn wait_for(&mut self, containers: &ContainerSelector, _timeout: Duration) -> bool {
        self.current
            .as_ref()
            .is_some_and(|snapshot| snapshot.contains(containers))
    }

    async fn scroll(&mut self) -> Result<bool, FetchError> {
        let Some(snapshot) = self.current.as_ref() else {
            return Err(FetchError::NoPage);
        };
        let Some(next) = self.scroll.next(snapshot) else {
            return Ok(false);
        };

        let html = self.load(&next)?;
        if let Some(snapshot) = self.current.as_mut() {
            snapshot.documents.push(html);
        }
        Ok(true)
    }

    fn snapshot(&self) -> Option<&PageSnapshot> {
        self.current.as_ref()
    }
}
