//! CSS selector helpers
//!
//! Selectors come from configuration, so every one of them is parsed at
//! startup and a bad one surfaces as an [`ExtractError`] instead of a panic.

use scraper::{ElementRef, Html, Selector};

use crate::utils::error::ExtractError;

/// Parse a CSS selector, keeping the offending text in the error
pub fn parse_selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Ordered fallback list for locating repeated card containers
///
/// The first selector that matches at least one element wins; later
/// selectors are only consulted when every earlier one came back empty.
#[derive(Debug, Clone)]
pub struct ContainerSelector {
    sources: Vec<String>,
    selectors: Vec<Selector>,
}

impl ContainerSelector {
    /// Build from configured selector strings
    pub fn parse<S: AsRef<str>>(field: &str, sources: &[S]) -> Result<Self, ExtractError> {
        if sources.is_empty() {
            return Err(ExtractError::NoStrategies(field.to_string()));
        }

        let selectors = sources
            .iter()
            .map(|s| parse_selector(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            sources: sources.iter().map(|s| s.as_ref().to_string()).collect(),
            selectors,
        })
    }

    /// Primary selector text, used for element waits
    pub fn primary(&self) -> &str {
        self.sources.first().map(String::as_str).unwrap_or_default()
    }

    /// Containers in document order from the first selector that matches
    pub fn select<'a>(&self, html: &'a Html) -> Vec<ElementRef<'a>> {
        for (source, selector) in self.sources.iter().zip(&self.selectors) {
            let found: Vec<ElementRef<'a>> = html.select(selector).collect();
            if !found.is_empty() {
                tracing::trace!(selector = %source, count = found.len(), "Container selector matched");
                return found;
            }
        }
        Vec::new()
    }

    /// True if any selector in the list matches the document
    pub fn matches(&self, html: &Html) -> bool {
        self.selectors
            .iter()
            .any(|selector| html.select(selector).next().is_some())
    }
}
