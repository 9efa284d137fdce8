//! Static page snapshots
//!
//! A snapshot is the owned HTML a driver has accumulated for one navigation:
//! the first document plus any documents appended by scrolling. Parsing
//! happens inside these synchronous helpers because `scraper::Html` is not
//! `Send` and must never be held across an await point.

use scraper::{ElementRef, Html};
use url::Url;

use crate::crawler::url::resolve_href;
use crate::parser::extract::FieldExtractor;
use crate::parser::sanitize::collapse_inline;
use crate::parser::selectors::{parse_selector, ContainerSelector};

/// Owned HTML of the current page
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: Url,
    pub documents: Vec<String>,
}

/// An `<a href>` with its visible text and resolved target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub text: String,
    pub href: String,
}

impl PageSnapshot {
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            documents: vec![html.into()],
        }
    }

    /// Map container elements across all documents, in document order, up to `limit` results
    ///
    /// `map` may reject a card by returning `None`; rejected cards do not
    /// count toward the limit.
    pub fn collect_cards<T, F>(&self, containers: &ContainerSelector, limit: usize, mut map: F) -> Vec<T>
    where
        F: FnMut(ElementRef<'_>, &Url) -> Option<T>,
    {
        let mut out = Vec::new();

        for document in &self.documents {
            if out.len() >= limit {
                break;
            }
            let html = Html::parse_document(document);
            for card in containers.select(&html) {
                if out.len() >= limit {
                    break;
                }
                if let Some(item) = map(card, &self.url) {
                    out.push(item);
                }
            }
        }

        out
    }

    /// First non-empty value of a field across documents
    pub fn extract_field(&self, field: &FieldExtractor) -> String {
        self.documents
            .iter()
            .map(|document| {
                let html = Html::parse_document(document);
                field.extract(html.root_element(), Some(&self.url))
            })
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }

    /// True if any document contains a match for the selector list
    pub fn contains(&self, containers: &ContainerSelector) -> bool {
        self.documents
            .iter()
            .any(|document| containers.matches(&Html::parse_document(document)))
    }

    /// Every anchor with an `href`, text collapsed, target resolved against the page URL
    pub fn anchors(&self) -> Vec<Anchor> {
        let Ok(selector) = parse_selector("a[href]") else {
            return Vec::new();
        };

        let mut anchors = Vec::new();
        for document in &self.documents {
            let html = Html::parse_document(document);
            for element in html.select(&selector) {
                let Some(href) = element
                    .value()
                    .attr("href")
                    .and_then(|href| resolve_href(Some(&self.url), href))
                else {
                    continue;
                };
                let text = collapse_inline(&element.text().collect::<Vec<_>>().join(" "));
                anchors.push(Anchor { text, href });
            }
        }
        anchors
    }
}
