//! Declarative field extraction
//!
//! A [`FieldExtractor`] is an ordered list of lookup [`Strategy`] values and a
//! [`Normalize`] step. Strategies are written as plain strings:
//!
//! - `css` reads the visible text of the first matching element
//! - `css@attr` reads an attribute of the first matching element
//! - `@attr` reads an attribute of the scope element itself
//!
//! The first strategy yielding a non-empty value wins. When every strategy
//! misses, the field is the empty string; a miss is expected and is only
//! visible at `trace` level.
//!
//! ```rust,ignore
//! let title = FieldExtractor::new(
//!     "title",
//!     &["h3.base-search-card__title", "a.job-link@aria-label"],
//!     Normalize::Text,
//! )?;
//! let value = title.extract(card, Some(&page_url));
//! ```

use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::crawler::url::resolve_href;
use crate::parser::sanitize::{collapse_inline, has_content};
use crate::parser::selectors::parse_selector;
use crate::utils::error::ExtractError;

/// Post-processing applied to a raw extracted value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalize {
    /// Sanitize and collapse whitespace
    #[default]
    Text,
    /// Resolve against the page URL
    Url,
    /// Trim only
    Raw,
}

impl Normalize {
    fn apply(self, value: &str, base: Option<&Url>) -> String {
        match self {
            Self::Text => collapse_inline(value),
            Self::Raw => value.trim().to_string(),
            Self::Url => resolve_href(base, value).unwrap_or_default(),
        }
    }
}

/// One way of locating a field value
#[derive(Debug, Clone)]
pub struct Strategy {
    source: String,
    selector: Option<Selector>,
    attr: Option<String>,
}

impl Strategy {
    /// Parse `css`, `css@attr` or `@attr`
    pub fn parse(text: &str) -> Result<Self, ExtractError> {
        let text = text.trim();
        let (css, attr) = split_attr(text);

        if css.is_empty() && attr.is_none() {
            return Err(ExtractError::InvalidSelector {
                selector: text.to_string(),
                reason: "empty strategy".to_string(),
            });
        }

        let selector = if css.is_empty() {
            None
        } else {
            Some(parse_selector(css)?)
        };

        Ok(Self {
            source: text.to_string(),
            selector,
            attr: attr.map(String::from),
        })
    }

    /// The configured strategy text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// First non-empty normalized value this strategy finds inside `scope`
    fn lookup(&self, scope: ElementRef<'_>, normalize: Normalize, base: Option<&Url>) -> String {
        let read = |element: ElementRef<'_>| -> String {
            let raw = match &self.attr {
                Some(attr) => element.value().attr(attr).unwrap_or_default().to_string(),
                None => element.text().collect::<Vec<_>>().join(" "),
            };
            normalize.apply(&raw, base)
        };

        match &self.selector {
            None => read(scope),
            Some(selector) => scope
                .select(selector)
                .map(read)
                .find(|value| has_content(value))
                .unwrap_or_default(),
        }
    }
}

/// Split a trailing `@attr` off a strategy string
///
/// The suffix only counts as an attribute name if it looks like one, so
/// selectors such as `a[href*='@']` stay intact.
fn split_attr(text: &str) -> (&str, Option<&str>) {
    if let Some((css, attr)) = text.rsplit_once('@') {
        let is_attr_name = !attr.is_empty()
            && attr
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
        if is_attr_name {
            return (css.trim(), Some(attr));
        }
    }
    (text, None)
}

/// Named field with an ordered fallback list of strategies
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    name: String,
    strategies: Vec<Strategy>,
    normalize: Normalize,
}

impl FieldExtractor {
    /// Build from configured strategy strings
    pub fn new<S: AsRef<str>>(
        name: &str,
        strategies: &[S],
        normalize: Normalize,
    ) -> Result<Self, ExtractError> {
        if strategies.is_empty() {
            return Err(ExtractError::NoStrategies(name.to_string()));
        }

        let strategies = strategies
            .iter()
            .map(|s| Strategy::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            strategies,
            normalize,
        })
    }

    /// Like [`FieldExtractor::new`] but an empty list yields `None`
    pub fn optional<S: AsRef<str>>(
        name: &str,
        strategies: &[S],
        normalize: Normalize,
    ) -> Result<Option<Self>, ExtractError> {
        if strategies.is_empty() {
            return Ok(None);
        }
        Self::new(name, strategies, normalize).map(Some)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Evaluate strategies in order; empty string on a full miss
    pub fn extract(&self, scope: ElementRef<'_>, base: Option<&Url>) -> String {
        for (index, strategy) in self.strategies.iter().enumerate() {
            let value = strategy.lookup(scope, self.normalize, base);
            if has_content(&value) {
                tracing::trace!(
                    field = %self.name,
                    strategy = index,
                    selector = %strategy.source(),
                    "Field extracted"
                );
                return value;
            }
        }

        tracing::trace!(field = %self.name, "Extraction miss");
        String::new()
    }
}
