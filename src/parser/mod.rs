//! HTML parsing and field extraction
//!
//! Connectors never touch `scraper` directly: they describe fields as
//! [`FieldExtractor`] fallback lists and evaluate them against owned
//! [`PageSnapshot`] documents handed out by the page driver.

pub mod extract;
pub mod page;
pub mod sanitize;
pub mod selectors;

pub use extract::{FieldExtractor, Normalize, Strategy};
pub use page::{Anchor, PageSnapshot};
pub use selectors::{parse_selector, ContainerSelector};
