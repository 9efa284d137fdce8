//! Page loading with pacing and optional retry
//!
//! This module implements the navigation side of the pipeline: the HTTP
//! fetcher, request pacing, URL canonicalization and the [`PageDriver`]
//! abstraction the connectors run on.

pub mod driver;
pub mod fetcher;
pub mod pacing;
pub mod url;

pub use driver::{HttpPageDriver, PageDriver, StaticPageDriver};
pub use fetcher::PageFetcher;
pub use pacing::{Pacer, PacingPolicy};

use crate::config::Config;
use crate::utils::error::FetchError;

/// Build an HTTP page driver from config
///
/// Each connector gets its own driver so pacing is tracked per source.
pub fn http_driver(config: &Config) -> Result<Box<dyn PageDriver>, FetchError> {
    let fetcher = PageFetcher::new(&config.http)?;
    Ok(Box::new(HttpPageDriver::new(fetcher, &config.pacing)))
}
