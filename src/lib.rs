//! jobharvest - Job Posting Ingestion Pipeline
//!
//! Aggregates job postings from job boards, a job-search API and employer
//! careers pages into one deduplicated SQLite store, then exports
//! spreadsheet snapshots.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Page driver, HTTP fetcher, pacing and URL handling
//! - [`parser`] - Declarative field extraction from static documents
//! - [`connectors`] - Board, API and careers-page sources
//! - [`registry`] - Employer fetch and careers-URL discovery
//! - [`storage`] - SQLite persistence, identity keys and idempotent ingest
//! - [`pipeline`] - Stage orchestration and recurring runs
//! - [`export`] - Workbook and CSV snapshots
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use jobharvest::config::Config;
//! use jobharvest::pipeline::Orchestrator;
//! use jobharvest::storage::{SharedStore, SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store: SharedStore = Arc::new(SqliteStore::open(&config.database.path)?);
//!     let query = config.search.clone();
//!     let mut orchestrator = Orchestrator::builder(config, store).build()?;
//!     let summary = orchestrator.run_all(&query).await;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connectors;
pub mod crawler;
pub mod error;
pub mod export;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::connectors::{BoardConnector, Connector, EmployerSiteHarvester};
    pub use crate::crawler::{PageDriver, StaticPageDriver};
    pub use crate::error::{Error, ErrorCategory, HarvestErrorTrait, Result};
    pub use crate::models::{Employer, JobPosting, PostingOrigin, RawPosting, SearchQuery};
    pub use crate::pipeline::{Orchestrator, RunSummary};
    pub use crate::storage::{JobIngestor, SharedStore, SqliteStore};
}

// Direct re-exports for convenience
pub use models::{Employer, JobPosting, RawPosting, SearchQuery};
