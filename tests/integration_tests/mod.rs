//! Integration tests module
//!
//! This module provides end-to-end integration tests for the jobharvest
//! pipeline, including:
//! - fetch employers -> discover -> scrape -> export
//! - Board and API connectors over HTTP
//! - Error handling and containment

pub mod connector_test;
pub mod error_scenarios;
pub mod fixtures;
pub mod pipeline_test;
