//! Error types for the jobharvest pipeline
//!
//! This module defines the domain error enums used by the page driver,
//! field extraction, connectors and storage.

use thiserror::Error;

/// Errors that can occur while loading a page or calling a remote API
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request or element wait timed out
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded")]
    MaxRetriesExceeded,

    /// Content decoding error
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No page is loaded in the driver
    #[error("No page loaded")]
    NoPage,

    /// Static driver has no document for this URL
    #[error("Page not found: {0}")]
    NotFound(String),
}

impl FetchError {
    /// Status codes worth another attempt when retries are enabled
    pub fn should_retry_status(status: u16) -> bool {
        matches!(status, 429 | 500 | 502 | 503 | 504)
    }
}

/// Errors raised while building field extractors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// CSS selector failed to parse
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// A field was declared without any lookup strategy
    #[error("Field '{0}' has no lookup strategies")]
    NoStrategies(String),
}

/// Errors raised by a source connector
///
/// Navigation and per-item failures are absorbed inside the connector;
/// these variants only cover faults that make the whole run meaningless.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Connector configuration is unusable
    #[error("Connector '{connector}' misconfigured: {reason}")]
    Misconfigured { connector: String, reason: String },

    /// Extractor construction failed
    #[error("Extractor error: {0}")]
    Extract(#[from] ExtractError),

    /// Unrecoverable fetch error surfaced by the connector
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Connector panicked; contained at the orchestrator boundary
    #[error("Connector '{0}' panicked")]
    Panicked(String),
}

impl ConnectorError {
    /// Create a misconfiguration error
    pub fn misconfigured(connector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Misconfigured {
            connector: connector.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A lock guarding the store was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    LockPoisoned,

    /// Record rejected before reaching the store
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem error while opening the database
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;
