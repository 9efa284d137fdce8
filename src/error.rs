//! Unified error handling for the jobharvest crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors into a single `Error` enum, while keeping the
//! domain errors available for code that wants to match on them.
//!
//! # Architecture
//!
//! - [`HarvestErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use jobharvest::error::{Error, HarvestErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(category = ?err.category(), "transient failure: {err}");
//!     } else {
//!         tracing::error!("fatal: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::export::ExportError;
pub use crate::utils::error::{ConnectorError, ExtractError, FetchError, StorageError};

/// Common trait for all jobharvest error types
pub trait HarvestErrorTrait: std::error::Error {
    /// Check if this error is recoverable (worth retrying)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Parsing and data extraction errors
    Parsing,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Snapshot export errors
    Export,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short label used in logs and run summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Export => "export",
            Self::Other => "other",
        }
    }
}

impl HarvestErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::ServerError(status) => FetchError::should_retry_status(*status),
            Self::Timeout => true,
            Self::MaxRetriesExceeded
            | Self::Decode(_)
            | Self::InvalidUrl(_)
            | Self::NoPage
            | Self::NotFound(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Parsing,
            Self::InvalidUrl(_) => ErrorCategory::Config,
            _ => ErrorCategory::Network,
        }
    }
}

impl HarvestErrorTrait for StorageError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

/// Unified error type for the jobharvest crate
#[derive(Error, Debug)]
pub enum Error {
    /// Page or API fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Extractor construction errors
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    /// Connector errors
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Snapshot export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl HarvestErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Storage(e) => e.is_recoverable(),
            Self::Connector(ConnectorError::Fetch(e)) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::Extract(_)
            | Self::Connector(_)
            | Self::Export(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(e) => e.category(),
            Self::Extract(_) | Self::Json(_) => ErrorCategory::Parsing,
            Self::Connector(ConnectorError::Fetch(e)) => e.category(),
            Self::Connector(ConnectorError::Extract(_)) => ErrorCategory::Parsing,
            Self::Connector(ConnectorError::Misconfigured { .. }) => ErrorCategory::Config,
            Self::Connector(ConnectorError::Panicked(_)) => ErrorCategory::Other,
            Self::Storage(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Export(_) => ErrorCategory::Export,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
