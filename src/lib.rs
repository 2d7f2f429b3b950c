//! Crawldex: a multi-site crawler and inverted-index builder
//!
//! This crate crawls a configured list of sites, extracts linguistic lemmas
//! from every reachable internal page, and persists a
//! `(site, page, lemma, index)` model for a search component to query.
//! Indexing runs are started, stopped, and supplemented (single-page
//! re-indexing) through a small HTTP control surface.

pub mod analyzer;
pub mod api;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod indexing;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Crawldex operations
#[derive(Debug, Error)]
pub enum CrawldexError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error fetching {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Analyzer initialization failed: {0}")]
    AnalyzerInit(String),

    #[error("Indexing is already running")]
    AlreadyRunning,

    #[error("Indexing is not running")]
    NotRunning,

    #[error("URL is outside configured sites: {0}")]
    OutOfScope(String),

    #[error("Indexing interrupted by user")]
    Cancelled,

    #[error("Worker pool did not drain cleanly: {0}")]
    PoolTermination(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
///
/// `Malformed` carries the best-effort lowercased and collapsed form the
/// normalizer produced before giving up, so callers can still log something
/// readable. A URL that failed normalization is never fetched.
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL (best-effort form: {0})")]
    Malformed(String),
}

impl CrawldexError {
    /// Short error-kind label used by the errors sink
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Fetch { .. } | Self::Io(_) => "IO_ERROR",
            Self::Url(_) => "MALFORMED_URL",
            Self::Database(_) | Self::Storage(_) => "DB_ERROR",
            Self::HtmlParse { .. } => "PARSE_ERROR",
            Self::AnalyzerInit(_) => "ANALYZER_INIT_ERROR",
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::NotRunning => "NOT_RUNNING",
            Self::OutOfScope(_) => "OUT_OF_SCOPE",
            Self::Cancelled => "CANCELLED",
            Self::PoolTermination(_) => "POOL_TERMINATION_FORCED",
        }
    }
}

/// Result type alias for Crawldex operations
pub type Result<T> = std::result::Result<T, CrawldexError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use crate::analyzer::LemmaAnalyzer;
pub use crate::config::Config;
pub use crate::indexing::IndexingCoordinator;
pub use crate::storage::{PageStore, SiteStatus, SqliteStore};
pub use crate::url::{is_internal_host, normalize_url};
