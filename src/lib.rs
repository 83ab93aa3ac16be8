//! Alopecosa: a polite single-host web crawler
//!
//! This crate explores a site from a seed URL, following discovered links in
//! breadth-first order with occasional promotion of link-dense areas, while
//! honouring a randomized politeness delay, domain restriction and a coarse
//! robots.txt check. The link-density threshold that drives promotion adapts
//! to the observed fetch success rate.

pub mod batch;
pub mod classifier;
pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod session;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Alopecosa operations
///
/// Crawl-time conditions (non-200 responses, timeouts, oversized bodies,
/// malformed markup) are never reported through this type; they surface as
/// [`crawler::FetchOutcome`] variants and report counters instead.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid seed URL '{url}': {source}")]
    InvalidSeed { url: String, source: UrlError },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session {0} not found")]
    SessionNotFound(u64),

    #[error("Session {id} cannot run from state {state}")]
    SessionState { id: u64, state: state::SessionState },
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
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingDomain,
}

/// Result type alias for Alopecosa operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlReport, PageRecord};
pub use state::{SessionState, StopReason};
pub use url::{extract_domain, is_allowed, normalize_url, FilterOptions};
