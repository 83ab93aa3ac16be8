//! Storage module for persisting crawl results
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Storing finished runs and their page records
//! - Search, per-page details and statistics queries
//!
//! A storage handle is opened explicitly and passed to whoever persists
//! results; there is no process-wide instance.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::{SessionState, StopReason};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Default page size for searches
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Content previews in search results are cut to this many characters
pub const PREVIEW_CHARS: usize = 500;

/// Run metadata stored alongside the page records
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub seed_url: String,
    pub max_depth: u32,
    pub max_pages: usize,
    pub status: SessionState,
    pub stop_reason: Option<StopReason>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub config_hash: Option<String>,
}

/// A stored page as returned by search
#[derive(Debug, Clone, Serialize)]
pub struct StoredWebsite {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub content: String,
    pub status_code: u16,
    pub crawl_time: f64,
    pub crawl_timestamp: String,
    pub domain: String,
    pub depth: u32,
    pub links_count: usize,
    pub metadata: serde_json::Value,
}

/// A stored page with full content and outgoing links
#[derive(Debug, Clone, Serialize)]
pub struct WebsiteDetails {
    #[serde(flatten)]
    pub website: StoredWebsite,
    pub content_hash: String,
    pub created_at: String,
    pub outgoing_links: Vec<String>,
}

/// Search filters; every filter is optional
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Substring matched against url, title and content
    pub text: Option<String>,
    pub domain: Option<String>,
    pub depth: Option<u32>,
    pub status_code: Option<u16>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: None,
            domain: None,
            depth: None,
            status_code: None,
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
        }
    }
}

impl SearchQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// One page of search results and the total match count
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub records: Vec<StoredWebsite>,
    pub total: u64,
}

/// Database-wide counts
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStatistics {
    pub total_websites: u64,
    pub total_links: u64,
    pub total_sessions: u64,
    pub unique_domains: u64,
    pub avg_content_length: f64,
    pub websites_last_7_days: u64,
}

/// A stored crawl run
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub id: i64,
    pub base_url: String,
    pub max_depth: u32,
    pub max_pages: usize,
    pub pages_crawled: usize,
    pub start_time: String,
    pub end_time: Option<String>,
    pub status: String,
    pub stop_reason: Option<String>,
    pub config_hash: Option<String>,
    pub created_at: String,
}

/// Timestamp format used in every stored column
///
/// Fixed width and UTC, so string comparison orders chronologically.
pub(crate) fn db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
