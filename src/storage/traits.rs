//! Storage traits and error types

use crate::crawler::PageRecord;
use crate::storage::{
    SearchQuery, SearchResults, SessionMeta, SessionRecord, StoreStatistics, WebsiteDetails,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The narrow interface the crawler side uses to persist and query results
///
/// Nothing in the crawl core depends on this trait; callers that want
/// persistence hand a finished report to an implementation.
pub trait Storage {
    /// Stores one run and its page records, returning the session id
    ///
    /// Pages whose URL (or non-empty content) is already stored update the
    /// existing row instead of adding a new one.
    fn store_crawl_results(
        &mut self,
        meta: &SessionMeta,
        records: &[PageRecord],
    ) -> StorageResult<i64>;

    /// Paginated search by text, domain, depth and status code
    fn search(&self, query: &SearchQuery) -> StorageResult<SearchResults>;

    /// Full stored page with its outgoing links
    fn website_details(&self, website_id: i64) -> StorageResult<Option<WebsiteDetails>>;

    /// Distinct stored domains, sorted
    fn domains(&self) -> StorageResult<Vec<String>>;

    /// Most recent sessions first
    fn sessions(&self, limit: usize) -> StorageResult<Vec<SessionRecord>>;

    fn statistics(&self) -> StorageResult<StoreStatistics>;

    /// Deletes pages crawled more than `days` days ago, returning how many
    fn delete_older_than(&mut self, days: u32) -> StorageResult<usize>;
}
