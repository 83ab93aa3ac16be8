//! Multi-seed batch crawling
//!
//! Each seed URL gets its own crawl session with its own frontier and
//! visited set. Sessions run concurrently on a bounded worker pool and
//! share nothing but the results collection and, optionally, a storage
//! handle.

mod dispatcher;
mod input;

pub use dispatcher::{
    save_batch_report, BatchDispatcher, BatchReport, BatchSummary, SessionOutcome,
    StorageOutcome,
};
pub use input::{load_urls, parse_url_list, BatchError, UrlListFormat};
