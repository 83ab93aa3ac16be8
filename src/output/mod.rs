//! Output module for saving and summarizing crawl results
//!
//! This module handles:
//! - Writing the run output document as JSON
//! - Computing and printing run statistics
//! - Generating markdown summaries
//! - Persisting a report through the storage collaborator

mod error;
mod json;
mod markdown;
pub mod stats;

pub use error::{OutputError, OutputResult};
pub use json::{default_report_path, save_report, CrawlInfo, RunOutput};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_statistics, print_store_statistics, CrawlStatistics};

use crate::crawler::CrawlReport;
use crate::storage::Storage;

/// Stores a finished report, returning the storage session id
///
/// A storage failure here says nothing about the crawl itself, which has
/// already finished; callers decide whether to fall back to a file.
pub fn persist_report(
    storage: &mut dyn Storage,
    report: &CrawlReport,
    config_hash: Option<String>,
) -> OutputResult<i64> {
    let meta = report.session_meta(config_hash);
    Ok(storage.store_crawl_results(&meta, &report.pages)?)
}
