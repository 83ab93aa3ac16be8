//! Crawler module: the core of a crawl session
//!
//! This module contains:
//! - HTTP fetching with politeness delay and size ceilings
//! - Bounded HTML traversal, link extraction and density scoring
//! - The frontier queue with visited-set de-duplication and promotion
//! - The adaptive density threshold
//! - The crawl engine tying them together

mod adaptive;
mod engine;
mod extractor;
mod fetcher;
mod frontier;
mod sink;

pub use adaptive::{AdaptiveThreshold, Adjustment};
pub use engine::{CancelFlag, CrawlCounters, CrawlEngine, CrawlReport};
pub use extractor::{extract_links, parse_page, ExtractLimits, ExtractedLinks, ParsedPage, NO_TITLE};
pub use fetcher::{
    build_http_client, fetch_url, politeness_delay, FetchFailure, FetchOutcome, FetchedPage,
    Fetcher, SizeLimits, SkipReason,
};
pub use frontier::{Frontier, FrontierEntry, PushOutcome};
pub use sink::{PageMetadata, PageRecord, ResultSink};

use crate::config::Config;
use crate::CrawlError;

/// Crawls a site from `seed_url` with the given configuration
///
/// Fails only if the engine cannot be constructed; once running, the crawl
/// always yields a report.
pub async fn crawl(config: &Config, seed_url: &str) -> Result<CrawlReport, CrawlError> {
    let engine = CrawlEngine::new(config, seed_url)?;
    Ok(engine.run().await)
}
