//! Crawl engine: the sequential control loop of one session
//!
//! Each iteration of the loop:
//! 1. Checks cancellation and the termination limits
//! 2. Pops the next frontier entry and marks it visited
//! 3. Fetches it (politeness delay included)
//! 4. Parses the page and scores link density
//! 5. Filters links and pushes them, promoting dense areas to the front
//! 6. Records the page and periodically adapts the density threshold
//!
//! The engine never fails once constructed. Whatever happens during the run,
//! [`CrawlEngine::run`] returns a [`CrawlReport`] holding every page gathered.

use crate::classifier::{self, ContentClassifier};
use crate::config::Config;
use crate::crawler::adaptive::{AdaptiveThreshold, Adjustment};
use crate::crawler::extractor::{parse_page, ExtractLimits};
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::crawler::frontier::{Frontier, PushOutcome};
use crate::crawler::sink::{PageMetadata, PageRecord, ResultSink};
use crate::robots::fetch_robots;
use crate::state::{SessionState, StopReason, TerrainEntry, TerrainMap};
use crate::storage::SessionMeta;
use crate::url::{evaluate, extract_domain, normalize_url, FilterOptions};
use crate::{CrawlError, UrlError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Pages between progress log lines
const PROGRESS_EVERY: usize = 10;

/// Cooperative cancellation signal, checked at the top of every loop iteration
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tallies kept while the loop runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlCounters {
    /// GET requests issued (seed included)
    pub fetch_attempts: usize,
    /// Page records produced
    pub pages: usize,
    /// Non-200, oversized or non-HTML responses
    pub skipped: usize,
    /// Timeouts and transport errors
    pub failed: usize,
    /// Links rejected by the admission filter
    pub filtered_out: usize,
    /// Entries discarded or links not queued for exceeding max depth
    pub depth_limited: usize,
    /// Pushes dropped because the frontier was full
    pub frontier_dropped: usize,
    /// Entries moved to the front of the frontier
    pub promotions: usize,
    /// Frontier pops
    pub iterations: usize,
    /// Threshold changes
    pub adaptations: usize,
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub seed_url: String,
    pub base_domain: String,
    pub max_depth: u32,
    pub max_pages: usize,
    pub status: SessionState,
    pub stop_reason: StopReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages: Vec<PageRecord>,
    pub terrain: TerrainMap,
    pub counters: CrawlCounters,
    pub final_threshold: u32,
    pub frontier_remaining: usize,
}

impl CrawlReport {
    /// Share of fetch attempts that produced a page record
    pub fn fetch_success_rate(&self) -> f64 {
        if self.counters.fetch_attempts == 0 {
            return 0.0;
        }
        self.counters.pages as f64 / self.counters.fetch_attempts as f64
    }

    pub fn total_links(&self) -> usize {
        self.pages.iter().map(|p| p.links.len()).sum()
    }

    /// Run metadata handed to the storage collaborator
    pub fn session_meta(&self, config_hash: Option<String>) -> SessionMeta {
        SessionMeta {
            seed_url: self.seed_url.clone(),
            max_depth: self.max_depth,
            max_pages: self.max_pages,
            status: self.status,
            stop_reason: Some(self.stop_reason),
            started_at: self.started_at,
            finished_at: Some(self.finished_at),
            config_hash,
        }
    }
}

/// One crawl session over a single site
pub struct CrawlEngine {
    config: Config,
    seed: Url,
    base_domain: String,
    fetcher: Fetcher,
    filter: FilterOptions,
    classifier: Arc<dyn ContentClassifier>,
    cancel: CancelFlag,
    state: SessionState,
}

impl CrawlEngine {
    /// Prepares a session in the `Ready` state
    ///
    /// # Errors
    ///
    /// * `CrawlError::InvalidSeed` - the seed is not an absolute http(s) URL
    /// * `CrawlError::Reqwest` - the HTTP client could not be built
    /// * `CrawlError::Config` - the configured classifier could not be built
    pub fn new(config: &Config, seed_url: &str) -> Result<Self, CrawlError> {
        let seed = normalize_url(seed_url).map_err(|source| CrawlError::InvalidSeed {
            url: seed_url.to_string(),
            source,
        })?;

        let base_domain = extract_domain(&seed).ok_or_else(|| CrawlError::InvalidSeed {
            url: seed_url.to_string(),
            source: UrlError::MissingDomain,
        })?;

        let fetcher = Fetcher::from_config(config)?;
        let classifier = classifier::from_config(&config.classifier)?;

        Ok(Self {
            config: config.clone(),
            seed,
            base_domain,
            fetcher,
            filter: FilterOptions::from_config(&config.crawler, &config.limits),
            classifier,
            cancel: CancelFlag::new(),
            state: SessionState::Ready,
        })
    }

    /// Replaces the classifier built from configuration
    pub fn with_classifier(mut self, classifier: Arc<dyn ContentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Shares an externally owned cancellation flag
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Runs the crawl loop to completion
    pub async fn run(mut self) -> CrawlReport {
        let started_at = Utc::now();
        self.state = SessionState::Running;

        let max_depth = self.config.crawler.max_depth;
        let max_pages = self.config.crawler.max_pages;
        let capacity = max_pages.saturating_mul(self.config.limits.queue_factor).max(1);
        let iteration_cap = max_pages
            .saturating_mul(self.config.limits.iteration_factor)
            .max(1);
        let extract_limits = ExtractLimits {
            max_nesting_depth: self.config.limits.max_nesting_depth,
            density_scan_limit: self.config.limits.density_scan_limit,
        };

        tracing::info!("Starting crawl of {}", self.seed);
        tracing::info!(
            "Max depth: {}, max pages: {}, delay range: {:?}",
            max_depth,
            max_pages,
            self.fetcher.delay_range()
        );

        if self.config.crawler.respect_robots {
            self.load_robots().await;
        }

        let mut frontier = Frontier::new(capacity);
        frontier.push(self.seed.to_string(), 0);

        let mut sink = ResultSink::new(max_pages);
        let mut terrain = TerrainMap::new();
        let mut threshold = AdaptiveThreshold::new(&self.config.adaptive);
        let mut counters = CrawlCounters::default();
        let run_start = Instant::now();

        let stop_reason = loop {
            if self.cancel.is_cancelled() {
                tracing::warn!("Crawl of {} cancelled", self.seed);
                break StopReason::Cancelled;
            }
            if sink.len() >= max_pages {
                break StopReason::PageLimit;
            }
            if frontier.is_empty() {
                break StopReason::FrontierExhausted;
            }
            if counters.iterations >= iteration_cap {
                tracing::warn!(
                    "Iteration cap of {} reached with {} pages; aborting crawl",
                    iteration_cap,
                    sink.len()
                );
                break StopReason::IterationCap;
            }

            let Some(entry) = frontier.pop() else {
                break StopReason::FrontierExhausted;
            };
            counters.iterations += 1;

            if entry.depth > max_depth {
                counters.depth_limited += 1;
                continue;
            }
            if !frontier.mark_visited(&entry.url) {
                continue;
            }

            let cycle_start = Instant::now();
            counters.fetch_attempts += 1;

            let page = match self.fetcher.fetch(&entry.url).await {
                FetchOutcome::Fetched(page) => page,
                FetchOutcome::Skip(reason) => {
                    counters.skipped += 1;
                    tracing::warn!("Skipping {}: {}", entry.url, reason);
                    continue;
                }
                FetchOutcome::Fail(failure) => {
                    counters.failed += 1;
                    tracing::warn!("Failed to fetch {}: {}", entry.url, failure);
                    continue;
                }
            };

            // Redirect targets count as visited too
            if let Ok(final_url) = normalize_url(page.final_url.as_str()) {
                if final_url.as_str() != entry.url {
                    frontier.mark_visited(final_url.as_str());
                }
            }

            let parsed = parse_page(
                &page.body,
                &page.final_url,
                threshold.value(),
                &extract_limits,
                self.config.crawler.max_content_length,
            );

            let mut links = Vec::with_capacity(parsed.links.links.len());
            for link in parsed.links.links {
                match evaluate(&link, &self.base_domain, &self.filter) {
                    Ok(()) => links.push(link),
                    Err(rejection) => {
                        counters.filtered_out += 1;
                        tracing::trace!("Rejected {}: {}", link, rejection);
                    }
                }
            }

            let child_depth = entry.depth + 1;
            if child_depth <= max_depth {
                for link in &links {
                    if frontier.push(link.as_str(), child_depth) == PushOutcome::Overflow {
                        tracing::debug!("Frontier full; dropped {}", link);
                    }
                }

                let admitted: HashSet<&str> = links.iter().map(String::as_str).collect();
                for url in &parsed.links.promoted {
                    if admitted.contains(url.as_str()) {
                        tracing::info!("Found rich hunting ground: {}", url);
                        frontier.add_scent(url.as_str());
                    }
                }

                if frontier.scent_len() > 0 {
                    let moved =
                        frontier.promote_scent(self.config.adaptive.promote_per_cycle, child_depth);
                    counters.promotions += moved;
                }
            } else {
                counters.depth_limited += links.iter().filter(|l| !frontier.is_visited(l)).count();
            }

            let timestamp = Utc::now();
            let link_count = links.len();
            let mut record = PageRecord {
                url: entry.url.clone(),
                title: parsed.title,
                content: parsed.content,
                links,
                status_code: page.status_code,
                crawl_time: 0.0,
                timestamp,
                metadata: PageMetadata {
                    depth: entry.depth,
                    link_count,
                    response_time: page.elapsed.as_secs_f64(),
                },
                classification: None,
            };
            record.classification = self.classifier.classify(&record).await;
            record.crawl_time = cycle_start.elapsed().as_secs_f64();

            terrain.record(
                &record.url,
                TerrainEntry {
                    depth: record.metadata.depth,
                    link_count: record.metadata.link_count,
                    title: record.title.clone(),
                    discovered_at: timestamp,
                },
            );

            tracing::debug!(
                "Crawled {} at depth {} in {:.2}s ({} links)",
                record.url,
                record.metadata.depth,
                record.crawl_time,
                record.metadata.link_count
            );

            sink.push(record);
            counters.pages = sink.len();

            if counters.pages % PROGRESS_EVERY == 0 {
                let elapsed = run_start.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} pages crawled, {} in frontier, {:.2} pages/sec",
                    counters.pages,
                    frontier.len(),
                    counters.pages as f64 / elapsed.max(f64::EPSILON)
                );
            }

            if counters.pages % self.config.adaptive.adapt_every.max(1) == 0 {
                let success_rate = counters.pages as f64 / counters.fetch_attempts as f64;
                match threshold.adapt(success_rate) {
                    Adjustment::Unchanged => {}
                    adjustment => {
                        counters.adaptations += 1;
                        tracing::info!(
                            "Adapting: density threshold {} (success rate {:.2})",
                            adjustment,
                            success_rate
                        );
                    }
                }
            }
        };

        counters.frontier_dropped = frontier.dropped();
        self.state = stop_reason.final_state();

        tracing::info!(
            "Crawl of {} finished: {} ({}), {} pages, {} skipped, {} failed",
            self.seed,
            self.state,
            stop_reason,
            sink.len(),
            counters.skipped,
            counters.failed
        );

        CrawlReport {
            seed_url: self.seed.to_string(),
            base_domain: self.base_domain,
            max_depth,
            max_pages,
            status: self.state,
            stop_reason,
            started_at,
            finished_at: Utc::now(),
            pages: sink.into_records(),
            terrain,
            counters,
            final_threshold: threshold.value(),
            frontier_remaining: frontier.len(),
        }
    }

    async fn load_robots(&mut self) {
        let policy = fetch_robots(self.fetcher.client(), &self.seed).await;
        if !policy.is_loaded() {
            return;
        }

        if policy.blocks_entire_site() {
            tracing::warn!(
                "robots.txt for {} disallows the whole site; discovered links will not be followed",
                self.base_domain
            );
            self.filter.blanket_disallow = true;
        }

        if let Some(delay) = policy.crawl_delay(&self.config.user_agent.crawler_name) {
            tracing::info!("robots.txt requests a crawl delay of {}s", delay);
            let ceiling = self.config.limits.max_crawl_delay_secs;
            if delay > ceiling {
                tracing::warn!(
                    "Crawl delay of {}s for {} exceeds the {}s ceiling; clamping",
                    delay,
                    self.base_domain,
                    ceiling
                );
            }
            self.fetcher.raise_delay_floor(capped_crawl_delay(delay, ceiling));
        }
    }
}

/// Limits a robots.txt crawl delay to `ceiling` seconds
fn capped_crawl_delay(requested: f64, ceiling: f64) -> f64 {
    if requested.is_nan() {
        return 0.0;
    }
    requested.clamp(0.0, ceiling.max(0.0))
}
