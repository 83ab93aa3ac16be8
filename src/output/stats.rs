//! Statistics derived from a finished crawl
//!
//! This module provides summary numbers for a single run and formatted
//! console output for both run and database statistics.

use crate::crawler::CrawlReport;
use crate::state::{SessionState, StopReason};
use crate::storage::StoreStatistics;
use serde::Serialize;

/// Crawl statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStatistics {
    pub total_pages: usize,

    /// Sum of admitted links over all pages (duplicates counted)
    pub total_links_discovered: usize,

    pub average_links_per_page: f64,

    /// Seconds, delay included
    pub average_crawl_time: f64,

    /// Share of page records with HTTP 200
    pub success_rate: f64,

    /// Share of fetch attempts that produced a page record
    pub fetch_success_rate: f64,

    /// URLs in the terrain map
    pub terrain_coverage: usize,

    /// Frontier entries moved forward for sitting in dense link areas
    pub hunting_efficiency: usize,

    pub frontier_remaining: usize,
    pub skipped: usize,
    pub failed: usize,
    pub final_threshold: u32,
    pub status: SessionState,
    pub stop_reason: StopReason,
}

impl CrawlStatistics {
    pub fn from_report(report: &CrawlReport) -> Self {
        let total_pages = report.pages.len();
        let total_links_discovered = report.total_links();

        let (average_links_per_page, average_crawl_time, success_rate) = if total_pages == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let pages = total_pages as f64;
            let crawl_time: f64 = report.pages.iter().map(|p| p.crawl_time).sum();
            let ok = report.pages.iter().filter(|p| p.status_code == 200).count();
            (
                total_links_discovered as f64 / pages,
                crawl_time / pages,
                ok as f64 / pages,
            )
        };

        Self {
            total_pages,
            total_links_discovered,
            average_links_per_page,
            average_crawl_time,
            success_rate,
            fetch_success_rate: report.fetch_success_rate(),
            terrain_coverage: report.terrain.len(),
            hunting_efficiency: report.counters.promotions,
            frontier_remaining: report.frontier_remaining,
            skipped: report.counters.skipped,
            failed: report.counters.failed,
            final_threshold: report.final_threshold,
            status: report.status,
            stop_reason: report.stop_reason,
        }
    }
}

/// Prints run statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Outcome: {} ({})", stats.status, stats.stop_reason);
    println!();

    println!("Overview:");
    println!("  Pages crawled: {}", stats.total_pages);
    println!("  Links discovered: {}", stats.total_links_discovered);
    println!("  Average links per page: {:.2}", stats.average_links_per_page);
    println!("  Average crawl time: {:.2}s", stats.average_crawl_time);
    println!("  Terrain coverage: {} URLs", stats.terrain_coverage);
    println!("  Promotions: {}", stats.hunting_efficiency);
    println!("  Left in frontier: {}", stats.frontier_remaining);
    println!("  Final density threshold: {}", stats.final_threshold);
    println!();

    if stats.skipped > 0 || stats.failed > 0 {
        println!("Not crawled:");
        println!("  Skipped: {}", stats.skipped);
        println!("  Failed: {}", stats.failed);
        println!();
    }

    println!(
        "Success Rate: {:.1}% of pages, {:.1}% of fetches",
        stats.success_rate * 100.0,
        stats.fetch_success_rate * 100.0
    );
}

/// Prints database statistics to stdout
pub fn print_store_statistics(stats: &StoreStatistics) {
    println!("=== Database Statistics ===\n");
    println!("  Websites: {}", stats.total_websites);
    println!("  Links: {}", stats.total_links);
    println!("  Sessions: {}", stats.total_sessions);
    println!("  Unique domains: {}", stats.unique_domains);
    println!(
        "  Average content length: {:.0} chars",
        stats.avg_content_length
    );
    println!("  Crawled in last 7 days: {}", stats.websites_last_7_days);
}
