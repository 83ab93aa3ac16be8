//! JSON run output
//!
//! The saved document has three top-level keys: `crawl_info` (run metadata),
//! `terrain_map` (visited URL → descriptor) and `results` (every page record).

use crate::crawler::{CrawlReport, PageRecord};
use crate::output::OutputResult;
use crate::state::{SessionState, StopReason, TerrainMap};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct CrawlInfo<'a> {
    pub base_url: &'a str,
    pub max_depth: u32,
    pub max_pages: usize,
    pub pages_crawled: usize,
    pub status: SessionState,
    pub stop_reason: StopReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub crawl_timestamp: DateTime<Utc>,
}

/// Borrowed view of a report in its on-disk shape
#[derive(Debug, Serialize)]
pub struct RunOutput<'a> {
    pub crawl_info: CrawlInfo<'a>,
    pub terrain_map: &'a TerrainMap,
    pub results: &'a [PageRecord],
}

impl<'a> RunOutput<'a> {
    pub fn from_report(report: &'a CrawlReport) -> Self {
        Self {
            crawl_info: CrawlInfo {
                base_url: &report.seed_url,
                max_depth: report.max_depth,
                max_pages: report.max_pages,
                pages_crawled: report.pages.len(),
                status: report.status,
                stop_reason: report.stop_reason,
                started_at: report.started_at,
                finished_at: report.finished_at,
                crawl_timestamp: Utc::now(),
            },
            terrain_map: &report.terrain,
            results: &report.pages,
        }
    }
}

/// File name used when the caller gives no output path
pub fn default_report_path(results_dir: &Path, now: NaiveDateTime) -> PathBuf {
    results_dir.join(format!(
        "alopecosa_crawl_results_{}.json",
        now.format("%Y%m%d_%H%M%S")
    ))
}

/// Writes a report as pretty-printed JSON, creating parent directories
pub fn save_report(report: &CrawlReport, path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(&RunOutput::from_report(report))?;
    std::fs::write(path, json)?;

    tracing::info!("Results saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_report_path() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap();
        let path = default_report_path(Path::new("data/crawl_results"), now);
        assert_eq!(
            path,
            PathBuf::from("data/crawl_results/alopecosa_crawl_results_20240309_070501.json")
        );
    }
}
