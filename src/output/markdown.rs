//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of one crawl run,
//! including statistics, counters and the depth breakdown.

use crate::crawler::CrawlReport;
use crate::output::stats::CrawlStatistics;
use crate::output::OutputResult;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of a run to `output_path`
pub fn generate_markdown_summary(
    report: &CrawlReport,
    stats: &CrawlStatistics,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(report, stats);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run as markdown
pub fn format_markdown_summary(report: &CrawlReport, stats: &CrawlStatistics) -> String {
    let mut md = String::new();

    md.push_str("# Alopecosa Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", report.seed_url));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    let duration = report.finished_at - report.started_at;
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        duration.num_milliseconds() as f64 / 1000.0
    ));
    md.push_str(&format!(
        "- **Status**: {} ({})\n",
        report.status, report.stop_reason
    ));
    md.push_str(&format!(
        "- **Limits**: depth {}, pages {}\n\n",
        report.max_depth, report.max_pages
    ));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Crawled**: {}\n", stats.total_pages));
    md.push_str(&format!(
        "- **Links Discovered**: {}\n",
        stats.total_links_discovered
    ));
    md.push_str(&format!(
        "- **Average Links per Page**: {:.2}\n",
        stats.average_links_per_page
    ));
    md.push_str(&format!(
        "- **Average Crawl Time**: {:.2}s\n",
        stats.average_crawl_time
    ));
    md.push_str(&format!(
        "- **Fetch Success Rate**: {:.2}%\n",
        stats.fetch_success_rate * 100.0
    ));
    md.push_str(&format!(
        "- **Final Density Threshold**: {}\n\n",
        stats.final_threshold
    ));

    let c = &report.counters;
    md.push_str("## Crawl Counters\n\n");
    md.push_str("| Counter | Value |\n");
    md.push_str("|---------|-------|\n");
    for (name, value) in [
        ("Fetch attempts", c.fetch_attempts),
        ("Skipped", c.skipped),
        ("Failed", c.failed),
        ("Filtered links", c.filtered_out),
        ("Depth limited", c.depth_limited),
        ("Frontier dropped", c.frontier_dropped),
        ("Promotions", c.promotions),
        ("Iterations", c.iterations),
        ("Adaptations", c.adaptations),
        ("Frontier remaining", report.frontier_remaining),
    ] {
        md.push_str(&format!("| {} | {} |\n", name, value));
    }
    md.push('\n');

    if !report.pages.is_empty() {
        let mut depths: BTreeMap<u32, usize> = BTreeMap::new();
        for page in &report.pages {
            *depths.entry(page.metadata.depth).or_insert(0) += 1;
        }

        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in depths {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');

        md.push_str("## Pages\n\n");
        md.push_str("| URL | Title | Links |\n");
        md.push_str("|-----|-------|-------|\n");
        for page in report.pages.iter().take(50) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                page.url,
                page.title.replace('|', "\\|"),
                page.metadata.link_count
            ));
        }
        if report.pages.len() > 50 {
            md.push_str(&format!("\n... and {} more\n", report.pages.len() - 50));
        }
        md.push('\n');
    }

    md
}
