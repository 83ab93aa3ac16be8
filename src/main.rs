//! Alopecosa main entry point
//!
//! This is the command-line interface for the Alopecosa crawler.

use alopecosa::batch::{load_urls, save_batch_report, BatchDispatcher, BatchReport};
use alopecosa::config::{load_config_with_hash, validate, Config};
use alopecosa::crawler::{CancelFlag, CrawlEngine};
use alopecosa::output::{
    default_report_path, generate_markdown_summary, persist_report, print_statistics,
    print_store_statistics, save_report, CrawlStatistics,
};
use alopecosa::storage::{SearchQuery, SqliteStorage, Storage};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Alopecosa: a polite single-host web crawler
///
/// Alopecosa explores a site from a seed URL, favouring link-dense areas,
/// and stores what it finds as JSON and optionally in SQLite.
#[derive(Parser, Debug)]
#[command(name = "alopecosa")]
#[command(version = "1.0.0")]
#[command(about = "A polite single-host web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site starting from URL
    Crawl {
        url: String,

        /// Maximum link depth from the seed
        #[arg(long)]
        depth: Option<u32>,

        /// Maximum number of pages to crawl
        #[arg(long)]
        pages: Option<usize>,

        /// Minimum politeness delay in seconds; the maximum is twice this
        #[arg(long)]
        delay: Option<f64>,

        /// JSON output file
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Also write a markdown summary
        #[arg(long, value_name = "FILE")]
        summary: Option<PathBuf>,

        /// Persist the results to the database
        #[arg(long)]
        store: bool,
    },

    /// Crawl every URL listed in FILE (.txt, .csv or .json)
    Batch {
        file: PathBuf,

        /// Concurrent crawl sessions
        #[arg(long)]
        workers: Option<usize>,

        /// Seconds between dispatching sessions
        #[arg(long)]
        delay: Option<f64>,

        /// JSON batch report file
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Do not persist results to the database
        #[arg(long)]
        no_store: bool,
    },

    /// Search stored pages
    Search {
        query: Option<String>,

        #[arg(long)]
        domain: Option<String>,

        #[arg(long)]
        depth: Option<u32>,

        #[arg(long)]
        status: Option<u16>,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show database statistics
    Stats,

    /// Load the configuration and print the effective settings
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load_configuration(cli.config.as_deref())?;

    match cli.command {
        Command::Crawl {
            url,
            depth,
            pages,
            delay,
            output,
            summary,
            store,
        } => {
            let mut config = config;
            if let Some(depth) = depth {
                config.crawler.max_depth = depth;
            }
            if let Some(pages) = pages {
                config.crawler.max_pages = pages;
            }
            if let Some(delay) = delay {
                config.crawler.delay_range = (delay, delay * 2.0);
            }
            validate(&config).context("invalid crawl options")?;

            handle_crawl(&config, config_hash, &url, output, summary, store).await?;
        }
        Command::Batch {
            file,
            workers,
            delay,
            output,
            no_store,
        } => {
            let mut config = config;
            if let Some(workers) = workers {
                config.batch.max_workers = workers;
            }
            if let Some(delay) = delay {
                config.batch.dispatch_delay_secs = delay;
            }
            if no_store {
                config.batch.store_results = false;
            }
            validate(&config).context("invalid batch options")?;

            handle_batch(config, config_hash, &file, output).await?;
        }
        Command::Search {
            query,
            domain,
            depth,
            status,
            limit,
            offset,
        } => {
            let search = SearchQuery {
                text: query,
                domain,
                depth,
                status_code: status,
                limit,
                offset,
            };
            handle_search(&config, &search)?;
        }
        Command::Stats => handle_stats(&config)?,
        Command::Validate => handle_validate(&config, config_hash.as_deref()),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("alopecosa=info,warn"),
            1 => EnvFilter::new("alopecosa=debug,info"),
            2 => EnvFilter::new("alopecosa=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file if one is given, otherwise the defaults
fn load_configuration(path: Option<&Path>) -> anyhow::Result<(Config, Option<String>)> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok((config, Some(hash)))
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Ok((Config::default(), None))
        }
    }
}

/// Raises `flag` on the first Ctrl-C
fn cancel_on_ctrl_c(flag: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            flag.cancel();
        }
    });
}

fn timestamped_path(dir: &str, prefix: &str) -> PathBuf {
    Path::new(dir).join(format!(
        "{}_{}.json",
        prefix,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}

async fn handle_crawl(
    config: &Config,
    config_hash: Option<String>,
    url: &str,
    output: Option<PathBuf>,
    summary: Option<PathBuf>,
    store: bool,
) -> anyhow::Result<()> {
    let engine = CrawlEngine::new(config, url)?;
    cancel_on_ctrl_c(engine.cancel_flag());

    let report = engine.run().await;
    let stats = CrawlStatistics::from_report(&report);
    print_statistics(&stats);

    let output = output.unwrap_or_else(|| {
        default_report_path(
            Path::new(&config.output.results_dir),
            chrono::Local::now().naive_local(),
        )
    });
    save_report(&report, &output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("\nResults saved to {}", output.display());

    if let Some(summary) = summary {
        generate_markdown_summary(&report, &stats, &summary)
            .with_context(|| format!("failed to write {}", summary.display()))?;
        println!("Summary written to {}", summary.display());
    }

    if store {
        let stored = SqliteStorage::open(Path::new(&config.output.database_path))
            .map_err(anyhow::Error::from)
            .and_then(|mut storage| {
                let id = persist_report(&mut storage, &report, config_hash)?;
                storage.close()?;
                Ok(id)
            });

        match stored {
            Ok(id) => println!("Stored as session {}", id),
            Err(e) => {
                tracing::error!("Database storage failed: {:#}", e);
                println!("Database storage failed; results kept in {}", output.display());
            }
        }
    }

    Ok(())
}

async fn handle_batch(
    config: Config,
    config_hash: Option<String>,
    file: &Path,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let urls = load_urls(file)?;

    let storage = if config.batch.store_results {
        match SqliteStorage::open(Path::new(&config.output.database_path)) {
            Ok(storage) => Some(Arc::new(Mutex::new(storage))),
            Err(e) => {
                tracing::error!("Could not open database, continuing without storage: {}", e);
                None
            }
        }
    } else {
        None
    };

    let output =
        output.unwrap_or_else(|| timestamped_path(&config.output.results_dir, "alopecosa_batch_results"));

    let mut dispatcher = BatchDispatcher::new(config, storage);
    if let Some(hash) = config_hash {
        dispatcher = dispatcher.with_config_hash(hash);
    }
    cancel_on_ctrl_c(dispatcher.cancel_flag());

    let report = dispatcher.run(urls).await;
    print_batch_summary(&report);

    save_batch_report(&report, &output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("\nBatch report saved to {}", output.display());

    Ok(())
}

fn print_batch_summary(report: &BatchReport) {
    let s = &report.summary;
    println!("=== Batch Summary ===\n");
    println!("  URLs: {}", s.total_urls);
    println!("  Successful: {}", s.successful);
    println!("  Failed: {}", s.failed);
    if s.storage_failures > 0 {
        println!("  Storage failures: {}", s.storage_failures);
    }
    println!("  Pages crawled: {}", s.total_pages_crawled);
    println!("  Links found: {}", s.total_links_found);
    println!("  Average crawl time: {:.1}s", s.average_crawl_time);
    println!("  Success rate: {:.1}%", s.success_rate);

    for session in report.sessions.iter().filter(|s| !s.is_success()) {
        println!(
            "  ! {}: {}",
            session.url,
            session.error.as_deref().unwrap_or("unknown error")
        );
    }
}

fn handle_search(config: &Config, query: &SearchQuery) -> anyhow::Result<()> {
    let storage = SqliteStorage::open(Path::new(&config.output.database_path))?;
    let results = storage.search(query)?;

    println!(
        "=== {} matching pages (showing {}) ===\n",
        results.total,
        results.records.len()
    );
    for website in &results.records {
        println!("[{}] {}", website.id, website.url);
        println!(
            "    {} | status {} | depth {} | {} links",
            website.title, website.status_code, website.depth, website.links_count
        );
    }

    storage.close()?;
    Ok(())
}

fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let storage = SqliteStorage::open(Path::new(&config.output.database_path))?;
    print_store_statistics(&storage.statistics()?);

    let sessions = storage.sessions(5)?;
    if !sessions.is_empty() {
        println!("\nRecent sessions:");
        for session in sessions {
            println!(
                "  #{} {} ({}, {} pages, {})",
                session.id,
                session.base_url,
                session.status,
                session.pages_crawled,
                session.start_time
            );
        }
    }

    storage.close()?;
    Ok(())
}

fn handle_validate(config: &Config, config_hash: Option<&str>) {
    println!("=== Alopecosa Configuration ===\n");
    if let Some(hash) = config_hash {
        println!("Config hash: {}\n", hash);
    }

    println!("Crawler:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!(
        "  Delay range: {:.1}s - {:.1}s",
        config.crawler.delay_range.0, config.crawler.delay_range.1
    );
    println!("  Timeout: {}s", config.crawler.timeout_secs);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    println!("  Allow external: {}", config.crawler.allow_external);
    println!("  HTML only: {}", config.crawler.html_only);

    println!("\nLimits:");
    println!("  Max URL length: {}", config.limits.max_url_length);
    println!(
        "  Response size: {} soft / {} hard bytes",
        config.limits.soft_response_bytes, config.limits.hard_response_bytes
    );
    println!(
        "  Frontier capacity: {}",
        config.crawler.max_pages * config.limits.queue_factor
    );
    println!(
        "  Iteration cap: {}",
        config.crawler.max_pages * config.limits.iteration_factor
    );

    println!("\nAdaptive threshold:");
    println!(
        "  Initial {} within [{}, {}], step {}",
        config.adaptive.initial_threshold,
        config.adaptive.min_threshold,
        config.adaptive.max_threshold,
        config.adaptive.step
    );
    println!("  Adapt every {} pages", config.adaptive.adapt_every);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Results dir: {}", config.output.results_dir);

    println!("\nBatch:");
    println!("  Workers: {}", config.batch.max_workers);
    println!("  Dispatch delay: {}s", config.batch.dispatch_delay_secs);
    println!("  Store results: {}", config.batch.store_results);

    println!("\nClassifier: {:?}", config.classifier.kind);

    println!("\n✓ Configuration is valid");
}
