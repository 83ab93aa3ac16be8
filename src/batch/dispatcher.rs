use crate::config::Config;
use crate::crawler::{CancelFlag, CrawlEngine, CrawlReport};
use crate::output::{persist_report, OutputResult};
use crate::state::StopReason;
use crate::storage::SqliteStorage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

type IndexedOutcomes = Mutex<Vec<(usize, SessionOutcome)>>;

/// What happened to a session's results in the database
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageOutcome {
    Stored(i64),
    Failed(String),
    Disabled,
}

/// Result of one seed URL in a batch
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub url: String,

    /// `completed`, `aborted`, or `error` when the crawl never started
    pub status: String,

    pub stop_reason: Option<StopReason>,
    pub pages_crawled: usize,
    pub links_found: usize,

    /// Wall-clock seconds for the whole session
    pub crawl_time: f64,

    pub error: Option<String>,
    pub storage: StorageOutcome,
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    fn from_report(url: String, report: &CrawlReport, crawl_time: f64) -> Self {
        Self {
            url,
            status: report.status.to_string(),
            stop_reason: Some(report.stop_reason),
            pages_crawled: report.pages.len(),
            links_found: report.total_links(),
            crawl_time,
            error: None,
            storage: StorageOutcome::Disabled,
        }
    }

    fn from_error(url: String, error: String, crawl_time: f64) -> Self {
        Self {
            url,
            status: "error".to_string(),
            stop_reason: None,
            pages_crawled: 0,
            links_found: 0,
            crawl_time,
            error: Some(error),
            storage: StorageOutcome::Disabled,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total_urls: usize,
    pub successful: usize,
    pub failed: usize,
    pub storage_failures: usize,
    pub total_pages_crawled: usize,
    pub total_links_found: usize,
    pub total_crawl_time: f64,
    pub average_crawl_time: f64,

    /// Percentage of sessions that ran to a report
    pub success_rate: f64,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[SessionOutcome]) -> Self {
        let total_urls = outcomes.len();
        let successful = outcomes.iter().filter(|o| o.is_success()).count();
        let total_crawl_time: f64 = outcomes.iter().map(|o| o.crawl_time).sum();

        let (average_crawl_time, success_rate) = if total_urls == 0 {
            (0.0, 0.0)
        } else {
            (
                total_crawl_time / total_urls as f64,
                successful as f64 / total_urls as f64 * 100.0,
            )
        };

        Self {
            total_urls,
            successful,
            failed: total_urls - successful,
            storage_failures: outcomes
                .iter()
                .filter(|o| matches!(o.storage, StorageOutcome::Failed(_)))
                .count(),
            total_pages_crawled: outcomes.iter().map(|o| o.pages_crawled).sum(),
            total_links_found: outcomes.iter().map(|o| o.links_found).sum(),
            total_crawl_time,
            average_crawl_time,
            success_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: BatchSummary,

    /// One entry per input URL, in input order
    pub sessions: Vec<SessionOutcome>,
}

/// Runs one independent crawl session per seed URL on a bounded worker pool
pub struct BatchDispatcher {
    config: Arc<Config>,
    storage: Option<Arc<Mutex<SqliteStorage>>>,
    config_hash: Option<String>,
    cancel: CancelFlag,
}

impl BatchDispatcher {
    /// Creates a dispatcher; pass `None` to skip persistence
    pub fn new(config: Config, storage: Option<Arc<Mutex<SqliteStorage>>>) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            config_hash: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Records the configuration hash with every stored session
    pub fn with_config_hash(mut self, hash: String) -> Self {
        self.config_hash = Some(hash);
        self
    }

    /// Flag shared by every session; raising it stops dispatch and running crawls
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub async fn run(&self, urls: Vec<String>) -> BatchReport {
        let started_at = Utc::now();
        let workers = self.config.batch.max_workers.max(1);
        let dispatch_delay = Duration::from_secs_f64(self.config.batch.dispatch_delay_secs.max(0.0));

        tracing::info!(
            "Starting batch of {} URLs with {} workers",
            urls.len(),
            workers
        );

        let total = urls.len();
        let semaphore = Arc::new(Semaphore::new(workers));
        let results: Arc<IndexedOutcomes> = Arc::new(Mutex::new(Vec::with_capacity(total)));
        let mut handles = Vec::with_capacity(total);

        for (index, url) in urls.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!("Batch cancelled, {} URLs not dispatched", total - index);
                break;
            }

            if index > 0 && !dispatch_delay.is_zero() {
                tokio::time::sleep(dispatch_delay).await;
            }

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let config = Arc::clone(&self.config);
            let storage = self.storage.clone();
            let config_hash = self.config_hash.clone();
            let cancel = self.cancel.clone();
            let results = Arc::clone(&results);
            let seed = url.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let outcome = run_session(&config, url, storage, config_hash, cancel).await;
                results
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push((index, outcome));
            });
            handles.push((index, seed, Instant::now(), handle));
        }

        for (index, url, dispatched, handle) in handles {
            await_worker(handle, index, url, dispatched, &results).await;
        }

        let mut collected = std::mem::take(&mut *results.lock().unwrap_or_else(|e| e.into_inner()));
        collected.sort_by_key(|(index, _)| *index);
        let sessions: Vec<SessionOutcome> = collected.into_iter().map(|(_, o)| o).collect();
        let summary = BatchSummary::from_outcomes(&sessions);

        tracing::info!(
            "Batch finished: {}/{} sessions succeeded, {} pages crawled",
            summary.successful,
            summary.total_urls,
            summary.total_pages_crawled
        );

        BatchReport {
            started_at,
            finished_at: Utc::now(),
            summary,
            sessions,
        }
    }
}

/// Waits for one session task; a task that died without reporting gets an
/// error outcome in its slot
async fn await_worker(
    handle: JoinHandle<()>,
    index: usize,
    url: String,
    dispatched: Instant,
    results: &IndexedOutcomes,
) {
    if let Err(e) = handle.await {
        tracing::error!("Batch worker for {} panicked: {}", url, e);
        let outcome = SessionOutcome::from_error(
            url,
            format!("worker panicked: {}", e),
            dispatched.elapsed().as_secs_f64(),
        );
        results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((index, outcome));
    }
}

async fn run_session(
    config: &Config,
    url: String,
    storage: Option<Arc<Mutex<SqliteStorage>>>,
    config_hash: Option<String>,
    cancel: CancelFlag,
) -> SessionOutcome {
    let start = Instant::now();
    tracing::info!("Batch session starting for {}", url);

    let engine = match CrawlEngine::new(config, &url) {
        Ok(engine) => engine.with_cancel_flag(cancel),
        Err(e) => {
            tracing::error!("Batch session for {} failed: {}", url, e);
            return SessionOutcome::from_error(url, e.to_string(), start.elapsed().as_secs_f64());
        }
    };

    let report = engine.run().await;
    let mut outcome = SessionOutcome::from_report(url, &report, start.elapsed().as_secs_f64());

    if let Some(storage) = storage {
        let persisted = tokio::task::spawn_blocking(move || {
            let mut guard = storage.lock().unwrap_or_else(|e| e.into_inner());
            persist_report(&mut *guard, &report, config_hash).map_err(|e| e.to_string())
        })
        .await
        .unwrap_or_else(|e| Err(format!("storage task failed: {}", e)));

        outcome.storage = match persisted {
            Ok(id) => StorageOutcome::Stored(id),
            Err(e) => {
                tracing::warn!("Storing results for {} failed: {}", outcome.url, e);
                StorageOutcome::Failed(e)
            }
        };
    }

    outcome
}

/// Writes a batch report as pretty-printed JSON
pub fn save_batch_report(report: &BatchReport, path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, serde_json::to_string_pretty(report)?)?;
    tracing::info!("Batch report saved to {}", path.display());
    Ok(())
}
