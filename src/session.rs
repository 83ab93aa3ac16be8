//! Crawl session lifecycle management
//!
//! A [`SessionManager`] owns any number of independent crawl sessions, each
//! identified by a numeric id. Sessions are created `Ready`, run once, and
//! keep their report afterwards for status and statistics queries.

use crate::config::{validate_delay_range, Config};
use crate::crawler::{CancelFlag, CrawlEngine, CrawlReport, PageRecord};
use crate::output::CrawlStatistics;
use crate::state::SessionState;
use crate::url::normalize_url;
use crate::{ConfigError, CrawlError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

pub type SessionId = u64;

struct SessionEntry {
    seed_url: String,
    config: Config,
    state: SessionState,
    cancel: CancelFlag,
    created_at: DateTime<Utc>,
    report: Option<CrawlReport>,
}

/// Listing entry for one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub seed_url: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub pages_crawled: usize,
}

pub struct SessionManager {
    base: Config,
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
    next_id: AtomicU64,
}

impl SessionManager {
    /// Creates a manager whose sessions start from `base`
    pub fn new(base: Config) -> Self {
        Self {
            base,
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a `Ready` session
    ///
    /// # Errors
    ///
    /// * `CrawlError::InvalidSeed` - the seed is not an absolute http(s) URL
    /// * `CrawlError::Config` - `max_pages` is 0 or the delay range is invalid
    pub fn create(
        &self,
        seed_url: &str,
        max_depth: u32,
        max_pages: usize,
        delay_range: (f64, f64),
    ) -> Result<SessionId, CrawlError> {
        let seed = normalize_url(seed_url).map_err(|source| CrawlError::InvalidSeed {
            url: seed_url.to_string(),
            source,
        })?;

        if max_pages == 0 {
            return Err(ConfigError::Validation("max_pages must be >= 1".to_string()).into());
        }
        validate_delay_range(delay_range)?;

        let mut config = self.base.clone();
        config.crawler.max_depth = max_depth;
        config.crawler.max_pages = max_pages;
        config.crawler.delay_range = delay_range;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sessions().insert(
            id,
            SessionEntry {
                seed_url: seed.to_string(),
                config,
                state: SessionState::Ready,
                cancel: CancelFlag::new(),
                created_at: Utc::now(),
                report: None,
            },
        );

        tracing::info!("Created crawl session {} for {}", id, seed);
        Ok(id)
    }

    /// Runs a `Ready` session to completion and returns its page records
    pub async fn run(&self, id: SessionId) -> Result<Vec<PageRecord>, CrawlError> {
        let (seed_url, config, cancel) = {
            let mut sessions = self.sessions();
            let entry = sessions.get_mut(&id).ok_or(CrawlError::SessionNotFound(id))?;
            if !entry.state.can_transition_to(SessionState::Running) {
                return Err(CrawlError::SessionState {
                    id,
                    state: entry.state,
                });
            }
            entry.state = SessionState::Running;
            (entry.seed_url.clone(), entry.config.clone(), entry.cancel.clone())
        };

        let engine = match CrawlEngine::new(&config, &seed_url) {
            Ok(engine) => engine.with_cancel_flag(cancel),
            Err(e) => {
                if let Some(entry) = self.sessions().get_mut(&id) {
                    entry.state = SessionState::Aborted;
                }
                tracing::error!("Session {} could not start: {}", id, e);
                return Err(e);
            }
        };

        let report = engine.run().await;
        let pages = report.pages.clone();

        match self.sessions().get_mut(&id) {
            Some(entry) => {
                entry.state = report.status;
                entry.report = Some(report);
            }
            None => tracing::debug!("Session {} was deleted while running", id),
        }

        Ok(pages)
    }

    pub fn status(&self, id: SessionId) -> Result<SessionState, CrawlError> {
        self.sessions()
            .get(&id)
            .map(|entry| entry.state)
            .ok_or(CrawlError::SessionNotFound(id))
    }

    /// Statistics of a finished session; None until it has run
    pub fn statistics(&self, id: SessionId) -> Result<Option<CrawlStatistics>, CrawlError> {
        self.sessions()
            .get(&id)
            .map(|entry| entry.report.as_ref().map(CrawlStatistics::from_report))
            .ok_or(CrawlError::SessionNotFound(id))
    }

    pub fn report(&self, id: SessionId) -> Result<Option<CrawlReport>, CrawlError> {
        self.sessions()
            .get(&id)
            .map(|entry| entry.report.clone())
            .ok_or(CrawlError::SessionNotFound(id))
    }

    /// Raises the session's cancellation flag
    ///
    /// A running crawl stops at the top of its next iteration, keeping the
    /// pages gathered so far.
    pub fn cancel(&self, id: SessionId) -> Result<(), CrawlError> {
        let sessions = self.sessions();
        let entry = sessions.get(&id).ok_or(CrawlError::SessionNotFound(id))?;
        entry.cancel.cancel();
        tracing::info!("Cancellation requested for session {}", id);
        Ok(())
    }

    /// Removes a session, cancelling it first if it is running
    pub fn delete(&self, id: SessionId) -> Result<(), CrawlError> {
        let entry = self
            .sessions()
            .remove(&id)
            .ok_or(CrawlError::SessionNotFound(id))?;
        entry.cancel.cancel();
        Ok(())
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions()
            .iter()
            .map(|(id, entry)| SessionSummary {
                id: *id,
                seed_url: entry.seed_url.clone(),
                state: entry.state,
                created_at: entry.created_at,
                pages_crawled: entry.report.as_ref().map_or(0, |r| r.pages.len()),
            })
            .collect();
        summaries.sort_by_key(|s| s.id);
        summaries
    }
}
