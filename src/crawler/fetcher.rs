//! HTTP fetcher implementation
//!
//! This module performs the single network GET behind each crawled page:
//! - Building the HTTP client with the crawler's user agent
//! - Sleeping a randomized politeness delay before every request
//! - Enforcing the per-request timeout and response size ceilings
//! - Classifying the result as fetched, skipped or failed
//!
//! Nothing here retries. A failure is reported once and the caller decides.

use crate::config::{Config, UserAgentConfig};
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::{Duration, Instant};
use url::Url;

/// Content types accepted when the html-only gate is on
const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// A page body that came back with HTTP 200 and within the size ceiling
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects; relative links resolve against it
    pub final_url: Url,

    pub status_code: u16,

    pub content_type: Option<String>,

    pub body: Vec<u8>,

    /// Request start to last body byte
    pub elapsed: Duration,
}

/// Non-fatal reasons to move on without parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Any status other than 200
    HttpStatus(u16),

    /// Declared or actual body size above the hard ceiling
    Oversized { bytes: u64, limit: u64 },

    /// Content-Type present and not HTML
    ContentMismatch(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(code) => write!(f, "HTTP status {}", code),
            Self::Oversized { bytes, limit } => {
                write!(f, "response of {} bytes exceeds {} byte limit", bytes, limit)
            }
            Self::ContentMismatch(ct) => write!(f, "expected HTML, got {}", ct),
        }
    }
}

/// Transport-level failures
///
/// Every variant is a retryable-class failure. The fetcher never retries;
/// retry policy is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Timeout,
    Connect(String),
    Transport(String),
}

impl FetchFailure {
    fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("request timed out"),
            Self::Connect(e) => write!(f, "connection failed: {}", e),
            Self::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

/// Result of one fetch
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Fetched(FetchedPage),
    Skip(SkipReason),
    Fail(FetchFailure),
}

/// Response size ceilings in bytes
#[derive(Debug, Clone, Copy)]
pub struct SizeLimits {
    /// Above this a warning is logged but the body is kept
    pub soft: u64,
    /// Above this the body is discarded
    pub hard: u64,
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use alopecosa::config::UserAgentConfig;
/// use alopecosa::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Draws a politeness delay uniformly from `[low, high]` seconds
///
/// A draw that does not fit in a `Duration` falls back to `low`, and to
/// zero when `low` does not fit either.
pub fn politeness_delay((low, high): (f64, f64)) -> Duration {
    let low = if low.is_finite() { low.max(0.0) } else { 0.0 };
    let secs = if high.is_finite() && high > low {
        rand::thread_rng().gen_range(low..=high)
    } else {
        low
    };
    Duration::try_from_secs_f64(secs)
        .or_else(|_| Duration::try_from_secs_f64(low))
        .unwrap_or(Duration::ZERO)
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    HTML_CONTENT_TYPES.contains(&mime.as_str())
}

/// Issues one GET for `url` under `timeout` and `limits`
///
/// # Outcome Classification
///
/// | Condition | Outcome |
/// |-----------|---------|
/// | HTTP 200 within size limits | `Fetched` |
/// | Any other status | `Skip(HttpStatus)` |
/// | Content-Length or body above hard limit | `Skip(Oversized)` |
/// | Non-HTML Content-Type (when `html_only`) | `Skip(ContentMismatch)` |
/// | Timeout | `Fail(Timeout)` |
/// | Connection refused / DNS failure | `Fail(Connect)` |
/// | Anything else from the transport | `Fail(Transport)` |
pub async fn fetch_url(
    client: &Client,
    url: &str,
    timeout: Duration,
    limits: SizeLimits,
    html_only: bool,
) -> FetchOutcome {
    let started = Instant::now();

    let mut response = match client.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => return FetchOutcome::Fail(FetchFailure::from_reqwest(&e)),
    };

    let status = response.status();
    if status != StatusCode::OK {
        return FetchOutcome::Skip(SkipReason::HttpStatus(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if html_only {
        if let Some(ct) = content_type.as_deref() {
            if !is_html(ct) {
                return FetchOutcome::Skip(SkipReason::ContentMismatch(ct.to_string()));
            }
        }
    }

    if let Some(declared) = response.content_length() {
        if declared > limits.hard {
            return FetchOutcome::Skip(SkipReason::Oversized {
                bytes: declared,
                limit: limits.hard,
            });
        }
    }

    let final_url = response.url().clone();
    let mut body: Vec<u8> = Vec::new();

    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let total = (body.len() + chunk.len()) as u64;
                if total > limits.hard {
                    return FetchOutcome::Skip(SkipReason::Oversized {
                        bytes: total,
                        limit: limits.hard,
                    });
                }
                body.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => return FetchOutcome::Fail(FetchFailure::from_reqwest(&e)),
        }
    }

    if body.len() as u64 > limits.soft {
        tracing::warn!(
            "Large response from {}: {} bytes (soft limit {})",
            url,
            body.len(),
            limits.soft
        );
    }

    FetchOutcome::Fetched(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body,
        elapsed: started.elapsed(),
    })
}

/// Politeness-aware fetcher used by the crawl engine
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    limits: SizeLimits,
    delay_range: (f64, f64),
    html_only: bool,
}

impl Fetcher {
    /// Builds a fetcher and its HTTP client from configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.crawler.timeout_secs);
        let client = build_http_client(&config.user_agent, timeout)?;

        Ok(Self {
            client,
            timeout,
            limits: SizeLimits {
                soft: config.limits.soft_response_bytes,
                hard: config.limits.hard_response_bytes,
            },
            delay_range: config.crawler.delay_range,
            html_only: config.crawler.html_only,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn delay_range(&self) -> (f64, f64) {
        self.delay_range
    }

    /// Raises both delay bounds to at least `floor` seconds
    pub fn raise_delay_floor(&mut self, floor: f64) {
        if !floor.is_finite() || floor <= 0.0 {
            return;
        }
        let (low, high) = self.delay_range;
        self.delay_range = (low.max(floor), high.max(floor));
    }

    /// Sleeps the politeness delay, then fetches `url`
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let delay = politeness_delay(self.delay_range);
        if !delay.is_zero() {
            tracing::trace!("Waiting {:?} before fetching {}", delay, url);
            tokio::time::sleep(delay).await;
        }

        fetch_url(&self.client, url, self.timeout, self.limits, self.html_only).await
    }
}
