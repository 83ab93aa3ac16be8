//! Admission filter for candidate URLs
//!
//! Every link discovered on a page passes through [`is_allowed`] before it
//! can enter the frontier. The filter is a pure function of its inputs: the
//! same URL under the same options always gets the same verdict.

use crate::config::{CrawlerConfig, LimitsConfig};
use crate::url::domain::is_within_domain;
use url::Url;

/// Default ceiling on candidate URL length, in characters
pub const DEFAULT_MAX_URL_LENGTH: usize = 2048;

/// Options that shape the admission decision
#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Admit hosts outside the base domain
    pub allow_external: bool,

    /// Whether robots.txt content is consulted at all
    pub respect_robots: bool,

    /// Loaded robots.txt carried a sitewide `Disallow: /`
    pub blanket_disallow: bool,

    /// Lowercase extensions (with leading dot) that never hold page content
    pub excluded_extensions: Vec<String>,

    /// Maximum candidate length in characters
    pub max_url_length: usize,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            allow_external: false,
            respect_robots: true,
            blanket_disallow: false,
            excluded_extensions: crate::config::default_excluded_extensions(),
            max_url_length: DEFAULT_MAX_URL_LENGTH,
        }
    }
}

impl FilterOptions {
    /// Builds filter options from the crawler and limits configuration
    ///
    /// `blanket_disallow` starts out false; the engine sets it once robots.txt
    /// has been loaded.
    pub fn from_config(crawler: &CrawlerConfig, limits: &LimitsConfig) -> Self {
        Self {
            allow_external: crawler.allow_external,
            respect_robots: crawler.respect_robots,
            blanket_disallow: false,
            excluded_extensions: crawler
                .excluded_extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            max_url_length: limits.max_url_length,
        }
    }
}

/// Why a candidate was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooLong,
    Unparseable,
    UnsupportedScheme,
    MissingHost,
    CrossDomain,
    RobotsDisallowed,
    ExcludedExtension,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::TooLong => "exceeds maximum length",
            Self::Unparseable => "cannot be parsed",
            Self::UnsupportedScheme => "unsupported scheme",
            Self::MissingHost => "missing host",
            Self::CrossDomain => "outside base domain",
            Self::RobotsDisallowed => "disallowed by robots.txt",
            Self::ExcludedExtension => "excluded file extension",
        };
        f.write_str(text)
    }
}

/// Evaluates a candidate URL and reports the first rule it breaks
pub fn evaluate(
    candidate: &str,
    base_domain: &str,
    options: &FilterOptions,
) -> Result<(), Rejection> {
    if candidate.chars().count() > options.max_url_length {
        return Err(Rejection::TooLong);
    }

    let url = Url::parse(candidate).map_err(|_| Rejection::Unparseable)?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Rejection::UnsupportedScheme);
    }

    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h,
        _ => return Err(Rejection::MissingHost),
    };

    if !options.allow_external && !is_within_domain(host, base_domain) {
        return Err(Rejection::CrossDomain);
    }

    if options.respect_robots && options.blanket_disallow {
        return Err(Rejection::RobotsDisallowed);
    }

    let path = url.path().to_lowercase();
    if options
        .excluded_extensions
        .iter()
        .any(|ext| path.ends_with(ext.as_str()))
    {
        return Err(Rejection::ExcludedExtension);
    }

    Ok(())
}

/// Decides whether a candidate URL may enter the frontier
///
/// Malformed input is never an error: anything that cannot be judged is
/// simply rejected.
///
/// # Examples
///
/// ```
/// use alopecosa::url::{is_allowed, FilterOptions};
///
/// let options = FilterOptions::default();
/// assert!(is_allowed("https://blog.example.com/post", "example.com", &options));
/// assert!(!is_allowed("https://other.org/", "example.com", &options));
/// assert!(!is_allowed("https://example.com/logo.png", "example.com", &options));
/// assert!(!is_allowed("::not a url::", "example.com", &options));
/// ```
pub fn is_allowed(candidate: &str, base_domain: &str, options: &FilterOptions) -> bool {
    evaluate(candidate, base_domain, options).is_ok()
}
