use serde::Deserialize;

/// Main configuration structure for Alopecosa
///
/// Every section is optional in the TOML file; missing sections and keys
/// take the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub limits: LimitsConfig,
    pub adaptive: AdaptiveConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub batch: BatchConfig,
    pub classifier: ClassifierConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum link depth from the seed (seed is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of page records a run produces
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Politeness delay bounds in seconds, drawn uniformly before each fetch
    #[serde(rename = "delay-range")]
    pub delay_range: (f64, f64),

    /// Hard per-request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Load robots.txt and honour a sitewide disallow
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,

    /// Follow links to hosts outside the seed's domain
    #[serde(rename = "allow-external")]
    pub allow_external: bool,

    /// Skip responses whose Content-Type is not HTML
    #[serde(rename = "html-only")]
    pub html_only: bool,

    /// Characters of extracted text kept per page
    #[serde(rename = "max-content-length")]
    pub max_content_length: usize,

    /// File extensions that are never fetched
    #[serde(rename = "excluded-extensions")]
    pub excluded_extensions: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 100,
            delay_range: (1.0, 3.0),
            timeout_secs: 15,
            respect_robots: true,
            allow_external: false,
            html_only: true,
            max_content_length: 1000,
            excluded_extensions: default_excluded_extensions(),
        }
    }
}

/// Defensive bounds against pathological sites and markup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    #[serde(rename = "max-url-length")]
    pub max_url_length: usize,

    /// Bodies above this size are logged as oversized but still parsed
    #[serde(rename = "soft-response-bytes")]
    pub soft_response_bytes: u64,

    /// Bodies above this size are discarded unparsed
    #[serde(rename = "hard-response-bytes")]
    pub hard_response_bytes: u64,

    /// Element nesting depth beyond which the link walk stops descending
    #[serde(rename = "max-nesting-depth")]
    pub max_nesting_depth: usize,

    /// Sibling elements examined when scoring link density
    #[serde(rename = "density-scan-limit")]
    pub density_scan_limit: usize,

    /// Frontier ceiling is `max_pages * queue_factor`
    #[serde(rename = "queue-factor")]
    pub queue_factor: usize,

    /// Loop iterations are capped at `max_pages * iteration_factor`
    #[serde(rename = "iteration-factor")]
    pub iteration_factor: usize,

    /// Upper bound in seconds on a `Crawl-delay` taken from robots.txt
    #[serde(rename = "max-crawl-delay-secs")]
    pub max_crawl_delay_secs: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_url_length: 2048,
            soft_response_bytes: 5 * 1024 * 1024,
            hard_response_bytes: 10 * 1024 * 1024,
            max_nesting_depth: 256,
            density_scan_limit: 50,
            queue_factor: 10,
            iteration_factor: 2,
            max_crawl_delay_secs: 30.0,
        }
    }
}

/// Link-density threshold control loop
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    #[serde(rename = "initial-threshold")]
    pub initial_threshold: u32,

    #[serde(rename = "min-threshold")]
    pub min_threshold: u32,

    #[serde(rename = "max-threshold")]
    pub max_threshold: u32,

    pub step: u32,

    /// Pages between adaptation steps
    #[serde(rename = "adapt-every")]
    pub adapt_every: usize,

    /// Promoted URLs moved to the front of the frontier per page
    #[serde(rename = "promote-per-cycle")]
    pub promote_per_cycle: usize,

    /// Success rate below which the threshold is lowered
    #[serde(rename = "low-success-rate")]
    pub low_success_rate: f64,

    /// Success rate above which the threshold is raised
    #[serde(rename = "high-success-rate")]
    pub high_success_rate: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            initial_threshold: 5,
            min_threshold: 3,
            max_threshold: 10,
            step: 1,
            adapt_every: 10,
            promote_per_cycle: 3,
            low_success_rate: 0.5,
            high_success_rate: 0.8,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// Free-form text placed in parentheses after the version
    pub comment: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Alopecosa-Fabrilis-Crawler".to_string(),
            crawler_version: "1.0".to_string(),
            comment: "Spider-inspired Web Crawler".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (comment)`
    pub fn header_value(&self) -> String {
        if self.comment.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name, self.crawler_version, self.comment
            )
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory for JSON run output files
    #[serde(rename = "results-dir")]
    pub results_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "data/crawler_database.db".to_string(),
            results_dir: "data/crawl_results".to_string(),
        }
    }
}

/// Multi-seed batch dispatch configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Concurrent crawl sessions
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Pause between dispatching sessions, in seconds
    #[serde(rename = "dispatch-delay-secs")]
    pub dispatch_delay_secs: f64,

    /// Persist each session to the database
    #[serde(rename = "store-results")]
    pub store_results: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            dispatch_delay_secs: 2.0,
            store_results: true,
        }
    }
}

/// Which content classifier is attached to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    Noop,
    Heuristic,
    External,
}

/// Content classifier configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,

    /// Scoring service URL, required for the external classifier
    pub endpoint: Option<String>,

    /// Crawl objective forwarded to the scoring service
    pub objective: String,

    #[serde(rename = "target-topics")]
    pub target_topics: Vec<String>,

    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::Noop,
            endpoint: None,
            objective: "General web crawling".to_string(),
            target_topics: Vec::new(),
            timeout_secs: 30,
        }
    }
}

/// Extensions of images, media, archives, executables, office documents,
/// stylesheets and scripts
pub fn default_excluded_extensions() -> Vec<String> {
    [
        ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".ico", ".webp", ".mp4", ".avi",
        ".mov", ".wmv", ".flv", ".webm", ".mp3", ".wav", ".flac", ".aac", ".ogg", ".zip", ".rar",
        ".7z", ".tar", ".gz", ".exe", ".msi", ".dmg", ".deb", ".rpm", ".doc", ".docx", ".xls",
        ".xlsx", ".ppt", ".pptx", ".css", ".js",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}
