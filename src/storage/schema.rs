//! Database schema definitions
//!
//! This module contains the SQL schema for the crawl results database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per stored crawl run
CREATE TABLE IF NOT EXISTS crawl_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_url TEXT NOT NULL,
    max_depth INTEGER NOT NULL,
    max_pages INTEGER NOT NULL,
    pages_crawled INTEGER NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT,
    status TEXT NOT NULL,
    stop_reason TEXT,
    config_hash TEXT,
    created_at TEXT NOT NULL
);

-- Crawled pages, one row per URL
CREATE TABLE IF NOT EXISTS websites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT,
    content TEXT,
    content_hash TEXT,
    status_code INTEGER,
    crawl_time REAL,
    crawl_timestamp TEXT NOT NULL,
    domain TEXT NOT NULL,
    depth INTEGER NOT NULL,
    links_count INTEGER NOT NULL,
    metadata TEXT,
    session_id INTEGER REFERENCES crawl_sessions(id),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_websites_domain ON websites(domain);
CREATE INDEX IF NOT EXISTS idx_websites_depth ON websites(depth);
CREATE INDEX IF NOT EXISTS idx_websites_timestamp ON websites(crawl_timestamp);
CREATE INDEX IF NOT EXISTS idx_websites_hash ON websites(content_hash);

-- Outbound links of each stored page
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_website_id INTEGER NOT NULL REFERENCES websites(id) ON DELETE CASCADE,
    target_url TEXT NOT NULL,
    position INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_links_source ON links(source_website_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
