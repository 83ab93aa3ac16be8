//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::PageRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageResult};
use crate::storage::{
    db_timestamp, SearchQuery, SearchResults, SessionMeta, SessionRecord, StoreStatistics,
    StoredWebsite, WebsiteDetails, PREVIEW_CHARS,
};
use crate::url::extract_domain;
use chrono::{Duration, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use sha2::{Digest, Sha256};
use std::path::Path;
use url::Url;

const WEBSITE_COLUMNS: &str = "id, url, title, content, status_code, crawl_time, crawl_timestamp, \
                               domain, depth, links_count, metadata";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database file at `path`
    ///
    /// Missing parent directories are created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;
        tracing::debug!("Opened crawl database at {}", path.display());

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Closes the connection, reporting any error SQLite raises on close
    pub fn close(self) -> StorageResult<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| extract_domain(&u))
        .unwrap_or_else(|| "unknown".to_string())
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let mut cut: String = content.chars().take(PREVIEW_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        content.to_string()
    }
}

/// Escapes LIKE wildcards so user text matches literally
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn website_from_row(row: &Row<'_>) -> rusqlite::Result<StoredWebsite> {
    let metadata: Option<String> = row.get(10)?;
    Ok(StoredWebsite {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row
            .get::<_, Option<String>>(2)?
            .unwrap_or_else(|| "No Title".to_string()),
        content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        status_code: row.get::<_, Option<u16>>(4)?.unwrap_or(0),
        crawl_time: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
        crawl_timestamp: row.get(6)?,
        domain: row.get(7)?,
        depth: row.get(8)?,
        links_count: row.get::<_, i64>(9)? as usize,
        metadata: metadata
            .and_then(|m| serde_json::from_str(&m).ok())
            .unwrap_or(serde_json::Value::Null),
    })
}

/// Inserts or updates one page and replaces its stored links
fn upsert_website(
    tx: &Transaction<'_>,
    session_id: i64,
    record: &PageRecord,
    now: &str,
) -> StorageResult<i64> {
    let hash = content_hash(&record.content);
    let metadata = serde_json::to_string(&serde_json::json!({
        "depth": record.metadata.depth,
        "link_count": record.metadata.link_count,
        "response_time": record.metadata.response_time,
        "classification": record.classification,
    }))?;
    let crawl_timestamp = db_timestamp(record.timestamp);

    let mut existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM websites WHERE url = ?1",
            params![record.url],
            |row| row.get(0),
        )
        .optional()?;

    // Identical non-empty content under another URL is the same page
    if existing.is_none() && !record.content.is_empty() {
        existing = tx
            .query_row(
                "SELECT id FROM websites WHERE content_hash = ?1 LIMIT 1",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;
    }

    let website_id = match existing {
        Some(id) => {
            tx.execute(
                "UPDATE websites SET title = ?1, content = ?2, content_hash = ?3, status_code = ?4,
                 crawl_time = ?5, crawl_timestamp = ?6, depth = ?7, links_count = ?8,
                 metadata = ?9, session_id = ?10
                 WHERE id = ?11",
                params![
                    record.title,
                    record.content,
                    hash,
                    record.status_code,
                    record.crawl_time,
                    crawl_timestamp,
                    record.metadata.depth,
                    record.links.len() as i64,
                    metadata,
                    session_id,
                    id
                ],
            )?;
            tx.execute(
                "DELETE FROM links WHERE source_website_id = ?1",
                params![id],
            )?;
            id
        }
        None => {
            tx.execute(
                "INSERT INTO websites
                 (url, title, content, content_hash, status_code, crawl_time, crawl_timestamp,
                  domain, depth, links_count, metadata, session_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    record.url,
                    record.title,
                    record.content,
                    hash,
                    record.status_code,
                    record.crawl_time,
                    crawl_timestamp,
                    domain_of(&record.url),
                    record.metadata.depth,
                    record.links.len() as i64,
                    metadata,
                    session_id,
                    now
                ],
            )?;
            tx.last_insert_rowid()
        }
    };

    let mut stmt = tx.prepare_cached(
        "INSERT INTO links (source_website_id, target_url, position) VALUES (?1, ?2, ?3)",
    )?;
    for (position, link) in record.links.iter().enumerate() {
        stmt.execute(params![website_id, link, position as i64])?;
    }

    Ok(website_id)
}

impl Storage for SqliteStorage {
    fn store_crawl_results(
        &mut self,
        meta: &SessionMeta,
        records: &[PageRecord],
    ) -> StorageResult<i64> {
        let now = db_timestamp(Utc::now());
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO crawl_sessions
             (base_url, max_depth, max_pages, pages_crawled, start_time, end_time, status,
              stop_reason, config_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                meta.seed_url,
                meta.max_depth,
                meta.max_pages as i64,
                records.len() as i64,
                db_timestamp(meta.started_at),
                meta.finished_at.map(db_timestamp),
                meta.status.to_db_string(),
                meta.stop_reason.map(|r| r.as_str()),
                meta.config_hash,
                now
            ],
        )?;
        let session_id = tx.last_insert_rowid();

        for record in records {
            upsert_website(&tx, session_id, record, &now)?;
        }

        tx.commit()?;
        tracing::info!(
            "Stored {} pages from {} as session {}",
            records.len(),
            meta.seed_url,
            session_id
        );

        Ok(session_id)
    }

    fn search(&self, query: &SearchQuery) -> StorageResult<SearchResults> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(text) = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            conditions.push(
                "(url LIKE ? ESCAPE '\\' OR title LIKE ? ESCAPE '\\' OR content LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(text);
            for _ in 0..3 {
                values.push(Value::Text(pattern.clone()));
            }
        }
        if let Some(domain) = query.domain.as_deref().filter(|d| !d.is_empty()) {
            conditions.push("domain = ?");
            values.push(Value::Text(domain.to_lowercase()));
        }
        if let Some(depth) = query.depth {
            conditions.push("depth = ?");
            values.push(Value::Integer(i64::from(depth)));
        }
        if let Some(status) = query.status_code {
            conditions.push("status_code = ?");
            values.push(Value::Integer(i64::from(status)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM websites{}", where_clause),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {} FROM websites{} ORDER BY crawl_timestamp DESC, id DESC LIMIT ? OFFSET ?",
            WEBSITE_COLUMNS, where_clause
        );
        values.push(Value::Integer(query.limit as i64));
        values.push(Value::Integer(query.offset as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), website_from_row)?
            .map(|row| {
                row.map(|mut website| {
                    website.content = preview(&website.content);
                    website
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchResults {
            records,
            total: total as u64,
        })
    }

    fn website_details(&self, website_id: i64) -> StorageResult<Option<WebsiteDetails>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {}, content_hash, created_at FROM websites WHERE id = ?1",
                    WEBSITE_COLUMNS
                ),
                params![website_id],
                |row| {
                    Ok((
                        website_from_row(row)?,
                        row.get::<_, Option<String>>(11)?.unwrap_or_default(),
                        row.get::<_, String>(12)?,
                    ))
                },
            )
            .optional()?;

        let Some((website, content_hash, created_at)) = row else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT target_url FROM links WHERE source_website_id = ?1 ORDER BY position",
        )?;
        let outgoing_links = stmt
            .query_map(params![website_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(Some(WebsiteDetails {
            website,
            content_hash,
            created_at,
            outgoing_links,
        }))
    }

    fn domains(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT domain FROM websites ORDER BY domain")?;
        let domains = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(domains)
    }

    fn sessions(&self, limit: usize) -> StorageResult<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, base_url, max_depth, max_pages, pages_crawled, start_time, end_time,
                    status, stop_reason, config_hash, created_at
             FROM crawl_sessions ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;

        let sessions = stmt
            .query_map(params![limit as i64], |row| {
                Ok(SessionRecord {
                    id: row.get(0)?,
                    base_url: row.get(1)?,
                    max_depth: row.get(2)?,
                    max_pages: row.get::<_, i64>(3)? as usize,
                    pages_crawled: row.get::<_, i64>(4)? as usize,
                    start_time: row.get(5)?,
                    end_time: row.get(6)?,
                    status: row.get(7)?,
                    stop_reason: row.get(8)?,
                    config_hash: row.get(9)?,
                    created_at: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    fn statistics(&self) -> StorageResult<StoreStatistics> {
        let count = |sql: &str| -> StorageResult<u64> {
            let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(count as u64)
        };

        let week_ago = db_timestamp(Utc::now() - Duration::days(7));
        let websites_last_7_days: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM websites WHERE crawl_timestamp > ?1",
            params![week_ago],
            |row| row.get(0),
        )?;

        let avg_content_length: Option<f64> = self.conn.query_row(
            "SELECT AVG(LENGTH(content)) FROM websites",
            [],
            |row| row.get(0),
        )?;

        Ok(StoreStatistics {
            total_websites: count("SELECT COUNT(*) FROM websites")?,
            total_links: count("SELECT COUNT(*) FROM links")?,
            total_sessions: count("SELECT COUNT(*) FROM crawl_sessions")?,
            unique_domains: count("SELECT COUNT(DISTINCT domain) FROM websites")?,
            avg_content_length: avg_content_length.unwrap_or(0.0),
            websites_last_7_days: websites_last_7_days as u64,
        })
    }

    fn delete_older_than(&mut self, days: u32) -> StorageResult<usize> {
        let cutoff = db_timestamp(Utc::now() - Duration::days(i64::from(days)));
        let deleted = self.conn.execute(
            "DELETE FROM websites WHERE crawl_timestamp < ?1",
            params![cutoff],
        )?;

        tracing::info!("Deleted {} websites older than {} days", deleted, days);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::PageMetadata;
    use crate::state::{SessionState, StopReason};
    use chrono::DateTime;

    fn meta(seed: &str) -> SessionMeta {
        SessionMeta {
            seed_url: seed.to_string(),
            max_depth: 2,
            max_pages: 10,
            status: SessionState::Completed,
            stop_reason: Some(StopReason::FrontierExhausted),
            started_at: Utc::now(),
            finished_at: Some(Utc::now()),
            config_hash: Some("abc123".to_string()),
        }
    }

    fn record(url: &str, title: &str, content: &str, depth: u32) -> PageRecord {
        record_at(url, title, content, depth, Utc::now())
    }

    fn record_at(
        url: &str,
        title: &str,
        content: &str,
        depth: u32,
        timestamp: DateTime<Utc>,
    ) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            links: vec![
                format!("{}/a", url.trim_end_matches('/')),
                format!("{}/b", url.trim_end_matches('/')),
            ],
            status_code: 200,
            crawl_time: 1.5,
            timestamp,
            metadata: PageMetadata {
                depth,
                link_count: 2,
                response_time: 0.3,
            },
            classification: None,
        }
    }

    #[test]
    fn test_open_in_memory() {
        let storage = SqliteStorage::open_in_memory();
        assert!(storage.is_ok());
        assert!(storage.unwrap().close().is_ok());
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("crawl.db");
        let storage = SqliteStorage::open(&path).unwrap();
        storage.close().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_store_and_search() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let records = vec![
            record("https://example.com/", "Home", "Welcome to the rust crawler", 0),
            record("https://example.com/about", "About", "About us page", 1),
        ];

        let session_id = storage
            .store_crawl_results(&meta("https://example.com/"), &records)
            .unwrap();
        assert!(session_id > 0);

        let all = storage.search(&SearchQuery::default()).unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.records.len(), 2);

        let hits = storage.search(&SearchQuery::text("rust")).unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.records[0].url, "https://example.com/");
        assert_eq!(hits.records[0].domain, "example.com");
        assert_eq!(hits.records[0].metadata["depth"], 0);
    }

    #[test]
    fn test_search_filters_and_pagination() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let records: Vec<_> = (0..5)
            .map(|i| {
                record(
                    &format!("https://example.com/p{}", i),
                    "Page",
                    &format!("content number {}", i),
                    i % 2,
                )
            })
            .collect();
        storage
            .store_crawl_results(&meta("https://example.com/"), &records)
            .unwrap();

        let depth_one = storage
            .search(&SearchQuery {
                depth: Some(1),
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(depth_one.total, 2);

        let page = storage
            .search(&SearchQuery {
                limit: 2,
                offset: 4,
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.records.len(), 1);

        let other_domain = storage
            .search(&SearchQuery {
                domain: Some("other.com".to_string()),
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(other_domain.total, 0);

        let not_found = storage
            .search(&SearchQuery {
                status_code: Some(404),
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(not_found.total, 0);
    }

    #[test]
    fn test_search_text_is_literal() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .store_crawl_results(
                &meta("https://example.com/"),
                &[record("https://example.com/", "Home", "plain words", 0)],
            )
            .unwrap();

        assert_eq!(storage.search(&SearchQuery::text("%")).unwrap().total, 0);
        assert_eq!(storage.search(&SearchQuery::text("_lain")).unwrap().total, 0);
        assert_eq!(storage.search(&SearchQuery::text("plain")).unwrap().total, 1);
    }

    #[test]
    fn test_search_previews_are_capped() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let long = "x".repeat(900);
        storage
            .store_crawl_results(
                &meta("https://example.com/"),
                &[record("https://example.com/", "Long", &long, 0)],
            )
            .unwrap();

        let results = storage.search(&SearchQuery::default()).unwrap();
        assert_eq!(results.records[0].content.chars().count(), PREVIEW_CHARS + 3);

        let details = storage
            .website_details(results.records[0].id)
            .unwrap()
            .unwrap();
        assert_eq!(details.website.content.len(), 900);
    }

    #[test]
    fn test_duplicate_url_updates_existing_row() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .store_crawl_results(
                &meta("https://example.com/"),
                &[record("https://example.com/", "Old", "old content", 0)],
            )
            .unwrap();
        storage
            .store_crawl_results(
                &meta("https://example.com/"),
                &[record("https://example.com/", "New", "new content", 0)],
            )
            .unwrap();

        let results = storage.search(&SearchQuery::default()).unwrap();
        assert_eq!(results.total, 1);
        assert_eq!(results.records[0].title, "New");

        let stats = storage.statistics().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_links, 2);
    }

    #[test]
    fn test_duplicate_content_updates_existing_row() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .store_crawl_results(
                &meta("https://example.com/"),
                &[
                    record("https://example.com/", "Home", "same body", 0),
                    record("https://example.com/index.html", "Home", "same body", 1),
                ],
            )
            .unwrap();
        assert_eq!(storage.search(&SearchQuery::default()).unwrap().total, 1);
    }

    #[test]
    fn test_empty_content_is_not_deduplicated() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .store_crawl_results(
                &meta("https://example.com/"),
                &[
                    record("https://example.com/a", "A", "", 1),
                    record("https://example.com/b", "B", "", 1),
                ],
            )
            .unwrap();
        assert_eq!(storage.search(&SearchQuery::default()).unwrap().total, 2);
    }

    #[test]
    fn test_website_details_lists_links_in_order() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .store_crawl_results(
                &meta("https://example.com/"),
                &[record("https://example.com/", "Home", "hello", 0)],
            )
            .unwrap();

        let id = storage.search(&SearchQuery::default()).unwrap().records[0].id;
        let details = storage.website_details(id).unwrap().unwrap();
        assert_eq!(
            details.outgoing_links,
            vec!["https://example.com/a", "https://example.com/b"]
        );
        assert_eq!(details.content_hash.len(), 64);

        assert!(storage.website_details(id + 100).unwrap().is_none());
    }

    #[test]
    fn test_domains_and_sessions() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .store_crawl_results(
                &meta("https://b.example.com/"),
                &[record("https://b.example.com/", "B", "bee", 0)],
            )
            .unwrap();
        storage
            .store_crawl_results(
                &meta("https://a.example.com/"),
                &[record("https://a.example.com/", "A", "ay", 0)],
            )
            .unwrap();

        assert_eq!(
            storage.domains().unwrap(),
            vec!["a.example.com", "b.example.com"]
        );

        let sessions = storage.sessions(10).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].base_url, "https://a.example.com/");
        assert_eq!(sessions[0].status, "completed");
        assert_eq!(sessions[0].stop_reason.as_deref(), Some("frontier_exhausted"));
        assert_eq!(sessions[0].pages_crawled, 1);
        assert_eq!(storage.sessions(1).unwrap().len(), 1);
    }

    #[test]
    fn test_statistics() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let empty = storage.statistics().unwrap();
        assert_eq!(empty.total_websites, 0);
        assert_eq!(empty.avg_content_length, 0.0);

        storage
            .store_crawl_results(
                &meta("https://example.com/"),
                &[
                    record("https://example.com/", "Home", "abcd", 0),
                    record("https://example.com/x", "X", "abcdefgh", 1),
                ],
            )
            .unwrap();

        let stats = storage.statistics().unwrap();
        assert_eq!(stats.total_websites, 2);
        assert_eq!(stats.total_links, 4);
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.unique_domains, 1);
        assert!((stats.avg_content_length - 6.0).abs() < 1e-9);
        assert_eq!(stats.websites_last_7_days, 2);
    }

    #[test]
    fn test_delete_older_than_cascades_links() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let old = Utc::now() - Duration::days(40);
        storage
            .store_crawl_results(
                &meta("https://example.com/"),
                &[
                    record_at("https://example.com/old", "Old", "old", 1, old),
                    record("https://example.com/new", "New", "new", 1),
                ],
            )
            .unwrap();

        assert_eq!(storage.delete_older_than(30).unwrap(), 1);

        let stats = storage.statistics().unwrap();
        assert_eq!(stats.total_websites, 1);
        assert_eq!(stats.total_links, 2);
    }
}
