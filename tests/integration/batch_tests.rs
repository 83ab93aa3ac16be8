//! Integration tests for batch crawling and persistence
//!
//! Batch runs dispatch several independent sessions against wiremock
//! servers and persist them into a temporary SQLite database.

use alopecosa::batch::{
    load_urls, save_batch_report, BatchDispatcher, BatchError, StorageOutcome,
};
use alopecosa::config::Config;
use alopecosa::crawler::crawl;
use alopecosa::output::persist_report;
use alopecosa::storage::{SearchQuery, SqliteStorage, Storage};
use std::io::Write;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = 1;
    config.crawler.max_pages = 5;
    config.crawler.delay_range = (0.0, 0.0);
    config.crawler.timeout_secs = 5;
    config.batch.max_workers = 2;
    config.batch.dispatch_delay_secs = 0.0;
    config
}

/// Starts a server with a root page linking to one child page
async fn site(name: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"<html><head><title>{name} home</title></head>
                <body><main>Welcome to {name}. <a href="/about">About</a></main></body></html>"#
            ),
            "text/html",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                "<html><head><title>About {name}</title></head><body><p>All about {name}.</p></body></html>"
            ),
            "text/html",
        ))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_batch_runs_sessions_and_stores_results() {
    let alpha = site("Alpha").await;
    let beta = site("Beta").await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("db").join("crawler.db");
    let storage = Arc::new(Mutex::new(SqliteStorage::open(&db_path).unwrap()));

    let dispatcher = BatchDispatcher::new(test_config(), Some(Arc::clone(&storage)))
        .with_config_hash("abc123".to_string());
    let report = dispatcher
        .run(vec![
            format!("{}/", alpha.uri()),
            "mailto:nobody@example.com".to_string(),
            format!("{}/", beta.uri()),
        ])
        .await;

    assert_eq!(report.sessions.len(), 3);
    assert!(report.sessions[0].url.starts_with(&alpha.uri()));
    assert!(report.sessions[2].url.starts_with(&beta.uri()));

    assert_eq!(report.summary.total_urls, 3);
    assert_eq!(report.summary.successful, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.storage_failures, 0);
    assert_eq!(report.summary.total_pages_crawled, 4);
    assert_eq!(report.summary.total_links_found, 2);

    assert_eq!(report.sessions[0].status, "completed");
    assert_eq!(report.sessions[0].pages_crawled, 2);
    assert!(matches!(report.sessions[0].storage, StorageOutcome::Stored(_)));
    assert_eq!(report.sessions[1].status, "error");
    assert_eq!(report.sessions[1].storage, StorageOutcome::Disabled);

    let storage = storage.lock().unwrap();
    let stats = storage.statistics().unwrap();
    assert_eq!(stats.total_websites, 4);
    assert_eq!(stats.total_sessions, 2);
    assert_eq!(stats.total_links, 2);
    assert_eq!(stats.unique_domains, 1);

    let hits = storage.search(&SearchQuery::text("Alpha")).unwrap();
    assert_eq!(hits.total, 2);
    assert!(hits.records.iter().all(|w| w.url.starts_with(&alpha.uri())));

    let sessions = storage.sessions(10).unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions
        .iter()
        .all(|s| s.config_hash.as_deref() == Some("abc123")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_stores_through_poisoned_handle() {
    let alpha = site("Alpha").await;
    let beta = site("Beta").await;
    let storage = Arc::new(Mutex::new(SqliteStorage::open_in_memory().unwrap()));

    let poisoner = Arc::clone(&storage);
    let _ = std::thread::spawn(move || {
        let _guard = poisoner.lock().unwrap();
        panic!("poison the storage lock");
    })
    .join();
    assert!(storage.is_poisoned());

    let report = BatchDispatcher::new(test_config(), Some(Arc::clone(&storage)))
        .run(vec![format!("{}/", alpha.uri()), format!("{}/", beta.uri())])
        .await;

    assert_eq!(report.summary.successful, 2);
    assert_eq!(report.summary.storage_failures, 0);
    assert!(report
        .sessions
        .iter()
        .all(|s| matches!(s.storage, StorageOutcome::Stored(_))));

    let storage = storage.lock().unwrap_or_else(|e| e.into_inner());
    assert_eq!(storage.statistics().unwrap().total_sessions, 2);
}

#[tokio::test]
async fn test_batch_without_storage() {
    let alpha = site("Alpha").await;

    let dispatcher = BatchDispatcher::new(test_config(), None);
    let report = dispatcher.run(vec![format!("{}/", alpha.uri())]).await;

    assert_eq!(report.summary.successful, 1);
    assert_eq!(report.sessions[0].storage, StorageOutcome::Disabled);
    assert!((report.summary.success_rate - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_batch_report_is_saved_as_json() {
    let alpha = site("Alpha").await;
    let report = BatchDispatcher::new(test_config(), None)
        .run(vec![format!("{}/", alpha.uri())])
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("batch.json");
    save_batch_report(&report, &path).unwrap();

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc["summary"]["total_urls"], 1);
    assert_eq!(doc["sessions"][0]["storage"], "disabled");
    assert_eq!(doc["sessions"][0]["stop_reason"], "frontier_exhausted");
}

#[tokio::test]
async fn test_cancelled_batch_dispatches_nothing() {
    let dispatcher = BatchDispatcher::new(test_config(), None);
    dispatcher.cancel_flag().cancel();

    let report = dispatcher
        .run(vec!["https://example.com/".to_string()])
        .await;

    assert!(report.sessions.is_empty());
    assert_eq!(report.summary.total_urls, 0);
}

#[test]
fn test_load_urls_detects_format() {
    let dir = tempfile::tempdir().unwrap();

    let json_path = dir.path().join("seeds.json");
    std::fs::write(
        &json_path,
        r#"{"urls": ["https://a.example/", "https://b.example/", "https://a.example/"]}"#,
    )
    .unwrap();
    assert_eq!(
        load_urls(&json_path).unwrap(),
        vec!["https://a.example/", "https://b.example/"]
    );

    let csv_path = dir.path().join("seeds.csv");
    std::fs::write(&csv_path, "url\nhttps://c.example/\n").unwrap();
    assert_eq!(load_urls(&csv_path).unwrap(), vec!["https://c.example/"]);

    let mut text = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    writeln!(text, "# seeds").unwrap();
    writeln!(text, "https://d.example/").unwrap();
    writeln!(text, "ftp://e.example/").unwrap();
    assert_eq!(load_urls(text.path()).unwrap(), vec!["https://d.example/"]);

    assert!(matches!(
        load_urls(&dir.path().join("missing.txt")),
        Err(BatchError::Io(_))
    ));
}

#[tokio::test]
async fn test_recrawl_updates_stored_pages() {
    let alpha = site("Alpha").await;
    let seed = format!("{}/", alpha.uri());
    let mut storage = SqliteStorage::open_in_memory().unwrap();

    for _ in 0..2 {
        let report = crawl(&test_config(), &seed).await.unwrap();
        persist_report(&mut storage, &report, None).unwrap();
    }

    let stats = storage.statistics().unwrap();
    assert_eq!(stats.total_websites, 2);
    assert_eq!(stats.total_sessions, 2);

    let hits = storage.search(&SearchQuery::text("About Alpha")).unwrap();
    assert_eq!(hits.total, 1);
    let details = storage.website_details(hits.records[0].id).unwrap().unwrap();
    assert!(details.outgoing_links.is_empty());

    let home = storage.search(&SearchQuery::text("Alpha home")).unwrap();
    let details = storage.website_details(home.records[0].id).unwrap().unwrap();
    assert_eq!(details.outgoing_links, vec![format!("{}/about", alpha.uri())]);

    storage.close().unwrap();
}
