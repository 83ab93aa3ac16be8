//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive full
//! crawl sessions end-to-end. Every test runs with a zero politeness delay.

use alopecosa::config::{ClassifierKind, Config};
use alopecosa::crawler::{crawl, CrawlEngine};
use alopecosa::output::save_report;
use alopecosa::session::SessionManager;
use alopecosa::state::{SessionState, StopReason};
use alopecosa::CrawlError;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no delay between requests
fn test_config(max_depth: u32, max_pages: usize) -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = max_depth;
    config.crawler.max_pages = max_pages;
    config.crawler.delay_range = (0.0, 0.0);
    config.crawler.timeout_secs = 5;
    config
}

fn html(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, route: &str, title: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(title, body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_seed_without_links_yields_one_record() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Lonely", "<p>Nothing to follow here.</p>").await;

    let report = crawl(&test_config(3, 10), &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 1);
    assert_eq!(report.status, SessionState::Completed);
    assert_eq!(report.stop_reason, StopReason::FrontierExhausted);

    let page = &report.pages[0];
    assert_eq!(page.title, "Lonely");
    assert_eq!(page.status_code, 200);
    assert_eq!(page.metadata.depth, 0);
    assert!(page.links.is_empty());
    assert!(page.content.contains("Nothing to follow here."));
}

#[tokio::test]
async fn test_seed_server_error_completes_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let report = crawl(&test_config(3, 10), &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert!(report.pages.is_empty());
    assert_eq!(report.status, SessionState::Completed);
    assert_eq!(report.counters.skipped, 1);
    assert_eq!(report.counters.fetch_attempts, 1);
}

#[tokio::test]
async fn test_page_limit_leaves_frontier_non_empty() {
    let server = MockServer::start().await;
    let links: String = (0..1000)
        .map(|i| format!("<a href=\"/page/{}\">Page {}</a>", i, i))
        .collect();
    mount_page(&server, "/", "Hub", &links).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/page/\d+$"))
        .respond_with(html("Leaf", "<p>leaf</p>"))
        .mount(&server)
        .await;

    let report = crawl(&test_config(1, 20), &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 20);
    assert_eq!(report.status, SessionState::Completed);
    assert_eq!(report.stop_reason, StopReason::PageLimit);
    assert!(report.frontier_remaining > 0);
    assert!(report.counters.frontier_dropped > 0);

    let unique: HashSet<&str> = report.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(unique.len(), report.pages.len());
    assert!(report.pages.iter().all(|p| p.metadata.depth <= 1));
}

#[tokio::test]
async fn test_depth_limit_is_respected() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Root", r#"<a href="/a">A</a>"#).await;
    mount_page(&server, "/a", "A", r#"<a href="/b">B</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("B", ""))
        .expect(0)
        .mount(&server)
        .await;

    let report = crawl(&test_config(1, 10), &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 2);
    assert_eq!(report.pages[1].metadata.depth, 1);
    assert_eq!(report.counters.depth_limited, 1);
    assert_eq!(report.status, SessionState::Completed);
}

#[tokio::test]
async fn test_sitewide_robots_disallow_stops_link_following() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .mount(&server)
        .await;
    mount_page(&server, "/", "Root", r#"<a href="/private">P</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(html("Private", ""))
        .expect(0)
        .mount(&server)
        .await;

    let report = crawl(&test_config(2, 10), &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 1);
    assert!(report.pages[0].links.is_empty());
    assert_eq!(report.counters.filtered_out, 1);
}

#[tokio::test]
async fn test_robots_ignored_when_not_respected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .mount(&server)
        .await;
    mount_page(&server, "/", "Root", r#"<a href="/open">O</a>"#).await;
    mount_page(&server, "/open", "Open", "").await;

    let mut config = test_config(2, 10);
    config.crawler.respect_robots = false;
    let report = crawl(&config, &format!("{}/", server.uri())).await.unwrap();

    assert_eq!(report.pages.len(), 2);
}

#[tokio::test]
async fn test_oversized_response_is_skipped() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Big", &"x".repeat(4096)).await;

    let mut config = test_config(1, 10);
    config.limits.soft_response_bytes = 512;
    config.limits.hard_response_bytes = 1024;
    let report = crawl(&config, &format!("{}/", server.uri())).await.unwrap();

    assert!(report.pages.is_empty());
    assert_eq!(report.counters.skipped, 1);
    assert_eq!(report.status, SessionState::Completed);
}

#[tokio::test]
async fn test_non_html_response_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"a":1}"#, "application/json"))
        .mount(&server)
        .await;

    let report = crawl(&test_config(1, 10), &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert!(report.pages.is_empty());
    assert_eq!(report.counters.skipped, 1);
}

#[tokio::test]
async fn test_cross_domain_links_are_filtered() {
    let server = MockServer::start().await;
    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();
    let body = format!(
        r#"<a href="/inside">In</a><a href="http://localhost:{}/outside">Out</a><a href="/file.pdf">PDF</a>"#,
        port
    );
    mount_page(&server, "/", "Root", &body).await;
    mount_page(&server, "/inside", "Inside", "").await;
    Mock::given(method("GET"))
        .and(path("/outside"))
        .respond_with(html("Outside", ""))
        .expect(0)
        .mount(&server)
        .await;

    let report = crawl(&test_config(1, 10), &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 2);
    assert_eq!(report.pages[0].links.len(), 1);
    assert!(report.pages[0].links[0].ends_with("/inside"));
    assert_eq!(report.counters.filtered_out, 2);
}

#[tokio::test]
async fn test_dense_links_are_promoted() {
    let server = MockServer::start().await;
    let dense: String = (0..8)
        .map(|i| format!("<a href=\"/d{}\">D{}</a>", i, i))
        .collect();
    let body = format!(
        r#"<p><a href="/plain">Plain</a></p><div class="nav">{}</div>"#,
        dense
    );
    mount_page(&server, "/", "Root", &body).await;
    mount_page(&server, "/plain", "Plain", "").await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/d\d$"))
        .respond_with(html("Dense", ""))
        .mount(&server)
        .await;

    let report = crawl(&test_config(1, 4), &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 4);
    assert_eq!(report.counters.promotions, 3);
    assert!(report.pages[1].url.ends_with("/d0"));
    assert!(report.pages[2].url.ends_with("/d1"));
    assert!(report.pages[3].url.ends_with("/d2"));
}

#[tokio::test]
async fn test_iteration_cap_aborts_with_partial_results() {
    let server = MockServer::start().await;
    let links: String = (0..30)
        .map(|i| format!("<p><a href=\"/broken/{}\">B</a></p>", i))
        .collect();
    mount_page(&server, "/", "Root", &links).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/broken/\d+$"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let report = crawl(&test_config(2, 5), &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.status, SessionState::Aborted);
    assert_eq!(report.stop_reason, StopReason::IterationCap);
    assert_eq!(report.pages.len(), 1);
    assert_eq!(report.counters.iterations, 10);
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_unrepresentable_crawl_delay_is_clamped() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nCrawl-delay: 1e300\n").await;
    mount_page(&server, "/", "Root", r#"<a href="/next">Next</a>"#).await;
    mount_page(&server, "/next", "Next", "").await;

    let mut config = test_config(1, 10);
    config.limits.max_crawl_delay_secs = 0.05;
    let report = tokio::time::timeout(
        Duration::from_secs(10),
        crawl(&config, &format!("{}/", server.uri())),
    )
    .await
    .expect("crawl stalled on the robots delay")
    .unwrap();

    assert_eq!(report.pages.len(), 2);
    assert_eq!(report.status, SessionState::Completed);
}

#[tokio::test]
async fn test_crawl_delay_above_ceiling_is_clamped() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nCrawl-delay: 86400\n").await;
    mount_page(&server, "/", "Root", r#"<a href="/next">Next</a>"#).await;
    mount_page(&server, "/next", "Next", "").await;

    let mut config = test_config(1, 10);
    config.limits.max_crawl_delay_secs = 0.1;
    let started = Instant::now();
    let report = tokio::time::timeout(
        Duration::from_secs(10),
        crawl(&config, &format!("{}/", server.uri())),
    )
    .await
    .expect("crawl stalled on the robots delay")
    .unwrap();

    assert_eq!(report.pages.len(), 2);
    // Two fetches, each preceded by the clamped delay
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_healthy_crawl_raises_threshold() {
    let server = MockServer::start().await;
    let links: String = (0..12)
        .map(|i| format!("<p><a href=\"/ok/{}\">Ok</a></p>", i))
        .collect();
    mount_page(&server, "/", "Root", &links).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/ok/\d+$"))
        .respond_with(html("Ok", "<p>fine</p>"))
        .mount(&server)
        .await;

    let config = test_config(1, 10);
    let report = crawl(&config, &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 10);
    assert_eq!(report.counters.fetch_attempts, 10);
    assert_eq!(report.stop_reason, StopReason::PageLimit);
    assert_eq!(report.counters.adaptations, 1);
    assert_eq!(
        report.final_threshold,
        config.adaptive.initial_threshold + config.adaptive.step
    );
}

#[tokio::test]
async fn test_struggling_crawl_lowers_threshold() {
    let server = MockServer::start().await;
    let broken: String = (0..20)
        .map(|i| format!("<p><a href=\"/broken/{}\">B</a></p>", i))
        .collect();
    let healthy: String = (0..9)
        .map(|i| format!("<p><a href=\"/ok/{}\">Ok</a></p>", i))
        .collect();
    mount_page(&server, "/", "Root", &format!("{}{}", broken, healthy)).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/broken/\d+$"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/ok/\d+$"))
        .respond_with(html("Ok", "<p>fine</p>"))
        .mount(&server)
        .await;

    let mut config = test_config(1, 10);
    config.limits.iteration_factor = 5;
    let report = crawl(&config, &format!("{}/", server.uri()))
        .await
        .unwrap();

    // Tenth page lands on the thirtieth attempt: rate 1/3
    assert_eq!(report.pages.len(), 10);
    assert_eq!(report.counters.fetch_attempts, 30);
    assert_eq!(report.counters.skipped, 20);
    assert_eq!(report.counters.adaptations, 1);
    assert_eq!(
        report.final_threshold,
        config.adaptive.initial_threshold - config.adaptive.step
    );
}

#[tokio::test]
async fn test_cancelled_engine_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Root", ""))
        .expect(0)
        .mount(&server)
        .await;

    let engine = CrawlEngine::new(&test_config(1, 10), &format!("{}/", server.uri())).unwrap();
    engine.cancel_flag().cancel();
    let report = engine.run().await;

    assert_eq!(report.status, SessionState::Aborted);
    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert!(report.pages.is_empty());
}

#[tokio::test]
async fn test_redirect_target_is_not_fetched_twice() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/home"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(html("Home", r#"<a href="/home">Self</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    let report = crawl(&test_config(2, 10), &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 1);
    assert_eq!(report.pages[0].title, "Home");
}

#[tokio::test]
async fn test_invalid_seed_fails_before_fetching() {
    let result = CrawlEngine::new(&test_config(1, 10), "javascript:alert(1)");
    assert!(matches!(result, Err(CrawlError::InvalidSeed { .. })));
}

#[tokio::test]
async fn test_heuristic_classifier_annotates_records() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Rust blog post", "<article>Rust article body</article>").await;

    let mut config = test_config(0, 5);
    config.classifier.kind = ClassifierKind::Heuristic;
    config.classifier.target_topics = vec!["rust".to_string()];
    let report = crawl(&config, &format!("{}/", server.uri())).await.unwrap();

    let analysis = report.pages[0].classification.as_ref().unwrap();
    assert_eq!(analysis.category, "blog");
    assert!((analysis.relevance_score - 0.6).abs() < 1e-9);
}

#[tokio::test]
async fn test_session_manager_runs_once() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Root", r#"<a href="/a">A</a>"#).await;
    mount_page(&server, "/a", "A", "").await;

    let manager = SessionManager::new(Config::default());
    let id = manager
        .create(&format!("{}/", server.uri()), 1, 10, (0.0, 0.0))
        .unwrap();

    let pages = manager.run(id).await.unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(manager.status(id).unwrap(), SessionState::Completed);

    let stats = manager.statistics(id).unwrap().unwrap();
    assert_eq!(stats.total_pages, 2);
    assert_eq!(stats.total_links_discovered, 1);

    assert!(matches!(
        manager.run(id).await,
        Err(CrawlError::SessionState { .. })
    ));
}

#[tokio::test]
async fn test_saved_report_document_shape() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Root", r#"<a href="/a">A</a>"#).await;
    mount_page(&server, "/a", "A", "").await;

    let seed = format!("{}/", server.uri());
    let report = crawl(&test_config(1, 10), &seed).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("run.json");
    save_report(&report, &path).unwrap();

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(doc["crawl_info"]["base_url"], seed.as_str());
    assert_eq!(doc["crawl_info"]["pages_crawled"], 2);
    assert_eq!(doc["crawl_info"]["status"], "completed");
    assert!(doc["terrain_map"][seed.as_str()].is_object());

    let first = &doc["results"][0];
    for key in [
        "url",
        "title",
        "content",
        "links",
        "status_code",
        "crawl_time",
        "timestamp",
        "metadata",
    ] {
        assert!(first.get(key).is_some(), "missing key {}", key);
    }
    assert_eq!(first["metadata"]["depth"], 0);
    assert!(first.get("classification").is_none());
}

#[tokio::test]
async fn test_external_classifier_response_is_attached() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Root", "<p>hello</p>").await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "relevance_score": 0.9,
            "category": "docs",
            "key_topics": ["greeting"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(0, 5);
    config.classifier.kind = ClassifierKind::External;
    config.classifier.endpoint = Some(format!("{}/analyze", server.uri()));
    let report = crawl(&config, &format!("{}/", server.uri())).await.unwrap();

    let analysis = report.pages[0].classification.as_ref().unwrap();
    assert_eq!(analysis.category, "docs");
    assert!((analysis.relevance_score - 0.9).abs() < 1e-9);
    assert!((analysis.quality_score - 0.5).abs() < 1e-9);
    assert_eq!(analysis.key_topics, vec!["greeting"]);
}

#[tokio::test]
async fn test_external_classifier_failure_falls_back() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Product page", "<p>buy this</p>").await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = test_config(0, 5);
    config.classifier.kind = ClassifierKind::External;
    config.classifier.endpoint = Some(format!("{}/analyze", server.uri()));
    let report = crawl(&config, &format!("{}/", server.uri())).await.unwrap();

    assert_eq!(report.pages.len(), 1);
    let analysis = report.pages[0].classification.as_ref().unwrap();
    assert_eq!(analysis.category, "product");
}
