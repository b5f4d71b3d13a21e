use crate::common::{article_page, create_test_config, html, mount_page, mount_robots};
use news_crawler::crawler::Orchestrator;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_disallowed_path_is_never_requested() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    Mock::given(method("GET"))
        .and(path("/private/memo"))
        .respond_with(html(article_page("Secret")))
        .expect(0)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let result = orchestrator
        .crawl_url(&format!("{}/private/memo", server.uri()), &source)
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("robots.txt"));
    assert_eq!(orchestrator.stats().total_bytes_crawled, 0);
}

#[tokio::test]
async fn test_longer_allow_overrides_disallow() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /a\nAllow: /a/public").await;
    mount_page(&server, "/a/public/x", &article_page("Open")).await;
    Mock::given(method("GET"))
        .and(path("/a/private"))
        .respond_with(html(article_page("Closed")))
        .expect(0)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();

    let open = orchestrator
        .crawl_url(&format!("{}/a/public/x", server.uri()), &source)
        .await;
    assert!(open.success);

    let closed = orchestrator
        .crawl_url(&format!("{}/a/private", server.uri()), &source)
        .await;
    assert!(!closed.success);
}

#[tokio::test]
async fn test_group_for_our_agent_beats_wildcard() {
    let server = MockServer::start().await;
    mount_robots(
        &server,
        "User-agent: *\nAllow: /\n\nUser-agent: TestBot\nDisallow: /",
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(html(article_page("Story")))
        .expect(0)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let result = orchestrator
        .crawl_url(&format!("{}/story", server.uri()), &source)
        .await;

    assert!(!result.success);
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/anything/at/all", &article_page("Fine")).await;

    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let result = orchestrator
        .crawl_url(&format!("{}/anything/at/all", server.uri()), &source)
        .await;

    assert!(result.success, "{:?}", result.error);
}

#[tokio::test]
async fn test_robots_server_error_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_page(&server, "/story", &article_page("Story")).await;

    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let result = orchestrator
        .crawl_url(&format!("{}/story", server.uri()), &source)
        .await;

    assert!(result.success, "{:?}", result.error);
}

#[tokio::test]
async fn test_robots_fetched_once_per_origin() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("User-agent: *\nAllow: /", "text/plain"),
        )
        .expect(1)
        .mount(&server)
        .await;
    for page in ["/one", "/two", "/three"] {
        mount_page(&server, page, &article_page("Story")).await;
    }

    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    for page in ["/one", "/two", "/three"] {
        let result = orchestrator
            .crawl_url(&format!("{}{}", server.uri(), page), &source)
            .await;
        assert!(result.success);
    }

    assert_eq!(orchestrator.robots().len(), 1);
}

#[tokio::test]
async fn test_ignoring_robots_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("User-agent: *\nDisallow: /", "text/plain"),
        )
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/story", &article_page("Story")).await;

    let mut config = create_test_config(&server.uri());
    config.crawler.respect_robots_txt = false;
    config.crawler.respect_crawl_delay = false;

    let orchestrator = Orchestrator::new(config).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let result = orchestrator
        .crawl_url(&format!("{}/story", server.uri()), &source)
        .await;

    assert!(result.success);
}

#[tokio::test]
async fn test_crawl_delay_is_honored() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nCrawl-delay: 1").await;
    mount_page(&server, "/story", &article_page("Story")).await;
    mount_page(&server, "/other", &article_page("Other")).await;

    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();

    let first = orchestrator
        .crawl_url(&format!("{}/story", server.uri()), &source)
        .await;
    let start = Instant::now();
    let second = orchestrator
        .crawl_url(&format!("{}/other", server.uri()), &source)
        .await;

    assert!(first.success && second.success);
    assert!(start.elapsed() >= Duration::from_secs(1), "{:?}", start.elapsed());
}

#[tokio::test]
async fn test_crawl_delay_spaces_concurrent_batch() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nCrawl-delay: 1").await;
    let titles = ["a", "b", "c", "d"];
    for title in titles {
        mount_page(&server, &format!("/{}", title), &article_page(title)).await;
    }

    let mut config = create_test_config(&server.uri());
    config.crawler.max_concurrent = 4;
    let orchestrator = Orchestrator::new(config).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let urls: Vec<String> = titles
        .iter()
        .map(|title| format!("{}/{}", server.uri(), title))
        .collect();

    let start = Instant::now();
    let results = orchestrator.crawl_batch(&urls, &source).await;

    assert!(results.iter().all(|result| result.success));
    assert!(start.elapsed() >= Duration::from_secs(3), "{:?}", start.elapsed());
}

#[tokio::test]
async fn test_too_many_requests_pauses_origin() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "120"))
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let result = orchestrator
        .crawl_url(&format!("{}/busy", server.uri()), &source)
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("HTTP 429"));

    let state = orchestrator.rate_limiter().domain_state(&server.uri()).unwrap();
    assert!(state.rate_limited_until.is_some());
    assert_eq!(state.request_count, 1);
}

#[tokio::test]
async fn test_min_delay_spaces_requests() {
    let server = MockServer::start().await;
    mount_page(&server, "/story", &article_page("Story")).await;

    let mut config = create_test_config(&server.uri());
    config.rate_limit.min_delay_ms = 300;

    let orchestrator = Orchestrator::new(config).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let url = format!("{}/story", server.uri());

    let start = Instant::now();
    orchestrator.crawl_url(&url, &source).await;
    orchestrator.crawl_url(&url, &source).await;

    assert!(start.elapsed() >= Duration::from_millis(300));
}
