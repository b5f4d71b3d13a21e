use crate::common::{article_page, create_test_config, html, mount_page, USER_AGENT};
use news_crawler::config::{load_config, Source};
use news_crawler::crawler::Orchestrator;
use std::io::Write;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = r#"<html><body>
    <article class="story">
      <h2>Rates held steady</h2>
      <a href="/news/rates">Read</a>
      <p>The central bank kept rates unchanged.</p>
      <img data-src="/img/rates.jpg">
    </article>
    <article class="story">
      <h2>Local team wins</h2>
      <a href="//sports.example.com/final">Read</a>
    </article>
    <article class="ad"><p>Sponsored</p></article>
</body></html>"#;

#[tokio::test]
async fn test_crawl_source_extracts_listing() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    mount_page(&server, "/", LISTING).await;

    let orchestrator = Orchestrator::new(create_test_config(&base_url)).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let articles = orchestrator.crawl_source(&source).await;

    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].title, "Rates held steady");
    assert_eq!(articles[0].url, format!("{}/news/rates", base_url));
    assert_eq!(articles[0].content, "The central bank kept rates unchanged.");
    assert_eq!(articles[0].images, vec![format!("{}/img/rates.jpg", base_url)]);
    assert_eq!(articles[0].source, "Mock News");
    assert_eq!(articles[1].url, "https://sports.example.com/final");
    assert_eq!(articles[1].content, "Local team wins");

    let stats = orchestrator.stats();
    assert_eq!(stats.total_jobs, 1);
    assert_eq!(stats.completed_jobs, 1);
    assert_eq!(stats.total_bytes_crawled, LISTING.len() as u64);
    assert!((stats.success_rate - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_crawl_source_with_custom_selectors() {
    let server = MockServer::start().await;
    mount_page(&server, "/", LISTING).await;

    let mut config = create_test_config(&server.uri());
    config.sources[0].selectors.article = Some("article.story".to_string());
    config.sources[0].selectors.title = Some("h2".to_string());

    let orchestrator = Orchestrator::new(config).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let titles: Vec<String> = orchestrator
        .crawl_source(&source)
        .await
        .into_iter()
        .map(|article| article.title)
        .collect();

    assert_eq!(titles, vec!["Rates held steady", "Local team wins"]);
}

#[tokio::test]
async fn test_crawl_url_sends_identifying_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(html(article_page("Budget")))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let result = orchestrator
        .crawl_url(&format!("{}/story", server.uri()), &source)
        .await;

    assert!(result.success, "{:?}", result.error);
    let article = result.article.unwrap();
    assert_eq!(article.title, "Budget");
    assert_eq!(article.content, "Lead paragraph.\n\nSecond paragraph.");
    assert_eq!(article.images, vec![format!("{}/img/Budget.jpg", server.uri())]);
    assert!(result.bytes > 0);
}

#[tokio::test]
async fn test_http_errors_become_failed_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.7", "application/pdf"))
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();

    let gone = orchestrator
        .crawl_url(&format!("{}/gone", server.uri()), &source)
        .await;
    assert!(!gone.success);
    assert!(gone.error.unwrap().contains("HTTP 404"));

    let pdf = orchestrator
        .crawl_url(&format!("{}/report.pdf", server.uri()), &source)
        .await;
    assert!(!pdf.success);
    assert!(pdf.error.unwrap().contains("application/pdf"));
}

#[tokio::test]
async fn test_page_without_title_succeeds_without_article() {
    let server = MockServer::start().await;
    mount_page(&server, "/blank", "<html><body><p>nothing here</p></body></html>").await;

    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let result = orchestrator
        .crawl_url(&format!("{}/blank", server.uri()), &source)
        .await;

    assert!(result.success);
    assert!(result.article.is_none());
}

#[tokio::test]
async fn test_crawl_batch_keeps_order() {
    let server = MockServer::start().await;
    for title in ["one", "two", "three"] {
        mount_page(&server, &format!("/{}", title), &article_page(title)).await;
    }

    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let urls: Vec<String> = ["one", "two", "three"]
        .iter()
        .map(|title| format!("{}/{}", server.uri(), title))
        .collect();

    let results = orchestrator.crawl_batch(&urls, &source).await;
    let titles: Vec<String> = results
        .iter()
        .map(|result| result.article.as_ref().unwrap().title.clone())
        .collect();
    assert_eq!(titles, vec!["one", "two", "three"]);
    assert_eq!(results[1].url, urls[1]);
}

async fn timed_slow_batch(max_concurrent: u32) -> Duration {
    let server = MockServer::start().await;
    let titles = ["one", "two", "three"];
    for title in titles {
        Mock::given(method("GET"))
            .and(path(format!("/{}", title)))
            .respond_with(html(article_page(title)).set_delay(Duration::from_millis(200)))
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(&server.uri());
    config.crawler.max_concurrent = max_concurrent;
    let orchestrator = Orchestrator::new(config).unwrap();
    let source = orchestrator.find_source("mock").unwrap().clone();
    let urls: Vec<String> = titles
        .iter()
        .map(|title| format!("{}/{}", server.uri(), title))
        .collect();

    let start = Instant::now();
    let results = orchestrator.crawl_batch(&urls, &source).await;
    assert!(results.iter().all(|result| result.success));
    start.elapsed()
}

#[tokio::test]
async fn test_crawl_batch_respects_max_concurrent() {
    let elapsed = timed_slow_batch(1).await;
    assert!(elapsed >= Duration::from_millis(600), "{:?}", elapsed);
}

#[tokio::test]
async fn test_crawl_batch_runs_fetches_in_parallel() {
    let elapsed = timed_slow_batch(3).await;
    assert!(elapsed < Duration::from_millis(550), "{:?}", elapsed);
}

#[tokio::test]
async fn test_crawl_all_skips_disabled_sources() {
    let server = MockServer::start().await;
    mount_page(&server, "/world", LISTING).await;
    Mock::given(method("GET"))
        .and(path("/archive"))
        .respond_with(html(LISTING))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    let mut archive = Source::new("archive", "Archive", &format!("{}/archive", server.uri()));
    archive.enabled = false;
    config.sources = vec![
        Source::new("world", "World", &format!("{}/world", server.uri())),
        archive,
    ];

    let orchestrator = Orchestrator::new(config).unwrap();
    let articles = orchestrator.crawl_all().await;

    assert_eq!(articles.len(), 2);
    assert!(articles.iter().all(|article| article.source == "World"));
    assert_eq!(orchestrator.stats().total_jobs, 1);
}

#[tokio::test]
async fn test_crawl_from_config_file() {
    let server = MockServer::start().await;
    mount_page(&server, "/", LISTING).await;

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[crawler]
source-pause-ms = 0

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[rate-limit]
requests-per-second = 20

[[source]]
id = "mock"
name = "Mock News"
base-url = "{}"

[source.selectors]
article = "article.story"
"#,
        server.uri()
    )
    .unwrap();
    file.flush().unwrap();

    let config = load_config(file.path()).unwrap();
    let (articles, stats) = news_crawler::crawler::crawl(config).await.unwrap();

    assert_eq!(articles.len(), 2);
    assert_eq!(stats.completed_jobs, 1);
}
