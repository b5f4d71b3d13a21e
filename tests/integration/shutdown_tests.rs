use crate::common::{article_page, create_test_config, html};
use news_crawler::crawler::Orchestrator;
use news_crawler::CrawlerError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

async fn slow_server(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html(article_page("Slow")).set_delay(delay))
        .mount(&server)
        .await;
    server
}

/// Waits until the queue has handed a job to the fetcher
async fn wait_until_active(orchestrator: &Orchestrator) {
    while orchestrator.stats().active_jobs == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_shutdown_abandons_long_running_job() {
    let server = slow_server(Duration::from_secs(10)).await;
    let orchestrator = Arc::new(Orchestrator::new(create_test_config(&server.uri())).unwrap());

    let running = orchestrator
        .add_job(&format!("{}/slow", server.uri()), "mock", 10)
        .unwrap();
    let pending = orchestrator
        .add_job(&format!("{}/slow", server.uri()), "mock", 0)
        .unwrap();

    let worker = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.process_queue().await })
    };
    wait_until_active(&orchestrator).await;

    let start = Instant::now();
    let report = orchestrator.shutdown().await;

    // Timeout is 500ms; shutdown must not wait for the 10s response
    assert!(start.elapsed() < Duration::from_secs(3));
    assert!(!report.is_clean());
    assert_eq!(report.abandoned, vec![running.clone()]);
    assert_eq!(report.cancelled, vec![pending]);

    let results = tokio::time::timeout(Duration::from_secs(3), worker)
        .await
        .expect("worker did not stop after abandon")
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert_eq!(results[0].job_id.as_ref(), Some(&running));
    assert_eq!(
        results[0].error.as_deref(),
        Some(
            CrawlerError::Abandoned {
                url: format!("{}/slow", server.uri())
            }
            .to_string()
            .as_str()
        )
    );
    assert_eq!(orchestrator.stats().active_jobs, 0);
}

#[tokio::test]
async fn test_shutdown_waits_for_quick_job() {
    let server = slow_server(Duration::from_millis(100)).await;
    let mut config = create_test_config(&server.uri());
    config.crawler.shutdown_timeout_ms = 5_000;
    let orchestrator = Arc::new(Orchestrator::new(config).unwrap());

    orchestrator
        .add_job(&format!("{}/slow", server.uri()), "mock", 0)
        .unwrap();

    let worker = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.process_queue().await })
    };
    wait_until_active(&orchestrator).await;

    let report = orchestrator.shutdown().await;
    assert!(report.is_clean());
    assert!(report.elapsed < Duration::from_secs(5));

    let results = worker.await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].success, "{:?}", results[0].error);
}

#[tokio::test]
async fn test_shutdown_when_idle_returns_immediately() {
    let server = MockServer::start().await;
    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();

    let report = orchestrator.shutdown().await;
    assert!(report.is_clean());
    assert!(report.cancelled.is_empty());
    assert!(report.elapsed < Duration::from_millis(100));
}
