use crate::common::{article_page, create_test_config, mount_page};
use news_crawler::crawler::Orchestrator;
use news_crawler::{CrawlerError, JobStatus};
use wiremock::MockServer;

async fn server_with_pages(pages: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    for page in pages {
        mount_page(&server, &format!("/{}", page), &article_page(page)).await;
    }
    server
}

#[tokio::test]
async fn test_queue_runs_by_priority() {
    let server = server_with_pages(&["low", "high", "mid"]).await;
    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();

    orchestrator.add_job(&format!("{}/low", server.uri()), "mock", 1).unwrap();
    orchestrator.add_job(&format!("{}/high", server.uri()), "mock", 10).unwrap();
    orchestrator.add_job(&format!("{}/mid", server.uri()), "mock", 5).unwrap();

    let results = orchestrator.process_queue().await;
    let titles: Vec<String> = results
        .iter()
        .map(|result| result.article.as_ref().unwrap().title.clone())
        .collect();
    assert_eq!(titles, vec!["high", "mid", "low"]);
    assert!(results.iter().all(|result| result.job_id.is_some()));

    let stats = orchestrator.stats();
    assert_eq!(stats.total_jobs, 3);
    assert_eq!(stats.completed_jobs, 3);
    assert_eq!(stats.queued_jobs, 0);
    assert_eq!(stats.active_jobs, 0);
}

#[tokio::test]
async fn test_cancelled_job_is_not_crawled() {
    let server = server_with_pages(&["keep", "drop"]).await;
    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();

    let keep = orchestrator.add_job(&format!("{}/keep", server.uri()), "mock", 0).unwrap();
    let drop = orchestrator.add_job(&format!("{}/drop", server.uri()), "mock", 0).unwrap();
    assert_eq!(orchestrator.stats().queued_jobs, 2);

    assert!(orchestrator.cancel_job(&drop));
    assert_eq!(orchestrator.stats().queued_jobs, 1);
    assert_eq!(orchestrator.job_status(&keep).unwrap().status, JobStatus::Pending);

    let results = orchestrator.process_queue().await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].job_id.as_ref(), Some(&keep));
}

#[tokio::test]
async fn test_failed_job_can_be_requeued_until_retries_run_out() {
    let server = MockServer::start().await;
    let mut config = create_test_config(&server.uri());
    config.crawler.max_retries = 1;
    let orchestrator = Orchestrator::new(config).unwrap();

    // Nothing is mounted at /flaky, so every attempt gets a 404
    let url = format!("{}/flaky", server.uri());
    let first = orchestrator.add_job(&url, "mock", 3).unwrap();

    let (job, result) = orchestrator.run_next().await.unwrap();
    assert_eq!(job.id, first);
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 1);
    assert!(!result.success);

    let retry = orchestrator.requeue(&job).unwrap();
    assert_ne!(retry, first);
    assert_eq!(orchestrator.job_status(&retry).unwrap().priority, 3);

    let (job, _) = orchestrator.run_next().await.unwrap();
    assert_eq!(job.attempts, 2);
    assert!(matches!(
        orchestrator.requeue(&job),
        Err(CrawlerError::RetriesExhausted { attempts: 2, .. })
    ));

    assert!(orchestrator.run_next().await.is_none());
    assert_eq!(orchestrator.stats().failed_jobs, 2);
}

#[tokio::test]
async fn test_process_queue_is_idempotent() {
    let server = server_with_pages(&["only"]).await;
    let orchestrator = Orchestrator::new(create_test_config(&server.uri())).unwrap();
    orchestrator.add_job(&format!("{}/only", server.uri()), "mock", 0).unwrap();

    assert_eq!(orchestrator.process_queue().await.len(), 1);
    assert!(orchestrator.process_queue().await.is_empty());
}
