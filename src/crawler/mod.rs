//! Crawler module for fetching and processing news pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with an identifying user agent
//! - Token-bucket and per-origin rate limiting
//! - The prioritized job queue
//! - Article extraction from HTML
//! - Overall crawl orchestration

mod coordinator;
mod extractor;
mod fetcher;
mod rate_limiter;
mod scheduler;
mod types;

pub use coordinator::{Orchestrator, ShutdownReport};
pub use extractor::{extract_articles, extract_page_article};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use rate_limiter::{DomainRateLimiter, RateLimiter, RateLimiterStatus};
pub use scheduler::JobQueue;
pub use types::{Article, CrawlJob, CrawlResult, JobId};

use crate::config::Config;
use crate::CrawlerError;

/// Crawls every enabled source once
///
/// This is the main entry point for a one-shot crawl. It will:
/// 1. Build the orchestrator and its HTTP client
/// 2. Crawl each enabled source in turn
/// 3. Shut the orchestrator down
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok((Vec<Article>, CrawlerStats))` - Articles found and final statistics
/// * `Err(CrawlerError)` - The crawler could not be started
pub async fn crawl(
    config: Config,
) -> Result<(Vec<Article>, crate::output::CrawlerStats), CrawlerError> {
    let orchestrator = Orchestrator::new(config)?;
    let articles = orchestrator.crawl_all().await;
    let stats = orchestrator.stats();
    orchestrator.shutdown().await;
    Ok((articles, stats))
}
