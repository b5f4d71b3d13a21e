//! Crawl orchestration
//!
//! This module ties the crawler together. Every fetch goes through the same
//! sequence:
//! - robots.txt check (disallowed URLs are never requested)
//! - per-origin rate limiting, spaced by the robots.txt crawl-delay
//! - a bounded number of concurrent HTTP requests
//! - article extraction and statistics

use crate::config::{Config, CrawlerConfig, Source};
use crate::crawler::extractor::{extract_articles, extract_page_article};
use crate::crawler::rate_limiter::DomainRateLimiter;
use crate::crawler::scheduler::JobQueue;
use crate::crawler::{
    build_http_client, fetch_url, Article, CrawlJob, CrawlResult, FetchResult, JobId,
};
use crate::output::{CrawlerStats, StatsRecorder};
use crate::robots::RobotsPolicyCache;
use crate::state::JobStatus;
use crate::url::{extract_origin, parse_http_url};
use crate::CrawlerError;
use futures::future::join_all;
use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::time::Instant;

/// Cooldown applied after HTTP 429 when the response has no usable `Retry-After`
const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// A page that was fetched successfully
#[derive(Debug)]
struct FetchedPage {
    final_url: String,
    body: String,
    bytes: u64,
    response_time: Duration,
}

/// What [`Orchestrator::shutdown`] did
#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    /// Pending jobs dropped from the queue
    pub cancelled: Vec<JobId>,

    /// Jobs still running when the timeout elapsed
    pub abandoned: Vec<JobId>,

    pub elapsed: Duration,
}

impl ShutdownReport {
    /// Returns true if every active job finished before the timeout
    pub fn is_clean(&self) -> bool {
        self.abandoned.is_empty()
    }
}

/// Main crawler structure
///
/// The orchestrator is `Send + Sync`; wrap it in an `Arc` to run
/// [`Orchestrator::process_queue`] and [`Orchestrator::shutdown`] from
/// different tasks.
pub struct Orchestrator {
    crawler: CrawlerConfig,
    user_agent: String,
    sources: Vec<Source>,
    client: Client,
    robots: Arc<RobotsPolicyCache>,
    limiter: Arc<DomainRateLimiter>,
    fetch_permits: Semaphore,
    queue: Mutex<JobQueue>,
    stats: Mutex<StatsRecorder>,
    /// Flipped once when shutdown gives up waiting
    abandon: watch::Sender<bool>,
    /// Number of jobs currently processing
    active: watch::Sender<usize>,
}

impl Orchestrator {
    /// Creates an orchestrator with its own HTTP client, robots cache, and rate limiter
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to crawl
    /// * `Err(CrawlerError)` - The HTTP client could not be built
    pub fn new(config: Config) -> Result<Self, CrawlerError> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_millis(config.crawler.request_timeout_ms),
        )?;
        let robots = RobotsPolicyCache::new(
            client.clone(),
            Duration::from_millis(config.crawler.robots_timeout_ms),
        );
        let limiter = DomainRateLimiter::new(config.rate_limit.clone());

        Ok(Self::with_parts(
            config,
            client,
            Arc::new(robots),
            Arc::new(limiter),
        ))
    }

    /// Creates an orchestrator from collaborators built elsewhere
    ///
    /// Sharing a robots cache or rate limiter between orchestrators keeps
    /// them polite towards the same origins.
    pub fn with_parts(
        config: Config,
        client: Client,
        robots: Arc<RobotsPolicyCache>,
        limiter: Arc<DomainRateLimiter>,
    ) -> Self {
        let (abandon, _) = watch::channel(false);
        let (active, _) = watch::channel(0);

        Self {
            user_agent: config.user_agent.header_value(),
            fetch_permits: Semaphore::new(config.crawler.max_concurrent as usize),
            crawler: config.crawler,
            sources: config.sources,
            client,
            robots,
            limiter,
            queue: Mutex::new(JobQueue::new()),
            stats: Mutex::new(StatsRecorder::new()),
            abandon,
            active,
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Looks up a configured source by id
    pub fn find_source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|source| source.id == id)
    }

    pub fn robots(&self) -> &RobotsPolicyCache {
        &self.robots
    }

    pub fn rate_limiter(&self) -> &DomainRateLimiter {
        &self.limiter
    }

    /// Crawls a single article page
    ///
    /// Never fails: policy, network, and extraction problems are reported in
    /// the returned result. A page without a title succeeds with no article.
    pub async fn crawl_url(&self, url: &str, source: &Source) -> CrawlResult {
        let started = Instant::now();

        match self.fetch_page(url).await {
            Ok(page) => {
                let article = extract_page_article(&page.body, &page.final_url, source);
                if article.is_none() {
                    tracing::debug!("No article found on {}", url);
                }
                CrawlResult::success(&source.name, url, article, page.response_time, page.bytes)
            }
            Err(e) => {
                tracing::warn!("Failed to crawl {}: {}", url, e);
                CrawlResult::failure(&source.name, url, &e, started.elapsed())
            }
        }
    }

    /// Crawls a source's listing page and extracts its articles
    ///
    /// Counts as one job in the statistics. Failures are logged and yield an
    /// empty list.
    pub async fn crawl_source(&self, source: &Source) -> Vec<Article> {
        tracing::info!("Crawling {} ({})", source.name, source.base_url);
        self.lock_stats().record_job_submitted();

        let outcome = match self.fetch_page(&source.base_url).await {
            Ok(page) => extract_articles(&page.body, source, &page.final_url),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(articles) => {
                self.lock_stats().record_job_finished(true);
                tracing::info!("Found {} articles from {}", articles.len(), source.name);
                articles
            }
            Err(e) => {
                self.lock_stats().record_job_finished(false);
                tracing::error!("Failed to crawl {}: {}", source.name, e);
                Vec::new()
            }
        }
    }

    /// Crawls every enabled source in order, pausing between sources
    pub async fn crawl_all(&self) -> Vec<Article> {
        let enabled: Vec<&Source> = self.sources.iter().filter(|s| s.enabled).collect();
        let pause = Duration::from_millis(self.crawler.source_pause_ms);
        tracing::info!("Starting crawl of {} enabled sources", enabled.len());

        let mut articles = Vec::new();
        for (index, source) in enabled.iter().enumerate() {
            if self.is_shutting_down() {
                tracing::info!("Shutdown requested, stopping after {} sources", index);
                break;
            }
            if index > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            articles.extend(self.crawl_source(source).await);
        }

        tracing::info!("Crawl finished with {} articles", articles.len());
        articles
    }

    /// Crawls several article pages of one source concurrently
    ///
    /// At most `max-concurrent` requests are in flight; results keep the order
    /// of `urls`.
    pub async fn crawl_batch(&self, urls: &[String], source: &Source) -> Vec<CrawlResult> {
        tracing::debug!("Crawling batch of {} URLs for {}", urls.len(), source.name);
        join_all(urls.iter().map(|url| self.crawl_url(url, source))).await
    }

    /// Enqueues a URL for [`Orchestrator::process_queue`]
    ///
    /// # Returns
    ///
    /// * `Ok(JobId)` - Id of the new job
    /// * `Err(CrawlerError::ShuttingDown)` - Shutdown has begun
    pub fn add_job(
        &self,
        url: &str,
        source_id: &str,
        priority: i32,
    ) -> Result<JobId, CrawlerError> {
        let id = self.lock_queue().add_job(url, source_id, priority)?;
        self.lock_stats().record_job_submitted();
        Ok(id)
    }

    /// Enqueues another attempt for a failed job
    ///
    /// Refused once the job has been retried `max-retries` times.
    pub fn requeue(&self, job: &CrawlJob) -> Result<JobId, CrawlerError> {
        if job.status != JobStatus::Failed {
            return Err(CrawlerError::InvalidTransition {
                from: job.status,
                to: JobStatus::Pending,
            });
        }
        if job.attempts > self.crawler.max_retries {
            return Err(CrawlerError::RetriesExhausted {
                url: job.url.clone(),
                attempts: job.attempts,
            });
        }

        let id = self.lock_queue().requeue(job)?;
        self.lock_stats().record_job_submitted();
        Ok(id)
    }

    /// Removes a pending job
    ///
    /// Returns false for jobs that are unknown, running, or finished.
    pub fn cancel_job(&self, id: &JobId) -> bool {
        let cancelled = self.lock_queue().cancel(id);
        if cancelled {
            tracing::info!("Cancelled job {}", id);
        }
        cancelled
    }

    /// Current state of a pending or running job
    pub fn job_status(&self, id: &JobId) -> Option<CrawlJob> {
        self.lock_queue().get(id).cloned()
    }

    /// Runs queued jobs one at a time until the queue is empty
    ///
    /// Returns immediately when there is nothing to do, and stops taking new
    /// jobs as soon as shutdown begins.
    pub async fn process_queue(&self) -> Vec<CrawlResult> {
        let mut results = Vec::new();
        while let Some((_, result)) = self.run_next().await {
            results.push(result);
        }
        results
    }

    /// Runs the highest-priority queued job
    ///
    /// Returns the finished job record with its result, which is what
    /// [`Orchestrator::requeue`] needs to retry a failure. Returns None when
    /// the queue is empty or shutdown has begun.
    pub async fn run_next(&self) -> Option<(CrawlJob, CrawlResult)> {
        let job = {
            let mut queue = self.lock_queue();
            let job = queue.start_next();
            self.active.send_replace(queue.active_len());
            job
        }?;

        tracing::info!("Processing {} ({})", job.id, job.url);
        let result = match self.find_source(&job.source_id) {
            Some(source) => self.crawl_url(&job.url, source).await,
            None => CrawlResult::failure(
                &job.source_id,
                &job.url,
                &CrawlerError::UnknownSource(job.source_id.clone()),
                Duration::ZERO,
            ),
        }
        .with_job(job.id.clone());

        if result.success {
            tracing::info!("Completed {}", job.id);
        } else {
            tracing::error!(
                "Job {} failed: {}",
                job.id,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }

        self.lock_stats().record_job_finished(result.success);
        let finished = {
            let mut queue = self.lock_queue();
            let finished = queue.finish(&job.id, result.error.clone());
            self.active.send_replace(queue.active_len());
            finished
        };

        Some((finished.unwrap_or(job), result))
    }

    /// Snapshot of job counters and traffic
    pub fn stats(&self) -> CrawlerStats {
        let (queued, active) = {
            let queue = self.lock_queue();
            (queue.pending_len(), queue.active_len())
        };
        self.lock_stats().snapshot(queued, active)
    }

    /// Returns true once [`Orchestrator::shutdown`] has been called
    pub fn is_shutting_down(&self) -> bool {
        !self.lock_queue().is_accepting()
    }

    /// Stops the crawler
    ///
    /// Pending jobs are dropped at once. Running jobs get up to
    /// `shutdown-timeout-ms` to finish; after that they are told to abort
    /// and reported as abandoned. Never waits longer than the timeout.
    pub async fn shutdown(&self) -> ShutdownReport {
        let started = Instant::now();
        let cancelled: Vec<JobId> = self
            .lock_queue()
            .close()
            .into_iter()
            .map(|job| job.id)
            .collect();
        tracing::info!("Shutting down, dropped {} pending jobs", cancelled.len());

        let timeout = Duration::from_millis(self.crawler.shutdown_timeout_ms);
        let mut active = self.active.subscribe();
        let drained = tokio::time::timeout(timeout, async {
            loop {
                if *active.borrow_and_update() == 0 {
                    return;
                }
                if active.changed().await.is_err() {
                    return;
                }
            }
        })
        .await
        .is_ok();

        let abandoned = if drained {
            Vec::new()
        } else {
            let ids = self.lock_queue().active_ids();
            for id in &ids {
                tracing::warn!("Abandoning job {} still running after {:?}", id, timeout);
            }
            self.abandon.send_replace(true);
            ids
        };

        let elapsed = started.elapsed();
        tracing::info!("Shutdown complete in {:?}", elapsed);
        ShutdownReport {
            cancelled,
            abandoned,
            elapsed,
        }
    }

    /// Fetches a page politely, giving up if shutdown abandons it
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, CrawlerError> {
        let abandoned = wait_for_abandon(self.abandon.subscribe());

        tokio::select! {
            result = self.fetch_politely(url) => result,
            _ = abandoned => Err(CrawlerError::Abandoned { url: url.to_string() }),
        }
    }

    /// Crawl-delay from robots.txt, or zero when it is absent or ignored
    async fn crawl_delay_for(&self, origin: &str) -> Duration {
        if !self.crawler.respect_crawl_delay {
            return Duration::ZERO;
        }
        let delay = self
            .robots
            .crawl_delay(origin, &self.user_agent)
            .await
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(Duration::ZERO);
        if !delay.is_zero() {
            tracing::debug!("Honoring crawl-delay of {:?} for {}", delay, origin);
        }
        delay
    }

    async fn fetch_politely(&self, url: &str) -> Result<FetchedPage, CrawlerError> {
        let parsed = parse_http_url(url)?;
        let origin = extract_origin(&parsed);

        if self.crawler.respect_robots_txt && !self.robots.is_allowed(url, &self.user_agent).await {
            tracing::info!("Skipping {}: disallowed by robots.txt", url);
            return Err(CrawlerError::RobotsDenied {
                url: url.to_string(),
            });
        }

        let spacing = self.crawl_delay_for(&origin).await;
        let waited = self.limiter.acquire_spaced(&origin, spacing).await;
        if !waited.is_zero() {
            tracing::debug!("Waited {:?} for rate limit on {}", waited, origin);
        }

        let _permit = self
            .fetch_permits
            .acquire()
            .await
            .map_err(|_| CrawlerError::ShuttingDown)?;

        tracing::debug!("Fetching {}", url);
        let started = Instant::now();
        let result = fetch_url(&self.client, url).await;
        let response_time = started.elapsed();

        match result {
            FetchResult::Success { final_url, body, .. } => {
                let bytes = body.len() as u64;
                self.lock_stats().record_fetch(response_time, bytes);
                Ok(FetchedPage {
                    final_url,
                    body,
                    bytes,
                    response_time,
                })
            }
            FetchResult::ContentMismatch { content_type } => {
                self.lock_stats().record_fetch(response_time, 0);
                Err(CrawlerError::ContentMismatch {
                    url: url.to_string(),
                    content_type,
                })
            }
            FetchResult::HttpError {
                status_code,
                retry_after,
            } => {
                self.lock_stats().record_fetch(response_time, 0);
                if status_code == 429 {
                    self.limiter.mark_rate_limited(
                        &origin,
                        retry_after.unwrap_or(DEFAULT_RATE_LIMIT_COOLDOWN),
                    );
                }
                Err(CrawlerError::HttpStatus {
                    url: url.to_string(),
                    status: status_code,
                })
            }
            FetchResult::NetworkError { error, timed_out } => {
                if timed_out {
                    Err(CrawlerError::Timeout {
                        url: url.to_string(),
                    })
                } else {
                    Err(CrawlerError::Http {
                        url: url.to_string(),
                        message: error,
                    })
                }
            }
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, JobQueue> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_stats(&self) -> MutexGuard<'_, StatsRecorder> {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Resolves once shutdown flips the abandon flag
async fn wait_for_abandon(mut abandon: watch::Receiver<bool>) {
    loop {
        if *abandon.borrow_and_update() {
            return;
        }
        if abandon.changed().await.is_err() {
            // Sender gone: nothing can abandon us any more
            std::future::pending::<()>().await;
        }
    }
}
