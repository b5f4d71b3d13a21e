//! Records produced and consumed by the crawler
//!
//! - `CrawlJob`: a queued unit of work with its lifecycle status
//! - `Article`: one extracted news article
//! - `CrawlResult`: the outcome of one fetch attempt

use crate::state::JobStatus;
use crate::CrawlerError;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

/// Opaque identifier of a crawl job
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Builds a job id from the enqueue time and a per-queue sequence number
    pub(crate) fn generate(seq: u64) -> Self {
        Self(format!("job-{}-{}", Utc::now().timestamp_millis(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unit of crawl work
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub id: JobId,

    /// Id of the configured source the URL belongs to
    pub source_id: String,

    pub url: String,

    /// Higher values are processed sooner
    pub priority: i32,

    /// Number of times processing has started for this job
    pub attempts: u32,

    pub status: JobStatus,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Error message of the last failed attempt
    pub error: Option<String>,
}

impl CrawlJob {
    /// Creates a pending job
    pub fn new(id: JobId, url: &str, source_id: &str, priority: i32) -> Self {
        Self {
            id,
            source_id: source_id.to_string(),
            url: url.to_string(),
            priority,
            attempts: 0,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    /// Moves the job to `next`, stamping the matching timestamp
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The transition was legal and applied
    /// * `Err(CrawlerError::InvalidTransition)` - The job is left unchanged
    pub fn transition(&mut self, next: JobStatus) -> Result<(), CrawlerError> {
        if !self.status.can_transition_to(next) {
            return Err(CrawlerError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        match next {
            JobStatus::Processing => {
                self.attempts += 1;
                self.started_at = Some(Utc::now());
            }
            JobStatus::Completed | JobStatus::Failed => {
                self.completed_at = Some(Utc::now());
            }
            JobStatus::Pending => {}
        }

        self.status = next;
        Ok(())
    }
}

/// A news article extracted from a fetched page
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Deterministic id derived from URL and title
    pub id: String,
    pub title: String,
    pub content: String,
    pub url: String,

    /// Name of the source the article came from
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub author: Option<String>,
    pub images: Vec<String>,
    pub category: Option<String>,
}

impl Article {
    /// Derives the article id from its URL and title
    ///
    /// Re-crawling an unchanged article reproduces the same id, which lets
    /// downstream consumers deduplicate.
    pub fn generate_id(url: &str, title: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hasher.update(title.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("article-{}", &digest[..16])
    }
}

/// Outcome of one fetch attempt
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub success: bool,
    pub article: Option<Article>,
    pub error: Option<String>,

    /// Name of the source the URL belongs to
    pub source: String,
    pub url: String,

    /// Set when the result came out of the job queue
    pub job_id: Option<JobId>,

    pub timestamp: DateTime<Utc>,
    pub response_time: Duration,

    /// Size of the fetched body
    pub bytes: u64,
}

impl CrawlResult {
    /// Creates a successful result
    pub fn success(
        source: &str,
        url: &str,
        article: Option<Article>,
        response_time: Duration,
        bytes: u64,
    ) -> Self {
        Self {
            success: true,
            article,
            error: None,
            source: source.to_string(),
            url: url.to_string(),
            job_id: None,
            timestamp: Utc::now(),
            response_time,
            bytes,
        }
    }

    /// Creates a failed result carrying the error message
    pub fn failure(source: &str, url: &str, error: &CrawlerError, response_time: Duration) -> Self {
        Self {
            success: false,
            article: None,
            error: Some(error.to_string()),
            source: source.to_string(),
            url: url.to_string(),
            job_id: None,
            timestamp: Utc::now(),
            response_time,
            bytes: 0,
        }
    }

    /// Tags the result with the job it belongs to
    pub fn with_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }
}
