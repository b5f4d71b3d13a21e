//! Job queue for scheduled crawls
//!
//! This module handles:
//! - Priority ordering of pending jobs (higher priority first, FIFO on ties)
//! - Tracking jobs that are currently being processed
//! - Cancellation of pending jobs
//! - Closing the queue on shutdown

use crate::crawler::{CrawlJob, JobId};
use crate::state::JobStatus;
use crate::CrawlerError;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// A pending job with its insertion order
#[derive(Debug, Clone)]
struct QueuedJob {
    job: CrawlJob,
    seq: u64,
}

// BinaryHeap pops the greatest element: higher priority wins, then the
// earlier insertion
impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.job
            .priority
            .cmp(&other.job.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

/// Pending and active crawl jobs
///
/// A job lives in exactly one place: the pending heap while `Pending`, the
/// active map while `Processing`. Finished jobs are handed back to the caller
/// and no longer tracked.
#[derive(Debug)]
pub struct JobQueue {
    pending: BinaryHeap<QueuedJob>,
    active: HashMap<JobId, CrawlJob>,
    next_seq: u64,
    accepting: bool,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            pending: BinaryHeap::new(),
            active: HashMap::new(),
            next_seq: 0,
            accepting: true,
        }
    }

    /// Enqueues a new pending job
    ///
    /// # Returns
    ///
    /// * `Ok(JobId)` - Id of the new job
    /// * `Err(CrawlerError::ShuttingDown)` - The queue has been closed
    pub fn add_job(
        &mut self,
        url: &str,
        source_id: &str,
        priority: i32,
    ) -> Result<JobId, CrawlerError> {
        if !self.accepting {
            return Err(CrawlerError::ShuttingDown);
        }

        let seq = self.bump_seq();
        let job = CrawlJob::new(JobId::generate(seq), url, source_id, priority);
        let id = job.id.clone();

        tracing::debug!("Queued {} for {} (priority {})", id, url, priority);
        self.pending.push(QueuedJob { job, seq });
        Ok(id)
    }

    /// Enqueues a fresh attempt for a failed job
    ///
    /// The new job gets a new id and carries over the attempt count, so
    /// callers can bound retries by checking `attempts`.
    pub fn requeue(&mut self, failed: &CrawlJob) -> Result<JobId, CrawlerError> {
        if !self.accepting {
            return Err(CrawlerError::ShuttingDown);
        }

        let seq = self.bump_seq();
        let mut job = CrawlJob::new(
            JobId::generate(seq),
            &failed.url,
            &failed.source_id,
            failed.priority,
        );
        job.attempts = failed.attempts;
        job.error = failed.error.clone();
        let id = job.id.clone();

        tracing::debug!("Requeued {} as {} (attempt {})", failed.id, id, job.attempts + 1);
        self.pending.push(QueuedJob { job, seq });
        Ok(id)
    }

    /// Removes a pending job
    ///
    /// Returns false if the job is unknown, already running, or finished.
    pub fn cancel(&mut self, id: &JobId) -> bool {
        let before = self.pending.len();
        self.pending
            .retain(|queued| &queued.job.id != id || !queued.job.status.is_cancellable());
        before != self.pending.len()
    }

    /// Looks up a pending or active job
    pub fn get(&self, id: &JobId) -> Option<&CrawlJob> {
        self.active.get(id).or_else(|| {
            self.pending
                .iter()
                .map(|queued| &queued.job)
                .find(|job| &job.id == id)
        })
    }

    /// Pops the highest-priority pending job and marks it processing
    ///
    /// Returns None when the queue is empty or closed.
    pub fn start_next(&mut self) -> Option<CrawlJob> {
        if !self.accepting {
            return None;
        }

        let QueuedJob { mut job, .. } = self.pending.pop()?;
        if let Err(e) = job.transition(JobStatus::Processing) {
            tracing::error!("Dropping job {}: {}", job.id, e);
            return None;
        }

        self.active.insert(job.id.clone(), job.clone());
        Some(job)
    }

    /// Moves an active job to its terminal state and stops tracking it
    ///
    /// # Arguments
    ///
    /// * `id` - The active job
    /// * `error` - `None` for success, otherwise the failure message
    pub fn finish(&mut self, id: &JobId, error: Option<String>) -> Option<CrawlJob> {
        let mut job = self.active.remove(id)?;
        let next = if error.is_some() {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };

        if let Err(e) = job.transition(next) {
            tracing::error!("Could not finish job {}: {}", id, e);
        }
        job.error = error;
        Some(job)
    }

    /// Stops accepting and starting jobs, returning the discarded pending jobs
    pub fn close(&mut self) -> Vec<CrawlJob> {
        self.accepting = false;
        self.pending
            .drain()
            .map(|queued| queued.job)
            .collect()
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// Number of pending jobs
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of jobs currently processing
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Ids of jobs currently processing
    pub fn active_ids(&self) -> Vec<JobId> {
        self.active.keys().cloned().collect()
    }

    /// Returns true if nothing is pending or active
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty()
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
