//! Crawl statistics
//!
//! Counters are updated as jobs finish and fetches complete; a
//! [`CrawlerStats`] snapshot is derived from them on demand.

use std::time::Duration;

/// Point-in-time view of crawler activity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlerStats {
    /// Jobs ever submitted (queued jobs plus direct source crawls)
    pub total_jobs: u64,

    pub completed_jobs: u64,

    pub failed_jobs: u64,

    /// Jobs currently processing
    pub active_jobs: usize,

    /// Jobs waiting in the queue
    pub queued_jobs: usize,

    /// Completed jobs as a percentage of finished jobs
    pub success_rate: f64,

    /// Mean response time over every recorded fetch
    pub average_response_time_ms: f64,

    pub total_bytes_crawled: u64,
}

/// Live counters behind [`CrawlerStats`]
#[derive(Debug, Default)]
pub struct StatsRecorder {
    total_jobs: u64,
    completed_jobs: u64,
    failed_jobs: u64,
    total_bytes: u64,
    total_response_time: Duration,
    responses: u64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_job_submitted(&mut self) {
        self.total_jobs += 1;
    }

    /// Records the terminal outcome of one job
    pub fn record_job_finished(&mut self, success: bool) {
        if success {
            self.completed_jobs += 1;
        } else {
            self.failed_jobs += 1;
        }
    }

    /// Records timing and size of one fetch attempt
    pub fn record_fetch(&mut self, response_time: Duration, bytes: u64) {
        self.responses += 1;
        self.total_response_time += response_time;
        self.total_bytes += bytes;
    }

    /// Builds a snapshot; queue sizes come from the job queue
    pub fn snapshot(&self, queued_jobs: usize, active_jobs: usize) -> CrawlerStats {
        let finished = self.completed_jobs + self.failed_jobs;
        let success_rate = if finished > 0 {
            (self.completed_jobs as f64 / finished as f64) * 100.0
        } else {
            0.0
        };

        let average_response_time_ms = if self.responses > 0 {
            self.total_response_time.as_secs_f64() * 1000.0 / self.responses as f64
        } else {
            0.0
        };

        CrawlerStats {
            total_jobs: self.total_jobs,
            completed_jobs: self.completed_jobs,
            failed_jobs: self.failed_jobs,
            active_jobs,
            queued_jobs,
            success_rate,
            average_response_time_ms,
            total_bytes_crawled: self.total_bytes,
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlerStats) {
    println!("=== Crawl Statistics ===\n");

    println!("Jobs:");
    println!("  Total: {}", stats.total_jobs);
    println!("  Completed: {}", stats.completed_jobs);
    println!("  Failed: {}", stats.failed_jobs);
    println!("  Active: {}", stats.active_jobs);
    println!("  Queued: {}", stats.queued_jobs);
    println!();

    println!("Traffic:");
    println!(
        "  Average response time: {:.0}ms",
        stats.average_response_time_ms
    );
    println!("  Bytes crawled: {}", stats.total_bytes_crawled);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} jobs completed)",
        stats.success_rate,
        stats.completed_jobs,
        stats.completed_jobs + stats.failed_jobs
    );
}
