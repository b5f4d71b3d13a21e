use crate::config::RateLimitConfig;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Tracks the request history of one origin during crawling
///
/// This structure maintains the per-origin information needed for the
/// minute/hour request windows, the minimum spacing between requests, and
/// cooldowns after the origin answered HTTP 429.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Number of requests made to this origin since the limiter was created
    pub request_count: u64,

    /// Timestamp of the last request to this origin
    pub last_request_time: Option<Instant>,

    /// The origin asked us to back off until this instant
    pub rate_limited_until: Option<Instant>,

    /// Request timestamps from the last hour, oldest first
    recent: VecDeque<Instant>,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self {
            request_count: 0,
            last_request_time: None,
            rate_limited_until: None,
            recent: VecDeque::new(),
        }
    }

    /// Checks if a request can be made to this origin
    ///
    /// This method enforces:
    /// - Cooldown after an HTTP 429
    /// - Minimum time between requests to the same origin
    /// - Requests-per-minute and requests-per-hour windows
    pub fn can_request(&self, config: &RateLimitConfig, now: Instant) -> bool {
        self.time_until_next_request(config, now).is_none()
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(
        &self,
        config: &RateLimitConfig,
        now: Instant,
    ) -> Option<Duration> {
        self.time_until_spaced_request(config, Duration::ZERO, now)
    }

    /// Like [`DomainState::time_until_next_request`], but keeps at least
    /// `spacing` between consecutive requests even when `min_delay_ms` is
    /// shorter. Used for robots.txt crawl-delay.
    pub fn time_until_spaced_request(
        &self,
        config: &RateLimitConfig,
        spacing: Duration,
        now: Instant,
    ) -> Option<Duration> {
        let mut ready_at = now;

        if let Some(until) = self.rate_limited_until {
            ready_at = ready_at.max(until);
        }

        if let Some(last) = self.last_request_time {
            let gap = Duration::from_millis(config.min_delay_ms).max(spacing);
            ready_at = ready_at.max(last + gap);
        }

        if let Some(limit) = config.requests_per_minute {
            if let Some(at) = self.window_frees_at(MINUTE, limit, now) {
                ready_at = ready_at.max(at);
            }
        }

        if let Some(limit) = config.requests_per_hour {
            if let Some(at) = self.window_frees_at(HOUR, limit, now) {
                ready_at = ready_at.max(at);
            }
        }

        if ready_at > now {
            Some(ready_at - now)
        } else {
            None
        }
    }

    /// When a full window gets room for one more request, if it is full now
    fn window_frees_at(&self, window: Duration, limit: u32, now: Instant) -> Option<Instant> {
        let in_window: Vec<&Instant> = self
            .recent
            .iter()
            .filter(|t| **t + window > now)
            .collect();

        let limit = limit as usize;
        if in_window.len() < limit {
            return None;
        }

        // The oldest request that must age out before the window has room
        let blocking = in_window[in_window.len() - limit];
        Some(*blocking + window)
    }

    /// Number of requests made inside the given window ending at `now`
    pub fn requests_within(&self, window: Duration, now: Instant) -> usize {
        self.recent.iter().filter(|t| **t + window > now).count()
    }

    /// Records that a request was made to this origin
    ///
    /// Updates the request count, last request time, and window history.
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
        self.recent.push_back(now);

        while let Some(oldest) = self.recent.front() {
            if *oldest + HOUR <= now {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }

    /// Marks this origin as rate limited for the given cooldown
    pub fn mark_rate_limited(&mut self, now: Instant, cooldown: Duration) {
        let until = now + cooldown;
        self.rate_limited_until = Some(match self.rate_limited_until {
            Some(existing) => existing.max(until),
            None => until,
        });
    }

}

impl Default for DomainState {
    fn default() -> Self {
        Self::new()
    }
}
