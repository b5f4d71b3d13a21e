//! Request pacing
//!
//! This module handles:
//! - A token bucket limiting requests per second
//! - Per-origin pacing that layers minute/hour windows, minimum spacing,
//!   and HTTP 429 cooldowns on top of the bucket

use crate::config::RateLimitConfig;
use crate::state::DomainState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Key shared by every origin when per-origin pacing is disabled
const SHARED_KEY: &str = "*";

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    max_tokens: f64,
    /// Tokens added per millisecond
    refill_rate: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(requests_per_second: f64, now: Instant) -> Self {
        Self {
            tokens: requests_per_second,
            max_tokens: requests_per_second,
            refill_rate: requests_per_second / 1000.0,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed_ms = now.saturating_duration_since(self.last_refill).as_secs_f64() * 1000.0;
        self.tokens = (self.tokens + elapsed_ms * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    /// Time until one whole token is available, zero if one already is
    fn wait_for_token(&self) -> Duration {
        if self.tokens >= 1.0 {
            return Duration::ZERO;
        }
        let ms = ((1.0 - self.tokens) / self.refill_rate).ceil();
        Duration::from_millis(ms as u64)
    }
}

/// Snapshot of a [`RateLimiter`]
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterStatus {
    pub available_tokens: f64,
    pub max_tokens: f64,
    /// Zero when a token is available now
    pub next_token_in: Duration,
}

/// Token bucket limiting request starts
///
/// The bucket holds up to `requests_per_second` tokens and refills
/// continuously at that rate. Waiters sleep outside the lock and re-check on
/// wake, so concurrent callers never overdraw the bucket.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Creates a full bucket
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Capacity and refill rate; must be positive
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            bucket: Mutex::new(Bucket::new(requests_per_second, Instant::now())),
        }
    }

    /// Waits until a token is available and consumes it
    ///
    /// # Returns
    ///
    /// How long the caller waited
    pub async fn acquire(&self) -> Duration {
        let mut waited = Duration::ZERO;

        loop {
            let wait = {
                let mut bucket = self.lock_bucket();
                bucket.refill(Instant::now());
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return waited;
                }
                bucket.wait_for_token()
            };

            tracing::trace!("Rate limiter empty, sleeping {:?}", wait);
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
            waited += wait;
        }
    }

    /// Time until a token would be available, without consuming anything
    pub fn delay(&self) -> Duration {
        let mut bucket = self.lock_bucket();
        bucket.refill(Instant::now());
        bucket.wait_for_token()
    }

    /// Refills the bucket to capacity
    pub fn reset(&self) {
        let mut bucket = self.lock_bucket();
        bucket.tokens = bucket.max_tokens;
        bucket.last_refill = Instant::now();
    }

    /// Changes the rate, clamping the current tokens to the new capacity
    pub fn update_config(&self, requests_per_second: f64) {
        let mut bucket = self.lock_bucket();
        bucket.refill(Instant::now());
        bucket.max_tokens = requests_per_second;
        bucket.refill_rate = requests_per_second / 1000.0;
        bucket.tokens = bucket.tokens.min(requests_per_second);
    }

    pub fn status(&self) -> RateLimiterStatus {
        let mut bucket = self.lock_bucket();
        bucket.refill(Instant::now());
        RateLimiterStatus {
            available_tokens: bucket.tokens,
            max_tokens: bucket.max_tokens,
            next_token_in: bucket.wait_for_token(),
        }
    }

    fn lock_bucket(&self) -> MutexGuard<'_, Bucket> {
        self.bucket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Per-origin request pacing
///
/// Every request first takes a token from the origin's bucket, then waits
/// until the origin's [`DomainState`] allows another request. With
/// `per_domain` disabled all origins share one bucket and one history.
#[derive(Debug)]
pub struct DomainRateLimiter {
    config: Mutex<RateLimitConfig>,
    buckets: Mutex<HashMap<String, Arc<RateLimiter>>>,
    domains: Mutex<HashMap<String, DomainState>>,
}

impl DomainRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Mutex::new(config),
            buckets: Mutex::new(HashMap::new()),
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until a request to `origin` is permitted and records it
    ///
    /// # Returns
    ///
    /// Total time spent waiting
    pub async fn acquire(&self, origin: &str) -> Duration {
        self.acquire_spaced(origin, Duration::ZERO).await
    }

    /// Like [`DomainRateLimiter::acquire`], and also keeps at least `spacing`
    /// between this request and the previous one to `origin`
    ///
    /// The wait and the bookkeeping happen under one lock, so concurrent
    /// callers for the same origin are released one `spacing` apart.
    pub async fn acquire_spaced(&self, origin: &str, spacing: Duration) -> Duration {
        let key = self.key_for(origin);
        let bucket = self.bucket_for(&key);
        let mut waited = bucket.acquire().await;

        loop {
            let wait = {
                let config = lock(&self.config).clone();
                let mut domains = lock(&self.domains);
                let state = domains.entry(key.clone()).or_default();
                let now = Instant::now();
                match state.time_until_spaced_request(&config, spacing, now) {
                    None => {
                        state.record_request(now);
                        return waited;
                    }
                    Some(wait) => wait,
                }
            };

            tracing::debug!("Pacing requests to {}, waiting {:?}", key, wait);
            tokio::time::sleep(wait).await;
            waited += wait;
        }
    }

    /// Pauses requests to `origin` for `cooldown`
    pub fn mark_rate_limited(&self, origin: &str, cooldown: Duration) {
        let key = self.key_for(origin);
        tracing::warn!("{} asked us to slow down; pausing for {:?}", key, cooldown);
        lock(&self.domains)
            .entry(key)
            .or_default()
            .mark_rate_limited(Instant::now(), cooldown);
    }

    /// Copy of the pacing state tracked for `origin`
    pub fn domain_state(&self, origin: &str) -> Option<DomainState> {
        let key = self.key_for(origin);
        lock(&self.domains).get(&key).cloned()
    }

    /// Applies a new configuration to existing and future buckets
    pub fn update_config(&self, config: RateLimitConfig) {
        for bucket in lock(&self.buckets).values() {
            bucket.update_config(config.requests_per_second);
        }
        *lock(&self.config) = config;
    }

    /// Forgets all buckets and request history
    pub fn reset(&self) {
        lock(&self.buckets).clear();
        lock(&self.domains).clear();
    }

    fn key_for(&self, origin: &str) -> String {
        if lock(&self.config).per_domain {
            origin.to_string()
        } else {
            SHARED_KEY.to_string()
        }
    }

    fn bucket_for(&self, key: &str) -> Arc<RateLimiter> {
        let rps = lock(&self.config).requests_per_second;
        let mut buckets = lock(&self.buckets);
        Arc::clone(
            buckets
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(RateLimiter::new(rps))),
        )
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
