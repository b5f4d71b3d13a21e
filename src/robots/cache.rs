//! Robots.txt caching implementation
//!
//! This module provides cache entries for parsed robots.txt files, including
//! automatic expiration after 24 hours.

use crate::robots::RobotsRules;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// How long a fetched robots.txt stays authoritative
pub const ROBOTS_TTL_HOURS: i64 = 24;

/// Cached robots.txt data for an origin
///
/// Entries are never updated in place; a stale entry is replaced wholesale by
/// a fresh fetch.
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt rules
    pub rules: Arc<RobotsRules>,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,

    /// When this entry stops being authoritative
    pub expires_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a new entry stamped with the current time
    pub fn new(rules: RobotsRules) -> Self {
        let fetched_at = Utc::now();
        Self {
            rules: Arc::new(rules),
            fetched_at,
            expires_at: fetched_at + Duration::hours(ROBOTS_TTL_HOURS),
        }
    }

    /// Checks if the cached robots.txt has expired
    ///
    /// Site owners change their policies, so rules are refreshed daily.
    pub fn is_stale(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Returns how long ago the robots.txt was fetched
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}
