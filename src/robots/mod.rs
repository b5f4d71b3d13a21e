//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files per origin. Policy lookups fail open: when robots.txt
//! cannot be obtained the origin is treated as allow-all.

mod cache;
mod parser;

pub use cache::{CachedRobots, ROBOTS_TTL_HOURS};
pub use parser::{product_token, RobotsRules, RuleGroup};

use crate::url::{extract_origin, origin_of};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Fetches and parses robots.txt for an origin
///
/// A non-success status, network error, or timeout yields
/// [`RobotsRules::allow_all`]; the failure is logged, never returned.
///
/// # Arguments
///
/// * `client` - HTTP client carrying the crawler's user agent
/// * `origin` - Origin such as `https://example.com`
/// * `timeout` - Upper bound for the whole fetch
pub async fn fetch_robots(client: &Client, origin: &str, timeout: Duration) -> RobotsRules {
    let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));
    tracing::debug!("Fetching {}", robots_url);

    let response = match client.get(&robots_url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                "Could not fetch {} ({}); allowing all paths",
                robots_url,
                e
            );
            return RobotsRules::allow_all();
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::info!(
            "{} returned HTTP {}; allowing all paths",
            robots_url,
            status.as_u16()
        );
        return RobotsRules::allow_all();
    }

    match response.text().await {
        Ok(body) => RobotsRules::parse(&body),
        Err(e) => {
            tracing::warn!(
                "Could not read {} ({}); allowing all paths",
                robots_url,
                e
            );
            RobotsRules::allow_all()
        }
    }
}

/// Per-origin robots.txt policy cache
///
/// Lookups fetch robots.txt on first use for an origin and reuse the parsed
/// rules until they expire. The network fetch happens outside the lock, so a
/// slow origin never blocks lookups for other origins.
pub struct RobotsPolicyCache {
    client: Client,
    timeout: Duration,
    entries: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsPolicyCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for robots.txt fetches
    /// * `timeout` - Timeout applied to each robots.txt fetch
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the rules for an origin, fetching them if absent or expired
    ///
    /// `origin` may be a bare origin or any URL on it.
    pub async fn rules_for(&self, origin: &str) -> Arc<RobotsRules> {
        let origin = normalize_origin(origin);
        if let Some(rules) = self.fresh_entry(&origin) {
            return rules;
        }

        let rules = fetch_robots(&self.client, &origin, self.timeout).await;
        let entry = CachedRobots::new(rules);
        let shared = Arc::clone(&entry.rules);

        self.lock_entries().insert(origin, entry);
        shared
    }

    /// Checks if a URL may be crawled by the given user agent
    ///
    /// URLs that cannot be parsed are allowed here; the fetch itself will
    /// report them as failures.
    pub async fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Skipping robots check for unparsable {}: {}", url, e);
                return true;
            }
        };

        let path = match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        };

        self.rules_for(&extract_origin(&parsed))
            .await
            .is_allowed(&path, user_agent)
    }

    /// Gets the crawl delay (seconds) that applies to the user agent on an origin
    pub async fn crawl_delay(&self, origin: &str, user_agent: &str) -> Option<f64> {
        self.rules_for(origin).await.crawl_delay(user_agent)
    }

    /// Gets the sitemap URLs advertised by an origin
    pub async fn sitemaps(&self, origin: &str) -> Vec<String> {
        self.rules_for(origin).await.sitemaps().to_vec()
    }

    /// Stores rules for an origin without fetching
    pub fn insert(&self, origin: &str, rules: RobotsRules) {
        let origin = normalize_origin(origin);
        self.lock_entries().insert(origin, CachedRobots::new(rules));
    }

    /// Invalidates one origin, or every origin when `origin` is `None`
    pub fn clear_cache(&self, origin: Option<&str>) {
        let mut entries = self.lock_entries();
        match origin {
            Some(origin) => {
                entries.remove(&normalize_origin(origin));
            }
            None => entries.clear(),
        }
    }

    /// Number of origins currently cached, fresh or not
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Returns true if no origin is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh_entry(&self, origin: &str) -> Option<Arc<RobotsRules>> {
        let entries = self.lock_entries();
        entries
            .get(origin)
            .filter(|entry| !entry.is_stale())
            .map(|entry| Arc::clone(&entry.rules))
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, CachedRobots>> {
        // A poisoned map still holds valid entries
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Accepts either an origin or any URL on it
fn normalize_origin(origin: &str) -> String {
    origin_of(origin).unwrap_or_else(|_| origin.trim_end_matches('/').to_string())
}
