use serde::Deserialize;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,
    #[serde(rename = "source", default)]
    pub sources: Vec<Source>,
}

impl Config {
    /// Returns the sources that are enabled for crawling
    pub fn enabled_sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Timeout for page fetches (milliseconds)
    pub request_timeout_ms: u64,

    /// Timeout for robots.txt fetches (milliseconds)
    pub robots_timeout_ms: u64,

    /// Whether robots.txt rules are consulted before fetching
    pub respect_robots_txt: bool,

    /// Whether a robots.txt Crawl-delay is slept before fetching
    pub respect_crawl_delay: bool,

    /// Maximum number of fetches in flight during batch crawls
    pub max_concurrent: u32,

    /// Maximum attempts a job may be re-enqueued for
    pub max_retries: u32,

    /// Pause between consecutive sources in a full crawl (milliseconds)
    pub source_pause_ms: u64,

    /// Upper bound on how long shutdown waits for active jobs (milliseconds)
    pub shutdown_timeout_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            robots_timeout_ms: 10_000,
            respect_robots_txt: true,
            respect_crawl_delay: true,
            max_concurrent: 5,
            max_retries: 3,
            source_pause_ms: 2_000,
            shutdown_timeout_ms: 30_000,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler, also the robots.txt product token
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the full user agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RateLimitConfig {
    /// Token bucket capacity and refill rate
    pub requests_per_second: f64,

    /// Optional ceiling on requests in any rolling minute
    pub requests_per_minute: Option<u32>,

    /// Optional ceiling on requests in any rolling hour
    pub requests_per_hour: Option<u32>,

    /// Minimum spacing between two requests to the same origin (milliseconds)
    pub min_delay_ms: u64,

    /// Keep a separate bucket per origin instead of one for the whole process
    pub per_domain: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            requests_per_minute: None,
            requests_per_hour: None,
            min_delay_ms: 0,
            per_domain: true,
        }
    }
}

/// A configured news source
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Source {
    /// Stable identifier referenced by crawl jobs
    pub id: String,

    /// Human readable name, copied into every article
    pub name: String,

    /// Page the source listing is crawled from; its origin resolves relative URLs
    pub base_url: String,

    /// Optional feed URL advertised by the source
    #[serde(default)]
    pub feed_url: Option<String>,

    #[serde(default)]
    pub selectors: SelectorSet,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Relative weight used as the default job priority
    #[serde(default)]
    pub priority: i32,

    /// How often the source should be revisited (minutes)
    #[serde(default = "default_crawl_frequency")]
    pub crawl_frequency: u32,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub country: Option<String>,
}

impl Source {
    /// Creates an enabled source with no selectors
    pub fn new(id: &str, name: &str, base_url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            base_url: base_url.to_string(),
            feed_url: None,
            selectors: SelectorSet::default(),
            enabled: true,
            priority: 0,
            crawl_frequency: default_crawl_frequency(),
            category: None,
            language: None,
            country: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_crawl_frequency() -> u32 {
    60
}

/// CSS selectors used to pull article fields out of a source's pages
///
/// Every field is optional; the extractor resolves each one through its own
/// fallback when the source leaves it unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectorSet {
    /// Container wrapping one article candidate
    pub article: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
    pub date: Option<String>,
    pub category: Option<String>,
}
