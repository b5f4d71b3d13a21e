use news_crawler::config::{Config, CrawlerConfig, RateLimitConfig, Source, UserAgentConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER_AGENT: &str = "TestBot/1.0.0 (+https://example.com/contact; test@example.com)";

/// Creates a test configuration with one source rooted at the mock server
pub fn create_test_config(base_url: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            request_timeout_ms: 5_000,
            robots_timeout_ms: 2_000,
            source_pause_ms: 0,
            shutdown_timeout_ms: 500,
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        // Fast enough that pacing never dominates test time
        rate_limit: RateLimitConfig {
            requests_per_second: 50.0,
            ..RateLimitConfig::default()
        },
        sources: vec![Source::new("mock", "Mock News", base_url)],
    }
}

pub fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html")
}

pub async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/plain"))
        .mount(server)
        .await;
}

pub async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .mount(server)
        .await;
}

pub fn article_page(title: &str) -> String {
    format!(
        r#"<html><head><title>{title} | Mock News</title></head><body>
        <h1>{title}</h1>
        <article><p>Lead paragraph.</p><p>Second paragraph.</p><img src="/img/{title}.jpg"></article>
        </body></html>"#
    )
}
