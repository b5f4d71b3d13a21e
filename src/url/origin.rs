use crate::UrlError;
use url::Url;

/// Extracts the origin (scheme, host and non-default port) of a URL
///
/// The origin is the unit robots.txt policies and rate limits are scoped to.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use news_crawler::url::extract_origin;
///
/// let url = Url::parse("https://EXAMPLE.com/path?q=1").unwrap();
/// assert_eq!(extract_origin(&url), "https://example.com");
///
/// let url = Url::parse("http://localhost:8080/a").unwrap();
/// assert_eq!(extract_origin(&url), "http://localhost:8080");
/// ```
pub fn extract_origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Parses a URL string and returns its origin
pub fn origin_of(raw: &str) -> Result<String, UrlError> {
    let url = Url::parse(raw).map_err(|e| UrlError::Parse(e.to_string()))?;
    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }
    Ok(extract_origin(&url))
}
