//! URL handling module
//!
//! This module provides origin extraction, relative URL resolution against a
//! source's origin, and robots.txt path pattern matching.

mod matcher;
mod origin;
mod resolve;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use matcher::matches_path_pattern;
pub use origin::{extract_origin, origin_of};
pub use resolve::resolve_url;

/// Parses a URL and checks that it is a crawlable HTTP(S) address
///
/// # Arguments
///
/// * `raw` - The URL string to parse
///
/// # Returns
///
/// * `Ok(Url)` - A URL with an `http` or `https` scheme and a host
/// * `Err(UrlError)` - The string is malformed, uses another scheme, or has no host
///
/// # Examples
///
/// ```
/// use news_crawler::url::parse_http_url;
///
/// assert!(parse_http_url("https://example.com/news").is_ok());
/// assert!(parse_http_url("mailto:editor@example.com").is_err());
/// ```
pub fn parse_http_url(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}
