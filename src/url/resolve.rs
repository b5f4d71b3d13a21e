use url::Url;

/// Resolves a possibly relative link against a source's base URL
///
/// # Resolution Rules
///
/// - Absolute `http://` / `https://` links are returned unchanged
/// - Protocol-relative links (`//cdn.example.com/a.jpg`) get `https:`
/// - Root-relative links (`/img/a.jpg`) are prefixed with the base origin
/// - Anything else is resolved as a normal relative URL against `base`
///
/// If the base cannot be parsed the link is returned as-is.
///
/// # Examples
///
/// ```
/// use news_crawler::url::resolve_url;
///
/// let base = "https://news.example.com/section/";
/// assert_eq!(resolve_url("//cdn.example.com/a.jpg", base), "https://cdn.example.com/a.jpg");
/// assert_eq!(resolve_url("/story/1", base), "https://news.example.com/story/1");
/// assert_eq!(resolve_url("story/2", base), "https://news.example.com/section/story/2");
/// ```
pub fn resolve_url(link: &str, base: &str) -> String {
    let link = link.trim();

    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }

    if link.starts_with("//") {
        return format!("https:{}", link);
    }

    let base_url = match Url::parse(base) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Cannot resolve {} against invalid base {}: {}", link, base, e);
            return link.to_string();
        }
    };

    if link.starts_with('/') {
        return format!("{}{}", base_url.origin().ascii_serialization(), link);
    }

    match base_url.join(link) {
        Ok(resolved) => resolved.to_string(),
        Err(e) => {
            tracing::debug!("Failed to resolve {} against {}: {}", link, base, e);
            link.to_string()
        }
    }
}
