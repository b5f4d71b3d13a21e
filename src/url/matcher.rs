/// Checks if a URL path matches a robots.txt path pattern
///
/// Patterns are anchored at the start of the path and support two special
/// characters:
/// 1. `*` matches any run of characters (including none)
/// 2. A trailing `$` anchors the pattern at the end of the path
///
/// Without `*` or `$` a pattern is a plain prefix: `/news` matches `/news`,
/// `/news/today` and `/newsletter`.
///
/// # Arguments
///
/// * `pattern` - The Allow/Disallow value from robots.txt
/// * `path` - The path (and query) being checked
///
/// # Examples
///
/// ```
/// use news_crawler::url::matches_path_pattern;
///
/// assert!(matches_path_pattern("/private", "/private/page"));
/// assert!(matches_path_pattern("/*.pdf$", "/files/report.pdf"));
/// assert!(!matches_path_pattern("/*.pdf$", "/files/report.pdf?x=1"));
/// ```
pub fn matches_path_pattern(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };

    let parts: Vec<&str> = pattern.split('*').collect();

    let first = parts[0];
    if !path.starts_with(first) {
        return false;
    }
    let mut pos = first.len();

    if parts.len() == 1 {
        return !anchored || pos == path.len();
    }

    let last_index = parts.len() - 1;
    for (i, part) in parts.iter().enumerate().skip(1) {
        if i == last_index && anchored {
            return path.len() >= pos + part.len() && path.ends_with(part);
        }

        if part.is_empty() {
            continue;
        }

        match path[pos..].find(part) {
            Some(idx) => pos += idx + part.len(),
            None => return false,
        }
    }

    true
}
