//! Robots.txt parser implementation
//!
//! Turns robots.txt text into per-agent rule groups and resolves
//! allow/disallow decisions with longest-match precedence.

use crate::url::matches_path_pattern;

/// One `User-agent` block of a robots.txt file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleGroup {
    /// Lowercased agent tokens this group applies to (`*` for everyone)
    pub agents: Vec<String>,

    /// Allow path patterns
    pub allow: Vec<String>,

    /// Disallow path patterns
    pub disallow: Vec<String>,

    /// Crawl delay in seconds
    pub crawl_delay: Option<f64>,
}

impl RuleGroup {
    fn applies_to(&self, token: &str) -> bool {
        self.agents.iter().any(|agent| agent == token)
    }

    fn is_wildcard(&self) -> bool {
        self.agents.iter().any(|agent| agent == "*")
    }
}

/// Parsed robots.txt rules for one origin
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotsRules {
    groups: Vec<RuleGroup>,
    sitemaps: Vec<String>,
}

impl RobotsRules {
    /// Creates a permissive policy that allows everything
    ///
    /// This is used when robots.txt is missing or cannot be fetched.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses raw robots.txt content
    ///
    /// Unknown directives and lines without a `:` are ignored, so garbage
    /// input degrades to an allow-all policy rather than an error.
    pub fn parse(content: &str) -> Self {
        let mut rules = Self::default();
        let mut current: Option<RuleGroup> = None;
        let mut last_was_agent = false;

        for line in content.lines() {
            // Strip trailing comments
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    let agent = value.to_lowercase();
                    last_was_agent = match (current.as_mut(), last_was_agent) {
                        // Consecutive User-agent lines share one group
                        (Some(group), true) => {
                            group.agents.push(agent);
                            true
                        }
                        _ => {
                            if let Some(group) = current.take() {
                                rules.groups.push(group);
                            }
                            current = Some(RuleGroup {
                                agents: vec![agent],
                                ..RuleGroup::default()
                            });
                            true
                        }
                    };
                }
                "allow" | "disallow" => {
                    last_was_agent = false;
                    let Some(group) = current.as_mut() else {
                        continue;
                    };
                    // An empty value matches nothing
                    if value.is_empty() {
                        continue;
                    }
                    if key == "allow" {
                        group.allow.push(value.to_string());
                    } else {
                        group.disallow.push(value.to_string());
                    }
                }
                "crawl-delay" => {
                    last_was_agent = false;
                    if let (Some(group), Ok(delay)) = (current.as_mut(), value.parse::<f64>()) {
                        if delay.is_finite() && delay >= 0.0 {
                            group.crawl_delay = Some(delay);
                        }
                    }
                }
                "sitemap" => {
                    if !value.is_empty() {
                        rules.sitemaps.push(value.to_string());
                    }
                }
                _ => {}
            }
        }

        if let Some(group) = current.take() {
            rules.groups.push(group);
        }

        rules
    }

    /// Returns all parsed rule groups
    pub fn groups(&self) -> &[RuleGroup] {
        &self.groups
    }

    /// Returns the sitemap URLs listed in the file
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    /// Selects the groups that govern the given user agent
    ///
    /// Groups naming the crawler's product token win over `*` groups. Several
    /// groups for the same agent are treated as one.
    fn groups_for(&self, user_agent: &str) -> Vec<&RuleGroup> {
        let token = product_token(user_agent);

        let specific: Vec<&RuleGroup> = self
            .groups
            .iter()
            .filter(|g| g.applies_to(&token))
            .collect();
        if !specific.is_empty() {
            return specific;
        }

        self.groups.iter().filter(|g| g.is_wildcard()).collect()
    }

    /// Checks if a path is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `path` - The URL path (and query) to check, e.g. "/news?page=2"
    /// * `user_agent` - The crawler's user agent string or product token
    ///
    /// # Returns
    ///
    /// * `true` - No pattern matches, or the longest matching pattern is an allow
    /// * `false` - The longest matching pattern is a disallow
    pub fn is_allowed(&self, path: &str, user_agent: &str) -> bool {
        if path == "/robots.txt" {
            return true;
        }

        let groups = self.groups_for(user_agent);

        let disallow = longest_match(groups.iter().flat_map(|g| g.disallow.iter()), path);
        let allow = longest_match(groups.iter().flat_map(|g| g.allow.iter()), path);

        match (disallow, allow) {
            (None, _) => true,
            // A disallow only yields to a strictly longer allow
            (Some(d), Some(a)) => a > d,
            (Some(_), None) => false,
        }
    }

    /// Gets the crawl delay (seconds) of the group governing the user agent
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.groups_for(user_agent)
            .iter()
            .find_map(|g| g.crawl_delay)
    }
}

/// Length of the longest pattern that matches the path
fn longest_match<'a>(patterns: impl Iterator<Item = &'a String>, path: &str) -> Option<usize> {
    patterns
        .filter(|p| matches_path_pattern(p, path))
        .map(|p| p.chars().count())
        .max()
}

/// Extracts the lowercased product token from a user agent string
///
/// `NewsBot/1.0 (+https://example.com/bot)` yields `newsbot`.
pub fn product_token(user_agent: &str) -> String {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_lowercase()
}
