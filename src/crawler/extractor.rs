//! HTML to article extraction
//!
//! This module turns fetched HTML into [`Article`] records using a source's
//! selector set. Every selector is optional; missing ones fall back to
//! generic markup that most news sites share.

use crate::config::{SelectorSet, Source};
use crate::crawler::Article;
use crate::url::{parse_http_url, resolve_url};
use crate::CrawlerError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::{ElementRef, Html, Selector};

const ARTICLE_FALLBACK: &str = "article";
const TITLE_FALLBACK: &str = "h1, h2, h3";
const CONTENT_FALLBACK: &str = "p";
const IMAGE_FALLBACK: &str = "img";
const LINK_SELECTOR: &str = "a[href]";

const PAGE_TITLE: &str = "h1";
const PAGE_TITLE_TAG: &str = "title";
const PAGE_CONTENT: &str = "article p, .content p, .article-body p";
const PAGE_IMAGES: &str = "article img, .content img";

/// A source's selectors, compiled once per extraction
struct CompiledSelectors {
    article: Selector,
    title: Selector,
    content: Selector,
    image: Selector,
    link: Selector,
    author: Option<Selector>,
    date: Option<Selector>,
    category: Option<Selector>,
    /// Whether `content` came from the source rather than the fallback
    custom_content: bool,
}

impl CompiledSelectors {
    fn compile(set: &SelectorSet) -> Result<Self, CrawlerError> {
        Ok(Self {
            article: compile_or(set.article.as_deref(), ARTICLE_FALLBACK)?,
            title: compile_or(set.title.as_deref(), TITLE_FALLBACK)?,
            content: compile_or(set.content.as_deref(), CONTENT_FALLBACK)?,
            image: compile_or(set.image.as_deref(), IMAGE_FALLBACK)?,
            link: compile(LINK_SELECTOR)?,
            author: compile_optional(set.author.as_deref())?,
            date: compile_optional(set.date.as_deref())?,
            category: compile_optional(set.category.as_deref())?,
            custom_content: set.content.is_some(),
        })
    }
}

fn compile(selector: &str) -> Result<Selector, CrawlerError> {
    Selector::parse(selector).map_err(|e| CrawlerError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Compiles the configured selector, or the fallback when none is set
fn compile_or(custom: Option<&str>, fallback: &str) -> Result<Selector, CrawlerError> {
    compile(custom.unwrap_or(fallback))
}

fn compile_optional(custom: Option<&str>) -> Result<Option<Selector>, CrawlerError> {
    custom.map(compile).transpose()
}

/// Extracts every article on a listing page
///
/// Candidates are the elements matched by the source's `article` selector.
/// A candidate without a title produces nothing; a candidate that fails is
/// logged and skipped so its siblings are still extracted.
///
/// # Arguments
///
/// * `html` - The page body
/// * `source` - Source whose selectors and name are applied
/// * `page_url` - URL the page was fetched from, used when a candidate has no link
///
/// # Returns
///
/// * `Ok(Vec<Article>)` - Extracted articles in document order
/// * `Err(CrawlerError::InvalidSelector)` - A configured selector does not parse
pub fn extract_articles(
    html: &str,
    source: &Source,
    page_url: &str,
) -> Result<Vec<Article>, CrawlerError> {
    let selectors = CompiledSelectors::compile(&source.selectors)?;
    let document = Html::parse_document(html);

    let mut articles = Vec::new();
    for (index, candidate) in document.select(&selectors.article).enumerate() {
        match extract_candidate(candidate, &selectors, source, page_url) {
            Ok(Some(article)) => articles.push(article),
            Ok(None) => tracing::trace!("Candidate {} on {} has no title", index, page_url),
            Err(e) => tracing::warn!("Skipping candidate {} on {}: {}", index, page_url, e),
        }
    }

    tracing::debug!(
        "Extracted {} articles from {} for {}",
        articles.len(),
        page_url,
        source.name
    );
    Ok(articles)
}

fn extract_candidate(
    candidate: ElementRef<'_>,
    selectors: &CompiledSelectors,
    source: &Source,
    page_url: &str,
) -> Result<Option<Article>, CrawlerError> {
    let title = match first_text(candidate, &selectors.title) {
        Some(title) => title,
        None => return Ok(None),
    };

    let content = if selectors.custom_content {
        joined_text(candidate, &selectors.content, " ")
    } else {
        first_text(candidate, &selectors.content).unwrap_or_default()
    };
    let content = if content.is_empty() {
        title.clone()
    } else {
        content
    };

    let url = match candidate
        .select(&selectors.link)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| is_followable(href))
    {
        Some(href) => resolve_url(href, &source.base_url),
        None => page_url.to_string(),
    };
    parse_http_url(&url).map_err(|e| CrawlerError::Extraction {
        url: url.clone(),
        message: e.to_string(),
    })?;

    let published_at = selectors
        .date
        .as_ref()
        .and_then(|selector| candidate.select(selector).next())
        .and_then(|el| {
            el.value()
                .attr("datetime")
                .map(str::to_string)
                .or_else(|| Some(element_text(el)))
        })
        .and_then(|raw| parse_published(&raw))
        .unwrap_or_else(Utc::now);

    let author = selectors
        .author
        .as_ref()
        .and_then(|selector| first_text(candidate, selector));
    let category = selectors
        .category
        .as_ref()
        .and_then(|selector| first_text(candidate, selector));

    Ok(Some(Article {
        id: Article::generate_id(&url, &title),
        title,
        content,
        images: image_urls(candidate, &selectors.image, &source.base_url),
        url,
        source: source.name.clone(),
        published_at,
        author,
        category,
    }))
}

/// Extracts the single article a detail page is about
///
/// The title comes from the first `h1`, then `<title>`. Returns None when the
/// page has neither.
pub fn extract_page_article(html: &str, url: &str, source: &Source) -> Option<Article> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let title = [PAGE_TITLE, PAGE_TITLE_TAG]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| first_text(root, &selector))?;

    let content = Selector::parse(PAGE_CONTENT)
        .map(|selector| joined_text(root, &selector, "\n\n"))
        .unwrap_or_default();

    let images = Selector::parse(PAGE_IMAGES)
        .map(|selector| image_urls(root, &selector, url))
        .unwrap_or_default();

    Some(Article {
        id: Article::generate_id(url, &title),
        title,
        content,
        url: url.to_string(),
        source: source.name.clone(),
        published_at: Utc::now(),
        author: None,
        images,
        category: None,
    })
}

/// Collapses whitespace in an element's text
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match, if it is non-empty
fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn joined_text(scope: ElementRef<'_>, selector: &Selector, separator: &str) -> String {
    scope
        .select(selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn image_urls(scope: ElementRef<'_>, selector: &Selector, base: &str) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    for img in scope.select(selector) {
        let src = img
            .value()
            .attr("src")
            .or_else(|| img.value().attr("data-src"))
            .map(str::trim)
            .filter(|src| !src.is_empty() && !src.starts_with("data:"));

        if let Some(src) = src {
            let resolved = resolve_url(src, base);
            if !images.contains(&resolved) {
                images.push(resolved);
            }
        }
    }
    images
}

fn is_followable(href: &str) -> bool {
    let href = href.trim();
    !(href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:"))
}

/// Parses a published date in RFC 3339, RFC 2822, or `YYYY-MM-DD` form
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
