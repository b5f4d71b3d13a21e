//! Output module for crawl results
//!
//! This module handles:
//! - Recording crawl statistics
//! - Printing extracted articles and statistics for the CLI

pub mod stats;

pub use stats::{print_statistics, CrawlerStats, StatsRecorder};

use crate::crawler::Article;

/// Prints extracted articles to stdout, grouped by source
///
/// # Arguments
///
/// * `articles` - Articles in the order they were extracted
pub fn print_articles(articles: &[Article]) {
    println!("=== Articles ({}) ===", articles.len());

    let mut current_source: Option<&str> = None;
    for article in articles {
        if current_source != Some(article.source.as_str()) {
            println!("\n{}:", article.source);
            current_source = Some(article.source.as_str());
        }

        println!("  - {}", article.title);
        println!("    {}", article.url);
        println!(
            "    published {}{}",
            article.published_at.format("%Y-%m-%d %H:%M UTC"),
            article
                .author
                .as_deref()
                .map(|author| format!(" by {}", author))
                .unwrap_or_default()
        );
    }
    println!();
}
