//! News-Crawler main entry point
//!
//! This is the command-line interface for the news crawler.

use clap::Parser;
use news_crawler::config::{load_config_with_hash, Config};
use news_crawler::crawler::{crawl, Orchestrator};
use news_crawler::output::{print_articles, print_statistics};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// News-Crawler: a polite news article harvester
///
/// Crawls the configured news sources while respecting robots.txt,
/// crawl delays, and per-domain rate limits, then prints the articles
/// it found.
#[derive(Parser, Debug)]
#[command(name = "news-crawler")]
#[command(version)]
#[command(about = "A polite news article harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Crawl only the source with this id
    #[arg(long, value_name = "ID")]
    source: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, cli.source.as_deref())?;
    } else if let Some(source_id) = cli.source {
        handle_single_source(config, &source_id).await?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("news_crawler=info,warn"),
            1 => EnvFilter::new("news_crawler=debug,info"),
            2 => EnvFilter::new("news_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, only: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== News-Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!("  Robots timeout: {}ms", config.crawler.robots_timeout_ms);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots_txt);
    println!("  Respect crawl-delay: {}", config.crawler.respect_crawl_delay);
    println!("  Max concurrent: {}", config.crawler.max_concurrent);
    println!("  Max retries: {}", config.crawler.max_retries);

    println!("\nRate Limits:");
    println!("  Per second: {}", config.rate_limit.requests_per_second);
    if let Some(rpm) = config.rate_limit.requests_per_minute {
        println!("  Per minute: {}", rpm);
    }
    if let Some(rph) = config.rate_limit.requests_per_hour {
        println!("  Per hour: {}", rph);
    }
    println!("  Min delay: {}ms", config.rate_limit.min_delay_ms);
    println!("  Per domain: {}", config.rate_limit.per_domain);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    let sources: Vec<_> = match only {
        Some(id) => config.sources.iter().filter(|s| s.id == id).collect(),
        None => config.enabled_sources().collect(),
    };
    if let Some(id) = only {
        if sources.is_empty() {
            return Err(format!("Source {} not found", id).into());
        }
    }

    println!("\nSources ({}):", sources.len());
    for source in &sources {
        println!("  - {} [{}] {}", source.name, source.id, source.base_url);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} sources", sources.len());

    Ok(())
}

/// Handles --source: crawls one configured source, enabled or not
async fn handle_single_source(
    config: Config,
    source_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = Orchestrator::new(config)?;
    let source = orchestrator
        .find_source(source_id)
        .cloned()
        .ok_or_else(|| format!("Source {} not found", source_id))?;

    let articles = orchestrator.crawl_source(&source).await;
    let stats = orchestrator.stats();
    orchestrator.shutdown().await;

    print_articles(&articles);
    print_statistics(&stats);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Sources: {} configured, {} enabled",
        config.sources.len(),
        config.enabled_sources().count()
    );

    match crawl(config).await {
        Ok((articles, stats)) => {
            tracing::info!("Crawl completed successfully");
            print_articles(&articles);
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
