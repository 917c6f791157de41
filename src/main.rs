//! Loopcrawl main entry point
//!
//! This is the command-line interface for the Loopcrawl keyword crawler.

use anyhow::{Context, Result};
use clap::Parser;
use loopcrawl::config::{load_config_with_hash, Config, LogConfig};
use loopcrawl::crawler::run_crawl;
use loopcrawl::output::{load_statistics, print_run_summary, print_statistics};
use loopcrawl::storage::open_storage;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Number of pages listed by --stats
const STATS_TOP_PAGES: usize = 10;

/// Loopcrawl: a self-feeding keyword crawler
///
/// Loopcrawl fetches pages from its seeds, scores them against a keyword
/// list, stores and indexes them, and feeds every link it has not seen
/// recently back into its own frontier.
#[derive(Parser, Debug)]
#[command(name = "loopcrawl")]
#[command(version)]
#[command(about = "A self-feeding keyword crawler", long_about = None)]
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

    /// Stop the crawl after this many seconds (overrides max-duration-secs)
    #[arg(long, value_name = "SECS")]
    duration: Option<u64>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the page store and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    setup_logging(cli.verbose, cli.quiet, config.log.as_ref())?;
    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    if let Some(secs) = cli.duration {
        config.crawler.max_duration_secs = Some(secs);
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a `[log]` section, JSON lines are appended to that file instead of
/// being written to stderr.
fn setup_logging(verbose: u8, quiet: bool, log: Option<&LogConfig>) -> Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("loopcrawl=info,warn"),
            1 => EnvFilter::new("loopcrawl=debug,info"),
            2 => EnvFilter::new("loopcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    match log {
        Some(log) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log.path)
                .with_context(|| format!("failed to open log file {}", log.path))?;

            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .init();
        }
    }

    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;
    println!("=== Loopcrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Frontier capacity: {}", crawler.frontier_capacity);
    println!("  Max concurrent fetches: {}", crawler.max_concurrent_fetches);
    println!("  Request timeout: {}ms", crawler.request_timeout_ms);
    println!("  Fetch delay: {}ms", crawler.fetch_delay_ms);
    println!("  Max response size: {} bytes", crawler.max_content_bytes);
    println!(
        "  Retries: {} (backoff {}ms)",
        crawler.max_retries, crawler.retry_backoff_ms
    );
    println!("  Freshness window: {}s", crawler.freshness_window_secs);
    println!("  Valuable threshold: {}", crawler.valuable_threshold);
    match crawler.max_duration_secs {
        Some(secs) => println!("  Duration limit: {}s", secs),
        None => println!("  Duration limit: none (runs until Ctrl-C)"),
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.value);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nSearch Index:");
    match &config.index {
        Some(index) => {
            println!("  Address: {}", index.address);
            println!("  Index: {}", index.index_name);
            println!(
                "  Auth: {}",
                if index.username.is_some() { "basic" } else { "none" }
            );
        }
        None => println!("  disabled"),
    }

    println!("\nKeywords ({}):", config.keywords.len());
    for keyword in &config.keywords {
        println!("  - {}", keyword);
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URLs", config.seeds.len());
}

/// Handles the --stats mode: shows statistics from the page store
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))
        .context("failed to open page store")?;
    let stats = load_statistics(&storage, STATS_TOP_PAGES)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<()> {
    tracing::info!(
        "Seeds: {}, keywords: {}",
        config.seeds.len(),
        config.keywords.len()
    );

    let snapshot = run_crawl(config, shutdown_signal())
        .await
        .context("crawl failed")?;

    print_run_summary(&snapshot);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
