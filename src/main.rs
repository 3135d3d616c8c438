//! Dokkan-Archive main entry point
//!
//! This is the command-line interface for the Dokkan-Archive card crawler.

use anyhow::Context;
use clap::Parser;
use dokkan_archive::config::{hash_with_overrides, load_config_with_hash, Config};
use dokkan_archive::crawler::{crawl, stop_on_ctrl_c, SessionSnapshot, StopSignal};
use dokkan_archive::output::{export_dataset, load_statistics, print_statistics};
use dokkan_archive::storage::{open_storage, Storage};
use dokkan_archive::SessionState;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Dokkan-Archive: an incremental card crawler
///
/// Dokkan-Archive walks the catalog's card list, fetches detail pages for
/// cards it has not seen yet, and keeps a resumable SQLite dataset of
/// structured card records linked into version groups.
#[derive(Parser, Debug)]
#[command(name = "dokkan-archive")]
#[command(version)]
#[command(about = "An incremental card crawler and index", long_about = None)]
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

    /// Continue from the saved frontier (overrides the config)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Ignore the saved frontier and start again from list page 1
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Re-fetch cards that are already in the index
    #[arg(long)]
    force_refresh: bool,

    /// New-item budget for this run (overrides the config)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_new: Option<u32>,

    /// Validate config and show pending work without fetching anything
    #[arg(long, conflicts_with_all = ["stats", "export"])]
    dry_run: bool,

    /// Show statistics from the dataset and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export"])]
    stats: bool,

    /// Export the dataset as JSON and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    ///
    /// # Returns
    ///
    /// The applied overrides as `key=value` pairs, for the run's config hash
    fn apply_overrides(&self, config: &mut Config) -> Vec<String> {
        let mut applied = Vec::new();
        if self.fresh {
            config.crawler.resume = false;
            applied.push("resume=false".to_string());
        } else if self.resume {
            config.crawler.resume = true;
            applied.push("resume=true".to_string());
        }
        if self.force_refresh {
            config.crawler.forced_refresh = true;
            applied.push("forced-refresh=true".to_string());
        }
        if let Some(max_new) = self.max_new {
            config.crawler.max_new_items = max_new;
            applied.push(format!("max-new-items={}", max_new));
        }
        applied
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, file_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", file_hash);

    let overrides = cli.apply_overrides(&mut config);
    let config_hash = hash_with_overrides(&file_hash, &overrides);
    if !overrides.is_empty() {
        tracing::info!(
            "Command-line overrides: {} (run hash: {})",
            overrides.join(", "),
            config_hash
        );
    }

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.export {
        handle_export(&config)
    } else {
        handle_crawl(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("dokkan_archive=info,warn"),
            1 => EnvFilter::new("dokkan_archive=debug,info"),
            2 => EnvFilter::new("dokkan_archive=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows pending work
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Dokkan-Archive Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  New-item budget: {}", config.crawler.max_new_items);
    println!("  Max list pages: {}", config.crawler.max_pages);
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Rate limit: {}ms", config.crawler.rate_limit_ms);
    println!("  Resume: {}", config.crawler.resume);
    println!("  Forced refresh: {}", config.crawler.forced_refresh);

    println!("\nSource:");
    println!("  Base URL: {}", config.source.base_url);
    println!("  List path: {}", config.source.list_path);
    println!("  Strategy: {}", config.source.strategy);
    if let Some(endpoint) = &config.source.render_endpoint {
        println!("  Render endpoint: {}", endpoint);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Export: {}", config.output.export_path);
    if config.output.download_assets {
        println!("  Assets: {}", config.output.assets_dir);
    }

    println!("\n✓ Configuration is valid");

    let database_path = Path::new(&config.output.database_path);
    if !database_path.exists() {
        println!("✓ No dataset yet; would start from list page 1");
        return Ok(());
    }

    let storage = open_storage(database_path)?;
    let snapshot = SessionSnapshot::load(&storage)?;
    println!("✓ Dataset is consistent ({} cards indexed)", snapshot.index.len());

    match snapshot.cursor.filter(|_| config.crawler.resume) {
        Some(cursor) => println!(
            "✓ Would resume with {} pending items ({} detail pages)",
            cursor.len(),
            cursor.pending_details()
        ),
        None => println!("✓ Would start from list page 1"),
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the dataset
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export mode: writes the dataset as JSON
fn handle_export(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting Dataset ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.export_path);
    println!();

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let integrity = storage.check_integrity()?;
    anyhow::ensure!(
        integrity.is_empty(),
        "dataset failed its integrity check: {}",
        integrity.join("; ")
    );

    let count = export_dataset(&storage, Path::new(&config.output.export_path))?;
    println!("✓ Exported {} cards to: {}", count, config.output.export_path);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    if config.crawler.resume {
        tracing::info!("Starting crawl (will resume from the saved frontier)");
    } else {
        tracing::info!("Starting fresh crawl from list page 1");
    }
    if config.crawler.forced_refresh {
        tracing::info!("Forced refresh: known cards will be fetched again");
    }

    let stop = StopSignal::new();
    stop_on_ctrl_c(stop.clone());

    let report = crawl(config, config_hash, stop).await?;

    match report.state {
        SessionState::Done => tracing::info!("Crawl completed: frontier exhausted"),
        SessionState::BudgetReached => tracing::info!(
            "Crawl paused: budget reached with {} items pending",
            report.pending
        ),
        _ => tracing::info!("Crawl stopped with {} items pending", report.pending),
    }
    println!(
        "{}: {} new, {} updated, {} unchanged, {} failed",
        report.state, report.inserted, report.updated, report.unchanged, report.failed
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dokkan_archive::config::parse_config;

    const CONFIG: &str = r#"
[crawler]
max-new-items = 25

[source]
base-url = "https://dokkaninfo.com"

[user-agent]
crawler-name = "DokkanArchive"
crawler-version = "0.3"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
database-path = "./cards.db"
"#;

    #[test]
    fn test_overrides_are_applied_and_reported() {
        let cli = Cli::parse_from([
            "dokkan-archive",
            "config.toml",
            "--fresh",
            "--force-refresh",
            "--max-new",
            "5",
        ]);
        let mut config = parse_config(CONFIG).unwrap();

        let applied = cli.apply_overrides(&mut config);

        assert!(!config.crawler.resume);
        assert!(config.crawler.forced_refresh);
        assert_eq!(config.crawler.max_new_items, 5);
        assert_eq!(
            applied,
            vec!["resume=false", "forced-refresh=true", "max-new-items=5"]
        );
        assert_ne!(hash_with_overrides("abc", &applied), "abc");
    }

    #[test]
    fn test_no_overrides_keep_file_hash() {
        let cli = Cli::parse_from(["dokkan-archive", "config.toml"]);
        let mut config = parse_config(CONFIG).unwrap();

        let applied = cli.apply_overrides(&mut config);

        assert!(applied.is_empty());
        assert_eq!(config.crawler.max_new_items, 25);
        assert_eq!(hash_with_overrides("abc", &applied), "abc");
    }
}
