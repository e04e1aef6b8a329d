//! SEI Harvester main entry point
//!
//! This is the command-line interface for the SEI case-record harvester.

use clap::Parser;
use sei_harvester::config::{load_config_with_hash, Config};
use sei_harvester::crawler::harvest;
use sei_harvester::output::print_run_summary;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// SEI Harvester: a case-record crawler for the SEI portal
///
/// Logs into the portal, walks every organizational unit's inbound record
/// list and stores the latest history entry of each record in SQLite.
#[derive(Parser, Debug)]
#[command(name = "sei-harvester")]
#[command(version = "1.0.0")]
#[command(about = "Harvests case records from the SEI portal", long_about = None)]
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

    /// Validate config and show what would be harvested without starting a browser
    #[arg(long, conflicts_with_all = ["stats", "dump", "logout"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "dump", "logout"])]
    stats: bool,

    /// Print every stored record and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "logout"])]
    dump: bool,

    /// Delete the saved session and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "dump"])]
    logout: bool,
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

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.dump {
        handle_dump(&config)?;
    } else if cli.logout {
        handle_logout(&config)?;
    } else {
        handle_harvest(config).await?;
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
            0 => EnvFilter::new("sei_harvester=info,warn"),
            1 => EnvFilter::new("sei_harvester=debug,info"),
            2 => EnvFilter::new("sei_harvester=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== SEI Harvester Dry Run ===\n");

    println!("Portal:");
    println!("  Entry URL: {}", config.portal.entry_url);
    println!("  Organization: {}", config.portal.organization);

    println!("\nCredentials:");
    println!("  Username: {}", config.credentials.username);
    match (&config.credentials.password, &config.credentials.password_env) {
        (Some(_), _) => println!("  Password: inline"),
        (None, Some(var)) => println!("  Password: from ${}", var),
        (None, None) => println!("  Password: missing"),
    }

    println!("\nBrowser:");
    println!("  WebDriver: {}", config.browser.webdriver_url);
    println!("  Headless: {}", config.browser.headless);
    println!(
        "  Accept insecure certs: {}",
        config.browser.accept_insecure_certs
    );
    println!("  Page load timeout: {}ms", config.browser.page_load_timeout_ms);

    println!("\nCrawl:");
    println!("  Landing timeout: {}ms", config.crawl.landing_timeout_ms);
    println!("  List timeout: {}ms", config.crawl.list_timeout_ms);
    println!("  Frame timeout: {}ms", config.crawl.frame_timeout_ms);
    println!("  Settle delay: {}ms", config.crawl.settle_delay_ms);
    println!("  Max pages per unit: {}", config.crawl.max_pages_per_unit);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Cookie store: {}", config.output.cookie_dir);
    println!("  Commit mode: {}", config.output.commit_mode.as_str());
    println!("  Print records: {}", config.output.print_records);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use sei_harvester::output::{load_statistics, print_statistics};
    use sei_harvester::storage::open_storage;

    println!("Database: {}\n", config.output.database_path);

    // Open the database
    let storage = open_storage(
        Path::new(&config.output.database_path),
        config.output.commit_mode,
    )?;

    // Load statistics
    let stats = load_statistics(&storage)?;

    // Print statistics
    print_statistics(&stats);

    Ok(())
}

/// Handles the --dump mode: prints every stored record
fn handle_dump(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use sei_harvester::output::print_records;
    use sei_harvester::storage::{open_storage, RecordStore};

    let storage = open_storage(
        Path::new(&config.output.database_path),
        config.output.commit_mode,
    )?;

    print_records(&storage.records()?);

    Ok(())
}

/// Handles the --logout mode: forgets the saved session
fn handle_logout(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use sei_harvester::session::{FileKvStore, SessionStore};

    let sessions = SessionStore::new(FileKvStore::open(Path::new(&config.output.cookie_dir))?);

    if sessions.clear()? {
        println!("✓ Saved session removed from {}", config.output.cookie_dir);
    } else {
        println!("No saved session in {}", config.output.cookie_dir);
    }
    sessions.close();

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Harvesting {} as {} (WebDriver at {})",
        config.portal.organization,
        config.credentials.username,
        config.browser.webdriver_url
    );

    match harvest(config).await {
        Ok(summary) => {
            tracing::info!("Harvest completed successfully");
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
