//! Crawldex entry point
//!
//! Loads the configuration, wires the indexing pipeline, and serves the
//! HTTP control endpoints.

use clap::Parser;
use crawldex::api;
use crawldex::config::load_config_with_hash;
use crawldex::storage::{SharedStore, SqliteStore};
use crawldex::IndexingCoordinator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Crawldex: multi-site crawler and inverted-index builder
#[derive(Parser, Debug)]
#[command(name = "crawldex")]
#[command(version)]
#[command(about = "Multi-site crawler and inverted-index builder", long_about = None)]
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

    /// Validate config and show what would be indexed without serving
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, &config_hash);
        return Ok(());
    }

    serve(config).await
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawldex=info,tower_http=info,warn"),
            1 => EnvFilter::new("crawldex=debug,tower_http=debug,info"),
            2 => EnvFilter::new("crawldex=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Prints the effective configuration and exits
fn handle_dry_run(config: &crawldex::Config, config_hash: &str) {
    println!("=== Crawldex Dry Run ===\n");

    println!("Config hash: {}", config_hash);

    println!("\nIndexing:");
    println!("  Parallelism: {}", config.indexing.parallelism);
    println!("  Batch size: {}", config.indexing.batch_size);

    println!("\nServer:");
    println!("  Listen: {}", config.server.listen);

    println!("\nDatabase:");
    println!("  Path: {}", config.database.path);

    println!("\nCaches:");
    println!(
        "  Page URLs: max {}, idle TTL {}s",
        config.caches.page_url_max, config.caches.page_url_idle_secs
    );
    println!(
        "  Lemmas: max {}, idle TTL {}s",
        config.caches.lemma_max, config.caches.lemma_idle_secs
    );

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        println!("  - {} ({})", site.name, site.url);
    }

    println!("\n✓ Configuration is valid");
}

/// Builds the pipeline and serves the control endpoints
async fn serve(config: crawldex::Config) -> Result<(), Box<dyn std::error::Error>> {
    let store: SharedStore = Arc::new(SqliteStore::new(config.database.path.as_ref())?);
    let coordinator = IndexingCoordinator::new(&config, store)?;

    let app = api::router(coordinator);
    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    tracing::info!(address = %config.server.listen, "control API listening");

    axum::serve(listener, app).await?;
    Ok(())
}
