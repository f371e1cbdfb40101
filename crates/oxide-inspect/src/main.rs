//! oxide-inspect CLI
//!
//! Command-line tool for looking at a database through its dialect adapter.

mod inspect;

use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_adapter::prelude::*;
use oxide_adapter_sqlite::SqliteDriver;

use crate::inspect::Commands;

/// Inspect a database through oxide-adapter.
#[derive(Parser)]
#[command(name = "oxide-inspect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL.
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite::memory:")]
    database: String,

    /// Dialect to use instead of detecting it from the driver.
    #[arg(short, long, env = "OXIDE_ADAPTER")]
    adapter: Option<String>,

    /// JSON file with adapter options.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = inspect::load_config(cli.config.as_deref(), cli.adapter)?;
    debug!(?config, "adapter configuration loaded");

    let driver = SqliteDriver::connect(&cli.database)?;
    let mut conn = Connection::new(driver, config)?;

    let output = inspect::run(&mut conn, &cli.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
