//! NHIS payments crawler CLI
//!
//! Local execution entry point. Walks the payments grid in a headless
//! browser and appends new rows to the CSV record log, resuming from the last
//! recorded page.

use std::env;

use clap::Parser;
use nhis_crawler::{
    browser::ChromiumDriver,
    error::Result,
    models::{Config, ensure_csv_suffix},
    pipeline::{self, SessionState},
    storage::{CsvRecordLog, RecordStore},
};
use tokio_util::sync::CancellationToken;

/// Environment variable naming the TOML config file
const CONFIG_ENV: &str = "NHIS_CRAWLER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// NHIS payments crawler
#[derive(Parser, Debug)]
#[command(
    name = "nhis-crawler",
    version,
    about = "Resumable crawler for the NHIS facility payments grid"
)]
struct Cli {
    /// CSV file to append records to (".csv" is added when missing)
    #[arg(short, long)]
    output: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Seconds to wait for the grid to change page
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("NHIS crawler starting...");

    // Load configuration
    let config_path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = Config::load_or_default(&config_path);
    if let Some(output) = cli.output {
        config.output.file = output;
    }
    config.output.file = ensure_csv_suffix(&config.output.file);
    if let Some(timeout) = cli.timeout {
        config.wait.timeout_secs = timeout;
    }

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }
    log::info!("Loaded configuration from {}", config_path);

    let store = RecordStore::load_or_init(CsvRecordLog::new(&config.output.file))?;
    log::info!("Record log: {}", config.output.file);

    let cancel = CancellationToken::new();
    let signals = futures::stream::unfold((), |()| async {
        tokio::signal::ctrl_c().await.ok().map(|()| ((), ()))
    });
    tokio::spawn(pipeline::watch_interrupts(
        Box::pin(signals),
        cancel.clone(),
        || std::process::exit(pipeline::FORCED_EXIT_CODE),
    ));

    let driver = ChromiumDriver::launch(&config.browser).await?;
    let report = pipeline::run_crawler(&config, driver, store, cancel).await?;

    match report.final_state {
        SessionState::Interrupted => log::info!("Stopped early; rerun to resume."),
        _ => log::info!("Done!"),
    }

    Ok(())
}
