use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use dotenv::dotenv;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sentinel::config;
use sentinel::connectors::{IbkrReferenceSource, KrakenPriceSource, NewsApiSource};
use sentinel::pipeline::{Pipeline, SentinelRun};
use sentinel::report;
use sentinel::{ConfigError, SentinelError};

/// Prints a one-shot report bridging S&P 500 news sentiment and the BTC/USD price.
///
/// Settings are read from `config.ini` (or the file named by SENTINEL_CONFIG).
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Logs go to stderr so stdout only carries the report
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let _cli = Cli::parse();

    println!("Starting Project Sentinel...");

    let config_path = config::config_path();
    match run(&config_path).await {
        Ok(outcome) => {
            debug!(
                "Run summary: {}",
                serde_json::to_string(&outcome).unwrap_or_default()
            );
            if outcome.is_degraded() {
                let sources: Vec<&str> = outcome.degraded.iter().map(|d| d.source).collect();
                warn!("Report built with fallback data from: {}", sources.join(", "));
            }
            Ok(())
        }
        Err(e) => {
            print_failure(&e, &config_path);
            std::process::exit(1);
        }
    }
}

async fn run(config_path: &Path) -> sentinel::Result<SentinelRun> {
    let config = config::load_config(config_path)?;
    info!("Configuration loaded. Fetching data...");

    let pipeline = Pipeline::new(
        Box::new(IbkrReferenceSource::new(&config.ibkr)),
        Box::new(NewsApiSource::new(config.news_api.api_key.clone())),
        Box::new(KrakenPriceSource::new()),
    );
    let outcome = pipeline.run().await;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_report(&mut out, &outcome.report, Utc::now())?;

    Ok(outcome)
}

fn print_failure(error: &SentinelError, config_path: &Path) {
    let file = config_path.display();
    match error {
        SentinelError::Config(ConfigError::MissingFile(_)) => {
            eprintln!("\nCRITICAL ERROR: {}", error);
            eprintln!("Please make sure '{}' exists in the working directory.", file);
            eprintln!("You can create it from 'config.ini.example'.");
        }
        SentinelError::Config(ConfigError::MissingSection(section)) => {
            eprintln!("\nCONFIGURATION ERROR: section [{}] is missing from '{}'.", section, file);
        }
        SentinelError::Config(ConfigError::MissingOption { section, option }) => {
            eprintln!(
                "\nCONFIGURATION ERROR: option '{}' is missing from section [{}] of '{}'.",
                option, section, file
            );
        }
        SentinelError::Config(ConfigError::InvalidValue { section, option, value }) => {
            eprintln!(
                "\nCONFIGURATION ERROR: option '{}' in section [{}] of '{}' has invalid value '{}'.",
                option, section, file, value
            );
        }
        SentinelError::Config(ConfigError::Parse(message)) => {
            eprintln!("\nCONFIGURATION ERROR: '{}' could not be parsed: {}", file, message);
        }
        SentinelError::Io(_) => {
            eprintln!("\nAN UNEXPECTED ERROR OCCURRED:");
            eprintln!("Error type: {}", error.kind());
            eprintln!("Message: {}", error);
            eprintln!("Execution has stopped.");
        }
    }
}
