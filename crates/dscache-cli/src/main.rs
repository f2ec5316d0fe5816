//! dscache CLI - versioned dataset cache tool.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dscache_core::config::LogFormat;
use dscache_core::Config;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

/// Exit codes for CLI operations.
///
/// Following Unix conventions:
/// - 0: Success
/// - 1-127: Application errors
#[repr(i32)]
#[derive(Debug, Clone, Copy)]
pub enum ExitCode {
    /// Successful execution
    Success = 0,
    /// Configuration error (invalid config file, missing required fields)
    ConfigError = 1,
    /// Dataset fetch error (network, status, malformed body)
    FetchError = 2,
    /// Durable store error
    StoreError = 3,
    /// General runtime error
    RuntimeError = 10,
}

impl ExitCode {
    /// Map an error to an exit code by inspecting the core error type.
    fn from_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<dscache_core::Error>() {
            Some(dscache_core::Error::Config(_)) => Self::ConfigError,
            Some(dscache_core::Error::Fetch(_)) => Self::FetchError,
            Some(
                dscache_core::Error::Store(_)
                | dscache_core::Error::Wipe(_)
                | dscache_core::Error::Populate(_),
            ) => Self::StoreError,
            None => {
                let message = error.to_string().to_lowercase();
                if message.contains("config") || message.contains("toml") {
                    Self::ConfigError
                } else {
                    Self::RuntimeError
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(name = "dscache")]
#[command(about = "Versioned dataset cache CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the dataset and reconcile the local stores
    Sync,

    /// Sample records from a collection
    Sample {
        /// Collection name to sample from
        collection: String,

        /// Number of records to sample
        #[arg(long, default_value_t = 1)]
        count: usize,

        /// Sample from the installed stores without fetching
        #[arg(long)]
        offline: bool,
    },

    /// Show installed version and per-collection key counts
    Status,

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() {
    let exit_code = run_cli().await;
    std::process::exit(exit_code as i32);
}

/// Main CLI execution logic with proper error handling.
async fn run_cli() -> ExitCode {
    let cli = Cli::parse();

    // Try to load config for log format settings (optional - falls back to text)
    let log_format = cli
        .config
        .as_ref()
        .and_then(|path| std::fs::read_to_string(path).ok())
        .and_then(|content| toml::from_str::<Config>(&content).ok())
        .map(|config| config.log.format)
        .unwrap_or(LogFormat::Text);

    // Initialize logging
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match cli.verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    match log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .init();
        }
    }

    match execute_command(cli).await {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::from_error(&e)
        }
    }
}

/// Execute the CLI command.
async fn execute_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Sync => {
            let config = load_config(&cli.config)?;
            commands::sync::run(config).await?;
        }

        Commands::Sample {
            collection,
            count,
            offline,
        } => {
            let config = load_config(&cli.config)?;
            commands::sample::run(config, &collection, count, offline).await?;
        }

        Commands::Status => {
            let config = load_config(&cli.config)?;
            commands::status::run(config).await?;
        }

        Commands::Validate => {
            let config = load_config(&cli.config)?;
            config.validate()?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}

fn load_config(path: &Option<PathBuf>) -> Result<Config> {
    let path = path.clone().unwrap_or_else(|| PathBuf::from("dscache.toml"));

    let content = std::fs::read_to_string(&path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}
