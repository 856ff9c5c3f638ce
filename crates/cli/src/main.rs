//! portal-access - manage data ingestion portal user access from the terminal

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "portal-access")]
#[command(about = "Manage user roles and country dataset grants in the ingestion portal")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Configuration file (JSON, TOML or YAML)
    #[arg(short = 'c', long, global = true, env = "PORTAL_ACCESS_CONFIG")]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "120")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.log_level.into(), cli.log_file.as_deref())?;

    info!("Starting portal-access");

    let outcome = if cli.timeout == 0 {
        Ok(cli.command.execute(cli.config).await)
    } else {
        let timeout_duration = Duration::from_secs(cli.timeout);
        tokio::time::timeout(timeout_duration, cli.command.execute(cli.config)).await
    };

    match outcome {
        Ok(Ok(())) => {
            info!("Command completed successfully");
        }
        Ok(Err(e)) => {
            error!("Command failed: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
        Err(_) => {
            error!("Command timed out after {} seconds", cli.timeout);
            eprintln!("Error: command timed out after {} seconds", cli.timeout);
            std::process::exit(1);
        }
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
