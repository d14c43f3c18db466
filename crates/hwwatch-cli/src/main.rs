//! hwwatch CLI
//!
//! Polls the homework review API and forwards status changes to a Telegram chat.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hwwatch_client::{build_http_client, ReviewApiClient, TelegramNotifier};
use hwwatch_core::{Config, PollLoop, TokioScheduler};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Trailer of `--help` describing where logs go.
const LOGGING_HELP: &str = "\
Logs are written to stdout and to HWWATCH_LOG_DIR/HWWATCH_LOG_FILE.
The log file rotates daily, not by size; HWWATCH_LOG_BACKUPS older files are kept.";

/// hwwatch - Homework Review Watcher
///
/// Periodically asks the review API for status changes of your homework
/// submissions and sends each change to a Telegram chat.
#[derive(Parser, Debug)]
#[command(name = "hwwatch")]
#[command(version, about, long_about = None)]
#[command(after_help = LOGGING_HELP)]
struct Args {
    /// Path to a .env file (default: .env in the current directory, if present)
    #[arg(short, long, value_name = "FILE")]
    env_file: Option<PathBuf>,

    /// Run a single poll iteration and exit
    #[arg(long)]
    once: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let args = Args::parse();

    // Environment file first, so it can feed both logging and configuration
    let env_loaded = match args.env_file.as_deref() {
        Some(path) => dotenvy::from_path(path).map(|()| Some(path.to_path_buf())),
        None => Ok(dotenvy::dotenv().ok()),
    };

    let config = Config::from_env();
    let _guard = init_tracing(args.verbose, config.as_ref().ok());

    match env_loaded {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "Loaded environment file"),
        Ok(None) => tracing::debug!("No environment file found"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load environment file");
            return ExitCode::from(1);
        }
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(severity = e.severity(), "{e}");
            return ExitCode::from(1);
        }
    };

    tracing::info!("hwwatch starting");
    tracing::debug!(config = ?config, "Configuration");

    match run(&config, args.once).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// Wires the clients into a poll loop and drives it.
async fn run(config: &Config, once: bool) -> anyhow::Result<ExitCode> {
    let http = build_http_client(config)?;
    let source = ReviewApiClient::from_config(http.clone(), config);
    let notifier = TelegramNotifier::from_config(http, config);

    let mut poll_loop = PollLoop::new(source, notifier, TokioScheduler, config.retry_period());

    if once {
        let outcome = poll_loop.tick().await;
        tracing::info!(outcome = ?outcome, "Single iteration finished");
        return Ok(if outcome.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        });
    }

    poll_loop.announce().await;

    tracing::info!(
        retry_period_secs = config.retry_period_secs,
        cursor = poll_loop.cursor(),
        "Poll loop started, press Ctrl+C to stop"
    );

    poll_loop
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!("hwwatch stopped");
    Ok(ExitCode::SUCCESS)
}

/// Installs the stdout and rotating file log layers.
///
/// Priority: `RUST_LOG` env var > `--verbose` flag > default (info). The file
/// layer is only installed once configuration is known; the returned guard
/// flushes it on drop.
fn init_tracing(verbose: bool, config: Option<&Config>) -> Option<WorkerGuard> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let appender = config.map(|config| {
        Builder::new()
            .rotation(Rotation::DAILY)
            .filename_prefix(&config.log_file)
            .max_log_files(config.log_backups + 1)
            .build(&config.log_dir)
    });

    let (file_layer, guard, file_error) = match appender {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard), None)
        }
        Some(Err(e)) => (None, None, Some(e)),
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        tracing::warn!(error = %e, "Failed to open log file, logging to stdout only");
    }

    guard
}
