//! # Input Router
//!
//! Routes keyboard and mouse input into the standard virtual controller.
//!
//! Devices are driven by text commands on stdin (see
//! [`input_router::device::console`]), which makes the binary a small
//! interactive harness for the routing graph.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use input_router::config::{Config, LoggingConfig};
use input_router::device::console::{read_commands, ConsoleProvider};
use input_router::dispatch::Dispatcher;
use input_router::runner::run_frames;
use input_router::trace::{attach, ControlTrace};
use input_router::virtual_controller::StandardController;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix of the daily rolling log
const LOG_FILE_PREFIX: &str = "input-router.log";

/// Main entry point for the input router
///
/// # Control Flow
///
/// 1. Load configuration (first argument, else `config/default.toml`, else
///    built-in defaults)
/// 2. Set up logging
/// 3. Detect console devices and register the standard virtual controller
/// 4. Read stdin commands on a background task
/// 5. Run the frame loop until Ctrl+C
///
/// # Errors
///
/// Returns error if the configuration is invalid or the trace file cannot be
/// created.
///
/// # Examples
///
/// ```bash
/// echo "Keyboard W down" | cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_path) = load_config(std::env::args().nth(1).map(PathBuf::from))?;
    let _guard = init_logging(&config.logging);

    info!("Input Router v{} starting...", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file, using defaults"),
    }

    let console = ConsoleProvider::new();
    let inputs = console.inputs();
    let mut dispatcher = Dispatcher::with_providers(vec![Box::new(console)]);

    if config.standard.enabled {
        let layout = StandardController::from_config(&config.standard);
        dispatcher
            .add_virtual_controller(&layout)
            .context("failed to register standard controller")?;
    }

    if config.trace.enabled {
        match dispatcher.find_controller(&config.trace.controller) {
            Some(id) => {
                let trace = ControlTrace::create(&config.trace.path, &config.trace.controller)
                    .with_context(|| format!("failed to create trace {}", config.trace.path))?;
                attach(&mut dispatcher, id, trace)?;
            }
            None => warn!(
                "Trace controller '{}' not found, tracing disabled",
                config.trace.controller
            ),
        }
    }

    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        match read_commands(stdin, inputs).await {
            Ok(applied) => info!("Console input closed after {} commands", applied),
            Err(e) => warn!("Console input failed: {}", e),
        }
    });

    info!("Press Ctrl+C to exit");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down...");
    };
    let summary = run_frames(&mut dispatcher, &config.dispatcher, shutdown).await;

    info!(
        "Total: {} frames, {} dirty, {} informed, {} propagated",
        summary.frames, summary.totals.dirty, summary.totals.informed, summary.totals.propagated
    );
    Ok(())
}

/// Resolves and loads the configuration.
///
/// An explicit path must exist; the default path is optional.
fn load_config(explicit: Option<PathBuf>) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let config = Config::load(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        return Ok((config, Some(path)));
    }

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        let config = Config::load(default_path)
            .with_context(|| format!("failed to load config {}", DEFAULT_CONFIG_PATH))?;
        return Ok((config, Some(default_path.to_path_buf())));
    }

    Ok((Config::default(), None))
}

/// Installs the console subscriber and, if configured, a daily rolling file.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let (file_layer, guard) = if logging.log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&logging.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}
