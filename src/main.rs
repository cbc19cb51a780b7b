//! Trackstrip - Language Track Filter
//!
//! Entry point: parses arguments, sets up logging, runs the pre-flight checks
//! and then processes the input file or directory one file at a time.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trackstrip::cli::Args;
use trackstrip::config::{Config, DEFAULT_CONFIG_FILE};
use trackstrip::setup::preflight;
use trackstrip::workflow::Workflow;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration first; its log directory is needed before anything is reported
    let loaded = load_config(args.config.as_deref());
    let log_dir = loaded.as_ref().ok().and_then(|c| c.logging.directory.clone());

    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = setup_logging(args.verbose, log_dir.as_deref())?;

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Ok(());
        }
    };

    // Let the flags override the file
    let policy = match args.resolve_policy(&mut config) {
        Ok(policy) => policy,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Ok(());
        }
    };
    info!(
        "Keeping audio {:?}, subtitles {:?} ({}, verification {})",
        policy.audio_languages(),
        policy.subtitle_languages(),
        if policy.copy_streams() { "stream copy" } else { "re-encode" },
        if policy.verify_output() { "on" } else { "off" }
    );

    let input_path = match std::path::absolute(&args.input_path) {
        Ok(path) if path.exists() => path,
        _ => {
            error!("Input path does not exist: {}", args.input_path.display());
            return Ok(());
        }
    };

    if let Err(e) = preflight(&config.tools, &config.batch).await {
        error!("{}", e);
        error!("Processing stopped due to missing dependencies.");
        return Ok(());
    }

    let workflow = Workflow::new(&config, policy);
    if let Err(e) = workflow.run(&input_path).await {
        error!("{}", e);
    }

    Ok(())
}

/// Explicit `--config`, else `trackstrip.toml` in the current directory, else defaults
fn load_config(path: Option<&Path>) -> trackstrip::error::Result<Config> {
    let config = match path {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            if local.exists() {
                Config::from_file(&local)?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

/// Setup logging to the console and, when a directory is configured, to a daily log file
fn setup_logging(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer().with_target(false);

    // Create file layer with daily rotation
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = rolling::daily(dir, "trackstrip.log");
            let (non_blocking_file, guard) = non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false); // No ANSI colors in file
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Setup layered subscriber
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match log_dir {
        Some(dir) => info!(
            "Logging initialized - console: {}, file: {}",
            log_level,
            dir.join("trackstrip.log").display()
        ),
        None => info!("Logging initialized - console: {}", log_level),
    }

    Ok(guard)
}
