//! CLI entrypoint for Feature Council
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use council_application::{RunCouncilInput, RunCouncilUseCase};
use council_infrastructure::{
    ConfigLoader, FileConfig, JsonlConversationLogger, create_decision_oracle,
};
use council_presentation::{Cli, ConsoleFormatter, OutputFormat, ProgressReporter, TaskPrompt};
use std::fs::OpenOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(&cli)?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    if cli.show_config {
        ConfigLoader::print_config_sources();
        println!();
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    // Held until exit so buffered file logs are flushed.
    let _log_guard = init_logging(&cli, &config)?;

    info!("Starting Feature Council");

    let task = TaskPrompt::resolve(cli.task.clone())?;

    // === Dependency Injection ===
    let oracle = create_decision_oracle(&config.oracle)?;
    let mut use_case = RunCouncilUseCase::new(oracle);

    if let Some(path) = &config.conversation_log
        && let Some(logger) = JsonlConversationLogger::new(path)
    {
        info!("Writing transcript to {}", logger.path().display());
        use_case = use_case.with_conversation_logger(Arc::new(logger));
    }

    let show_progress = !cli.quiet && cli.output != OutputFormat::Json;
    if show_progress {
        println!();
        println!("+============================================================+");
        println!("|                  Feature Council                           |");
        println!("+============================================================+");
        println!();
        println!("Feature: {}", task);
        println!(
            "Workers: {}  Model: {}",
            config.worker_count, config.oracle.model
        );
        println!();
        use_case = use_case.with_progress(Arc::new(ProgressReporter::new()));
    }

    let cancellation = CancellationToken::new();
    let on_signal = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the run");
            on_signal.cancel();
        }
    });

    let result = use_case
        .execute(RunCouncilInput::new(task, config.worker_count), cancellation)
        .await;
    // Releases the oracle connection and finishes the progress display.
    drop(use_case);

    let output = match result {
        Ok(output) => output,
        Err(e) if e.is_cancelled() => bail!("Run cancelled"),
        Err(e) => return Err(e.into()),
    };

    let rendered = match cli.output {
        OutputFormat::Answer => ConsoleFormatter::format_answer_only(&output),
        OutputFormat::Full => ConsoleFormatter::format(&output),
        OutputFormat::Json => ConsoleFormatter::format_json(&output),
    };
    println!("{}", rendered);

    Ok(())
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        return Ok(ConfigLoader::load_defaults());
    }
    if let Some(path) = &cli.config
        && !path.exists()
    {
        bail!("Config file not found: {}", path.display());
    }
    ConfigLoader::load(cli.config.as_ref())
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))
}

fn apply_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(workers) = cli.workers {
        config.worker_count = workers;
    }
    if let Some(endpoint) = &cli.endpoint {
        config.oracle.endpoint = endpoint.clone();
    }
    if let Some(model) = &cli.model {
        config.oracle.model = model.clone();
    }
}

/// Install the tracing subscriber.
///
/// Filter priority: `-v` count, then `RUST_LOG`, then the configured level.
fn init_logging(cli: &Cli, config: &FileConfig) -> Result<Option<WorkerGuard>> {
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter())),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow!("Cannot open log file {}: {}", path.display(), e))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}
