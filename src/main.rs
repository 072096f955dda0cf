use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vastlog::config::{load_log_settings, LogSettings};
use vastlog::logs::LogLevel;

#[derive(Parser)]
#[command(name = "vastlog")]
#[command(
    about = "Structured logging through a phase-ordered interceptor pipeline with console and rotating file sinks"
)]
#[command(version)]
struct Cli {
    /// Configuration directory (default: /etc/vastlog if exists, otherwise ~/.config/vastlog)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the settings and print the resulting pipeline
    Check,
    /// Log a single message
    Emit {
        #[arg(short, long, value_enum, default_value = "info")]
        level: LogLevel,
        #[arg(short, long, default_value = "vastlog")]
        tag: String,
        /// Message text
        message: String,
    },
    /// Log every line read from stdin
    Pipe {
        #[arg(short, long, value_enum, default_value = "info")]
        level: LogLevel,
        #[arg(short, long, default_value = "stdin")]
        tag: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Determine config directory with proper precedence:
    // 1. CLI argument if provided
    // 2. System-wide config (/etc/vastlog) if it exists
    // 3. User config (~/.config/vastlog)
    let config_dir = cli.config.unwrap_or_else(|| {
        let system_config = PathBuf::from("/etc/vastlog");
        if system_config.exists() {
            system_config
        } else {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vastlog")
        }
    });

    let settings = load_log_settings(&config_dir).with_context(|| {
        format!(
            "Failed to load log settings from {}",
            config_dir.display()
        )
    })?;
    info!("Loaded log settings from {}", config_dir.display());

    match cli.command {
        Commands::Check => check(&settings, &config_dir),
        Commands::Emit {
            level,
            tag,
            message,
        } => emit(&settings, level, &tag, message).await,
        Commands::Pipe { level, tag } => pipe(&settings, level, &tag).await,
    }
}

fn check(settings: &LogSettings, config_dir: &std::path::Path) -> anyhow::Result<()> {
    // sync sinks so no runtime-bound consumer is spawned just for inspection
    let mut settings = settings.clone();
    settings.console.mode = vastlog::logs::WriteMode::Sync;
    if let Some(file) = settings.file.as_mut() {
        file.mode = vastlog::logs::WriteMode::Sync;
    }

    let logging = settings.build_factory()?;
    let pipeline = logging.factory.build_pipeline()?;

    println!("Configuration: {}", config_dir.display());
    println!("Plugins: {}", logging.factory.plugin_keys().join(", "));
    println!("Execution plan:");
    for (phase, interceptor) in pipeline.execution_plan() {
        println!("  {:<10} {}", phase, interceptor);
    }
    Ok(())
}

async fn emit(
    settings: &LogSettings,
    level: LogLevel,
    tag: &str,
    message: String,
) -> anyhow::Result<()> {
    let logging = settings.build_factory()?;
    let log = logging.factory.get_log(tag)?;

    log.log(level, tag, message);

    log.shutdown().await?;
    logging.close().await
}

async fn pipe(settings: &LogSettings, level: LogLevel, tag: &str) -> anyhow::Result<()> {
    let logging = settings.build_factory()?;
    let log = logging.factory.get_log(tag)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut count = 0usize;
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
    {
        log.log(level, tag, line);
        count += 1;
    }

    log.shutdown().await?;
    logging.close().await?;
    info!("Logged {} lines", count);
    Ok(())
}
