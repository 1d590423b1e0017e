//! Trackline CLI - search and download across configured trackers.

mod commands;
mod metrics;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trackline_core::{load_config, validate_config};

#[derive(Parser)]
#[command(name = "trackline")]
#[command(about = "Search and download from private trackers sharing a JSON API", version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "TRACKLINE_CONFIG", default_value = "trackline.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;
    info!(trackers = config.trackers.len(), "Configuration loaded");

    let outcome = commands::handle_command(cli.command, &config).await;

    if cli.metrics {
        eprintln!("{}", metrics::encode_metrics()?);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
[[trackers]]
id = "orpheus"
base_urls = ["https://orpheus.example"]

[trackers.credentials]
mode = "api_key"
key = "secret"

[[trackers.categories]]
native = "1"
category = 3000
"#;

    #[tokio::test]
    async fn test_config_command_with_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let cli = Cli::parse_from(["trackline", "--config", path.as_str(), "--metrics", "config"]);
        assert!(run(cli).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_config_file_fails() {
        let cli = Cli::parse_from(["trackline", "--config", "/nonexistent/trackline.toml", "config"]);
        let err = run(cli).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load config"));
    }
}
