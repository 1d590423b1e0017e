//! CLI command implementations

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde::Serialize;
use tracing::info;

use trackline_core::{Category, Config, SanitizedConfig, SearchQuery, TrackerRegistry};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Search one or more trackers and print the releases as JSON
    Search {
        /// Free-text search term
        #[arg(default_value = "")]
        term: String,
        /// Restrict to these tracker ids (default: all)
        #[arg(short, long = "tracker")]
        trackers: Vec<String>,
        /// Newznab-style category numbers, e.g. 3000 or 5040
        #[arg(short, long = "category")]
        categories: Vec<u32>,
        #[arg(long)]
        imdb: Option<String>,
        #[arg(long)]
        tvdb: Option<u64>,
        /// Season number, or a year for daily shows
        #[arg(long)]
        season: Option<String>,
        /// Episode number, or MM/DD for daily shows
        #[arg(long)]
        episode: Option<String>,
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        album: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        year: Option<u32>,
        /// Only return freeleech releases
        #[arg(long)]
        freeleech: bool,
        #[arg(long, default_value = "0")]
        offset: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Download a torrent file
    Download {
        /// Tracker id the URL belongs to
        #[arg(short, long)]
        tracker: String,
        /// Download URL from a search result
        url: String,
        /// Where to write the torrent file
        #[arg(short, long, default_value = "release.torrent")]
        output: PathBuf,
    },
    /// Print the loaded configuration with secrets redacted
    Config,
}

/// Handle the CLI command
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Search {
            term,
            trackers,
            categories,
            imdb,
            tvdb,
            season,
            episode,
            artist,
            album,
            genre,
            year,
            freeleech,
            offset,
            limit,
        } => {
            let query = SearchQuery {
                term,
                categories: categories.into_iter().map(Category).collect(),
                imdb_id: imdb,
                tvdb_id: tvdb,
                season,
                episode,
                genre,
                artist,
                album,
                year,
                offset,
                limit,
                freeleech_only: freeleech,
            };
            search(config, &trackers, &query).await
        }
        Commands::Download {
            tracker,
            url,
            output,
        } => download(config, &tracker, &url, output).await,
        Commands::Config => print_json(&SanitizedConfig::from(config)),
    }
}

async fn search(config: &Config, trackers: &[String], query: &SearchQuery) -> Result<()> {
    let registry = TrackerRegistry::from_config(config)
        .await
        .context("Failed to set up trackers")?;
    if registry.is_empty() {
        bail!("No trackers configured");
    }

    let outcome = if trackers.is_empty() {
        registry.search_all(query).await
    } else {
        registry.search_some(trackers, query).await
    };
    info!(
        releases = outcome.release_count(),
        failed = outcome.errors.len(),
        duration_ms = outcome.duration_ms,
        "Search finished"
    );

    print_json(&outcome)?;
    if outcome.results.is_empty() && !outcome.errors.is_empty() {
        bail!("Every tracker failed");
    }
    Ok(())
}

async fn download(config: &Config, tracker: &str, url: &str, output: PathBuf) -> Result<()> {
    let registry = TrackerRegistry::from_config(config)
        .await
        .context("Failed to set up trackers")?;

    let body = registry
        .download(tracker, url)
        .await
        .with_context(|| format!("Download from {} failed", tracker))?;
    tokio::fs::write(&output, &body)
        .await
        .with_context(|| format!("Failed to write {:?}", output))?;

    info!(bytes = body.len(), path = ?output, "Torrent saved");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}
