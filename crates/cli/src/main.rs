//! url-metadata command line entry point.
//!
//! Configuration comes from `URL_METADATA_*` environment variables and an
//! optional TOML file, with flags applied last. Logging goes to stderr so
//! stdout carries only listings and JSON.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use urlmeta_core::AppConfig;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "url-metadata")]
#[command(about = "Cache metadata, summaries and subtitles for URLs")]
#[command(version)]
struct Args {
    /// Override the cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Show debug logs
    #[arg(long, global = true)]
    debug: bool,

    /// Seconds to sleep between network requests
    #[arg(long, global = true)]
    sleep_time: Option<u64>,

    /// Subtitle language code to download
    #[arg(long, global = true)]
    subtitle_language: Option<String>,

    /// Never download subtitles
    #[arg(long, global = true)]
    skip_subtitles: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Get metadata for one or more URLs, fetching on a cache miss
    Get {
        /// Cache only; print nothing
        #[arg(short, long)]
        quiet: bool,
        /// URLs to fetch, in order
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// List cached URLs
    List {
        /// Print a JSON array instead of one entry per line
        #[arg(long)]
        json: bool,
        /// Print cache directories instead of URLs
        #[arg(long)]
        location: bool,
    },
    /// Print every cached record as JSON
    Export,
    /// Print the cache directory
    Cachedir,
}

impl Args {
    /// Apply flag overrides on top of the loaded configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(secs) = self.sleep_time {
            config.sleep_time = secs;
        }
        if let Some(lang) = &self.subtitle_language {
            config.subtitle_language = lang.clone();
        }
        if self.skip_subtitles {
            config.skip_subtitles = true;
        }
        if self.debug {
            config.loglevel = "debug".into();
        }
    }
}

fn init_logging(config: &AppConfig, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.loglevel));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = AppConfig::load().context("failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    init_logging(&config, args.log_json);
    tracing::debug!(?config, "starting");

    let cache = urlmeta_client::open_cache(config)?;
    let mut stdout = std::io::stdout().lock();

    match &args.command {
        Command::Get { quiet, urls } => {
            let failed = commands::get(&cache, urls, *quiet, &mut stdout).await?;
            stdout.flush()?;
            if failed > 0 {
                tracing::warn!(failed, total = urls.len(), "some urls failed");
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::List { json, location } => commands::list(&cache, *json, *location, &mut stdout)?,
        Command::Export => commands::export(&cache, &mut stdout)?,
        Command::Cachedir => commands::cachedir(&cache, &mut stdout)?,
    }

    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}
