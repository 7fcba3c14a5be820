//! Sumi-Mirror main entry point
//!
//! This is the command-line interface for the Sumi-Mirror site downloader.

use anyhow::{bail, Context};
use clap::Parser;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use sumi_mirror::config::{
    load_config, read_urls, resolve_output_dir, split_and_trim, validate, MirrorConfig,
};
use sumi_mirror::crawler::{
    download_file, download_input, run_mirror, HttpFetcher, MirrorSettings,
    DEFAULT_DOWNLOAD_CONCURRENCY,
};
use sumi_mirror::output::stats::format_download_summary;
use sumi_mirror::output::{load_statistics, print_statistics, TracingLog};
use tracing_subscriber::EnvFilter;

/// Sumi-Mirror: download files or mirror whole sites
///
/// Without `--mirror` the URL is saved as a single file. With `--mirror`
/// every same-host page, image, stylesheet and CSS asset reachable from the
/// URL is saved under `<output-dir>/<host>/`.
#[derive(Parser, Debug)]
#[command(name = "sumi-mirror")]
#[command(version)]
#[command(about = "Download files or mirror websites for offline browsing", long_about = None)]
struct Cli {
    /// URL to download or mirror
    #[arg(value_name = "URL", required_unless_present = "input_file")]
    url: Option<String>,

    /// Save a single download under this file name
    #[arg(short = 'O', value_name = "NAME", conflicts_with_all = ["mirror", "input_file"])]
    output_name: Option<String>,

    /// Directory to save files in (`~` is expanded)
    #[arg(short = 'P', value_name = "DIR")]
    output_dir: Option<String>,

    /// Download every URL listed in this file, one per line
    #[arg(short = 'i', value_name = "FILE", conflicts_with = "mirror")]
    input_file: Option<PathBuf>,

    /// Mirror the whole site reachable from URL
    #[arg(long)]
    mirror: bool,

    /// Comma-separated file suffixes to skip while mirroring (e.g. jpg,gif)
    #[arg(short = 'R', long, value_name = "LIST")]
    reject: Option<String>,

    /// Comma-separated path prefixes to skip while mirroring (e.g. /js,/assets)
    #[arg(short = 'X', long, value_name = "LIST")]
    exclude: Option<String>,

    /// Rewrite links in saved HTML to point at the local copies
    #[arg(long)]
    convert_links: bool,

    /// Cap the download speed, e.g. 200k or 2M (bytes per second)
    #[arg(long, value_name = "RATE")]
    rate_limit: Option<String>,

    /// Number of concurrent transfers
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Write log output to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let config = build_config(&cli)?;
    let fetcher = HttpFetcher::new(&config.http).context("Failed to build HTTP client")?;
    let log = TracingLog::new();

    if let Some(input) = &cli.input_file {
        handle_input_file(&cli, &config, input, &fetcher, &log).await
    } else if cli.mirror {
        handle_mirror(&cli, &config, &fetcher, &log).await
    } else {
        handle_download(&cli, &config, &fetcher, &log).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_mirror=info,warn"),
            1 => EnvFilter::new("sumi_mirror=debug,info"),
            2 => EnvFilter::new("sumi_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

/// Loads the optional config file and layers command-line flags on top
fn build_config(cli: &Cli) -> anyhow::Result<MirrorConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => MirrorConfig::default(),
    };

    if let Some(dir) = &cli.output_dir {
        config.mirror.output_dir = dir.clone();
    }
    if let Some(reject) = &cli.reject {
        config.mirror.reject = split_and_trim(reject, ",");
    }
    if let Some(exclude) = &cli.exclude {
        config.mirror.exclude = split_and_trim(exclude, ",");
    }
    if cli.convert_links {
        config.mirror.convert_links = true;
    }
    if let Some(workers) = cli.workers {
        config.mirror.workers = workers;
    }
    if let Some(rate) = &cli.rate_limit {
        config.http.rate_limit = Some(rate.clone());
    }

    validate(&config).context("Invalid options")?;
    Ok(config)
}

/// Handles `--mirror`: crawls the site and prints the run statistics
async fn handle_mirror(
    cli: &Cli,
    config: &MirrorConfig,
    fetcher: &HttpFetcher,
    log: &TracingLog,
) -> anyhow::Result<()> {
    let Some(url) = &cli.url else {
        bail!("--mirror needs a URL");
    };

    let settings = MirrorSettings::from_options(&config.mirror);
    if !settings.reject.is_empty() {
        tracing::info!("Rejecting suffixes: {}", settings.reject.join(", "));
    }
    if !settings.exclude.is_empty() {
        tracing::info!("Excluding prefixes: {}", settings.exclude.join(", "));
    }

    let report = run_mirror(url, &settings, fetcher, log).await?;

    if !cli.quiet {
        print_statistics(&load_statistics(&report));
    }
    Ok(())
}

/// Handles the default mode: saves one URL as a file
async fn handle_download(
    cli: &Cli,
    config: &MirrorConfig,
    fetcher: &HttpFetcher,
    log: &TracingLog,
) -> anyhow::Result<()> {
    let Some(url) = &cli.url else {
        bail!("a URL or -i FILE is required");
    };

    let output_dir = resolve_output_dir(&config.mirror.output_dir);
    let record = download_file(url, &output_dir, cli.output_name.as_deref(), fetcher, log).await?;
    tracing::debug!("Saved {} bytes to {}", record.bytes, record.path.display());
    Ok(())
}

/// Handles `-i FILE`: downloads every listed URL concurrently
async fn handle_input_file(
    cli: &Cli,
    config: &MirrorConfig,
    input: &Path,
    fetcher: &HttpFetcher,
    log: &TracingLog,
) -> anyhow::Result<()> {
    let urls = read_urls(input)?;
    let output_dir = resolve_output_dir(&config.mirror.output_dir);
    let concurrency = cli.workers.unwrap_or(DEFAULT_DOWNLOAD_CONCURRENCY);

    tracing::info!("Downloading {} URLs from {}", urls.len(), input.display());
    let report = download_input(&urls, &output_dir, concurrency, fetcher, log).await;

    if !cli.quiet {
        print!("{}", format_download_summary(&report));
    }
    if report.completed.is_empty() {
        bail!("none of the {} URLs could be downloaded", urls.len());
    }
    Ok(())
}
