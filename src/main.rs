use anyhow::{bail, Context};
use clap::Parser;
use sheetsync::{
    parse_entries, FailureCode, Orchestrator, ReportSink, RetryPolicy, RunStatus, SheetList,
    SyncConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "sheetsync")]
#[command(about = "Download published spreadsheet sheets as CSV files", long_about = None)]
#[command(version)]
struct Args {
    /// JSON sheet list file ({"output_dir": ..., "sheets": [{"name", "key"}]})
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sheet to download as NAME=KEY (repeatable)
    #[arg(short, long = "sheet", value_parser = parse_sheet)]
    sheets: Vec<(String, String)>,

    /// Output directory for CSV files
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Spreadsheet service base URL
    #[arg(long, default_value = "https://docs.google.com")]
    base_url: String,

    /// Wait between retries after a network error (e.g. "1s", "500ms")
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
    retry_interval: Duration,

    /// Add random jitter to the retry interval
    #[arg(long)]
    jitter: bool,

    /// Give up after this many retries instead of retrying forever
    #[arg(long)]
    max_retries: Option<usize>,

    /// Per-request timeout
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_sheet(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, key)) if !name.is_empty() && !key.is_empty() => {
            Ok((name.to_string(), key.to_string()))
        }
        _ => Err(format!("expected NAME=KEY, got {:?}", s)),
    }
}

/// Logs run events.
struct LogSink;

impl ReportSink for LogSink {
    fn on_success(&self, paths: &[PathBuf]) {
        for path in paths {
            info!("✅ {}", path.display());
        }
    }

    fn on_failure(&self, codes: &[FailureCode]) {
        warn!("❌ {} sheet(s) failed", codes.len());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("sheetsync={}", log_level))
        .init();

    let sheet_list = match &args.config {
        Some(path) => SheetList::load(path)
            .with_context(|| format!("failed to load sheet list {}", path.display()))?,
        None => SheetList::default(),
    };

    let mut entries: Vec<(&str, &str)> = sheet_list
        .sheets
        .iter()
        .map(|s| (s.name.as_str(), s.key.as_str()))
        .collect();
    entries.extend(args.sheets.iter().map(|(n, k)| (n.as_str(), k.as_str())));
    let descriptors = parse_entries(entries)?;

    if descriptors.is_empty() {
        bail!("no sheets given; use --sheet NAME=KEY or --config FILE");
    }

    let defaults = SyncConfig::default();
    let config = SyncConfig {
        base_url: args.base_url,
        output_dir: args
            .output
            .or(sheet_list.output_dir)
            .unwrap_or(defaults.output_dir),
        request_timeout: args.timeout,
        retry: RetryPolicy {
            interval: args.retry_interval,
            jitter: args.jitter,
            max_retries: args.max_retries,
        },
    };

    info!("📦 SheetSync - Spreadsheet CSV Downloader");
    info!("Sheets: {}", descriptors.len());
    info!("Output directory: {:?}", config.output_dir);
    for path in config.output_paths(&descriptors) {
        debug!("Target: {}", path.display());
    }

    let pb = indicatif::ProgressBar::new(descriptors.len() as u64);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} sheets | {elapsed_precise} elapsed")
            .context("invalid progress template")?
            .progress_chars("█▓▒░ "),
    );

    let orchestrator = Arc::new(
        Orchestrator::new(&config)?
            .with_sink(Arc::new(LogSink))
            .with_progress(pb),
    );

    let ctrl_c = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                orchestrator.cancel();
            }
        })
    };

    let status = orchestrator.start_run(descriptors).await;
    ctrl_c.abort();

    match status {
        RunStatus::Completed(report) => {
            for (name, outcome) in &report.failures {
                if let Some(code) = outcome.failure_code() {
                    eprintln!("❌ {}: {}", name, code);
                }
            }
            if report.failures.is_empty() {
                info!("✅ All {} sheet(s) downloaded", report.successes.len());
                Ok(())
            } else {
                std::process::exit(1);
            }
        }
        RunStatus::Cancelled => {
            eprintln!("❌ Cancelled");
            std::process::exit(130);
        }
        RunStatus::AlreadyRunning => bail!("a sync run is already in progress"),
    }
}
