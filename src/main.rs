use anyhow::{Context, Result};
use clap::Parser;
use silencesplit::config::Config;
use silencesplit::cutter::FfmpegCutter;
use silencesplit::interactive::run_interactive_wizard;
use silencesplit::pipeline::{print_summary, split_media_with, PipelineConfig};
use silencesplit::report::SplitReport;
use silencesplit::{ShortfallPolicy, SplitError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "silencesplit")]
#[command(version, about = "Split a video into parts at its quietest moments")]
#[command(
    long_about = "Measure the loudness of a video's audio track, cut it at quiet moments into the requested number of parts, and write each part with ffmpeg stream copy (no re-encoding)."
)]
struct Cli {
    /// Input video file (omit to start the interactive wizard)
    input: Option<PathBuf>,

    /// Number of parts to produce
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    parts: Option<i64>,

    /// Loudness threshold in dBFS; quieter windows are cut candidates [default: -35.0]
    #[arg(short, long, allow_negative_numbers = true)]
    threshold: Option<f64>,

    /// Output file name prefix; parts are named <PREFIX>_01.mp4, <PREFIX>_02.mp4, ...
    #[arg(short, long)]
    prefix: Option<String>,

    /// Folder to write the parts into
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Loudness analysis window in milliseconds [default: 1000]
    #[arg(long)]
    window_ms: Option<u64>,

    /// Number of parts cut concurrently [default: 1]
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// How to place cuts when there are too few quiet moments: trailing-gap, proportional
    #[arg(long)]
    shortfall: Option<String>,

    /// Print the split plan without writing any parts
    #[arg(long)]
    dry_run: bool,

    /// Write a JSON report of the split to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Start the interactive wizard
    #[arg(short, long)]
    interactive: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Merge CLI flags over the loaded config into one request.
fn build_pipeline_config(cli: &Cli, config: &Config) -> Result<PipelineConfig> {
    let missing = |what: &str| SplitError::InvalidArgument(format!("Missing required {what}"));

    let input = cli.input.clone().ok_or_else(|| missing("input file"))?;
    let parts = cli.parts.ok_or_else(|| missing("--parts"))?;
    let prefix = cli.prefix.clone().ok_or_else(|| missing("--prefix"))?;
    let output_folder = cli.output_dir.clone().ok_or_else(|| missing("--output-dir"))?;

    let shortfall = match &cli.shortfall {
        Some(s) => s
            .parse::<ShortfallPolicy>()
            .map_err(|e| anyhow::anyhow!(e))?,
        None => config.shortfall,
    };

    Ok(PipelineConfig {
        input,
        output_folder,
        parts,
        threshold_db: cli.threshold.unwrap_or(config.threshold_db),
        prefix,
        window: cli
            .window_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.window()),
        concurrency: cli.concurrency.unwrap_or(config.concurrency),
        shortfall,
        dry_run: cli.dry_run,
        show_progress: true,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let pipeline_config = if cli.interactive || cli.input.is_none() {
        PipelineConfig {
            dry_run: cli.dry_run,
            ..run_interactive_wizard(&config)?
        }
    } else {
        build_pipeline_config(&cli, &config)?
    };

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    ctrlc::set_handler(move || {
        if !flag.swap(true, Ordering::SeqCst) {
            eprintln!("\nCancelling; parts already being written will finish...");
        }
    })
    .context("Failed to install Ctrl+C handler")?;

    info!("Input:     {}", pipeline_config.input.display());
    info!("Output:    {}", pipeline_config.output_folder.display());
    info!("Parts:     {}", pipeline_config.parts);
    info!("Threshold: {} dB", pipeline_config.threshold_db);

    let result = split_media_with(&pipeline_config, Box::new(FfmpegCutter), cancelled)
        .await
        .context("Split failed")?;

    print_summary(&result, &pipeline_config.output_folder);

    if let Some(path) = &cli.report {
        SplitReport::new(&pipeline_config, &result)
            .write(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    if !result.is_complete() {
        let failed = result.failed().count();
        warn!("{} of {} parts failed", failed, result.segments.len());
        anyhow::bail!("{} of {} parts could not be written", failed, result.segments.len());
    }

    Ok(())
}
