use crate::error::{Result, SplitError};
use crate::split::Segment;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Writes one time range of a media file to a new file without re-encoding.
#[async_trait]
pub trait MediaCutter: Send + Sync {
    /// Copy `duration` seconds starting at `start` from `source` into
    /// `output`, replacing whatever is already there.
    async fn cut(&self, source: &Path, start: f64, duration: f64, output: &Path) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Stream-copy extraction through the `ffmpeg` binary on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegCutter;

impl FfmpegCutter {
    fn command(source: &Path, start: f64, duration: f64, output: &Path) -> Command {
        // Round the boundaries, not the length, so adjacent parts still meet
        let start_us = to_micros(start);
        let end_us = to_micros(start + duration);

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-v", "error", "-ss"])
            .arg(format_seconds(start_us))
            .arg("-i")
            .arg(source)
            .arg("-t")
            .arg(format_seconds(end_us.saturating_sub(start_us)))
            .args(["-c", "copy"])
            .arg(output);
        cmd
    }
}

fn to_micros(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1_000_000.0).round() as u64
}

fn format_seconds(micros: u64) -> String {
    format!("{}.{:06}", micros / 1_000_000, micros % 1_000_000)
}

#[async_trait]
impl MediaCutter for FfmpegCutter {
    async fn cut(&self, source: &Path, start: f64, duration: f64, output: &Path) -> Result<()> {
        let mut cmd = Self::command(source, start, duration, output);
        debug!("Running {:?}", cmd.as_std());

        let result = cmd
            .output()
            .await
            .map_err(|e| SplitError::external("cut", format!("Failed to run FFmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SplitError::external(
                "cut",
                format!("FFmpeg exited with {}: {}", result.status, stderr.trim()),
            ));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg stream copy"
    }
}

/// What happened to one planned segment.
#[derive(Debug, Clone)]
pub struct SegmentOutcome {
    pub segment: Segment,
    pub output_path: PathBuf,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl SegmentOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Statistics from a cutting run.
#[derive(Debug, Clone)]
pub struct CutStats {
    pub total_segments: usize,
    pub successful_segments: usize,
    pub failed_segments: usize,
    pub total_time: Duration,
}

/// Runs a [`MediaCutter`] over every planned segment with bounded concurrency.
///
/// A failing segment never stops the others; every segment gets an outcome.
pub struct CutOrchestrator {
    cutter: Arc<dyn MediaCutter>,
    concurrency: usize,
    show_progress: bool,
    cancelled: Arc<AtomicBool>,
}

impl CutOrchestrator {
    pub fn new(cutter: Box<dyn MediaCutter>, concurrency: usize) -> Self {
        Self {
            cutter: Arc::from(cutter),
            concurrency: concurrency.max(1),
            show_progress: true,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enable or disable progress bar display.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Share a cancellation flag; segments not yet started when it is set are skipped.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub async fn run(
        &self,
        source: &Path,
        segments: &[Segment],
        output_folder: &Path,
    ) -> (Vec<SegmentOutcome>, CutStats) {
        let total_segments = segments.len();
        let start_time = Instant::now();

        info!(
            "Cutting {} segments with {} concurrent jobs using {}",
            total_segments,
            self.concurrency,
            self.cutter.name()
        );

        let progress_bar = if self.show_progress && total_segments > 0 {
            let pb = ProgressBar::new(total_segments as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut futures = FuturesUnordered::new();

        for segment in segments {
            let sem = semaphore.clone();
            let cutter = self.cutter.clone();
            let cancelled = self.cancelled.clone();
            let pb = progress_bar.clone();
            let output_path = segment.output_path(output_folder);
            let segment = segment.clone();

            futures.push(async move {
                let permit = sem.acquire().await;
                let segment_start = Instant::now();

                let result = if permit.is_err() || cancelled.load(Ordering::Relaxed) {
                    Err(SplitError::Cancelled)
                } else {
                    debug!(
                        "Cutting segment {}: {:.3}s to {:.3}s",
                        segment.index, segment.start, segment.end
                    );
                    cutter
                        .cut(source, segment.start, segment.duration(), &output_path)
                        .await
                };

                if let Some(ref pb) = pb {
                    pb.inc(1);
                }

                let error = match result {
                    Ok(()) => {
                        debug!("Segment {} written to {}", segment.index, output_path.display());
                        None
                    }
                    Err(e) => {
                        let e = match e {
                            SplitError::ExternalToolFailure { message, .. } => SplitError::external(
                                format!("segment {}", segment.index),
                                message,
                            ),
                            other => other,
                        };
                        warn!("Segment {} failed: {}", segment.index, e);
                        Some(e.to_string())
                    }
                };

                SegmentOutcome {
                    segment,
                    output_path,
                    error,
                    elapsed: segment_start.elapsed(),
                }
            });
        }

        let mut outcomes: Vec<SegmentOutcome> = Vec::with_capacity(total_segments);
        while let Some(outcome) = futures.next().await {
            outcomes.push(outcome);
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Cutting complete");
        }

        outcomes.sort_by_key(|o| o.segment.index);

        let successful_segments = outcomes.iter().filter(|o| o.is_success()).count();
        let stats = CutStats {
            total_segments,
            successful_segments,
            failed_segments: total_segments - successful_segments,
            total_time: start_time.elapsed(),
        };

        info!(
            "Cutting complete: {}/{} segments written in {:.2}s",
            successful_segments,
            total_segments,
            stats.total_time.as_secs_f64()
        );

        (outcomes, stats)
    }
}
