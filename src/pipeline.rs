use crate::audio::{check_ffmpeg, extract_audio, get_media_duration, measure_loudness};
use crate::cutter::{CutOrchestrator, FfmpegCutter, MediaCutter, SegmentOutcome};
use crate::error::{Result, SplitError};
use crate::split::plan::validate_prefix;
use crate::split::{
    plan, select_with_policy, validate_parts, CutPointSet, Segment, ShortfallPolicy,
    SplitRequest, DEFAULT_THRESHOLD_DB,
};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Everything needed for one split, assembled up front by the caller.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source media file.
    pub input: PathBuf,
    /// Folder receiving the numbered parts.
    pub output_folder: PathBuf,
    /// Number of parts to produce.
    pub parts: i64,
    /// Loudness below which a window counts as quiet, in dBFS.
    pub threshold_db: f64,
    /// File name prefix of every part.
    pub prefix: String,
    /// Loudness analysis window.
    pub window: Duration,
    /// Number of ffmpeg cut processes allowed at once.
    pub concurrency: usize,
    /// How missing cuts are synthesized.
    pub shortfall: ShortfallPolicy,
    /// Plan only, write no parts.
    pub dry_run: bool,
    /// Show progress bars.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_folder: PathBuf::from("."),
            parts: 2,
            threshold_db: DEFAULT_THRESHOLD_DB,
            prefix: String::new(),
            window: Duration::from_secs(1),
            concurrency: 1,
            shortfall: ShortfallPolicy::default(),
            dry_run: false,
            show_progress: true,
        }
    }
}

impl PipelineConfig {
    /// Check every argument before anything touches the filesystem.
    pub fn validate(&self) -> Result<()> {
        validate_parts(self.parts)?;
        validate_prefix(&self.prefix)?;

        if self.input.as_os_str().is_empty() {
            return Err(SplitError::InvalidArgument(
                "No input file selected".to_string(),
            ));
        }
        if self.output_folder.as_os_str().is_empty() {
            return Err(SplitError::InvalidArgument(
                "No output folder selected".to_string(),
            ));
        }
        if !self.threshold_db.is_finite() {
            return Err(SplitError::InvalidArgument(format!(
                "Threshold must be a finite number of dB, got {}",
                self.threshold_db
            )));
        }
        if self.window.is_zero() {
            return Err(SplitError::InvalidArgument(
                "Analysis window must be longer than zero".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(SplitError::InvalidArgument(
                "Concurrency must be greater than 0".to_string(),
            ));
        }
        if !self.input.exists() {
            return Err(SplitError::FileNotFound(self.input.display().to_string()));
        }

        Ok(())
    }
}

/// Timing and counts from a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_time: Duration,
    pub analysis_time: Duration,
    pub cutting_time: Duration,
    pub audio_duration: Duration,
    pub windows_analyzed: usize,
}

/// Result of a split: the chosen cuts, the plan and what happened to each part.
#[derive(Debug)]
pub struct PipelineResult {
    pub cut_points: CutPointSet,
    pub segments: Vec<Segment>,
    /// Empty on a dry run.
    pub outcomes: Vec<SegmentOutcome>,
    pub stats: PipelineStats,
    pub dry_run: bool,
}

impl PipelineResult {
    pub fn failed(&self) -> impl Iterator<Item = &SegmentOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// True when every planned part was written, or nothing was meant to be.
    pub fn is_complete(&self) -> bool {
        self.dry_run || (self.outcomes.len() == self.segments.len() && self.failed().count() == 0)
    }
}

/// Split a media file into parts at its quiet moments.
pub async fn split_media(config: &PipelineConfig) -> Result<PipelineResult> {
    let cancelled = Arc::new(AtomicBool::new(false));
    split_media_with(config, Box::new(FfmpegCutter), cancelled).await
}

/// Split a media file using the given cutter, honoring a cancellation flag.
///
/// Stages:
/// 1. Validate the request
/// 2. Extract the audio track and measure per-window loudness
/// 3. Select cut points and plan the parts
/// 4. Cut every part (skipped on a dry run)
pub async fn split_media_with(
    config: &PipelineConfig,
    cutter: Box<dyn MediaCutter>,
    cancelled: Arc<AtomicBool>,
) -> Result<PipelineResult> {
    let start_time = Instant::now();

    config.validate()?;
    check_ffmpeg()?;

    let temp_dir = TempDir::new()?;
    debug!("Using temp directory: {:?}", temp_dir.path());

    let multi_progress = config.show_progress.then(MultiProgress::new);

    check_cancelled(&cancelled)?;

    // Stage 1: Loudness analysis
    info!("Stage 1/3: Analyzing loudness of {:?}", config.input);
    let analysis_start = Instant::now();
    let analysis_pb = spinner(multi_progress.as_ref(), "Extracting audio...");

    let audio_path = temp_dir.path().join("audio.wav");
    extract_audio(&config.input, &audio_path).await?;

    if let Some(pb) = &analysis_pb {
        pb.set_message("Measuring loudness...");
    }
    let (profile, metadata) = measure_loudness(&audio_path, config.window)?;

    if let Some(pb) = analysis_pb {
        pb.finish_with_message(format!(
            "✓ Analyzed {:.1}s of audio ({} windows)",
            metadata.duration.as_secs_f64(),
            profile.len()
        ));
    }

    let analysis_time = analysis_start.elapsed();

    // Cuts follow the audio track; a shorter or longer video stream is only reported
    match get_media_duration(&config.input) {
        Ok(container)
            if container.max(metadata.duration) - container.min(metadata.duration)
                > config.window =>
        {
            warn!(
                "Container lasts {:.2}s but its audio lasts {:.2}s; parts follow the audio",
                container.as_secs_f64(),
                metadata.duration.as_secs_f64()
            )
        }
        Ok(_) => {}
        Err(e) => debug!("Could not probe container duration: {}", e),
    }

    if profile.is_empty() {
        return Err(SplitError::EmptyProfile);
    }

    check_cancelled(&cancelled)?;

    // Stage 2: Cut point selection
    info!(
        "Stage 2/3: Selecting {} parts below {:.1} dB",
        config.parts, config.threshold_db
    );
    let request = SplitRequest::new(metadata.duration.as_secs_f64(), config.parts)
        .with_threshold(config.threshold_db);
    let cut_points = select_with_policy(&profile, &request, config.shortfall)?;
    let segments = plan(&cut_points, &config.prefix)?;

    info!(
        "Cut points: {}",
        cut_points
            .points()
            .iter()
            .map(|p| format!("{:.3}", p))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let windows_analyzed = profile.len();

    if config.dry_run {
        info!("Dry run, no parts written");
        return Ok(PipelineResult {
            cut_points,
            segments,
            outcomes: Vec::new(),
            stats: PipelineStats {
                total_time: start_time.elapsed(),
                analysis_time,
                cutting_time: Duration::ZERO,
                audio_duration: metadata.duration,
                windows_analyzed,
            },
            dry_run: true,
        });
    }

    check_cancelled(&cancelled)?;

    // Stage 3: Cutting
    info!(
        "Stage 3/3: Writing {} parts to {:?}",
        segments.len(),
        config.output_folder
    );
    std::fs::create_dir_all(&config.output_folder)?;

    let cutting_start = Instant::now();
    let orchestrator = CutOrchestrator::new(cutter, config.concurrency)
        .with_progress(config.show_progress)
        .with_cancel_flag(cancelled);
    let (outcomes, _cut_stats) = orchestrator
        .run(&config.input, &segments, &config.output_folder)
        .await;

    Ok(PipelineResult {
        cut_points,
        segments,
        outcomes,
        stats: PipelineStats {
            total_time: start_time.elapsed(),
            analysis_time,
            cutting_time: cutting_start.elapsed(),
            audio_duration: metadata.duration,
            windows_analyzed,
        },
        dry_run: false,
    })
}

fn check_cancelled(cancelled: &AtomicBool) -> Result<()> {
    if cancelled.load(Ordering::Relaxed) {
        return Err(SplitError::Cancelled);
    }
    Ok(())
}

fn spinner(multi_progress: Option<&MultiProgress>, message: &'static str) -> Option<ProgressBar> {
    multi_progress.map(|mp| {
        let pb = mp.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    })
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult, output_folder: &Path) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    if result.dry_run {
        println!("                        Split Plan (dry run)                   ");
    } else {
        println!("                          Split Complete                       ");
    }
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Folder:     {}", output_folder.display());
    println!(
        "  Duration:   {:.1}s audio, {} windows",
        result.stats.audio_duration.as_secs_f64(),
        result.stats.windows_analyzed
    );
    println!();
    println!("  Parts:");
    for segment in &result.segments {
        let status = match result
            .outcomes
            .iter()
            .find(|o| o.segment.index == segment.index)
        {
            Some(outcome) if outcome.is_success() => "ok".to_string(),
            Some(outcome) => format!("FAILED: {}", outcome.error.as_deref().unwrap_or("")),
            None => "planned".to_string(),
        };
        println!(
            "    {:<20} {:>10.3}s → {:>10.3}s  {}",
            segment.output_name, segment.start, segment.end, status
        );
    }
    println!();
    println!("  Timing:");
    println!(
        "    Analyze:     {:.2}s",
        result.stats.analysis_time.as_secs_f64()
    );
    if !result.dry_run {
        println!(
            "    Cut:         {:.2}s",
            result.stats.cutting_time.as_secs_f64()
        );
    }
    println!(
        "    Total:       {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    let failed = result.failed().count();
    if failed > 0 {
        println!();
        println!(
            "  {} of {} parts failed; the others were written.",
            failed,
            result.segments.len()
        );
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn valid_config(input: &Path) -> PipelineConfig {
        PipelineConfig {
            input: input.to_path_buf(),
            output_folder: PathBuf::from("/tmp/silencesplit-out"),
            parts: 3,
            prefix: "clip".to_string(),
            show_progress: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.threshold_db, -35.0);
        assert_eq!(config.window, Duration::from_secs(1));
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.shortfall, ShortfallPolicy::TrailingGap);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let input = NamedTempFile::new().unwrap();
        assert!(valid_config(input.path()).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_parts() {
        let input = NamedTempFile::new().unwrap();
        for parts in [0, -4] {
            let config = PipelineConfig {
                parts,
                ..valid_config(input.path())
            };
            assert!(matches!(
                config.validate(),
                Err(SplitError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let input = NamedTempFile::new().unwrap();

        let no_prefix = PipelineConfig {
            prefix: String::new(),
            ..valid_config(input.path())
        };
        assert!(matches!(no_prefix.validate(), Err(SplitError::InvalidArgument(_))));

        let no_input = PipelineConfig {
            input: PathBuf::new(),
            ..valid_config(input.path())
        };
        assert!(matches!(no_input.validate(), Err(SplitError::InvalidArgument(_))));

        let no_folder = PipelineConfig {
            output_folder: PathBuf::new(),
            ..valid_config(input.path())
        };
        assert!(matches!(no_folder.validate(), Err(SplitError::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_reports_missing_input_file() {
        let config = valid_config(Path::new("/nonexistent/video.mp4"));
        assert!(matches!(config.validate(), Err(SplitError::FileNotFound(_))));
    }

    #[test]
    fn test_is_complete() {
        let cut_points = CutPointSet::new(vec![0.0, 10.0]).unwrap();
        let segments = plan(&cut_points, "clip").unwrap();
        let stats = PipelineStats {
            total_time: Duration::ZERO,
            analysis_time: Duration::ZERO,
            cutting_time: Duration::ZERO,
            audio_duration: Duration::from_secs(10),
            windows_analyzed: 10,
        };

        let dry = PipelineResult {
            cut_points: cut_points.clone(),
            segments: segments.clone(),
            outcomes: Vec::new(),
            stats: stats.clone(),
            dry_run: true,
        };
        assert!(dry.is_complete());

        let failed = PipelineResult {
            cut_points,
            outcomes: vec![SegmentOutcome {
                segment: segments[0].clone(),
                output_path: PathBuf::from("clip_01.mp4"),
                error: Some("boom".to_string()),
                elapsed: Duration::ZERO,
            }],
            segments,
            stats,
            dry_run: false,
        };
        assert!(!failed.is_complete());
        assert_eq!(failed.failed().count(), 1);
    }
}
