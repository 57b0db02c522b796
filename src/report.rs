// JSON split report
use crate::error::Result;
use crate::pipeline::{PipelineConfig, PipelineResult};
use serde::Serialize;
use std::path::Path;

/// Machine-readable record of a split, one entry per planned part.
#[derive(Debug, Serialize)]
pub struct SplitReport {
    pub metadata: ReportMetadata,
    pub cut_points: Vec<f64>,
    pub segments: Vec<ReportSegment>,
}

#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub source_file: String,
    pub output_folder: String,
    pub requested_parts: i64,
    pub threshold_db: f64,
    pub window_ms: u128,
    pub shortfall: String,
    pub audio_duration: f64,
    pub dry_run: bool,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct ReportSegment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub start_formatted: String,
    pub end_formatted: String,
    pub output: String,
    pub status: SegmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    Planned,
    Written,
    Failed,
}

impl SplitReport {
    pub fn new(config: &PipelineConfig, result: &PipelineResult) -> Self {
        let segments: Vec<ReportSegment> = result
            .segments
            .iter()
            .map(|segment| {
                let outcome = result
                    .outcomes
                    .iter()
                    .find(|o| o.segment.index == segment.index);
                let (status, error) = match outcome {
                    None => (SegmentStatus::Planned, None),
                    Some(o) if o.is_success() => (SegmentStatus::Written, None),
                    Some(o) => (SegmentStatus::Failed, o.error.clone()),
                };
                ReportSegment {
                    index: segment.index,
                    start: segment.start,
                    end: segment.end,
                    start_formatted: format_timestamp(segment.start),
                    end_formatted: format_timestamp(segment.end),
                    output: segment
                        .output_path(&config.output_folder)
                        .display()
                        .to_string(),
                    status,
                    error,
                }
            })
            .collect();

        let succeeded = segments
            .iter()
            .filter(|s| s.status == SegmentStatus::Written)
            .count();
        let failed = segments
            .iter()
            .filter(|s| s.status == SegmentStatus::Failed)
            .count();

        Self {
            metadata: ReportMetadata {
                source_file: config.input.display().to_string(),
                output_folder: config.output_folder.display().to_string(),
                requested_parts: config.parts,
                threshold_db: config.threshold_db,
                window_ms: config.window.as_millis(),
                shortfall: config.shortfall.to_string(),
                audio_duration: result.stats.audio_duration.as_secs_f64(),
                dry_run: result.dry_run,
                succeeded,
                failed,
            },
            cut_points: result.cut_points.points().to_vec(),
            segments,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn format_timestamp(secs: f64) -> String {
    let total_millis = (secs * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let seconds = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
