//! Cut point selection and segment planning.
//!
//! Data flows one way: a [`LoudnessProfile`](crate::audio::LoudnessProfile)
//! and a [`SplitRequest`] go into [`select`], the resulting [`CutPointSet`]
//! goes into [`plan`], and the planned [`Segment`]s are handed to a cutter.

pub mod plan;
pub mod select;

pub use plan::{output_name, plan, OUTPUT_EXTENSION};
pub use select::{select, select_with_policy};

use crate::error::{Result, SplitError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_THRESHOLD_DB: f64 = -35.0;

/// Upper bound on the number of parts a single split may produce.
pub const MAX_PARTS: usize = 10_000;

/// What the caller asked for: how long the media is, how many parts, and
/// how quiet a window has to be to count as a cut candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRequest {
    /// Seconds.
    pub total_duration: f64,
    /// Signed so that bad user input reaches validation instead of a parse error.
    pub requested_parts: i64,
    pub threshold_db: f64,
}

impl SplitRequest {
    pub fn new(total_duration: f64, requested_parts: i64) -> Self {
        Self {
            total_duration,
            requested_parts,
            threshold_db: DEFAULT_THRESHOLD_DB,
        }
    }

    pub fn with_threshold(mut self, threshold_db: f64) -> Self {
        self.threshold_db = threshold_db;
        self
    }

    /// Check the request and return the part count as a `usize`.
    pub fn validate(&self) -> Result<usize> {
        let parts = validate_parts(self.requested_parts)?;

        if !self.total_duration.is_finite() || self.total_duration <= 0.0 {
            return Err(SplitError::InvalidArgument(format!(
                "Media duration must be positive, got {}s",
                self.total_duration
            )));
        }

        if self.threshold_db.is_nan() {
            return Err(SplitError::InvalidArgument(
                "Threshold must be a number".to_string(),
            ));
        }

        Ok(parts)
    }
}

/// Reject part counts below one or above [`MAX_PARTS`].
pub fn validate_parts(requested_parts: i64) -> Result<usize> {
    if requested_parts < 1 {
        return Err(SplitError::InvalidArgument(format!(
            "Number of parts must be a positive integer, got {}",
            requested_parts
        )));
    }

    match usize::try_from(requested_parts) {
        Ok(parts) if parts <= MAX_PARTS => Ok(parts),
        _ => Err(SplitError::InvalidArgument(format!(
            "Number of parts must be at most {}, got {}",
            MAX_PARTS, requested_parts
        ))),
    }
}

/// How to make up for missing cut points when the track has too few quiet windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShortfallPolicy {
    /// Evenly subdivide only the last segment.
    #[default]
    TrailingGap,
    /// Spread the missing cuts over every segment in proportion to its length.
    Proportional,
}

impl std::fmt::Display for ShortfallPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShortfallPolicy::TrailingGap => write!(f, "trailing-gap"),
            ShortfallPolicy::Proportional => write!(f, "proportional"),
        }
    }
}

impl std::str::FromStr for ShortfallPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "trailing-gap" | "trailing" => Ok(ShortfallPolicy::TrailingGap),
            "proportional" => Ok(ShortfallPolicy::Proportional),
            _ => Err(format!(
                "Unknown shortfall policy: {}. Use 'trailing-gap' or 'proportional'",
                s
            )),
        }
    }
}

/// Segment boundaries in seconds.
///
/// Always starts at 0.0, ends at the media duration and is strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CutPointSet(Vec<f64>);

impl CutPointSet {
    /// Wrap precomputed boundaries, checking the ordering guarantees.
    pub fn new(points: Vec<f64>) -> Result<Self> {
        if points.len() < 2 {
            return Err(SplitError::InvalidArgument(
                "At least two cut points are needed".to_string(),
            ));
        }
        if points[0] != 0.0 {
            return Err(SplitError::InvalidArgument(format!(
                "First cut point must be 0.0, got {}",
                points[0]
            )));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(SplitError::InvalidArgument(
                "Cut points must be finite".to_string(),
            ));
        }
        if points.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SplitError::InvalidArgument(
                "Cut points must be strictly increasing".to_string(),
            ));
        }
        Ok(Self(points))
    }

    pub fn points(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments these boundaries describe.
    pub fn parts(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn total_duration(&self) -> f64 {
        self.0.last().copied().unwrap_or(0.0)
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }
}

/// One output file's worth of media.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    /// 1-based.
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub output_name: String,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn output_path(&self, output_folder: &Path) -> PathBuf {
        output_folder.join(&self.output_name)
    }
}
