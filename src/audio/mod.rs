pub mod extract;
pub mod loudness;

pub use extract::{check_ffmpeg, extract_audio, get_media_duration};
pub use loudness::{compute_loudness_profile, measure_loudness, window_dbfs};

use std::time::Duration;

/// Metadata about an extracted audio track.
#[derive(Debug, Clone)]
pub struct AudioMetadata {
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Loudness of one analysis window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessSample {
    pub window_index: usize,
    /// dBFS, at most 0.0. Digital silence is `f64::NEG_INFINITY`.
    pub loudness_db: f64,
}

/// Per-window loudness over a whole track.
///
/// Window indices are contiguous from 0 and follow time order.
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessProfile {
    window: Duration,
    samples: Vec<LoudnessSample>,
}

impl LoudnessProfile {
    /// Build a profile from loudness levels listed in window order.
    pub fn from_levels(window: Duration, levels: impl IntoIterator<Item = f64>) -> Self {
        let samples = levels
            .into_iter()
            .enumerate()
            .map(|(window_index, loudness_db)| LoudnessSample {
                window_index,
                loudness_db,
            })
            .collect();
        Self { window, samples }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn samples(&self) -> &[LoudnessSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Start time of a window, in seconds.
    pub fn time_of(&self, window_index: usize) -> f64 {
        window_index as f64 * self.window.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_levels_indexes_contiguously() {
        let profile =
            LoudnessProfile::from_levels(Duration::from_secs(1), vec![-10.0, -50.0, -20.0]);
        assert_eq!(profile.len(), 3);
        for (i, sample) in profile.samples().iter().enumerate() {
            assert_eq!(sample.window_index, i);
        }
        assert_eq!(profile.samples()[1].loudness_db, -50.0);
    }

    #[test]
    fn test_time_of_uses_window_size() {
        let profile = LoudnessProfile::from_levels(Duration::from_millis(500), vec![0.0; 4]);
        assert_eq!(profile.time_of(0), 0.0);
        assert_eq!(profile.time_of(3), 1.5);
    }

    #[test]
    fn test_empty_profile() {
        let profile = LoudnessProfile::from_levels(Duration::from_secs(1), Vec::new());
        assert!(profile.is_empty());
    }
}
