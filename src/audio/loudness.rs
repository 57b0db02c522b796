use std::path::Path;
use std::time::Duration;

use hound::WavReader;
use tracing::{debug, info};

use crate::error::{Result, SplitError};

use super::{AudioMetadata, LoudnessProfile};

/// Full-scale amplitude of a signed 16-bit sample.
const FULL_SCALE: f64 = 32768.0;

/// Loudness of a block of samples in dBFS.
///
/// An empty or all-zero block is `f64::NEG_INFINITY`.
pub fn window_dbfs(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return f64::NEG_INFINITY;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let normalized = s as f64 / FULL_SCALE;
            normalized * normalized
        })
        .sum();

    let rms = (sum_squares / samples.len() as f64).sqrt();
    if rms == 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * rms.log10()
    }
}

/// Slice interleaved samples into fixed windows and measure each one.
///
/// The last window may be shorter than the others.
pub fn compute_loudness_profile(
    samples: &[i16],
    sample_rate: u32,
    channels: u16,
    window: Duration,
) -> Result<LoudnessProfile> {
    let frames_per_window = (sample_rate as u128 * window.as_millis() / 1000) as usize;
    if frames_per_window == 0 {
        return Err(SplitError::InvalidArgument(format!(
            "Analysis window of {}ms is shorter than one sample at {} Hz",
            window.as_millis(),
            sample_rate
        )));
    }

    let step = frames_per_window * channels.max(1) as usize;
    let levels = samples.chunks(step).map(window_dbfs);

    Ok(LoudnessProfile::from_levels(window, levels))
}

/// Read a WAV file and build its loudness profile.
pub fn measure_loudness(
    audio_path: &Path,
    window: Duration,
) -> Result<(LoudnessProfile, AudioMetadata)> {
    let reader = WavReader::open(audio_path)?;
    let spec = reader.spec();

    debug!(
        "Measuring loudness: {} Hz, {} channels, {} bits",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    );

    let samples: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .into_samples::<i16>()
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<std::result::Result<_, _>>()?,
    };

    let channels = spec.channels.max(1);
    let frames = samples.len() / channels as usize;
    let metadata = AudioMetadata {
        duration: Duration::from_secs_f64(frames as f64 / spec.sample_rate as f64),
        sample_rate: spec.sample_rate,
        channels,
    };

    let profile = compute_loudness_profile(&samples, spec.sample_rate, channels, window)?;

    info!(
        "Measured {} windows of {}ms over {:.2}s of audio",
        profile.len(),
        window.as_millis(),
        metadata.duration.as_secs_f64()
    );

    Ok((profile, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::TempDir;

    #[test]
    fn test_window_dbfs_silence() {
        assert_eq!(window_dbfs(&[0i16; 100]), f64::NEG_INFINITY);
        assert_eq!(window_dbfs(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_window_dbfs_full_scale() {
        let samples: Vec<i16> = (0..100)
            .map(|i| if i % 2 == 0 { i16::MAX } else { i16::MIN })
            .collect();
        assert!(window_dbfs(&samples).abs() < 0.01);
    }

    #[test]
    fn test_window_dbfs_half_scale() {
        let db = window_dbfs(&[16384i16; 100]);
        assert!((db - (-6.02)).abs() < 0.01);
    }

    #[test]
    fn test_profile_keeps_partial_last_window() {
        // 2.5 windows of 10 frames each
        let samples = vec![1000i16; 25];
        let profile =
            compute_loudness_profile(&samples, 10, 1, Duration::from_secs(1)).unwrap();
        assert_eq!(profile.len(), 3);
    }

    #[test]
    fn test_profile_counts_frames_not_samples() {
        let samples = vec![1000i16; 40];
        let profile =
            compute_loudness_profile(&samples, 10, 2, Duration::from_secs(1)).unwrap();
        assert_eq!(profile.len(), 2);
    }

    #[test]
    fn test_profile_rejects_sub_sample_window() {
        let result = compute_loudness_profile(&[0i16; 10], 10, 1, Duration::from_millis(10));
        assert!(matches!(result, Err(SplitError::InvalidArgument(_))));
    }

    #[test]
    fn test_measure_loudness_from_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        // 1s loud, 1s silent, 1s loud
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for second in 0..3 {
            for i in 0..8000 {
                let sample = if second == 1 {
                    0
                } else if i % 2 == 0 {
                    8000
                } else {
                    -8000
                };
                writer.write_sample(sample as i16).unwrap();
            }
        }
        writer.finalize().unwrap();

        let (profile, metadata) = measure_loudness(&path, Duration::from_secs(1)).unwrap();

        assert_eq!(metadata.duration, Duration::from_secs(3));
        assert_eq!(profile.len(), 3);
        assert!(profile.samples()[0].loudness_db > -35.0);
        assert_eq!(profile.samples()[1].loudness_db, f64::NEG_INFINITY);
        assert!(profile.samples()[2].loudness_db > -35.0);
    }
}
