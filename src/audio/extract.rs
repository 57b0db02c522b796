use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, SplitError};

const ANALYSIS_SAMPLE_RATE: u32 = 16000;

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| {
            SplitError::external(
                "tool check",
                format!(
                    "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
                ),
            )
        })?;

    if !output.status.success() {
        return Err(SplitError::external("tool check", "FFmpeg check failed"));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Get container duration using FFprobe.
pub fn get_media_duration(input: &Path) -> Result<Duration> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| SplitError::external("probe", format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SplitError::external(
            "probe",
            format!("FFprobe failed: {}", stderr.trim()),
        ));
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let secs: f64 = raw.trim().parse().map_err(|e| {
        SplitError::external("probe", format!("Failed to parse duration '{}': {e}", raw.trim()))
    })?;

    if !secs.is_finite() || secs < 0.0 {
        return Err(SplitError::external(
            "probe",
            format!("Invalid duration reported: {secs}"),
        ));
    }

    Ok(Duration::from_secs_f64(secs))
}

/// Extract the first audio stream of a media file to a WAV for loudness analysis.
///
/// The output is mono 16-bit PCM at 16kHz.
pub async fn extract_audio(input: &Path, output: &Path) -> Result<()> {
    check_ffmpeg()?;

    if !input.exists() {
        return Err(SplitError::FileNotFound(input.display().to_string()));
    }

    info!("Extracting audio from {}", input.display());

    let result = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-i"])
        .arg(input)
        .args(["-vn", "-map", "0:a:0", "-acodec", "pcm_s16le", "-ar"])
        .arg(ANALYSIS_SAMPLE_RATE.to_string())
        .args(["-ac", "1"])
        .arg(output)
        .output()
        .await
        .map_err(|e| SplitError::external("audio extraction", format!("Failed to run FFmpeg: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(SplitError::external(
            "audio extraction",
            format!("FFmpeg exited with {}: {}", result.status, stderr.trim()),
        ));
    }

    if !output.exists() {
        return Err(SplitError::external(
            "audio extraction",
            "Output file was not created",
        ));
    }

    info!("Audio extracted to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ffmpeg_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_check_ffmpeg() {
        let result = check_ffmpeg();
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available or broken");
            return;
        }
        assert!(result.is_ok(), "FFmpeg check failed: {:?}", result.err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("12.5\n").unwrap(), Duration::from_millis(12500));
        assert!(parse_duration("N/A").is_err());
        assert!(parse_duration("-1").is_err());
    }

    #[tokio::test]
    async fn test_extract_audio_file_not_found() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let result =
            extract_audio(Path::new("/nonexistent/file.mp4"), Path::new("/tmp/out.wav")).await;
        match &result {
            Err(SplitError::FileNotFound(path)) => {
                assert!(path.contains("nonexistent"));
            }
            Err(other) => {
                panic!("Expected FileNotFound error, got: {other}");
            }
            Ok(_) => {
                panic!("Expected error but got Ok");
            }
        }
    }

    #[tokio::test]
    async fn test_extracted_audio_feeds_loudness_measurement() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&source, spec).unwrap();
        for i in 0..(44100 * 3) {
            let v = ((i as f64 * 0.05).sin() * 8000.0) as i16;
            writer.write_sample(v).unwrap();
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let wav = dir.path().join("audio.wav");
        extract_audio(&source, &wav).await.unwrap();

        let (profile, metadata) =
            crate::audio::measure_loudness(&wav, Duration::from_secs(1)).unwrap();
        assert_eq!(metadata.sample_rate, ANALYSIS_SAMPLE_RATE);
        assert_eq!(metadata.channels, 1);
        assert!((metadata.duration.as_secs_f64() - 3.0).abs() < 0.05);
        assert!(profile.len() >= 3);
    }
}
