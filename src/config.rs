use crate::error::{Result, SplitError};
use crate::split::{ShortfallPolicy, DEFAULT_THRESHOLD_DB};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Loudness below which a window counts as quiet, in dBFS.
    pub threshold_db: f64,
    /// Loudness analysis window, in milliseconds.
    pub window_ms: u64,
    /// Number of ffmpeg processes allowed to cut segments at once.
    pub concurrency: usize,
    /// How missing cut points are synthesized when too few quiet windows exist.
    pub shortfall: ShortfallPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
            window_ms: 1000,
            concurrency: 1,
            shortfall: ShortfallPolicy::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str::<Config>(&contents)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(threshold) = std::env::var("SILENCESPLIT_THRESHOLD_DB") {
            if let Ok(t) = threshold.parse() {
                self.threshold_db = t;
            }
        }
        if let Ok(window) = std::env::var("SILENCESPLIT_WINDOW_MS") {
            if let Ok(w) = window.parse() {
                self.window_ms = w;
            }
        }
        if let Ok(concurrency) = std::env::var("SILENCESPLIT_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                self.concurrency = c;
            }
        }
        if let Ok(policy) = std::env::var("SILENCESPLIT_SHORTFALL") {
            if let Ok(p) = policy.parse() {
                self.shortfall = p;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold_db.is_finite() {
            return Err(SplitError::Config(format!(
                "Threshold must be a finite number of dB, got {}",
                self.threshold_db
            )));
        }

        if self.window_ms == 0 {
            return Err(SplitError::Config(
                "Analysis window must be at least 1 ms".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(SplitError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()
            .ok_or_else(|| SplitError::Config("No config directory on this system".to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| SplitError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("silencesplit").join("config.toml"))
    }
}
