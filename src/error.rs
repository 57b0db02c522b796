use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Loudness analysis produced no samples for a non-empty source")]
    EmptyProfile,

    #[error("External tool failed during {stage}: {message}")]
    ExternalToolFailure { stage: String, message: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SplitError {
    pub fn external(stage: impl Into<String>, message: impl Into<String>) -> Self {
        SplitError::ExternalToolFailure {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SplitError>;
