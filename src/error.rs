use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid geometry: {dimension}={value} ({reason})")]
    InvalidGeometry {
        dimension: &'static str,
        value: i64,
        reason: String,
    },

    #[error("Malformed cue #{index}: {reason}")]
    MalformedCue { index: usize, reason: String },

    #[error("Unsafe path for filter expression '{path}': {reason}")]
    PathEncodingHazard { path: String, reason: String },

    #[error("Invalid split parameters: {0}")]
    InvalidSplit(String),

    #[error("Subtitle parse error in block {block}: {reason}")]
    SubtitleParse { block: usize, reason: String },

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Speech recognition error: {0}")]
    Recognizer(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl VidError {
    pub(crate) fn geometry(dimension: &'static str, value: i64, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            dimension,
            value,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedCue {
            index,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VidError>;
