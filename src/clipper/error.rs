use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipperError {
    #[error("No readable video found at {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Failed to determine duration of {}: {reason}", path.display())]
    ProbeFailure { path: PathBuf, reason: String },

    #[error("Transcription failed for {}: {reason}", path.display())]
    TranscriptionFailure { path: PathBuf, reason: String },

    #[error("Rendering clip {index} to {} failed: {reason}", output.display())]
    RenderFailure {
        index: usize,
        output: PathBuf,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClipperError {
    pub fn probe(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        ClipperError::ProbeFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn transcription(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        ClipperError::TranscriptionFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
