//! Error taxonomy for the extraction and filtering pipeline.
//!
//! Per-object edge cases (missing contours, failed ellipse fits, objects with
//! too few frames) are never errors; they are represented as data and handled
//! by the filter rules. Only conditions that abort a stage end up here.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T, E = TrackError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// The input directory is missing, unreadable, or holds no matching files.
    #[error("failed to load mask sequence from {}: {reason}", dir.display())]
    Load { dir: PathBuf, reason: String },

    /// A single label image could not be decoded.
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// Numeric parameters that failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Writing one of the export artifacts failed.
    #[error("export failed: {0}")]
    Export(String),

    /// The job was cancelled through its [`CancelToken`](crate::progress::CancelToken).
    #[error("processing was cancelled")]
    Cancelled,

    /// Anything else caught at the job boundary (including worker panics).
    #[error("unexpected failure: {0}")]
    Unexpected(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    PngEncode(#[from] png::EncodingError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl TrackError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn load(dir: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load {
            dir: dir.into(),
            reason: reason.into(),
        }
    }
}
