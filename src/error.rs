use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use thiserror::Error;

/// Error type for dataset discovery, loading, and persistence failures.
#[derive(Debug, Error)]
pub enum GazeError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("no matching files found in {}", .directory.display())]
    Discovery { directory: PathBuf },
    #[error("unsupported file format \"{received}\". Supported formats are: {}", .supported.join(", "))]
    UnsupportedFormat {
        received: String,
        supported: Vec<&'static str>,
    },
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Arrow(#[from] ArrowError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GazeError>;

impl GazeError {
    pub(crate) fn unsupported(received: impl Into<String>, supported: &[&'static str]) -> Self {
        GazeError::UnsupportedFormat {
            received: received.into(),
            supported: supported.to_vec(),
        }
    }
}
