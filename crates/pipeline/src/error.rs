//! Error types for calibration sessions and batch processing

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a whole operation
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No files matching *.{extension} in {}", .dir.display())]
    EmptyInput { dir: PathBuf, extension: String },

    #[error("Unsupported output: {0}")]
    UnsupportedOutput(String),

    #[error("Cannot start worker pool: {0}")]
    WorkerPool(#[from] photomon_parallel::ThreadPoolBuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Calibration record error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] photomon_core::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// A file the batch processor could not process
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: photomon_core::Error,
}

impl std::fmt::Display for FileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}
