//! Error types for Gazeflow

use thiserror::Error;

/// Errors that can occur in the gaze pipeline
#[derive(Debug, Error)]
pub enum GazeError {
    #[error("Screen units are not supported: {0}")]
    UnsupportedUnits(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Screen point ({0}, {1}) is outside the active display area")]
    PointOutOfBounds(f64, f64),

    /// Recoverable state-protocol violation. Callers are expected to check
    /// state and continue rather than abort.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid data format at line {line}: {message}")]
    DataFormat { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
