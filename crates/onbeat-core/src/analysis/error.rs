//! Analysis error types

use thiserror::Error;

/// Errors that can occur during onset analysis
///
/// Silent or empty audio is not an error: it yields an empty event list.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid analysis input: {0}")]
    InvalidInput(String),

    #[error("FFT failed: {0}")]
    Fft(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
