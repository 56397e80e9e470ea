//! Error types for CFF design operations.

use thiserror::Error;

/// Errors that can occur while obtaining or decoding a CFF design.
#[derive(Error, Debug)]
pub enum CffError {
    /// The requested parameters cannot describe a valid design.
    #[error("Invalid CFF parameters: {0}")]
    InvalidParameters(String),

    /// No construction or stored design satisfies the request.
    #[error("No CFF design available: {0}")]
    DesignUnavailable(String),

    /// A stored design could not be parsed or fails validation.
    #[error("Malformed CFF design: {0}")]
    MalformedDesign(String),

    /// Outcome pattern length does not match the design.
    #[error("Outcome length mismatch: design has {expected} tests, got {actual}")]
    OutcomeLengthMismatch {
        /// Number of tests in the design.
        expected: usize,
        /// Number of outcome bits supplied.
        actual: usize,
    },

    /// Design store I/O failure.
    #[error("Design store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CFF operations.
pub type Result<T> = std::result::Result<T, CffError>;
