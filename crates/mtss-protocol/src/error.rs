//! Error types for protocol operations.

use thiserror::Error;

/// Errors that can occur during sign and verify operations.
///
/// Verification failure and incomplete localization are *not* errors: they
/// are reported through [`crate::VerificationReport`]. Everything here is
/// fatal and aborts before any output is written.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// CFF design acquisition or decoding failed.
    #[error("CFF error: {0}")]
    Cff(#[from] mtss_cff::CffError),

    /// Cryptographic operation failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] mtss_crypto::CryptoError),

    /// Malformed request (empty message, bad sizes, conflicting flags).
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A persisted bundle could not be parsed.
    #[error("Malformed signature bundle: {0}")]
    MalformedBundle(String),

    /// The message block count does not match the bundle's design.
    #[error("Block count mismatch: bundle covers {expected} blocks, message has {actual}")]
    BlockCountMismatch {
        /// Block count recorded in the bundle.
        expected: usize,
        /// Block count of the message being verified.
        actual: usize,
    },

    /// The scheme or hash selected for verification differs from the bundle.
    #[error("Bundle was created with {bundle}, not {requested}")]
    SchemeMismatch {
        /// Scheme/hash pair recorded in the bundle.
        bundle: String,
        /// Scheme/hash pair requested by the caller.
        requested: String,
    },
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
