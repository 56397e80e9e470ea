//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
///
/// Note that a signature failing to verify is not represented here: the
/// scheme API returns `bool` for verification, and the protocol layer treats
/// failing bits as data.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The requested signature scheme is not supported.
    #[error("Unsupported signature scheme '{0}': must be 'rsa', 'ed25519' or 'ml-dsa-65'")]
    UnsupportedScheme(String),

    /// The requested hash function is not supported.
    #[error("Unsupported hash function '{0}': must be SHA256, SHA512, SHA3-256, SHA3-512 or BLAKE2B")]
    UnsupportedHash(String),

    /// A key file could not be read or decoded.
    #[error("Key load failure: {0}")]
    KeyLoad(String),

    /// Key generation failed.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// The signing primitive itself failed (not a verification outcome).
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Raw key material has the wrong length.
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// The key type does not match the selected scheme.
    #[error("Key does not match scheme {0}")]
    SchemeKeyMismatch(&'static str),
}

/// Result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
