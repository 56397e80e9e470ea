//! Selectable digest functions for the classical signature schemes.

use blake2::Blake2b512;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use sha3::{Sha3_256, Sha3_512};

use crate::error::{CryptoError, Result};

/// Hash functions available for per-group digests.
///
/// ML-DSA signs raw content and ignores this selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashKind {
    /// SHA-256 (32-byte digest).
    Sha256,
    /// SHA-512 (64-byte digest).
    Sha512,
    /// SHA3-256 (32-byte digest).
    Sha3_256,
    /// SHA3-512 (64-byte digest).
    Sha3_512,
    /// BLAKE2b-512 (64-byte digest).
    Blake2b,
}

impl HashKind {
    /// Parse a hash name as it appears on the command line.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedHash` for anything outside the supported set.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SHA256" | "SHA-256" => Ok(Self::Sha256),
            "SHA512" | "SHA-512" => Ok(Self::Sha512),
            "SHA3-256" | "SHA3_256" => Ok(Self::Sha3_256),
            "SHA3-512" | "SHA3_512" => Ok(Self::Sha3_512),
            "BLAKE2B" | "BLAKE2B-512" => Ok(Self::Blake2b),
            other => Err(CryptoError::UnsupportedHash(other.to_string())),
        }
    }

    /// Canonical display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
            Self::Sha3_256 => "SHA3-256",
            Self::Sha3_512 => "SHA3-512",
            Self::Blake2b => "BLAKE2B",
        }
    }

    /// Digest length in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Sha256 | Self::Sha3_256 => 32,
            Self::Sha512 | Self::Sha3_512 | Self::Blake2b => 64,
        }
    }

    /// Hash `data` with this function.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
            Self::Sha3_256 => Sha3_256::digest(data).to_vec(),
            Self::Sha3_512 => Sha3_512::digest(data).to_vec(),
            Self::Blake2b => Blake2b512::digest(data).to_vec(),
        }
    }

    /// One-byte identifier used in the persisted signature bundle.
    pub fn code(self) -> u8 {
        match self {
            Self::Sha256 => 1,
            Self::Sha512 => 2,
            Self::Sha3_256 => 3,
            Self::Sha3_512 => 4,
            Self::Blake2b => 5,
        }
    }

    /// Inverse of [`HashKind::code`].
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedHash` for unknown codes.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Sha256),
            2 => Ok(Self::Sha512),
            3 => Ok(Self::Sha3_256),
            4 => Ok(Self::Sha3_512),
            5 => Ok(Self::Blake2b),
            other => Err(CryptoError::UnsupportedHash(format!("code {other}"))),
        }
    }
}

impl std::fmt::Display for HashKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_cli_spellings() {
        assert_eq!(HashKind::parse("sha256").unwrap(), HashKind::Sha256);
        assert_eq!(HashKind::parse("SHA512").unwrap(), HashKind::Sha512);
        assert_eq!(HashKind::parse("sha3-256").unwrap(), HashKind::Sha3_256);
        assert_eq!(HashKind::parse("SHA3_512").unwrap(), HashKind::Sha3_512);
        assert_eq!(HashKind::parse("blake2b").unwrap(), HashKind::Blake2b);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(HashKind::parse("md5").is_err());
    }

    #[test]
    fn test_digest_lengths() {
        let kinds = [
            HashKind::Sha256,
            HashKind::Sha512,
            HashKind::Sha3_256,
            HashKind::Sha3_512,
            HashKind::Blake2b,
        ];
        for kind in kinds {
            assert_eq!(kind.digest(b"abc").len(), kind.digest_len());
        }
    }

    #[test]
    fn test_sha256_known_answer() {
        let digest = HashKind::Sha256.digest(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_code_round_trip() {
        for code in 1u8..=5 {
            let kind = HashKind::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert!(HashKind::from_code(0).is_err());
        assert!(HashKind::from_code(6).is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let kind = HashKind::Sha3_512;
        let bytes = bincode::serialize(&kind).unwrap();
        let back: HashKind = bincode::deserialize(&bytes).unwrap();
        assert_eq!(kind, back);
    }

    #[test]
    fn test_functions_disagree() {
        let data = b"same input";
        let d256 = HashKind::Sha256.digest(data);
        let d3_256 = HashKind::Sha3_256.digest(data);
        assert_ne!(d256, d3_256);
    }
}
