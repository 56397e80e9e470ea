//! Signature scheme selection and the sign/verify primitive.

use rsa::traits::PublicKeyParts;
use rsa::Pkcs1v15Sign;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CryptoError, Result};
use crate::hash::HashKind;
use crate::mldsa::{self, MlDsaPrivateKey, MlDsaPublicKey};

/// Supported signature schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemeKind {
    /// RSA with PKCS#1 v1.5 padding over a selectable digest.
    RsaPkcs1v15,
    /// Ed25519 over a SHA-512 digest of the content.
    Ed25519,
    /// ML-DSA-65 over raw content (post-quantum).
    MlDsa65,
}

impl SchemeKind {
    /// Parse a scheme name as it appears on the command line.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedScheme` for anything outside the supported set.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rsa" | "pkcs1v15" => Ok(Self::RsaPkcs1v15),
            "ed25519" => Ok(Self::Ed25519),
            "ml-dsa-65" | "mldsa65" | "ml-dsa" | "dilithium3" => Ok(Self::MlDsa65),
            other => Err(CryptoError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Canonical display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::RsaPkcs1v15 => "RSA PKCS#1 v1.5",
            Self::Ed25519 => "Ed25519",
            Self::MlDsa65 => "ML-DSA-65",
        }
    }

    /// One-byte identifier used in the persisted signature bundle.
    pub fn code(self) -> u8 {
        match self {
            Self::RsaPkcs1v15 => 1,
            Self::Ed25519 => 2,
            Self::MlDsa65 => 3,
        }
    }

    /// Inverse of [`SchemeKind::code`].
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedScheme` for unknown codes.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::RsaPkcs1v15),
            2 => Ok(Self::Ed25519),
            3 => Ok(Self::MlDsa65),
            other => Err(CryptoError::UnsupportedScheme(format!("code {other}"))),
        }
    }
}

impl std::fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A private key for one of the supported schemes.
pub enum PrivateKey {
    /// RSA private key.
    Rsa(Box<rsa::RsaPrivateKey>),
    /// Ed25519 signing key.
    Ed25519(ed25519_dalek::SigningKey),
    /// ML-DSA-65 private key.
    MlDsa(MlDsaPrivateKey),
}

impl PrivateKey {
    /// Length in bytes of signatures this key produces.
    pub fn signature_length(&self) -> usize {
        match self {
            Self::Rsa(key) => key.size(),
            Self::Ed25519(_) => 64,
            Self::MlDsa(_) => mldsa::SIGNATURE_SIZE,
        }
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Rsa(_) => "Rsa",
            Self::Ed25519(_) => "Ed25519",
            Self::MlDsa(_) => "MlDsa",
        };
        write!(f, "PrivateKey::{kind}([REDACTED])")
    }
}

/// A public key for one of the supported schemes.
#[derive(Clone, Debug)]
pub enum PublicKey {
    /// RSA public key.
    Rsa(rsa::RsaPublicKey),
    /// Ed25519 verifying key.
    Ed25519(ed25519_dalek::VerifyingKey),
    /// ML-DSA-65 public key.
    MlDsa(MlDsaPublicKey),
}

impl PublicKey {
    /// Length in bytes of signatures this key verifies.
    pub fn signature_length(&self) -> usize {
        match self {
            Self::Rsa(key) => key.size(),
            Self::Ed25519(_) => 64,
            Self::MlDsa(_) => mldsa::SIGNATURE_SIZE,
        }
    }
}

/// A fully specified signature scheme: algorithm plus digest selection.
///
/// Construction validates the combination before any key or message I/O
/// happens, so unsupported requests abort early.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigScheme {
    scheme: SchemeKind,
    hash: HashKind,
}

impl SigScheme {
    /// Combine a scheme with an optional hash selection.
    ///
    /// RSA defaults to SHA-512 when no hash is given. Ed25519 pins SHA-512
    /// and rejects any other explicit choice. ML-DSA signs raw content and
    /// ignores the selection entirely.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedHash` for an Ed25519 request with a non-SHA-512
    /// hash.
    pub fn new(scheme: SchemeKind, hash: Option<HashKind>) -> Result<Self> {
        let hash = match scheme {
            SchemeKind::RsaPkcs1v15 => hash.unwrap_or(HashKind::Sha512),
            SchemeKind::Ed25519 => match hash {
                None | Some(HashKind::Sha512) => HashKind::Sha512,
                Some(other) => {
                    return Err(CryptoError::UnsupportedHash(format!(
                        "{other} (Ed25519 requires SHA512)"
                    )))
                }
            },
            SchemeKind::MlDsa65 => HashKind::Sha512,
        };
        Ok(Self { scheme, hash })
    }

    /// The signature algorithm.
    pub fn scheme(&self) -> SchemeKind {
        self.scheme
    }

    /// The digest used for classical schemes.
    pub fn hash(&self) -> HashKind {
        self.hash
    }

    /// Sign `content` with the matching private key.
    ///
    /// Classical schemes hash first and sign the digest; ML-DSA signs the
    /// raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `SchemeKeyMismatch` for a key of the wrong type and
    /// `Signing` when the primitive itself fails.
    pub fn sign(&self, key: &PrivateKey, content: &[u8]) -> Result<Vec<u8>> {
        match (self.scheme, key) {
            (SchemeKind::RsaPkcs1v15, PrivateKey::Rsa(key)) => {
                let digest = self.hash.digest(content);
                key.sign(rsa_padding(self.hash), &digest)
                    .map_err(|e| CryptoError::Signing(e.to_string()))
            }
            (SchemeKind::Ed25519, PrivateKey::Ed25519(key)) => {
                use ed25519_dalek::Signer;
                let digest = self.hash.digest(content);
                Ok(key.sign(&digest).to_bytes().to_vec())
            }
            (SchemeKind::MlDsa65, PrivateKey::MlDsa(key)) => key.sign(content),
            _ => Err(CryptoError::SchemeKeyMismatch(self.scheme.name())),
        }
    }

    /// Verify `signature` over `content` with the matching public key.
    ///
    /// A failed check is `false`, never an error: per-group verification
    /// outcomes are protocol data, and the primitive must not be retried.
    pub fn verify(&self, key: &PublicKey, content: &[u8], signature: &[u8]) -> bool {
        match (self.scheme, key) {
            (SchemeKind::RsaPkcs1v15, PublicKey::Rsa(key)) => {
                let digest = self.hash.digest(content);
                key.verify(rsa_padding(self.hash), &digest, signature).is_ok()
            }
            (SchemeKind::Ed25519, PublicKey::Ed25519(key)) => {
                use ed25519_dalek::Verifier;
                let digest = self.hash.digest(content);
                match ed25519_dalek::Signature::from_slice(signature) {
                    Ok(signature) => key.verify(&digest, &signature).is_ok(),
                    Err(_) => false,
                }
            }
            (SchemeKind::MlDsa65, PublicKey::MlDsa(key)) => key.verify(content, signature),
            _ => {
                debug!(scheme = %self.scheme, "verification key does not match scheme");
                false
            }
        }
    }
}

/// PKCS#1 v1.5 digest-info prefix for the selected hash.
///
/// BLAKE2b has no registered OID in the `rsa` crate's table, so it signs the
/// bare digest without a prefix.
fn rsa_padding(hash: HashKind) -> Pkcs1v15Sign {
    match hash {
        HashKind::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        HashKind::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
        HashKind::Sha3_256 => Pkcs1v15Sign::new::<sha3::Sha3_256>(),
        HashKind::Sha3_512 => Pkcs1v15Sign::new::<sha3::Sha3_512>(),
        HashKind::Blake2b => Pkcs1v15Sign::new_unprefixed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mldsa::MlDsaKeyPair;
    use rand::rngs::OsRng;

    fn rsa_pair() -> (PrivateKey, PublicKey) {
        let private = rsa::RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let public = private.to_public_key();
        (PrivateKey::Rsa(Box::new(private)), PublicKey::Rsa(public))
    }

    fn ed25519_pair() -> (PrivateKey, PublicKey) {
        let signing = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        (PrivateKey::Ed25519(signing), PublicKey::Ed25519(verifying))
    }

    fn mldsa_pair() -> (PrivateKey, PublicKey) {
        let pair = MlDsaKeyPair::generate().unwrap();
        (PrivateKey::MlDsa(pair.private), PublicKey::MlDsa(pair.public))
    }

    #[test]
    fn test_scheme_parse() {
        assert_eq!(SchemeKind::parse("rsa").unwrap(), SchemeKind::RsaPkcs1v15);
        assert_eq!(SchemeKind::parse("Ed25519").unwrap(), SchemeKind::Ed25519);
        assert_eq!(SchemeKind::parse("ml-dsa-65").unwrap(), SchemeKind::MlDsa65);
        assert!(SchemeKind::parse("dsa").is_err());
    }

    #[test]
    fn test_ed25519_rejects_other_hashes() {
        assert!(SigScheme::new(SchemeKind::Ed25519, Some(HashKind::Sha256)).is_err());
        assert!(SigScheme::new(SchemeKind::Ed25519, Some(HashKind::Sha512)).is_ok());
        assert!(SigScheme::new(SchemeKind::Ed25519, None).is_ok());
    }

    #[test]
    fn test_rsa_round_trip_all_hashes() {
        let (private, public) = rsa_pair();
        let hashes = [
            HashKind::Sha256,
            HashKind::Sha512,
            HashKind::Sha3_256,
            HashKind::Sha3_512,
            HashKind::Blake2b,
        ];
        for hash in hashes {
            let scheme = SigScheme::new(SchemeKind::RsaPkcs1v15, Some(hash)).unwrap();
            let signature = scheme.sign(&private, b"block content").unwrap();
            assert_eq!(signature.len(), private.signature_length(), "{hash}");
            assert!(scheme.verify(&public, b"block content", &signature), "{hash}");
            assert!(!scheme.verify(&public, b"other content", &signature), "{hash}");
        }
    }

    #[test]
    fn test_ed25519_round_trip() {
        let (private, public) = ed25519_pair();
        let scheme = SigScheme::new(SchemeKind::Ed25519, None).unwrap();
        let signature = scheme.sign(&private, b"block content").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(scheme.verify(&public, b"block content", &signature));
        assert!(!scheme.verify(&public, b"other content", &signature));
    }

    #[test]
    fn test_mldsa_round_trip() {
        let (private, public) = mldsa_pair();
        let scheme = SigScheme::new(SchemeKind::MlDsa65, None).unwrap();
        let signature = scheme.sign(&private, b"block content").unwrap();
        assert_eq!(signature.len(), crate::mldsa::SIGNATURE_SIZE);
        assert!(scheme.verify(&public, b"block content", &signature));
        assert!(!scheme.verify(&public, b"other content", &signature));
    }

    #[test]
    fn test_mismatched_key_is_an_error() {
        let (_, ed_public) = ed25519_pair();
        let (ed_private, _) = ed25519_pair();
        let scheme = SigScheme::new(SchemeKind::RsaPkcs1v15, None).unwrap();
        assert!(scheme.sign(&ed_private, b"content").is_err());
        assert!(!scheme.verify(&ed_public, b"content", &[0u8; 64]));
    }

    #[test]
    fn test_garbage_signature_is_false_not_error() {
        let (_, public) = ed25519_pair();
        let scheme = SigScheme::new(SchemeKind::Ed25519, None).unwrap();
        assert!(!scheme.verify(&public, b"content", b"short"));
    }

    #[test]
    fn test_scheme_code_round_trip() {
        for code in 1u8..=3 {
            assert_eq!(SchemeKind::from_code(code).unwrap().code(), code);
        }
        assert!(SchemeKind::from_code(9).is_err());
    }
}
