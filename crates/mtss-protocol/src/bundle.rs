//! The persisted signature bundle.
//!
//! Wire layout (all integers little-endian):
//!
//! ```text
//! magic "MTSS" | version u8 | scheme u8 | hash u8 |
//! n u32 | d u32 | t u32 | q u32 | k u32 | signature_length u32 |
//! t signatures of signature_length bytes each
//! ```
//!
//! The signature length field is what lets a reader split the byte stream
//! back into individual per-group signatures.

use serde::{Deserialize, Serialize};

use mtss_crypto::{HashKind, SchemeKind};

use crate::error::{ProtocolError, Result};

/// File magic of a signature bundle.
pub const BUNDLE_MAGIC: &[u8; 4] = b"MTSS";

/// Current bundle format version.
pub const BUNDLE_VERSION: u8 = 1;

/// Fixed header size in bytes.
pub const HEADER_LEN: usize = 4 + 1 + 1 + 1 + 6 * 4;

/// A signed message's persisted artifact: the CFF design parameters, the
/// algorithm identifiers, and one signature per test group.
///
/// Created at sign time, consumed read-only at verify time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBundle {
    /// Number of message blocks the design covers.
    pub n: u32,
    /// Localization capacity of the design.
    pub d: u32,
    /// Number of test groups (and signatures).
    pub t: u32,
    /// CFF construction field size (0 for the trivial design).
    pub q: u32,
    /// CFF construction degree bound (1 for the trivial design).
    pub k: u32,
    /// Signature scheme that produced the per-group signatures.
    pub scheme: SchemeKind,
    /// Hash function used for per-group digests.
    pub hash: HashKind,
    /// Length in bytes of each individual signature.
    pub signature_length: u32,
    signatures: Vec<Vec<u8>>,
}

impl SignatureBundle {
    /// Assemble a bundle, validating that the signature table matches the
    /// declared dimensions.
    ///
    /// # Errors
    ///
    /// Returns `MalformedBundle` if the count or any length disagrees.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n: u32,
        d: u32,
        t: u32,
        q: u32,
        k: u32,
        scheme: SchemeKind,
        hash: HashKind,
        signature_length: u32,
        signatures: Vec<Vec<u8>>,
    ) -> Result<Self> {
        if signatures.len() != t as usize {
            return Err(ProtocolError::MalformedBundle(format!(
                "expected {t} signatures, got {}",
                signatures.len()
            )));
        }
        if let Some(bad) = signatures.iter().position(|s| s.len() != signature_length as usize) {
            return Err(ProtocolError::MalformedBundle(format!(
                "signature {bad} has {} bytes, expected {signature_length}",
                signatures[bad].len()
            )));
        }
        Ok(Self {
            n,
            d,
            t,
            q,
            k,
            scheme,
            hash,
            signature_length,
            signatures,
        })
    }

    /// Total encoded size of a bundle with `t` signatures of `sig_len` bytes.
    pub fn encoded_len(t: u32, sig_len: usize) -> usize {
        HEADER_LEN + t as usize * sig_len
    }

    /// The per-group signatures, in design order.
    pub fn signatures(&self) -> &[Vec<u8>] {
        &self.signatures
    }

    /// The signature of one test group.
    ///
    /// # Panics
    ///
    /// Panics if `test` is out of range; callers iterate `0..t`.
    pub fn signature(&self, test: u32) -> &[u8] {
        &self.signatures[test as usize]
    }

    /// Serialize to the wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::encoded_len(self.t, self.signature_length as usize));
        out.extend_from_slice(BUNDLE_MAGIC);
        out.push(BUNDLE_VERSION);
        out.push(self.scheme.code());
        out.push(self.hash.code());
        for value in [self.n, self.d, self.t, self.q, self.k, self.signature_length] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        for signature in &self.signatures {
            out.extend_from_slice(signature);
        }
        out
    }

    /// Parse a bundle from the wire format.
    ///
    /// # Errors
    ///
    /// Returns `MalformedBundle` on bad magic, unknown version, or a length
    /// that disagrees with the header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(ProtocolError::MalformedBundle(format!(
                "{} bytes is shorter than the {HEADER_LEN}-byte header",
                bytes.len()
            )));
        }
        if &bytes[..4] != BUNDLE_MAGIC {
            return Err(ProtocolError::MalformedBundle("bad magic".into()));
        }
        if bytes[4] != BUNDLE_VERSION {
            return Err(ProtocolError::MalformedBundle(format!(
                "unknown version {}",
                bytes[4]
            )));
        }
        let scheme = SchemeKind::from_code(bytes[5])?;
        let hash = HashKind::from_code(bytes[6])?;

        let mut fields = [0u32; 6];
        for (i, field) in fields.iter_mut().enumerate() {
            let start = 7 + i * 4;
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes[start..start + 4]);
            *field = u32::from_le_bytes(raw);
        }
        let [n, d, t, q, k, signature_length] = fields;

        let body_len = (t as usize)
            .checked_mul(signature_length as usize)
            .ok_or_else(|| ProtocolError::MalformedBundle("signature table overflow".into()))?;
        if bytes.len() != HEADER_LEN + body_len {
            return Err(ProtocolError::MalformedBundle(format!(
                "expected {} bytes total, got {}",
                HEADER_LEN + body_len,
                bytes.len()
            )));
        }

        let signatures = bytes[HEADER_LEN..]
            .chunks_exact(signature_length as usize)
            .map(<[u8]>::to_vec)
            .collect();
        Self::new(n, d, t, q, k, scheme, hash, signature_length, signatures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> SignatureBundle {
        let signatures = (0..9u8).map(|i| vec![i; 64]).collect();
        SignatureBundle::new(
            8,
            2,
            9,
            3,
            2,
            SchemeKind::Ed25519,
            HashKind::Sha512,
            64,
            signatures,
        )
        .unwrap()
    }

    #[test]
    fn test_wire_round_trip() {
        let bundle = sample_bundle();
        let bytes = bundle.to_bytes();
        assert_eq!(bytes.len(), SignatureBundle::encoded_len(9, 64));
        let parsed = SignatureBundle::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn test_new_rejects_wrong_signature_count() {
        let signatures = vec![vec![0u8; 64]; 3];
        assert!(SignatureBundle::new(
            8,
            2,
            9,
            3,
            2,
            SchemeKind::Ed25519,
            HashKind::Sha512,
            64,
            signatures
        )
        .is_err());
    }

    #[test]
    fn test_new_rejects_wrong_signature_length() {
        let mut signatures: Vec<Vec<u8>> = (0..9).map(|_| vec![0u8; 64]).collect();
        signatures[4] = vec![0u8; 63];
        assert!(SignatureBundle::new(
            8,
            2,
            9,
            3,
            2,
            SchemeKind::Ed25519,
            HashKind::Sha512,
            64,
            signatures
        )
        .is_err());
    }

    #[test]
    fn test_from_bytes_rejects_bad_magic() {
        let mut bytes = sample_bundle().to_bytes();
        bytes[0] = b'X';
        assert!(SignatureBundle::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_from_bytes_rejects_unknown_version() {
        let mut bytes = sample_bundle().to_bytes();
        bytes[4] = 99;
        assert!(SignatureBundle::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_from_bytes_rejects_truncated_body() {
        let bytes = sample_bundle().to_bytes();
        assert!(SignatureBundle::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_from_bytes_rejects_short_header() {
        assert!(SignatureBundle::from_bytes(b"MTSS").is_err());
    }

    #[test]
    fn test_signature_accessor_preserves_order() {
        let bundle = sample_bundle();
        for i in 0..9u32 {
            assert_eq!(bundle.signature(i), vec![i as u8; 64]);
        }
    }
}
