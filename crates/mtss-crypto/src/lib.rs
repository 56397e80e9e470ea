//! # mtss-crypto
//!
//! Signature scheme primitives for the MTSS protocol:
//! - **RSA PKCS#1 v1.5** over a selectable digest (SHA-2, SHA-3, BLAKE2b)
//! - **Ed25519** (digest pinned to SHA-512)
//! - **ML-DSA-65** post-quantum signatures over raw content
//!
//! plus PEM/raw key loading. Signature verification failure is reported as a
//! boolean outcome, never as an error: the protocol layer turns per-group
//! verification bits into localization results.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod hash;
pub mod keys;
pub mod mldsa;
pub mod scheme;

pub use error::{CryptoError, Result};
pub use hash::HashKind;
pub use keys::{load_private_key, load_public_key};
pub use scheme::{PrivateKey, PublicKey, SchemeKind, SigScheme};
