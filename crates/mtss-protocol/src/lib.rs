//! # mtss-protocol
//!
//! The MTSS sign/verify protocol: message blocks are grouped by a cover-free
//! test design, each test group gets one aggregate signature, and the
//! pass/fail pattern of per-group verification localizes which blocks were
//! modified.
//!
//! This crate provides:
//! - **SignatureBundle**: the persisted artifact (design parameters +
//!   per-group signatures)
//! - **sign**: block grouping, per-group digesting and signing
//! - **verify**: per-group re-verification and localization decoding

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bundle;
pub mod error;
pub mod signer;
pub mod verifier;

pub use bundle::SignatureBundle;
pub use error::{ProtocolError, Result};
pub use signer::{sign, DesignRequest};
pub use verifier::{check_scheme, design_for_bundle, verify, verify_with_design, VerificationReport};

/// Concatenated content of one test group's member blocks, in group order.
///
/// This is the exact byte string each per-group signature covers; sign,
/// verify and correction must all use it unchanged.
pub fn group_content(blocks: &[String], group: &[u32]) -> Vec<u8> {
    let mut content = Vec::new();
    for &index in group {
        content.extend_from_slice(blocks[index as usize].as_bytes());
    }
    content
}

/// Like [`group_content`], but with the block at `replace` substituted by
/// `replacement`. Used by the correction engine to test candidate contents
/// without cloning the whole message.
pub fn group_content_with(
    blocks: &[String],
    group: &[u32],
    replace: u32,
    replacement: &[u8],
) -> Vec<u8> {
    let mut content = Vec::new();
    for &index in group {
        if index == replace {
            content.extend_from_slice(replacement);
        } else {
            content.extend_from_slice(blocks[index as usize].as_bytes());
        }
    }
    content
}
