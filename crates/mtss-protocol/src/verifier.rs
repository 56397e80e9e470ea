//! Verification: per-group re-verification and localization decoding.

use tracing::{debug, info, warn};

use mtss_cff::{reconstruct, CffDesign, DesignRepository};
use mtss_crypto::{PublicKey, SigScheme};

use crate::bundle::SignatureBundle;
use crate::error::{ProtocolError, Result};
use crate::group_content;

/// Outcome of verifying a message against a signature bundle.
///
/// `valid` means every per-group signature checked out. When it is false,
/// `modified_blocks` holds the localized block indices and `complete` says
/// whether that localization can be trusted (at most d blocks flagged). An
/// incomplete localization is reported as such, never silently truncated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationReport {
    /// Whether all test groups verified.
    pub valid: bool,
    /// Localized modified block indices, ascending.
    pub modified_blocks: Vec<u32>,
    /// Whether the flagged set is within the design's capacity d.
    pub complete: bool,
}

impl VerificationReport {
    fn clean() -> Self {
        Self {
            valid: true,
            modified_blocks: Vec::new(),
            complete: true,
        }
    }
}

/// Verify `blocks` against `bundle`, reconstructing the design the bundle
/// was signed with.
///
/// # Errors
///
/// Returns `SchemeMismatch` if the caller's scheme selection disagrees with
/// the bundle, `BlockCountMismatch` if the message cannot line up with the
/// design, and `DesignUnavailable` if the design can be neither looked up
/// nor re-derived.
pub fn verify(
    scheme: &SigScheme,
    key: &PublicKey,
    blocks: &[String],
    bundle: &SignatureBundle,
    repository: &dyn DesignRepository,
) -> Result<VerificationReport> {
    let design = design_for_bundle(bundle, blocks.len(), repository)?;
    check_scheme(scheme, bundle)?;
    Ok(verify_with_design(scheme, key, blocks, bundle, &design))
}

/// Verify against an already reconstructed design.
///
/// Split out so verify-and-correct can reuse the design for the correction
/// search without reconstructing it per block.
pub fn verify_with_design(
    scheme: &SigScheme,
    key: &PublicKey,
    blocks: &[String],
    bundle: &SignatureBundle,
    design: &CffDesign,
) -> VerificationReport {
    let outcomes: Vec<bool> = design
        .groups()
        .iter()
        .enumerate()
        .map(|(test, group)| {
            let content = group_content(blocks, group);
            scheme.verify(key, &content, bundle.signature(test as u32))
        })
        .collect();

    if outcomes.iter().all(|&passed| passed) {
        info!(n = bundle.n, "signature valid, message unmodified");
        return VerificationReport::clean();
    }

    // decode() cannot fail here: the outcome vector is built from the
    // design's own group list.
    let modified_blocks = design.decode(&outcomes).unwrap_or_default();
    let complete = modified_blocks.len() <= design.d as usize;
    if complete {
        info!(
            modified = ?modified_blocks,
            d = design.d,
            "signature invalid, modification localized"
        );
    } else {
        warn!(
            flagged = modified_blocks.len(),
            d = design.d,
            "more blocks flagged than the design can localize"
        );
    }
    VerificationReport {
        valid: false,
        modified_blocks,
        complete,
    }
}

/// Reconstruct the design recorded in a bundle, checking the message shape.
///
/// # Errors
///
/// See [`verify`].
pub fn design_for_bundle(
    bundle: &SignatureBundle,
    block_count: usize,
    repository: &dyn DesignRepository,
) -> Result<CffDesign> {
    if block_count != bundle.n as usize {
        return Err(ProtocolError::BlockCountMismatch {
            expected: bundle.n as usize,
            actual: block_count,
        });
    }
    debug!(n = bundle.n, d = bundle.d, t = bundle.t, "reconstructing design");
    Ok(reconstruct(
        repository, bundle.n, bundle.d, bundle.t, bundle.q, bundle.k,
    )?)
}

/// Ensure the caller's scheme selection agrees with what the bundle records.
///
/// # Errors
///
/// Returns `SchemeMismatch` when either the scheme or the hash differs.
pub fn check_scheme(scheme: &SigScheme, bundle: &SignatureBundle) -> Result<()> {
    if scheme.scheme() != bundle.scheme || scheme.hash() != bundle.hash {
        return Err(ProtocolError::SchemeMismatch {
            bundle: format!("{} / {}", bundle.scheme, bundle.hash),
            requested: format!("{} / {}", scheme.scheme(), scheme.hash()),
        });
    }
    Ok(())
}
