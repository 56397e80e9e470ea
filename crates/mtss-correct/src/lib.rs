//! # mtss-correct
//!
//! Brute-force correction of localized block tampering.
//!
//! For each block the verifier localized, the engine searches the space of
//! small byte edits for a content that satisfies the stored signatures of
//! the block's clean test groups (those containing no other tampered
//! block), using the remaining blocks as-is; a full repair is then
//! confirmed against every group. The search is partitioned across a fixed
//! worker pool with first-accepted-wins semantics and cooperative
//! cancellation.
//!
//! The acceptance check is a validity oracle, not an originality oracle:
//! any content that validates all affected groups is accepted, and when more
//! than one distinct candidate validates, the extras are reported as
//! collisions rather than suppressed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;

pub use engine::{correct, CorrectionOptions, Outcome};

use tracing::{info, warn};

use mtss_cff::DesignRepository;
use mtss_crypto::{PublicKey, SigScheme};
use mtss_protocol::{check_scheme, design_for_bundle, verify_with_design, Result,
    SignatureBundle, VerificationReport};

/// Correction attempt for one localized block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockCorrection {
    /// Index of the block the attempt targeted.
    pub index: u32,
    /// What the search produced.
    pub outcome: Outcome,
}

/// Result of a verify-and-correct run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrectionReport {
    /// The verification and localization outcome.
    pub verification: VerificationReport,
    /// Per-block correction attempts, in block order. Empty when the
    /// message verified clean or localization was incomplete.
    pub corrections: Vec<BlockCorrection>,
    /// The full block list with every successful correction applied, when
    /// at least one block was corrected. A fully corrected list has also
    /// passed re-verification against every test group.
    pub corrected_blocks: Option<Vec<String>>,
}

/// Verify a message and attempt to repair whatever tampering was localized.
///
/// Correction runs only when localization is complete (at most d blocks
/// flagged); an overloaded localization is reported uncorrected. Per-block
/// failures are local: one uncorrectable block does not stop the others.
///
/// # Errors
///
/// Same failure modes as [`mtss_protocol::verify`]; correction itself never
/// errors, it reports per-block outcomes.
pub fn verify_and_correct(
    scheme: &SigScheme,
    key: &PublicKey,
    blocks: &[String],
    bundle: &SignatureBundle,
    repository: &dyn DesignRepository,
    options: &CorrectionOptions,
) -> Result<CorrectionReport> {
    let design = design_for_bundle(bundle, blocks.len(), repository)?;
    check_scheme(scheme, bundle)?;
    let verification = verify_with_design(scheme, key, blocks, bundle, &design);

    if verification.valid {
        // Uncorrupted message: the engine is not invoked at all.
        return Ok(CorrectionReport {
            verification,
            corrections: Vec::new(),
            corrected_blocks: None,
        });
    }
    if !verification.complete {
        warn!(
            flagged = verification.modified_blocks.len(),
            d = bundle.d,
            "localization incomplete, correction skipped"
        );
        return Ok(CorrectionReport {
            verification,
            corrections: Vec::new(),
            corrected_blocks: None,
        });
    }

    let mut corrections = Vec::with_capacity(verification.modified_blocks.len());
    let mut corrected = blocks.to_vec();
    let mut any_corrected = false;
    for &index in &verification.modified_blocks {
        let outcome = correct(
            scheme,
            key,
            blocks,
            index,
            bundle,
            &design,
            &verification.modified_blocks,
            options,
        );
        match &outcome {
            Outcome::Corrected { content, .. } => {
                info!(block = index, "block corrected");
                corrected[index as usize] = content.clone();
                any_corrected = true;
            }
            Outcome::Uncorrectable => {
                warn!(block = index, "block could not be corrected");
            }
        }
        corrections.push(BlockCorrection { index, outcome });
    }

    // Per-block acceptance excludes groups shared with other tampered
    // blocks, so a full repair is confirmed against every group before it
    // is reported.
    let all_corrected = corrections
        .iter()
        .all(|c| matches!(c.outcome, Outcome::Corrected { .. }));
    if all_corrected && !verify_with_design(scheme, key, &corrected, bundle, &design).valid {
        warn!("corrected message failed re-verification");
        return Ok(CorrectionReport {
            verification,
            corrections,
            corrected_blocks: None,
        });
    }

    Ok(CorrectionReport {
        verification,
        corrections,
        corrected_blocks: any_corrected.then_some(corrected),
    })
}
