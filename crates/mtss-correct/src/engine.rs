//! The brute-force search engine for a single tampered block.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use tracing::debug;

use mtss_cff::CffDesign;
use mtss_crypto::{PublicKey, SigScheme};
use mtss_protocol::{group_content_with, SignatureBundle};

/// Candidate bytes are drawn from the 7-bit range; substituting a
/// non-ASCII byte could only produce a valid block through a multi-byte
/// sequence, which a substitution-only search cannot assemble anyway.
const ALPHABET_MAX: u8 = 0x7F;

/// Knobs for the correction search.
#[derive(Clone, Copy, Debug)]
pub struct CorrectionOptions {
    /// Maximum number of byte substitutions to try per block.
    pub max_edits: usize,
    /// Number of search worker threads.
    pub workers: usize,
}

impl Default for CorrectionOptions {
    fn default() -> Self {
        Self {
            max_edits: 1,
            workers: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

/// Result of a correction search for one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A candidate validated every test group containing the block.
    Corrected {
        /// The accepted content.
        content: String,
        /// Other distinct candidates that also validated. Signature
        /// verification is a validity oracle, not an originality oracle,
        /// so ties are surfaced instead of silently dropped.
        collisions: Vec<String>,
    },
    /// No candidate within the edit budget validated.
    Uncorrectable,
}

struct Search<'a> {
    scheme: &'a SigScheme,
    key: &'a PublicKey,
    blocks: &'a [String],
    block: u32,
    bundle: &'a SignatureBundle,
    /// (test index, group members) for every test containing the block.
    tests: Vec<(u32, &'a [u32])>,
}

impl Search<'_> {
    /// A candidate is accepted iff it is valid UTF-8 and every affected
    /// group's stored signature verifies with the candidate substituted in.
    fn accepts(&self, candidate: &[u8]) -> bool {
        if std::str::from_utf8(candidate).is_err() {
            return false;
        }
        self.tests.iter().all(|&(test, group)| {
            let content = group_content_with(self.blocks, group, self.block, candidate);
            self.scheme
                .verify(self.key, &content, self.bundle.signature(test))
        })
    }
}

/// Search for a content of `blocks[block]` that validates the stored
/// signatures of the block's test groups, trying all substitutions of up to
/// `options.max_edits` bytes.
///
/// `modified` is the full localized set: groups that also contain another
/// still-tampered block can never validate no matter what candidate is
/// substituted here, so acceptance is restricted to the groups whose other
/// members are all clean. The cover-free property guarantees at least one
/// such group whenever the localized set is within the design's capacity d.
///
/// The position space is partitioned across workers by the first edited
/// position; the first accepted candidate wins and cooperatively cancels
/// the rest of the search.
#[allow(clippy::too_many_arguments)]
pub fn correct(
    scheme: &SigScheme,
    key: &PublicKey,
    blocks: &[String],
    block: u32,
    bundle: &SignatureBundle,
    design: &CffDesign,
    modified: &[u32],
    options: &CorrectionOptions,
) -> Outcome {
    let tests: Vec<(u32, &[u32])> = design
        .groups_containing(block)
        .into_iter()
        .map(|test| (test, design.group(test)))
        .filter(|(_, group)| {
            group
                .iter()
                .all(|&member| member == block || !modified.contains(&member))
        })
        .collect();
    if tests.is_empty() {
        // No group can isolate this block from the other tampered ones.
        return Outcome::Uncorrectable;
    }
    let search = Search {
        scheme,
        key,
        blocks,
        block,
        bundle,
        tests,
    };

    let original = blocks[block as usize].as_bytes();
    let positions = original.len();
    let max_edits = options.max_edits.max(1).min(positions);
    let workers = options.workers.max(1).min(positions.max(1));
    debug!(
        block,
        positions,
        max_edits,
        workers,
        affected_tests = search.tests.len(),
        "correction search started"
    );
    if positions == 0 {
        return Outcome::Uncorrectable;
    }

    let stop = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    thread::scope(|scope| {
        for worker in 0..workers {
            let tx = tx.clone();
            let search = &search;
            let stop = &stop;
            scope.spawn(move || {
                let mut candidate = original.to_vec();
                // Stride partition over the first edited position.
                let mut first = worker;
                while first < candidate.len() {
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }
                    substitute_from(search, &mut candidate, first, max_edits, stop, &tx);
                    debug!(
                        worker,
                        block = search.block,
                        position = first,
                        "first-edit position exhausted"
                    );
                    first += workers;
                }
            });
        }
    });
    drop(tx);

    let mut found: Vec<String> = Vec::new();
    while let Ok(bytes) = rx.recv() {
        // Workers only send UTF-8-checked candidates.
        if let Ok(content) = String::from_utf8(bytes) {
            if !found.contains(&content) {
                found.push(content);
            }
        }
    }
    match found.split_first() {
        Some((content, rest)) => {
            if !rest.is_empty() {
                debug!(block, collisions = rest.len(), "multiple validating candidates");
            }
            Outcome::Corrected {
                content: content.clone(),
                collisions: rest.to_vec(),
            }
        }
        None => Outcome::Uncorrectable,
    }
}

/// Try every substitution at `position`, then recurse into later positions
/// while edits remain. Depth-first, so each position set is visited once.
fn substitute_from(
    search: &Search<'_>,
    candidate: &mut Vec<u8>,
    position: usize,
    edits_left: usize,
    stop: &AtomicBool,
    tx: &mpsc::Sender<Vec<u8>>,
) {
    let original = candidate[position];
    for byte in 0..=ALPHABET_MAX {
        if byte == original {
            continue;
        }
        if stop.load(Ordering::Relaxed) {
            break;
        }
        candidate[position] = byte;
        if search.accepts(candidate) {
            let _ = tx.send(candidate.clone());
            stop.store(true, Ordering::Relaxed);
            break;
        }
        if edits_left > 1 {
            for next in position + 1..candidate.len() {
                substitute_from(search, candidate, next, edits_left - 1, stop, tx);
            }
        }
    }
    candidate[position] = original;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtss_cff::{DesignRepository, MemoryDesignRepository};
    use mtss_crypto::{PrivateKey, SchemeKind};
    use mtss_protocol::{design_for_bundle, sign, DesignRequest};
    use rand::rngs::OsRng;

    fn ed25519() -> (SigScheme, PrivateKey, PublicKey) {
        let signing = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        (
            SigScheme::new(SchemeKind::Ed25519, None).unwrap(),
            PrivateKey::Ed25519(signing),
            PublicKey::Ed25519(verifying),
        )
    }

    fn signed_message(
        repo: &dyn DesignRepository,
    ) -> (SigScheme, PublicKey, Vec<String>, SignatureBundle) {
        let (scheme, private, public) = ed25519();
        let blocks: Vec<String> = (0..8).map(|i| format!("line {i}")).collect();
        let bundle = sign(&scheme, &private, &blocks, DesignRequest::Explicit { k: 2 }, repo)
            .unwrap();
        (scheme, public, blocks, bundle)
    }

    #[test]
    fn test_single_byte_corruption_is_recovered() {
        let repo = MemoryDesignRepository::new();
        let (scheme, public, blocks, bundle) = signed_message(&repo);
        let mut tampered = blocks.clone();
        tampered[3] = "lXne 3".to_string();

        let design = design_for_bundle(&bundle, tampered.len(), &repo).unwrap();
        let outcome = correct(
            &scheme,
            &public,
            &tampered,
            3,
            &bundle,
            &design,
            &[3],
            &CorrectionOptions { max_edits: 1, workers: 2 },
        );
        match outcome {
            Outcome::Corrected { content, .. } => assert_eq!(content, "line 3"),
            Outcome::Uncorrectable => panic!("expected correction"),
        }
    }

    #[test]
    fn test_corrects_despite_shared_group_with_other_tampered_block() {
        let repo = MemoryDesignRepository::new();
        let (scheme, public, blocks, bundle) = signed_message(&repo);
        // Blocks 2 and 5 share a test group in the q = 3, k = 2 design;
        // that group stays invalid while block 5 is tampered, so acceptance
        // must lean on block 2's clean groups alone.
        let mut tampered = blocks.clone();
        tampered[2] = "lXne 2".to_string();
        tampered[5] = "lXne 5".to_string();

        let design = design_for_bundle(&bundle, tampered.len(), &repo).unwrap();
        let outcome = correct(
            &scheme,
            &public,
            &tampered,
            2,
            &bundle,
            &design,
            &[2, 5],
            &CorrectionOptions { max_edits: 1, workers: 2 },
        );
        match outcome {
            Outcome::Corrected { content, .. } => assert_eq!(content, "line 2"),
            Outcome::Uncorrectable => panic!("expected correction"),
        }
    }

    #[test]
    fn test_budget_too_small_is_uncorrectable() {
        let repo = MemoryDesignRepository::new();
        let (scheme, public, blocks, bundle) = signed_message(&repo);
        let mut tampered = blocks.clone();
        // Two substituted bytes; a one-edit search cannot reach the original.
        tampered[3] = "lXnX 3".to_string();

        let design = design_for_bundle(&bundle, tampered.len(), &repo).unwrap();
        let outcome = correct(
            &scheme,
            &public,
            &tampered,
            3,
            &bundle,
            &design,
            &[3],
            &CorrectionOptions { max_edits: 1, workers: 2 },
        );
        assert_eq!(outcome, Outcome::Uncorrectable);
    }

    #[test]
    fn test_two_edit_budget_recovers_two_substitutions() {
        let repo = MemoryDesignRepository::new();
        let (scheme, public, blocks, bundle) = signed_message(&repo);
        let mut tampered = blocks.clone();
        tampered[5] = "xine x".to_string();

        let design = design_for_bundle(&bundle, tampered.len(), &repo).unwrap();
        let outcome = correct(
            &scheme,
            &public,
            &tampered,
            5,
            &bundle,
            &design,
            &[5],
            &CorrectionOptions { max_edits: 2, workers: 4 },
        );
        match outcome {
            Outcome::Corrected { content, .. } => assert_eq!(content, "line 5"),
            Outcome::Uncorrectable => panic!("expected correction"),
        }
    }

    #[test]
    fn test_default_options_are_sane() {
        let options = CorrectionOptions::default();
        assert_eq!(options.max_edits, 1);
        assert!(options.workers >= 1);
    }
}
