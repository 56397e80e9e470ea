//! CFF design type, outcome decoding, and design acquisition.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CffError, Result};
use crate::polynomial::{self, MAX_CONSTRUCTION_K};
use crate::store::DesignRepository;

/// Parameters of a CFF design, derivable without materializing its groups.
///
/// Used by the size-constrained sign mode to cost out candidate designs
/// before committing to one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignParams {
    /// Number of items (message blocks) covered.
    pub n: u32,
    /// Maximum number of defective items that remain uniquely decodable.
    pub d: u32,
    /// Number of tests (per-group signatures).
    pub t: u32,
    /// Field size of the polynomial construction (0 for the trivial design).
    pub q: u32,
    /// Polynomial degree bound of the construction (1 for the trivial design).
    pub k: u32,
}

impl DesignParams {
    /// Derive the parameters the construction for (n, k) would produce.
    ///
    /// k = 1 selects the trivial per-block design. For k >= 2 the smallest
    /// prime field covering n is chosen.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` for k = 0 or a derived d that is zero or
    /// reaches n.
    pub fn for_k(n: u32, k: u32) -> Result<Self> {
        if n == 0 {
            return Err(CffError::InvalidParameters("n must be positive".into()));
        }
        match k {
            0 => Err(CffError::InvalidParameters("k must be positive".into())),
            1 => {
                if n == 1 {
                    return Err(CffError::InvalidParameters(
                        "d = 1 >= n = 1 for the trivial design".into(),
                    ));
                }
                Ok(Self {
                    n,
                    d: 1,
                    t: n,
                    q: 0,
                    k: 1,
                })
            }
            _ => {
                let q = polynomial::smallest_field(n, k, k)?;
                let d = (q - 1) / (k - 1);
                if d >= n {
                    return Err(CffError::InvalidParameters(format!(
                        "d = {d} >= n = {n} for k = {k}"
                    )));
                }
                Ok(Self {
                    n,
                    d,
                    t: q * q,
                    q,
                    k,
                })
            }
        }
    }
}

/// A d-cover-free test design over n block indices.
///
/// Read-only once built: both the group order and the member order within
/// each group determine which bytes are concatenated for each per-group
/// signature, so a design must never be re-derived with different
/// tie-breaking between sign and verify.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CffDesign {
    /// Number of items (message blocks).
    pub n: u32,
    /// Localization capacity.
    pub d: u32,
    /// Number of tests.
    pub t: u32,
    /// Construction field size (0 when unknown or trivial).
    pub q: u32,
    /// Construction degree bound (1 for the trivial design).
    pub k: u32,
    groups: Vec<Vec<u32>>,
}

impl CffDesign {
    /// Build a design after validating its groups.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDesign` if the group count differs from t, any
    /// index is out of range, a group has duplicate or unsorted members, or
    /// some block belongs to no test.
    pub fn new(n: u32, d: u32, t: u32, q: u32, k: u32, groups: Vec<Vec<u32>>) -> Result<Self> {
        if groups.len() != t as usize {
            return Err(CffError::MalformedDesign(format!(
                "expected {t} groups, got {}",
                groups.len()
            )));
        }
        let mut covered = vec![false; n as usize];
        for (test, group) in groups.iter().enumerate() {
            let mut previous: Option<u32> = None;
            for &index in group {
                if index >= n {
                    return Err(CffError::MalformedDesign(format!(
                        "test {test} contains index {index} >= n = {n}"
                    )));
                }
                if previous.is_some_and(|p| p >= index) {
                    return Err(CffError::MalformedDesign(format!(
                        "test {test} members are not strictly ascending"
                    )));
                }
                previous = Some(index);
                covered[index as usize] = true;
            }
        }
        if let Some(missing) = covered.iter().position(|&c| !c) {
            return Err(CffError::MalformedDesign(format!(
                "block {missing} belongs to no test"
            )));
        }
        Ok(Self {
            n,
            d,
            t,
            q,
            k,
            groups,
        })
    }

    /// The parameter tuple of this design.
    pub fn params(&self) -> DesignParams {
        DesignParams {
            n: self.n,
            d: self.d,
            t: self.t,
            q: self.q,
            k: self.k,
        }
    }

    /// All test groups, in design order.
    pub fn groups(&self) -> &[Vec<u32>] {
        &self.groups
    }

    /// Members of one test group.
    ///
    /// # Panics
    ///
    /// Panics if `test` is out of range; callers iterate `0..t`.
    pub fn group(&self, test: u32) -> &[u32] {
        &self.groups[test as usize]
    }

    /// Indices of the tests containing the given block.
    pub fn groups_containing(&self, block: u32) -> Vec<u32> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(_, group)| group.binary_search(&block).is_ok())
            .map(|(test, _)| test as u32)
            .collect()
    }

    /// Decode a per-test outcome pattern into the set of flagged blocks.
    ///
    /// A block is flagged iff every test containing it failed; by the
    /// cover-free property this recovers exactly the modified set whenever
    /// at most d blocks were modified. Callers must treat a flagged set
    /// larger than d as incomplete localization, never as a trusted answer.
    ///
    /// # Errors
    ///
    /// Returns `OutcomeLengthMismatch` if `outcomes` does not have t entries.
    pub fn decode(&self, outcomes: &[bool]) -> Result<Vec<u32>> {
        if outcomes.len() != self.t as usize {
            return Err(CffError::OutcomeLengthMismatch {
                expected: self.t as usize,
                actual: outcomes.len(),
            });
        }
        let mut cleared = vec![false; self.n as usize];
        for (group, &passed) in self.groups.iter().zip(outcomes) {
            if passed {
                for &index in group {
                    cleared[index as usize] = true;
                }
            }
        }
        Ok(cleared
            .iter()
            .enumerate()
            .filter(|(_, &clean)| !clean)
            .map(|(index, _)| index as u32)
            .collect())
    }
}

/// Obtain a design for (n, k): repository lookup first, then deterministic
/// construction, persisting the result for later verification runs.
///
/// # Errors
///
/// Propagates `InvalidParameters` from parameter derivation and store errors
/// from the repository.
pub fn obtain(repository: &dyn DesignRepository, n: u32, k: u32) -> Result<CffDesign> {
    obtain_params(repository, DesignParams::for_k(n, k)?)
}

/// Obtain the design with exactly these parameters, which need not use the
/// smallest field for their k (the size-constrained sign mode picks larger
/// fields when the budget allows a higher d).
///
/// # Errors
///
/// Propagates construction and store errors.
pub fn obtain_params(repository: &dyn DesignRepository, params: DesignParams) -> Result<CffDesign> {
    if let Some(groups) = repository.get(params.d, params.t, params.n)? {
        debug!(d = params.d, t = params.t, n = params.n, "CFF design loaded from store");
        return CffDesign::new(params.n, params.d, params.t, params.q, params.k, groups);
    }
    let design = if params.k == 1 {
        polynomial::trivial(params.n)?
    } else {
        polynomial::construct(params.n, params.q, params.k)?
    };
    repository.put(&design)?;
    debug!(
        d = design.d,
        t = design.t,
        n = design.n,
        q = design.q,
        k = design.k,
        "CFF design constructed"
    );
    Ok(design)
}

/// Rebuild the design a signature bundle was created with.
///
/// The repository is consulted first; otherwise the design is re-derived
/// from the recorded (q, k) and cross-checked against the recorded (d, t) so
/// that sign and verify can never disagree on group order.
///
/// # Errors
///
/// Returns `DesignUnavailable` if neither source yields a matching design.
pub fn reconstruct(
    repository: &dyn DesignRepository,
    n: u32,
    d: u32,
    t: u32,
    q: u32,
    k: u32,
) -> Result<CffDesign> {
    if let Some(groups) = repository.get(d, t, n)? {
        return CffDesign::new(n, d, t, q, k, groups);
    }
    let design = if k <= 1 {
        polynomial::trivial(n)?
    } else {
        polynomial::construct(n, q, k)?
    };
    if design.d != d || design.t != t {
        return Err(CffError::DesignUnavailable(format!(
            "recorded {d}-CFF({t}, {n}) does not match construction for q = {q}, k = {k}"
        )));
    }
    Ok(design)
}

/// Search (k, q) parameter space for the design with the largest d whose
/// bundle fits a byte budget.
///
/// For every k the search walks successive prime fields, not just the
/// smallest one covering n: a larger q costs t = q^2 tests but raises
/// d = (q - 1) / (k - 1), and the budget is the only ceiling. The walk per
/// k stops once the cost exceeds the budget or d reaches n.
///
/// `cost` maps a candidate's test count to the resulting bundle size in
/// bytes. Candidates with equal d prefer fewer tests.
///
/// # Errors
///
/// Returns `DesignUnavailable` when no candidate fits the budget.
pub fn best_params_within(
    n: u32,
    budget: usize,
    cost: impl Fn(u32) -> usize,
) -> Result<DesignParams> {
    let mut best: Option<DesignParams> = None;
    let mut consider = |candidate: DesignParams| {
        let better = match best {
            None => true,
            Some(current) => {
                candidate.d > current.d || (candidate.d == current.d && candidate.t < current.t)
            }
        };
        if better {
            best = Some(candidate);
        }
    };

    if let Ok(trivial) = DesignParams::for_k(n, 1) {
        if cost(trivial.t) <= budget {
            consider(trivial);
        }
    }
    for k in 2..=MAX_CONSTRUCTION_K {
        let Ok(mut q) = polynomial::smallest_field(n, k, k) else {
            continue;
        };
        loop {
            let d = (q - 1) / (k - 1);
            if d >= n {
                break;
            }
            let Some(t) = q.checked_mul(q) else {
                break;
            };
            if cost(t) > budget {
                break;
            }
            consider(DesignParams { n, d, t, q, k });
            let Some(next) = (q + 1..).find(|&v| polynomial::is_prime(v)) else {
                break;
            };
            q = next;
        }
    }
    best.ok_or_else(|| {
        CffError::DesignUnavailable(format!(
            "no design for n = {n} fits within {budget} bytes"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDesignRepository;

    #[test]
    fn test_params_for_k1_is_trivial() {
        let params = DesignParams::for_k(10, 1).unwrap();
        assert_eq!(params.d, 1);
        assert_eq!(params.t, 10);
    }

    #[test]
    fn test_params_for_k2_n8() {
        let params = DesignParams::for_k(8, 2).unwrap();
        assert_eq!(params, DesignParams { n: 8, d: 2, t: 9, q: 3, k: 2 });
    }

    #[test]
    fn test_params_rejects_k0() {
        assert!(DesignParams::for_k(8, 0).is_err());
    }

    #[test]
    fn test_params_reject_single_block_trivial() {
        // d = 1 would not stay below n = 1.
        assert!(DesignParams::for_k(1, 1).is_err());
    }

    #[test]
    fn test_obtain_params_materializes_non_minimal_field() {
        let repo = MemoryDesignRepository::new();
        let params = DesignParams { n: 8, d: 4, t: 25, q: 5, k: 2 };
        let design = obtain_params(&repo, params).unwrap();
        assert_eq!(design.params(), params);
        assert!(repo.get(4, 25, 8).unwrap().is_some());
    }

    #[test]
    fn test_new_rejects_out_of_range_index() {
        let groups = vec![vec![0, 5], vec![1]];
        assert!(CffDesign::new(3, 1, 2, 0, 1, groups).is_err());
    }

    #[test]
    fn test_new_rejects_unsorted_group() {
        let groups = vec![vec![1, 0], vec![0], vec![2]];
        assert!(CffDesign::new(3, 1, 3, 0, 1, groups).is_err());
    }

    #[test]
    fn test_new_rejects_uncovered_block() {
        let groups = vec![vec![0], vec![0]];
        assert!(CffDesign::new(2, 1, 2, 0, 1, groups).is_err());
    }

    #[test]
    fn test_decode_requires_matching_length() {
        let design = crate::polynomial::trivial(4).unwrap();
        assert!(design.decode(&[true, false]).is_err());
    }

    #[test]
    fn test_decode_clean_pattern_flags_nothing() {
        let design = crate::polynomial::construct(8, 3, 2).unwrap();
        let outcomes = vec![true; design.t as usize];
        assert!(design.decode(&outcomes).unwrap().is_empty());
    }

    #[test]
    fn test_decode_localizes_two_blocks() {
        let design = crate::polynomial::construct(8, 3, 2).unwrap();
        let modified = [2u32, 5];
        let outcomes: Vec<bool> = design
            .groups()
            .iter()
            .map(|group| !group.iter().any(|i| modified.contains(i)))
            .collect();
        assert_eq!(design.decode(&outcomes).unwrap(), vec![2, 5]);
    }

    #[test]
    fn test_obtain_round_trips_through_repository() {
        let repo = MemoryDesignRepository::new();
        let first = obtain(&repo, 8, 2).unwrap();
        let second = obtain(&repo, 8, 2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reconstruct_matches_signed_design() {
        let repo = MemoryDesignRepository::new();
        let signed = obtain(&repo, 20, 2).unwrap();
        let empty = MemoryDesignRepository::new();
        let rebuilt = reconstruct(&empty, signed.n, signed.d, signed.t, signed.q, signed.k).unwrap();
        assert_eq!(signed.groups(), rebuilt.groups());
    }

    #[test]
    fn test_reconstruct_rejects_mismatched_parameters() {
        let repo = MemoryDesignRepository::new();
        // d = 3 is not what q = 3, k = 2 produces.
        assert!(reconstruct(&repo, 8, 3, 9, 3, 2).is_err());
    }

    #[test]
    fn test_best_params_walks_larger_fields() {
        // Cost model: 64-byte signatures, no overhead. A budget of t <= 49
        // admits the q = 7, k = 2 design (d = 6), which beats the minimal
        // q = 3 field (d = 2) for the same k.
        let best = best_params_within(8, 49 * 64, |t| t as usize * 64).unwrap();
        assert_eq!(best, DesignParams { n: 8, d: 6, t: 49, q: 7, k: 2 });
    }

    #[test]
    fn test_best_params_minimal_field_when_budget_is_tight() {
        // t <= 9 only fits the trivial design and the q = 3, k = 2 field.
        let best = best_params_within(8, 9 * 64, |t| t as usize * 64).unwrap();
        assert_eq!(best, DesignParams { n: 8, d: 2, t: 9, q: 3, k: 2 });
    }

    #[test]
    fn test_best_params_fails_when_budget_too_small() {
        assert!(best_params_within(8, 10, |t| t as usize * 64).is_err());
    }

    #[test]
    fn test_best_params_falls_back_to_trivial() {
        // Budget fits t = n = 4 but not t = q^2 = 9 for any k >= 2.
        let best = best_params_within(4, 4 * 64, |t| t as usize * 64).unwrap();
        assert_eq!(best.k, 1);
        assert_eq!(best.d, 1);
    }
}
