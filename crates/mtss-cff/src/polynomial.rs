//! Polynomial cover-free family construction over a prime field.
//!
//! Blocks are identified with polynomials of degree < k over GF(q): block i
//! has coefficients equal to the base-q digits of i. There is one test per
//! point (x, y) in GF(q) x GF(q); the test contains block i iff p_i(x) = y.
//! Two distinct polynomials of degree < k agree on at most k - 1 points, so
//! the family is d-cover-free for d = floor((q - 1) / (k - 1)), with t = q^2
//! tests covering up to n = q^k blocks.

use crate::design::CffDesign;
use crate::error::{CffError, Result};

/// Upper bound on the construction parameter k considered by searches.
///
/// Beyond this, q must be so small relative to n that the resulting d is
/// never competitive with smaller k values.
pub const MAX_CONSTRUCTION_K: u32 = 8;

/// Primality test by trial division. Fields here are tiny (q is on the
/// order of n^(1/k)), so nothing faster is warranted.
pub fn is_prime(q: u32) -> bool {
    if q < 2 {
        return false;
    }
    if q % 2 == 0 {
        return q == 2;
    }
    let mut f = 3u32;
    while (f as u64) * (f as u64) <= q as u64 {
        if q % f == 0 {
            return false;
        }
        f += 2;
    }
    true
}

/// Smallest prime q satisfying q >= lower and q^k >= n.
pub fn smallest_field(n: u32, k: u32, lower: u32) -> Result<u32> {
    let mut q = lower.max(2);
    loop {
        if is_prime(q) && pow_at_least(q, k, n as u64) {
            return Ok(q);
        }
        q = q
            .checked_add(1)
            .ok_or_else(|| CffError::DesignUnavailable(format!("no prime field covers n = {n}")))?;
    }
}

/// Checks q^k >= n without overflow.
fn pow_at_least(q: u32, k: u32, n: u64) -> bool {
    let mut acc: u128 = 1;
    for _ in 0..k {
        acc *= q as u128;
        if acc >= n as u128 {
            return true;
        }
    }
    acc >= n as u128
}

/// Evaluate the polynomial identified by `index` at point `x` in GF(q).
///
/// Coefficients are the base-q digits of `index`, least significant first.
fn evaluate(index: u32, x: u32, q: u32, k: u32) -> u32 {
    let q64 = q as u64;
    let mut rest = index as u64;
    let mut power = 1u64;
    let mut acc = 0u64;
    for _ in 0..k {
        let coefficient = rest % q64;
        rest /= q64;
        acc = (acc + coefficient * power) % q64;
        power = (power * x as u64) % q64;
    }
    acc as u32
}

/// Construct the polynomial d-CFF(q^2, n) design for the given field.
///
/// Tests are ordered lexicographically by (x, y) and members ascend by block
/// index; this ordering is part of the design identity and must match between
/// sign and verify.
///
/// # Errors
///
/// Returns `InvalidParameters` if q is not prime, k < 2, q < k (which would
/// give d = 0), q^k < n, or the derived d reaches n.
pub fn construct(n: u32, q: u32, k: u32) -> Result<CffDesign> {
    if n == 0 {
        return Err(CffError::InvalidParameters("n must be positive".into()));
    }
    if k < 2 {
        return Err(CffError::InvalidParameters(format!(
            "polynomial construction requires k >= 2, got {k}"
        )));
    }
    if !is_prime(q) {
        return Err(CffError::InvalidParameters(format!("q = {q} is not prime")));
    }
    if q < k {
        return Err(CffError::InvalidParameters(format!(
            "q = {q} < k = {k} gives zero localization power"
        )));
    }
    if !pow_at_least(q, k, n as u64) {
        return Err(CffError::InvalidParameters(format!(
            "field too small: {q}^{k} < n = {n}"
        )));
    }
    let d = (q - 1) / (k - 1);
    if d >= n {
        return Err(CffError::InvalidParameters(format!(
            "d = {d} >= n = {n}: per-block testing is cheaper"
        )));
    }
    let t = q * q;

    let mut groups: Vec<Vec<u32>> = vec![Vec::new(); t as usize];
    for i in 0..n {
        for x in 0..q {
            let y = evaluate(i, x, q, k);
            groups[(x * q + y) as usize].push(i);
        }
    }
    CffDesign::new(n, d, t, q, k, groups)
}

/// The degenerate d = 1 design: one singleton test per block (t = n).
///
/// # Errors
///
/// Returns `InvalidParameters` for n < 2, where d = 1 would not stay below n.
pub fn trivial(n: u32) -> Result<CffDesign> {
    if n < 2 {
        return Err(CffError::InvalidParameters(format!(
            "trivial design needs n >= 2, got {n}"
        )));
    }
    let groups = (0..n).map(|i| vec![i]).collect();
    CffDesign::new(n, 1, n, 0, 1, groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_prime_small_values() {
        let primes = [2u32, 3, 5, 7, 11, 13, 17, 19, 23];
        for p in primes {
            assert!(is_prime(p), "{p} should be prime");
        }
        for c in [0u32, 1, 4, 6, 8, 9, 15, 21, 25] {
            assert!(!is_prime(c), "{c} should be composite");
        }
    }

    #[test]
    fn test_smallest_field_covers_n() {
        // 3^2 = 9 >= 8
        assert_eq!(smallest_field(8, 2, 2).unwrap(), 3);
        // 5^2 = 25 >= 20
        assert_eq!(smallest_field(20, 2, 2).unwrap(), 5);
        // 2^4 = 16 >= 16
        assert_eq!(smallest_field(16, 4, 2).unwrap(), 2);
    }

    #[test]
    fn test_evaluate_linear_polynomial() {
        // index 7 in base 3 is digits [1, 2]: p(x) = 1 + 2x mod 3
        assert_eq!(evaluate(7, 0, 3, 2), 1);
        assert_eq!(evaluate(7, 1, 3, 2), 0);
        assert_eq!(evaluate(7, 2, 3, 2), 2);
    }

    #[test]
    fn test_construct_n8_q3_k2() {
        let design = construct(8, 3, 2).unwrap();
        assert_eq!(design.n, 8);
        assert_eq!(design.d, 2);
        assert_eq!(design.t, 9);
        // Each block appears in exactly q tests (one per x).
        for i in 0..8 {
            assert_eq!(design.groups_containing(i).len(), 3);
        }
    }

    #[test]
    fn test_construct_rejects_bad_parameters() {
        assert!(construct(8, 4, 2).is_err()); // q not prime
        assert!(construct(8, 3, 1).is_err()); // k < 2
        assert!(construct(100, 3, 2).is_err()); // field too small
        assert!(construct(8, 2, 3).is_err()); // q < k, d would be 0
    }

    #[test]
    fn test_trivial_design() {
        let design = trivial(5).unwrap();
        assert_eq!(design.d, 1);
        assert_eq!(design.t, 5);
        for i in 0..5 {
            assert_eq!(design.groups_containing(i), vec![i]);
        }
    }

    #[test]
    fn test_trivial_rejects_single_block() {
        assert!(trivial(1).is_err());
        assert!(trivial(0).is_err());
    }

    #[test]
    fn test_groups_are_sorted_and_duplicate_free() {
        let design = construct(25, 5, 2).unwrap();
        for group in design.groups() {
            let mut sorted = group.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(&sorted, group);
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    /// Simulate test outcomes for a defective set: a test passes iff it
    /// contains no defective block.
    fn outcomes_for(design: &CffDesign, defective: &BTreeSet<u32>) -> Vec<bool> {
        design
            .groups()
            .iter()
            .map(|group| !group.iter().any(|i| defective.contains(i)))
            .collect()
    }

    proptest! {
        /// Cover-free soundness: any defective set of size <= d is recovered
        /// exactly from the outcome pattern.
        #[test]
        fn decode_recovers_defective_sets(
            (q, k) in prop_oneof![Just((3u32, 2u32)), Just((5, 2)), Just((7, 2)), Just((5, 3))],
            seed in any::<u64>(),
        ) {
            let n = q.pow(k).min(64);
            let design = construct(n, q, k).unwrap();
            let d = design.d;

            // Pseudo-random defective set of size <= d.
            let mut state = seed;
            let mut defective = BTreeSet::new();
            let size = (seed % (d as u64 + 1)) as u32;
            while (defective.len() as u32) < size {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                defective.insert((state >> 33) as u32 % n);
            }

            let outcomes = outcomes_for(&design, &defective);
            let flagged = design.decode(&outcomes).unwrap();
            let expected: Vec<u32> = defective.iter().copied().collect();
            prop_assert_eq!(flagged, expected);
        }

        /// Incompleteness detection: more than d defectives always yields a
        /// flagged set larger than d (the flagged set is a superset of the
        /// true defectives).
        #[test]
        fn overload_is_detected(seed in any::<u64>()) {
            let design = construct(9, 3, 2).unwrap();
            let d = design.d;

            let mut state = seed;
            let mut defective = BTreeSet::new();
            while (defective.len() as u32) < d + 1 {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                defective.insert((state >> 33) as u32 % design.n);
            }

            let outcomes = outcomes_for(&design, &defective);
            let flagged = design.decode(&outcomes).unwrap();
            for i in &defective {
                prop_assert!(flagged.contains(i));
            }
            prop_assert!(flagged.len() > d as usize);
        }
    }
}
