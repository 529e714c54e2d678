//! Polynomial evaluation helpers
//!
//! Small, allocation-light evaluators shared by the sum-check driver and
//! the WHIR verifier: multilinear evaluation over a coefficient vector,
//! univariate Horner evaluation, quadratic reconstruction from values at
//! `{0, 1, 2}`, the eq indicator, and the two power expansions used to
//! derive combination randomness and out-of-domain points.
//!
//! Coefficient vectors are indexed by binary tuples with the variable
//! split on the *last* coordinate: `coeffs[..half]` is the slice where
//! the last variable is 0 and `coeffs[half..]` where it is 1.

#![forbid(unsafe_code)]

use ark_ff::{Field, One, Zero};
use std::sync::OnceLock;

use crate::F;

/// 1/2 in F, used by the quadratic reconstruction.
pub(crate) fn half() -> F {
    static HALF: OnceLock<F> = OnceLock::new();
    *HALF.get_or_init(|| {
        F::from(2u64)
            .inverse()
            .expect("2 is a unit in an odd prime field")
    })
}

/// Evaluate a multilinear polynomial given by its coefficient vector.
///
/// `coeffs.len()` must be `2^point.len()`.
pub fn eval_multilinear(coeffs: &[F], point: &[F]) -> F {
    debug_assert_eq!(coeffs.len(), 1 << point.len());
    match point.split_last() {
        None => coeffs[0],
        Some((last, rest)) => {
            let (lo, hi) = coeffs.split_at(coeffs.len() / 2);
            eval_multilinear(lo, rest) + *last * eval_multilinear(hi, rest)
        }
    }
}

/// Horner evaluation of a univariate polynomial in ascending coefficient
/// order.
pub fn eval_univariate(coeffs: &[F], z: F) -> F {
    let mut acc = F::zero();
    for c in coeffs.iter().rev() {
        acc = acc * z + c;
    }
    acc
}

/// Reconstruct a quadratic from its values at `{0, 1, 2}` and evaluate it
/// at `z`.
///
/// With `a = p(0)`, `c = (p(2) - 2 p(1) + p(0)) / 2`, `b = p(1) - a - c`,
/// the result is `a + b z + c z²`.
pub fn eval_quadratic_from_evals(evals: &[F; 3], z: F) -> F {
    let a = evals[0];
    let c = (evals[2] - evals[1].double() + evals[0]) * half();
    let b = evals[1] - a - c;
    a + b * z + c * z.square()
}

/// The multilinear eq indicator `∏ᵢ (aᵢ·bᵢ + (1−aᵢ)·(1−bᵢ))`.
pub fn eq_poly(a: &[F], b: &[F]) -> F {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = F::one();
    for (x, y) in a.iter().zip(b) {
        acc *= *x * y + (F::one() - x) * (F::one() - y);
    }
    acc
}

/// Lift a univariate point into `n` multilinear coordinates by successive
/// squaring: `[z^{2^{n-1}}, …, z², z]`.
pub fn expand_from_univariate(z: F, n: usize) -> Vec<F> {
    let mut out = vec![F::one(); n];
    let mut cur = z;
    for slot in out.iter_mut().rev() {
        *slot = cur;
        cur = cur.square();
    }
    out
}

/// Geometric expansion `[1, r, r², …, r^{n−1}]`.
pub fn powers(r: F, n: usize) -> Vec<F> {
    let mut out = Vec::with_capacity(n);
    let mut cur = F::one();
    for _ in 0..n {
        out.push(cur);
        cur *= r;
    }
    out
}

/// Dot product of two equal-length scalar slices.
pub fn dot(a: &[F], b: &[F]) -> F {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| *x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;

    #[test]
    fn multilinear_corner_identities() {
        let coeffs: Vec<F> = (1..=8).map(|i| F::from(i as u64)).collect();
        let zeros = [F::zero(); 3];
        let ones = [F::one(); 3];
        assert_eq!(eval_multilinear(&coeffs, &zeros), coeffs[0]);
        // At the all-ones point a coefficient-form multilinear evaluates
        // to the sum of its coefficients.
        let sum: F = coeffs.iter().copied().sum();
        assert_eq!(eval_multilinear(&coeffs, &ones), sum);
    }

    #[test]
    fn multilinear_matches_direct_expansion() {
        let mut rng = ark_std::test_rng();
        let coeffs: Vec<F> = (0..8).map(|_| F::rand(&mut rng)).collect();
        let point: Vec<F> = (0..3).map(|_| F::rand(&mut rng)).collect();
        // Direct sum over subsets: coeffs[b] * prod_{i in b} x_i, with
        // bit i of the index selecting variable i.
        let mut direct = F::zero();
        for (idx, c) in coeffs.iter().enumerate() {
            let mut term = *c;
            for (i, x) in point.iter().enumerate() {
                if idx >> i & 1 == 1 {
                    term *= x;
                }
            }
            direct += term;
        }
        assert_eq!(eval_multilinear(&coeffs, &point), direct);
    }

    #[test]
    fn quadratic_reconstruction_matches_direct_evaluation() {
        let mut rng = ark_std::test_rng();
        for _ in 0..8 {
            let (a, b, c) = (F::rand(&mut rng), F::rand(&mut rng), F::rand(&mut rng));
            let q = |z: F| a + b * z + c * z.square();
            let evals = [q(F::zero()), q(F::one()), q(F::from(2u64))];
            let z = F::rand(&mut rng);
            assert_eq!(eval_quadratic_from_evals(&evals, z), q(z));
        }
    }

    #[test]
    fn horner_matches_naive_powers() {
        let coeffs: Vec<F> = [3u64, 0, 7, 1].iter().map(|&x| F::from(x)).collect();
        let z = F::from(5u64);
        let naive: F = coeffs
            .iter()
            .enumerate()
            .map(|(i, c)| *c * z.pow([i as u64]))
            .sum();
        assert_eq!(eval_univariate(&coeffs, z), naive);
    }

    #[test]
    fn eq_is_the_boolean_indicator() {
        let a = [F::one(), F::zero(), F::one()];
        let b = [F::one(), F::zero(), F::one()];
        let c = [F::one(), F::one(), F::one()];
        assert_eq!(eq_poly(&a, &b), F::one());
        assert_eq!(eq_poly(&a, &c), F::zero());
    }

    #[test]
    fn expand_from_univariate_is_successive_squares() {
        let z = F::from(3u64);
        let exp = expand_from_univariate(z, 4);
        assert_eq!(exp, vec![z.pow([8]), z.pow([4]), z.pow([2]), z]);
    }

    #[test]
    fn powers_is_geometric() {
        let r = F::from(7u64);
        assert_eq!(powers(r, 4), vec![F::one(), r, r * r, r * r * r]);
        assert!(powers(r, 0).is_empty());
    }
}
