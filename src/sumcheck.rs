//! Sum-check round driver
//!
//! Each round reads one prover polynomial, enforces the consistency law
//! `p(0) + p(1) = last_eval`, squeezes the round's folding challenge and
//! folds `last_eval` to `p(r)`. The driver is generic over the round
//! polynomial's representation:
//!
//! - [`QuadraticEvals`]: three scalars, the values of a quadratic at
//!   `{0, 1, 2}`. Every folding sum-check inside the low-degree test uses
//!   this form.
//! - [`CubicCoeffs`]: four scalars, coefficient form, evaluated by
//!   Horner. The outer constraint-system reduction sends its cubic round
//!   polynomials this way.
//!
//! `last_eval` is never reset by the driver; callers thread it from one
//! phase to the next.

#![forbid(unsafe_code)]

use ark_ff::Field;

use crate::poly;
use crate::transcript::{Arthur, TranscriptError};
use crate::F;

#[derive(Debug, thiserror::Error)]
pub enum SumcheckError {
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
    /// `p(0) + p(1)` of the round polynomial disagreed with the running
    /// evaluation. The offending values ride along for diagnostics but
    /// stay out of the rendered message.
    #[error("sum-check consistency failure at round {round}")]
    Consistency { round: usize, expected: F, got: F },
}

/// One round's prover polynomial.
pub trait RoundPolynomial: Sized {
    /// Scalars read off the transcript per round.
    const SCALARS: usize;

    fn from_scalars(scalars: &[F]) -> Self;

    /// `p(0) + p(1)`.
    fn sum_over_bool(&self) -> F;

    fn evaluate(&self, z: F) -> F;
}

/// Quadratic in evaluation form over `{0, 1, 2}`.
pub struct QuadraticEvals(pub [F; 3]);

impl RoundPolynomial for QuadraticEvals {
    const SCALARS: usize = 3;

    fn from_scalars(scalars: &[F]) -> Self {
        Self([scalars[0], scalars[1], scalars[2]])
    }

    fn sum_over_bool(&self) -> F {
        self.0[0] + self.0[1]
    }

    fn evaluate(&self, z: F) -> F {
        poly::eval_quadratic_from_evals(&self.0, z)
    }
}

/// Cubic in ascending coefficient form.
pub struct CubicCoeffs(pub [F; 4]);

impl RoundPolynomial for CubicCoeffs {
    const SCALARS: usize = 4;

    fn from_scalars(scalars: &[F]) -> Self {
        Self([scalars[0], scalars[1], scalars[2], scalars[3]])
    }

    fn sum_over_bool(&self) -> F {
        // p(0) = c0 and p(1) is the coefficient sum.
        self.0[0].double() + self.0[1] + self.0[2] + self.0[3]
    }

    fn evaluate(&self, z: F) -> F {
        poly::eval_univariate(&self.0, z)
    }
}

/// Run `rounds` sum-check rounds, returning the folding challenges and
/// the final running evaluation.
pub fn run_rounds<P: RoundPolynomial>(
    arthur: &mut Arthur<'_>,
    mut last_eval: F,
    rounds: usize,
) -> Result<(Vec<F>, F), SumcheckError> {
    let mut challenges = Vec::with_capacity(rounds);
    for round in 0..rounds {
        let poly = P::from_scalars(&arthur.next_scalars(P::SCALARS)?);
        let got = poly.sum_over_bool();
        if got != last_eval {
            return Err(SumcheckError::Consistency {
                round,
                expected: last_eval,
                got,
            });
        }
        let r = arthur.challenge_scalar()?;
        challenges.push(r);
        last_eval = poly.evaluate(r);
    }
    Ok((challenges, last_eval))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{IoPattern, Merlin};
    use ark_ff::{One, UniformRand, Zero};

    fn pattern_for(rounds: usize, scalars: usize) -> IoPattern {
        let mut raw = String::from("sumcheck-test");
        for _ in 0..rounds {
            raw.push('\0');
            raw.push_str(&format!("A{}poly", 32 * scalars));
            raw.push('\0');
            raw.push_str("S47rand");
        }
        IoPattern::parse(&raw).unwrap()
    }

    /// Write `rounds` quadratic rounds that satisfy the consistency law
    /// by construction and return (transcript, expected challenges,
    /// expected final evaluation).
    fn consistent_quadratic_transcript(
        claim: F,
        rounds: usize,
    ) -> (Vec<u8>, Vec<F>, F) {
        let io = pattern_for(rounds, 3);
        let mut rng = ark_std::test_rng();
        let mut merlin = Merlin::new(&io);
        let mut last = claim;
        let mut challenges = Vec::new();
        for _ in 0..rounds {
            let p0 = F::rand(&mut rng);
            let p2 = F::rand(&mut rng);
            let evals = [p0, last - p0, p2];
            merlin.add_scalars(&evals).unwrap();
            let r = merlin.challenge_scalar().unwrap();
            challenges.push(r);
            last = poly::eval_quadratic_from_evals(&evals, r);
        }
        (merlin.into_transcript(), challenges, last)
    }

    #[test]
    fn accepts_consistent_quadratic_rounds() {
        let claim = F::from(120u64);
        let rounds = 4;
        let (transcript, challenges, expected) =
            consistent_quadratic_transcript(claim, rounds);
        let io = pattern_for(rounds, 3);
        let mut arthur = Arthur::new(&io, &transcript);
        let (got_challenges, got_eval) =
            run_rounds::<QuadraticEvals>(&mut arthur, claim, rounds).unwrap();
        assert_eq!(got_challenges, challenges);
        assert_eq!(got_eval, expected);
        arthur.finish().unwrap();
    }

    #[test]
    fn rejects_a_wrong_claim() {
        let claim = F::from(120u64);
        let (transcript, _, _) = consistent_quadratic_transcript(claim, 3);
        let io = pattern_for(3, 3);
        let mut arthur = Arthur::new(&io, &transcript);
        let err = run_rounds::<QuadraticEvals>(&mut arthur, claim + F::one(), 3).unwrap_err();
        assert!(matches!(err, SumcheckError::Consistency { round: 0, .. }));
    }

    #[test]
    fn rejects_a_tampered_middle_round() {
        let claim = F::from(7u64);
        let (mut transcript, _, _) = consistent_quadratic_transcript(claim, 3);
        // Flip a byte inside round 1's polynomial (rounds are 96 bytes).
        transcript[96] ^= 1;
        let io = pattern_for(3, 3);
        let mut arthur = Arthur::new(&io, &transcript);
        let err = run_rounds::<QuadraticEvals>(&mut arthur, claim, 3).unwrap_err();
        assert!(matches!(err, SumcheckError::Consistency { round: 1, .. }));
    }

    #[test]
    fn accepts_consistent_cubic_rounds() {
        let rounds = 3;
        let io = pattern_for(rounds, 4);
        let mut rng = ark_std::test_rng();
        let mut merlin = Merlin::new(&io);
        // The outer reduction starts from zero.
        let mut last = F::zero();
        for _ in 0..rounds {
            let c1 = F::rand(&mut rng);
            let c2 = F::rand(&mut rng);
            let c3 = F::rand(&mut rng);
            // Pick c0 so that 2 c0 + c1 + c2 + c3 = last.
            let c0 = (last - c1 - c2 - c3) * poly::half();
            let coeffs = [c0, c1, c2, c3];
            merlin.add_scalars(&coeffs).unwrap();
            let r = merlin.challenge_scalar().unwrap();
            last = poly::eval_univariate(&coeffs, r);
        }
        let transcript = merlin.into_transcript();

        let mut arthur = Arthur::new(&io, &transcript);
        let (challenges, got) =
            run_rounds::<CubicCoeffs>(&mut arthur, F::zero(), rounds).unwrap();
        assert_eq!(challenges.len(), rounds);
        assert_eq!(got, last);
    }
}
