//! Verification orchestrator
//!
//! Wires the whole predicate together in the scripted order: the outer
//! constraint-system sum-check runs first (its folding randomness is what
//! the statement evaluations are claimed at), then the WHIR verifier
//! consumes those evaluations as its linear claims, the transcript cursor
//! is required to land exactly on the end, and the closing equation ties
//! the three statement evaluations back to the outer sum-check's final
//! value:
//!
//! ```text
//! (A*·B* − C*) · eq(sp_rand, t) == outer_final_value
//! ```
//!
//! Every failure is fatal and surfaces as a single [`VerifyError`];
//! there is no partial acceptance and nothing to retry.

#![forbid(unsafe_code)]

use ark_ff::Zero;
use tracing::{debug, info};

use crate::config::Params;
use crate::proof::Proof;
use crate::sumcheck::{self, CubicCoeffs, SumcheckError};
use crate::transcript::{Arthur, IoPattern, TranscriptError};
use crate::whir::{WhirError, WhirVerifier};
use crate::{poly, F};

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
    #[error(transparent)]
    Sumcheck(#[from] SumcheckError),
    #[error(transparent)]
    Whir(#[from] WhirError),
    #[error("config carries {got} statement evaluations, the outer protocol sends 3")]
    StatementShape { got: usize },
    #[error("constraint-system equation mismatch after the outer sum-check")]
    R1csEquationMismatch,
}

/// Outcome of the outer reduction: the eq-point challenge, the folding
/// randomness, and the final running value of the sum-check.
pub struct OuterReduction {
    pub t_rand: Vec<F>,
    pub sp_rand: Vec<F>,
    pub final_value: F,
}

/// Squeeze the eq point and run the `n_vars` cubic rounds reducing
/// `(Az)·(Bz) − Cz ≡ 0` over the hypercube to one evaluation claim.
pub fn outer_reduction(
    arthur: &mut Arthur<'_>,
    n_vars: usize,
) -> Result<OuterReduction, VerifyError> {
    let t_rand = arthur.challenge_scalars(n_vars)?;
    let (sp_rand, final_value) =
        sumcheck::run_rounds::<CubicCoeffs>(arthur, F::zero(), n_vars)?;
    Ok(OuterReduction {
        t_rand,
        sp_rand,
        final_value,
    })
}

fn closing_equation(
    statement_evaluations: &[F],
    outer: &OuterReduction,
) -> Result<(), VerifyError> {
    let [a, b, c] = statement_evaluations else {
        return Err(VerifyError::StatementShape {
            got: statement_evaluations.len(),
        });
    };
    let lhs = (*a * b - c) * poly::eq_poly(&outer.sp_rand, &outer.t_rand);
    if lhs != outer.final_value {
        return Err(VerifyError::R1csEquationMismatch);
    }
    Ok(())
}

pub struct Verifier<'a> {
    pub params: &'a Params,
}

impl Verifier<'_> {
    /// Replay the transcript and check the full predicate.
    pub fn verify(&self, proof: &Proof) -> Result<(), VerifyError> {
        let p = self.params;
        if p.statement_evaluations.len() != 3 {
            return Err(VerifyError::StatementShape {
                got: p.statement_evaluations.len(),
            });
        }
        let io = IoPattern::parse(&p.io_pattern)?;
        let mut arthur = Arthur::new(&io, &p.transcript);

        debug!(
            n_vars = p.n_vars,
            n_rounds = p.n_rounds,
            transcript_len = p.transcript.len(),
            "replaying transcript"
        );

        let outer = outer_reduction(&mut arthur, p.n_vars)?;
        WhirVerifier::new(p).verify(&mut arthur, proof)?;
        arthur.finish()?;
        closing_equation(&p.statement_evaluations, &outer)?;

        info!("proof verified");
        Ok(())
    }
}
