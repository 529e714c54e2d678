//! WHIR low-degree-test verifier
//!
//! Drives the committed codeword through the scripted phases:
//!
//! 1. **Initial commitment.** Read the first root, the out-of-domain
//!    points and answers, combine them with the statement evaluations
//!    under powers of a squeezed generator, and fold the first
//!    `folding_factor` variables by sum-check.
//! 2. **Main rounds.** Each round reads the next root, authenticates the
//!    previous commitment's openings, derives in-domain query indices
//!    from challenge bytes, runs the optional proof-of-work, folds the
//!    opened leaves with the previous phase's randomness, absorbs
//!    everything into the running claim under fresh combination
//!    randomness, and sum-checks the next block of variables. The domain
//!    halves and the query generator squares as the codeword shrinks.
//! 3. **Final phase.** Read the fully folded polynomial in coefficient
//!    form, authenticate the last commitment's openings, check each
//!    final fold against a direct univariate evaluation, run the closing
//!    sum-check rounds, and accept only if the running claim equals
//!    `W(r) · mle(final_coeffs, r_final)` for the weight polynomial `W`
//!    accumulated across every phase.
//!
//! The running claim (`last_eval`) threads through all three phases
//! without ever being reset. State is a flat record of roots, randomness
//! vectors and domain bookkeeping local to [`WhirVerifier::verify`]; no
//! state survives a verification call.

#![forbid(unsafe_code)]

use ark_ff::{BigInt, Field, PrimeField, Zero};
use tracing::debug;

use crate::config::{HashKind, Params};
use crate::merkle::{self, MerkleError, TwoToOne};
use crate::proof::{Proof, RoundOpenings};
use crate::sumcheck::{self, QuadraticEvals, SumcheckError};
use crate::transcript::{Arthur, TranscriptError};
use crate::{poly, skyscraper, F};

#[derive(Debug, thiserror::Error)]
pub enum WhirError {
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
    #[error(transparent)]
    Sumcheck(#[from] SumcheckError),
    #[error("proof ships {got} opening batches, expected {expected}")]
    BatchCount { got: usize, expected: usize },
    #[error("proof ships {got} statement values, expected {expected}")]
    StatementValues { got: usize, expected: usize },
    #[error("round {round}: leaf {leaf} holds {got} values, expected {expected}")]
    LeafWidth {
        round: usize,
        leaf: usize,
        got: usize,
        expected: usize,
    },
    #[error("round {round}: domain of size {domain} cannot fold by 2^{k}")]
    DomainTooSmall { round: usize, domain: usize, k: usize },
    #[error("merkle authentication failed in round {round}")]
    Merkle {
        round: usize,
        #[source]
        source: MerkleError,
    },
    #[error("round {round}: query index {index} is outside the prover's leaf set")]
    IndexNotInLeafSet { round: usize, index: u64 },
    #[error("proof of work insufficient ({phase})")]
    PowInsufficient { phase: String },
    #[error("final fold {index} disagrees with the final polynomial")]
    FinalFoldMismatch { index: usize },
    #[error("final combined evaluation does not match the weight polynomial")]
    FinalEquationMismatch,
}

/// One commitment's openings with wire digests resolved for backend `H`.
struct Batch<H: TwoToOne> {
    leaf_indexes: Vec<u64>,
    leaves: Vec<Vec<F>>,
    siblings: Vec<H::Digest>,
    paths: Vec<Vec<H::Digest>>,
}

pub struct WhirVerifier<'a> {
    params: &'a Params,
}

impl<'a> WhirVerifier<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self { params }
    }

    /// Verify the low-degree test plus the linear statement combination.
    /// Consumes transcript operations from the current position; the
    /// caller owns cursor exhaustion.
    pub fn verify(&self, arthur: &mut Arthur<'_>, proof: &Proof) -> Result<(), WhirError> {
        match self.params.hash {
            HashKind::Field => self.run::<merkle::FieldNative>(arthur, proof),
            HashKind::Keccak => self.run::<merkle::Keccak>(arthur, proof),
        }
    }

    fn run<H: TwoToOne>(&self, arthur: &mut Arthur<'_>, proof: &Proof) -> Result<(), WhirError> {
        let p = self.params;
        let batch_count = p.n_rounds + 1;
        if proof.merkle_paths.len() != batch_count {
            return Err(WhirError::BatchCount {
                got: proof.merkle_paths.len(),
                expected: batch_count,
            });
        }
        if proof.statement_values_at_random_point.len() != p.statement_evaluations.len() {
            return Err(WhirError::StatementValues {
                got: proof.statement_values_at_random_point.len(),
                expected: p.statement_evaluations.len(),
            });
        }
        let batches: Vec<Batch<H>> = proof
            .merkle_paths
            .iter()
            .enumerate()
            .map(|(round, openings)| self.decode_batch::<H>(round, openings))
            .collect::<Result<_, _>>()?;

        // ---- Initial commitment phase -----------------------------------
        let mut roots = Vec::with_capacity(batch_count);
        roots.push(H::read_root(arthur)?);

        let (initial_ood_points, initial_ood_answers) =
            read_ood(arthur, p.commitment_ood_samples)?;

        let gamma0 = arthur.challenge_scalar()?;
        let initial_comb = poly::powers(
            gamma0,
            p.commitment_ood_samples + p.statement_evaluations.len(),
        );
        let claims: Vec<F> = initial_ood_answers
            .iter()
            .chain(&p.statement_evaluations)
            .copied()
            .collect();
        let mut last_eval = poly::dot(&initial_comb, &claims);

        let (initial_rand, folded) =
            sumcheck::run_rounds::<QuadraticEvals>(arthur, last_eval, p.folding.at(0))?;
        last_eval = folded;

        // ---- Main rounds ------------------------------------------------
        let mut domain_size = p.domain_size;
        let mut domain_gen = p.domain_generator;
        let mut round_rand: Vec<Vec<F>> = Vec::with_capacity(p.n_rounds);
        let mut ood_points_per_round: Vec<Vec<F>> = Vec::with_capacity(p.n_rounds);
        let mut stir_points_per_round: Vec<Vec<F>> = Vec::with_capacity(p.n_rounds);
        let mut comb_per_round: Vec<Vec<F>> = Vec::with_capacity(p.n_rounds);

        for round in 0..p.n_rounds {
            let new_root = H::read_root(arthur)?;

            // This round queries the previous commitment; authenticate its
            // batch against the root it was committed under.
            let batch = &batches[round];
            let k = p.folding.at(round);
            let tree_height = fold_height(round, domain_size, k)?;
            merkle::verify_batch::<H>(
                &roots[round],
                tree_height,
                &batch.leaf_indexes,
                &batch.leaves,
                &batch.siblings,
                &batch.paths,
            )
            .map_err(|source| WhirError::Merkle { round, source })?;
            roots.push(new_root);

            let (ood_points, ood_answers) = read_ood(arthur, p.ood_samples[round])?;

            let indices = stir_indices(arthur, p.num_queries[round], domain_size >> k)?;
            for &index in &indices {
                if !batch.leaf_indexes.contains(&index) {
                    return Err(WhirError::IndexNotInLeafSet { round, index });
                }
            }
            let exp_gen = fold_generator(domain_gen, k);
            let stir_points: Vec<F> = batch
                .leaf_indexes
                .iter()
                .map(|&i| exp_gen.pow([i]))
                .collect();

            check_pow(arthur, p.pow_bits[round], || format!("round {round}"))?;

            let gamma = arthur.challenge_scalar()?;
            let comb = poly::powers(gamma, ood_answers.len() + batch.leaf_indexes.len());

            let prev_rand = if round == 0 {
                &initial_rand
            } else {
                &round_rand[round - 1]
            };
            let folds: Vec<F> = batch
                .leaves
                .iter()
                .map(|leaf| poly::eval_multilinear(leaf, prev_rand))
                .collect();
            let values: Vec<F> = ood_answers.iter().chain(&folds).copied().collect();
            last_eval += poly::dot(&values, &comb);

            let (rand, folded) =
                sumcheck::run_rounds::<QuadraticEvals>(arthur, last_eval, p.folding.at(round + 1))?;
            last_eval = folded;
            round_rand.push(rand);

            debug!(round, queries = indices.len(), "folding round verified");

            domain_size /= 2;
            domain_gen = domain_gen.square();
            ood_points_per_round.push(ood_points);
            stir_points_per_round.push(stir_points);
            comb_per_round.push(comb);
        }

        // ---- Final phase ------------------------------------------------
        let final_coeffs = arthur.next_scalars(1 << p.final_sumcheck_rounds)?;

        let batch = &batches[p.n_rounds];
        let k = p.folding.at(p.n_rounds);
        let indices = stir_indices(arthur, p.final_queries, domain_size >> k)?;
        for &index in &indices {
            if !batch.leaf_indexes.contains(&index) {
                return Err(WhirError::IndexNotInLeafSet {
                    round: p.n_rounds,
                    index,
                });
            }
        }

        check_pow(arthur, p.final_pow_bits, || "final".to_string())?;

        let tree_height = fold_height(p.n_rounds, domain_size, k)?;
        merkle::verify_batch::<H>(
            &roots[p.n_rounds],
            tree_height,
            &batch.leaf_indexes,
            &batch.leaves,
            &batch.siblings,
            &batch.paths,
        )
        .map_err(|source| WhirError::Merkle {
            round: p.n_rounds,
            source,
        })?;

        let exp_gen = fold_generator(domain_gen, k);
        let prev_rand = if p.n_rounds == 0 {
            &initial_rand
        } else {
            &round_rand[p.n_rounds - 1]
        };
        for (index, (leaf, &leaf_index)) in
            batch.leaves.iter().zip(&batch.leaf_indexes).enumerate()
        {
            let fold = poly::eval_multilinear(leaf, prev_rand);
            let direct = poly::eval_univariate(&final_coeffs, exp_gen.pow([leaf_index]));
            if fold != direct {
                return Err(WhirError::FinalFoldMismatch { index });
            }
        }

        let (final_rand, folded) =
            sumcheck::run_rounds::<QuadraticEvals>(arthur, last_eval, p.final_sumcheck_rounds)?;
        last_eval = folded;

        check_pow(arthur, p.final_folding_pow_bits, || "final folding".to_string())?;

        let weight = self.weight_poly(
            &initial_comb,
            &initial_ood_points,
            &proof.statement_values_at_random_point,
            &ood_points_per_round,
            &stir_points_per_round,
            &comb_per_round,
            &initial_rand,
            &round_rand,
            &final_rand,
        );
        if last_eval != weight * poly::eval_multilinear(&final_coeffs, &final_rand) {
            return Err(WhirError::FinalEquationMismatch);
        }
        debug!("low-degree test verified");
        Ok(())
    }

    /// Evaluate the accumulated weight polynomial at the full folding
    /// point (all randomness concatenated and reversed).
    #[allow(clippy::too_many_arguments)]
    fn weight_poly(
        &self,
        initial_comb: &[F],
        initial_ood_points: &[F],
        statement_values: &[F],
        ood_points_per_round: &[Vec<F>],
        stir_points_per_round: &[Vec<F>],
        comb_per_round: &[Vec<F>],
        initial_rand: &[F],
        round_rand: &[Vec<F>],
        final_rand: &[F],
    ) -> F {
        let n = self.params.n_vars;
        let mut point: Vec<F> = initial_rand.to_vec();
        for rand in round_rand {
            point.extend_from_slice(rand);
        }
        point.extend_from_slice(final_rand);
        point.reverse();
        debug_assert_eq!(point.len(), n);

        let mut value = F::zero();
        for (j, ood) in initial_ood_points.iter().enumerate() {
            let expanded = poly::expand_from_univariate(*ood, n);
            value += initial_comb[j] * poly::eq_poly(&expanded, &point);
        }
        for (j, v) in statement_values.iter().enumerate() {
            value += initial_comb[initial_ood_points.len() + j] * v;
        }

        let mut vars = n;
        for round in 0..round_rand.len() {
            vars -= self.params.folding.at(round);
            let points = ood_points_per_round[round]
                .iter()
                .chain(&stir_points_per_round[round]);
            for (i, pt) in points.enumerate() {
                let expanded = poly::expand_from_univariate(*pt, vars);
                value += comb_per_round[round][i] * poly::eq_poly(&expanded, &point[..vars]);
            }
        }
        value
    }

    fn decode_batch<H: TwoToOne>(
        &self,
        round: usize,
        openings: &RoundOpenings,
    ) -> Result<Batch<H>, WhirError> {
        let width = 1 << self.params.folding.at(round);
        for (leaf, values) in openings.leaves.iter().enumerate() {
            if values.len() != width {
                return Err(WhirError::LeafWidth {
                    round,
                    leaf,
                    got: values.len(),
                    expected: width,
                });
            }
        }
        let wire_paths = merkle::decode_prefix_paths(
            &openings.auth_paths_prefix_lengths,
            &openings.auth_paths_suffixes,
        )
        .map_err(|source| WhirError::Merkle { round, source })?;
        Ok(Batch {
            leaf_indexes: openings.leaf_indexes.clone(),
            leaves: openings.leaves.clone(),
            siblings: openings
                .leaf_sibling_hashes
                .iter()
                .map(H::from_wire)
                .collect(),
            paths: wire_paths
                .iter()
                .map(|path| path.iter().map(H::from_wire).collect())
                .collect(),
        })
    }
}

/// Generator of the folded evaluation points: `g^{2^k}`.
fn fold_generator(domain_gen: F, k: usize) -> F {
    let mut exp = domain_gen;
    for _ in 0..k {
        exp = exp.square();
    }
    exp
}

/// Tree height for a commitment folded by `2^k` over `domain` points.
fn fold_height(round: usize, domain: usize, k: usize) -> Result<usize, WhirError> {
    let log_domain = domain.trailing_zeros() as usize;
    if log_domain <= k {
        return Err(WhirError::DomainTooSmall { round, domain, k });
    }
    Ok(log_domain - k)
}

fn read_ood(arthur: &mut Arthur<'_>, count: usize) -> Result<(Vec<F>, Vec<F>), TranscriptError> {
    let points = arthur.challenge_scalars(count)?;
    let answers = arthur.next_scalars(count)?;
    Ok((points, answers))
}

/// Derive in-domain query indices: one big-endian slot of
/// `⌈log₂(folded_domain)/8⌉` challenge bytes per query, masked to
/// `log₂(folded_domain)` bits.
fn stir_indices(
    arthur: &mut Arthur<'_>,
    num_queries: usize,
    folded_domain: usize,
) -> Result<Vec<u64>, WhirError> {
    let bits = folded_domain.trailing_zeros() as usize;
    let bytes_per_query = (bits + 7) / 8;
    if bytes_per_query == 0 {
        // One-point folded domain; every query lands on index 0.
        return Ok(vec![0; num_queries]);
    }
    let raw = arthur.challenge_bytes(bytes_per_query * num_queries)?;
    let mask = (1u64 << bits) - 1;
    Ok(raw
        .chunks(bytes_per_query)
        .map(|slot| {
            let mut value = 0u64;
            for &b in slot {
                value = value << 8 | b as u64;
            }
            value & mask
        })
        .collect())
}

/// Largest accepted hash value at `bits` of difficulty: ⌊p / 2^bits⌋.
pub(crate) fn pow_threshold(bits: usize) -> BigInt<4> {
    let limbs = F::MODULUS.0;
    let shift = bits as u32;
    if shift == 0 {
        return BigInt::new(limbs);
    }
    let mut out = [0u64; 4];
    for i in 0..4 {
        out[i] = limbs[i] >> shift;
        if i + 1 < 4 {
            out[i] |= limbs[i + 1] << (64 - shift);
        }
    }
    BigInt::new(out)
}

/// Grinding check: squeeze a 32-byte challenge, read the 8-byte
/// big-endian nonce, and require `compress(challenge, nonce)` to clear
/// the difficulty threshold.
fn check_pow(
    arthur: &mut Arthur<'_>,
    bits: usize,
    phase: impl Fn() -> String,
) -> Result<(), WhirError> {
    if bits == 0 {
        return Ok(());
    }
    let challenge = arthur.challenge_bytes(32)?;
    let nonce_bytes = arthur.next_bytes(8)?;
    let nonce = u64::from_be_bytes(nonce_bytes.try_into().expect("8 nonce bytes"));
    let digest = skyscraper::compress(
        F::from_le_bytes_mod_order(&challenge),
        F::from(nonce),
    );
    if digest.into_bigint() > pow_threshold(bits) {
        return Err(WhirError::PowInsufficient { phase: phase() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{IoPattern, Merlin};

    #[test]
    fn stir_indices_mask_to_the_folded_domain() {
        let io = IoPattern::parse("stir\0S6seed").unwrap();
        let mut merlin = Merlin::new(&io);
        let expected_raw = merlin.challenge_bytes(6).unwrap();

        let mut arthur = Arthur::new(&io, &[]);
        // 16-point folded domain: 4 bits, one byte per query.
        let indices = stir_indices(&mut arthur, 6, 16).unwrap();
        assert_eq!(indices.len(), 6);
        for (index, raw) in indices.iter().zip(&expected_raw) {
            assert_eq!(*index, (*raw as u64) & 0xf);
            assert!(*index < 16);
        }
    }

    #[test]
    fn stir_indices_use_big_endian_slots() {
        // 2^12 folded domain: 12 bits, two bytes per query.
        let io = IoPattern::parse("stir\0S4seed").unwrap();
        let mut merlin = Merlin::new(&io);
        let raw = merlin.challenge_bytes(4).unwrap();

        let mut arthur = Arthur::new(&io, &[]);
        let indices = stir_indices(&mut arthur, 2, 1 << 12).unwrap();
        let expect = |hi: u8, lo: u8| ((hi as u64) << 8 | lo as u64) & 0xfff;
        assert_eq!(indices, vec![expect(raw[0], raw[1]), expect(raw[2], raw[3])]);
    }

    #[test]
    fn pow_threshold_shrinks_with_difficulty() {
        let t0 = pow_threshold(0);
        let t1 = pow_threshold(1);
        let t20 = pow_threshold(20);
        assert_eq!(t0, F::MODULUS);
        assert!(t1 < t0);
        assert!(t20 < t1);
    }

    #[test]
    fn ground_nonce_passes_and_zero_rejection_matches_threshold() {
        let bits = 6;
        let io = IoPattern::parse("pow\0S32pow_queries\0A8pow-nonce").unwrap();
        let mut merlin = Merlin::new(&io);
        let challenge = merlin.challenge_bytes(32).unwrap();
        let chal = F::from_le_bytes_mod_order(&challenge);
        let nonce = (0u64..)
            .find(|&n| {
                skyscraper::compress(chal, F::from(n)).into_bigint() <= pow_threshold(bits)
            })
            .unwrap();
        merlin.add_bytes(&nonce.to_be_bytes()).unwrap();
        let transcript = merlin.into_transcript();

        let mut arthur = Arthur::new(&io, &transcript);
        check_pow(&mut arthur, bits, || "test".to_string()).unwrap();

        // Splice in the first nonce that misses the threshold instead.
        let bad_nonce = (0u64..)
            .find(|&n| {
                skyscraper::compress(chal, F::from(n)).into_bigint() > pow_threshold(bits)
            })
            .unwrap();
        let bad_bytes = bad_nonce.to_be_bytes();
        let mut arthur = Arthur::new(&io, &bad_bytes);
        let err = check_pow(&mut arthur, bits, || "test".to_string()).unwrap_err();
        assert!(matches!(err, WhirError::PowInsufficient { .. }));
    }

    #[test]
    fn zero_difficulty_consumes_nothing() {
        let io = IoPattern::parse("pow\0A8next").unwrap();
        let mut arthur = Arthur::new(&io, &[0u8; 8]);
        check_pow(&mut arthur, 0, || "test".to_string()).unwrap();
        // The scripted absorb is still available afterwards.
        arthur.next_bytes(8).unwrap();
    }
}
