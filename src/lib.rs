//! Crate root: public surface, core aliases, and protocol-wide invariants
//!
//! Native verifier for a succinct non-interactive argument of R1CS
//! satisfiability. The prover's transcript attests that a committed
//! multilinear polynomial encoding a satisfying witness passes (a) a
//! linear statement of evaluation claims and (b) the three matrix-vector
//! dot-product identities of the constraint system. Verification replays
//! the transcript: every Fiat–Shamir challenge is re-derived from the
//! scripted I/O pattern, the WHIR low-degree test is checked round by
//! round with Merkle-authenticated in-domain queries, and the outer
//! sum-check ties the statement evaluations back to the constraint
//! system.
//!
//! ## Invariants
//!
//! - **Field.** All arithmetic is in the BN254 scalar field
//!   (`F = ark_bn254::Fr`); all hashing is the field-native two-to-one
//!   compression in [`skyscraper`]. We **forbid unsafe** throughout.
//! - **Ordering.** Every absorb and squeeze happens in the exact order
//!   the I/O pattern scripts; this ordering is the correctness contract.
//!   Control flow is strictly sequential and single-threaded.
//! - **One-shot data flow.** Inputs are immutable for the duration of a
//!   verification; the transcript reader only ever advances; every
//!   accumulator is written once per round and read by the next. A
//!   verification either returns `Ok(())` or the first error met —
//!   there is no partial acceptance and nothing to retry.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

/// Verifier configuration: JSON schema, validation, typed parameters.
pub mod config;
/// Merkle batch authentication (prefix-compressed paths, two backends).
pub mod merkle;
/// Polynomial evaluation helpers (multilinear, Horner, eq, expansions).
pub mod poly;
/// Proof blob: canonical-serialized openings and statement values.
pub mod proof;
/// R1CS loading: CSR matrices and the interned coefficient table.
pub mod r1cs;
/// Field-native two-to-one compression and its duplex permutation.
pub mod skyscraper;
/// Sum-check round driver, generic over the round-polynomial form.
pub mod sumcheck;
/// Fiat–Shamir transcript: I/O pattern, duplex sponge, reader/writer.
pub mod transcript;
/// Verification orchestrator and the outer constraint-system sum-check.
pub mod verifier;
/// WHIR low-degree-test verifier.
pub mod whir;

/// Scalar field used across the crate (BN254 scalar field).
pub type F = ark_bn254::Fr;

pub use crate::config::{Config, HashKind, Params};
pub use crate::proof::Proof;
pub use crate::r1cs::R1cs;
pub use crate::verifier::{Verifier, VerifyError};
