//! Merkle batch authentication
//!
//! Verifies batches of leaf openings against a committed root. A leaf
//! holds the `2^k` codeword values that fold to one point of the next
//! round's halved domain; its hash is the left-deep compression fold of
//! those values. Authentication paths arrive root-first and
//! prefix-compressed across the batch: `path[0]` is stored whole, and
//! `path[j]` reuses the first `prefix_lengths[j]` nodes of `path[j-1]`
//! followed by its own suffix.
//!
//! The routine is polymorphic over the compression through [`TwoToOne`]:
//! [`FieldNative`] (skyscraper, digest = one scalar) is the canonical
//! backend; [`Keccak`] (digest = 32 raw bytes) covers the legacy
//! transcripts that committed with byte hashing.

#![forbid(unsafe_code)]

use ark_ff::{BigInteger, PrimeField, Zero};
use sha3::{Digest as _, Keccak256};

use crate::transcript::{Arthur, TranscriptError};
use crate::{skyscraper, F};

/// Digest as carried on the wire: 32 bytes for either backend.
pub type WireDigest = [u8; 32];

#[derive(Debug, thiserror::Error)]
pub enum MerkleError {
    #[error("opening counts disagree: {leaves} leaves, {siblings} siblings, {paths} paths, {indexes} indexes")]
    BatchShape {
        leaves: usize,
        siblings: usize,
        paths: usize,
        indexes: usize,
    },
    #[error("prefix decode out of range at path {path}: prefix {prefix} of a {len}-node path")]
    PrefixOutOfRange {
        path: usize,
        prefix: usize,
        len: usize,
    },
    #[error("authentication path {opening} has {got} siblings, expected {expected}")]
    PathShape {
        opening: usize,
        got: usize,
        expected: usize,
    },
    #[error("root mismatch at opening {opening} (leaf index {leaf_index})")]
    RootMismatch { opening: usize, leaf_index: u64 },
}

/// Two-to-one compression backing a Merkle instance.
pub trait TwoToOne {
    type Digest: Clone + PartialEq + Eq + std::fmt::Debug;

    /// Hash a leaf's value vector.
    fn leaf_hash(values: &[F]) -> Self::Digest;

    /// Compress an ordered node pair.
    fn compress(l: &Self::Digest, r: &Self::Digest) -> Self::Digest;

    /// Interpret a wire digest.
    fn from_wire(bytes: &WireDigest) -> Self::Digest;

    /// Read a committed root off the transcript.
    fn read_root(arthur: &mut Arthur<'_>) -> Result<Self::Digest, TranscriptError>;
}

/// Field-native backend: digests are scalars, compression is skyscraper.
pub struct FieldNative;

impl TwoToOne for FieldNative {
    type Digest = F;

    fn leaf_hash(values: &[F]) -> F {
        match values {
            [] => F::zero(),
            [single] => *single,
            [first, second, rest @ ..] => {
                let mut acc = skyscraper::compress(*first, *second);
                for v in rest {
                    acc = skyscraper::compress(acc, *v);
                }
                acc
            }
        }
    }

    fn compress(l: &F, r: &F) -> F {
        skyscraper::compress(*l, *r)
    }

    fn from_wire(bytes: &WireDigest) -> F {
        F::from_le_bytes_mod_order(bytes)
    }

    fn read_root(arthur: &mut Arthur<'_>) -> Result<F, TranscriptError> {
        Ok(arthur.next_scalars(1)?[0])
    }
}

/// Legacy byte backend: digests are raw Keccak-256 outputs.
pub struct Keccak;

impl TwoToOne for Keccak {
    type Digest = WireDigest;

    fn leaf_hash(values: &[F]) -> WireDigest {
        // Legacy leaf layout: 8-byte little-endian length prefix followed
        // by the canonical 32-byte scalars.
        let mut hasher = Keccak256::new();
        hasher.update((values.len() as u64).to_le_bytes());
        for v in values {
            hasher.update(v.into_bigint().to_bytes_le());
        }
        hasher.finalize().into()
    }

    fn compress(l: &WireDigest, r: &WireDigest) -> WireDigest {
        let mut hasher = Keccak256::new();
        hasher.update(l);
        hasher.update(r);
        hasher.finalize().into()
    }

    fn from_wire(bytes: &WireDigest) -> WireDigest {
        *bytes
    }

    fn read_root(arthur: &mut Arthur<'_>) -> Result<WireDigest, TranscriptError> {
        let bytes = arthur.next_bytes(32)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}

/// Rebuild a batch's authentication paths from their prefix-compressed
/// wire form. Decoded paths are root-first, like the wire form.
pub fn decode_prefix_paths(
    prefix_lengths: &[u64],
    suffixes: &[Vec<WireDigest>],
) -> Result<Vec<Vec<WireDigest>>, MerkleError> {
    let mut paths: Vec<Vec<WireDigest>> = Vec::with_capacity(suffixes.len());
    for (j, suffix) in suffixes.iter().enumerate() {
        let path = if j == 0 {
            suffix.clone()
        } else {
            let prefix = prefix_lengths[j] as usize;
            let prev = &paths[j - 1];
            if prefix > prev.len() {
                return Err(MerkleError::PrefixOutOfRange {
                    path: j,
                    prefix,
                    len: prev.len(),
                });
            }
            let mut path = prev[..prefix].to_vec();
            path.extend_from_slice(suffix);
            path
        };
        paths.push(path);
    }
    Ok(paths)
}

/// Verify a batch of leaf openings against `root`.
///
/// `auth_paths` are root-first with exactly `tree_height - 1` internal
/// siblings each; the leaf-level peer comes separately in
/// `leaf_sibling_hashes`.
pub fn verify_batch<H: TwoToOne>(
    root: &H::Digest,
    tree_height: usize,
    leaf_indexes: &[u64],
    leaves: &[Vec<F>],
    leaf_sibling_hashes: &[H::Digest],
    auth_paths: &[Vec<H::Digest>],
) -> Result<(), MerkleError> {
    if leaves.len() != leaf_sibling_hashes.len()
        || leaves.len() != auth_paths.len()
        || leaves.len() != leaf_indexes.len()
    {
        return Err(MerkleError::BatchShape {
            leaves: leaves.len(),
            siblings: leaf_sibling_hashes.len(),
            paths: auth_paths.len(),
            indexes: leaf_indexes.len(),
        });
    }

    for (opening, ((values, &leaf_index), (sibling, path))) in leaves
        .iter()
        .zip(leaf_indexes)
        .zip(leaf_sibling_hashes.iter().zip(auth_paths))
        .enumerate()
    {
        if path.len() + 1 != tree_height {
            return Err(MerkleError::PathShape {
                opening,
                got: path.len(),
                expected: tree_height - 1,
            });
        }

        let claimed = H::leaf_hash(values);
        let mut current = if leaf_index & 1 == 1 {
            H::compress(sibling, &claimed)
        } else {
            H::compress(&claimed, sibling)
        };

        // Wire order is root-first; climb leaf-first.
        for (level, node) in path.iter().rev().enumerate() {
            let bit = leaf_index >> (level + 1) & 1;
            current = if bit == 1 {
                H::compress(node, &current)
            } else {
                H::compress(&current, node)
            };
        }

        if current != *root {
            return Err(MerkleError::RootMismatch { opening, leaf_index });
        }
    }
    Ok(())
}
