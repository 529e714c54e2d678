//! Proof blob: canonical-serialized Merkle openings and statement values
//!
//! The prover ships one [`RoundOpenings`] batch per commitment (the
//! initial one plus each folding round) and the vector of statement
//! values at the random point consumed by the final combination. Digests
//! travel as 32 raw bytes regardless of the hash backend; leaf values are
//! canonical scalars. The whole record uses arkworks canonical
//! serialization, so the wire form of a leaf is exactly the 8-byte
//! little-endian length prefix followed by 32-byte scalars.

#![forbid(unsafe_code)]

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use std::path::Path;

use crate::merkle::WireDigest;
use crate::F;

#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    #[error("failed to read proof: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode proof: {0}")]
    Decode(#[from] SerializationError),
}

/// One commitment's worth of Merkle openings, paths prefix-compressed
/// and root-first as on the wire.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct RoundOpenings {
    pub leaf_sibling_hashes: Vec<WireDigest>,
    pub auth_paths_prefix_lengths: Vec<u64>,
    pub auth_paths_suffixes: Vec<Vec<WireDigest>>,
    pub leaf_indexes: Vec<u64>,
    pub leaves: Vec<Vec<F>>,
}

/// The complete proof blob.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct Proof {
    pub merkle_paths: Vec<RoundOpenings>,
    pub statement_values_at_random_point: Vec<F>,
}

impl Proof {
    pub fn load(path: &Path) -> Result<Self, ProofError> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProofError> {
        Ok(Self::deserialize_compressed(bytes)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProofError> {
        let mut out = Vec::new();
        self.serialize_compressed(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;

    fn sample_proof() -> Proof {
        let mut rng = ark_std::test_rng();
        let mut scalar = || F::rand(&mut rng);
        Proof {
            merkle_paths: vec![RoundOpenings {
                leaf_sibling_hashes: vec![[7u8; 32], [9u8; 32]],
                auth_paths_prefix_lengths: vec![0, 2],
                auth_paths_suffixes: vec![vec![[1u8; 32], [2u8; 32], [3u8; 32]], vec![[4u8; 32]]],
                leaf_indexes: vec![5, 11],
                leaves: vec![
                    vec![scalar(), scalar(), scalar(), scalar()],
                    vec![scalar(), scalar(), scalar(), scalar()],
                ],
            }],
            statement_values_at_random_point: vec![scalar(), scalar(), scalar()],
        }
    }

    #[test]
    fn encode_decode_round_trips() {
        let proof = sample_proof();
        let bytes = proof.encode().unwrap();
        assert_eq!(Proof::decode(&bytes).unwrap(), proof);
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let bytes = sample_proof().encode().unwrap();
        assert!(matches!(
            Proof::decode(&bytes[..bytes.len() - 3]).unwrap_err(),
            ProofError::Decode(_)
        ));
    }
}
