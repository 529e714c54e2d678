//! Verifier configuration: JSON schema, validation, parsed parameters
//!
//! The config file carries everything the verifier needs besides the
//! proof blob: protocol sizes, the per-round query/PoW schedule, the
//! starting-domain generator, the I/O pattern and the transcript bytes
//! themselves, plus the three statement evaluations claimed by the outer
//! reduction. Scalars travel as decimal strings.
//!
//! Loading is two-staged: [`Config`] mirrors the file verbatim;
//! [`Config::params`] validates it and produces the typed [`Params`]
//! record every verification phase reads. Validation is strict about the
//! arithmetic that later phases silently rely on: the transcript length,
//! the folding schedule summing to the variable count, and the domain
//! generator actually generating a multiplicative subgroup of the right
//! two-power order.

#![forbid(unsafe_code)]

use ark_ff::{Field, One, Zero};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::F;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{what} is not a canonical decimal scalar: {value:?}")]
    Scalar { what: &'static str, value: String },
    #[error("transcript length field says {expected}, transcript has {got} bytes")]
    TranscriptLength { expected: usize, got: usize },
    #[error("round array {which} covers {got} rounds, need {need}")]
    RoundArrays {
        which: &'static str,
        got: usize,
        need: usize,
    },
    #[error("folding factor must be positive")]
    ZeroFoldingFactor,
    #[error("folding schedule consumes {consumed} variables, polynomial has {n_vars}")]
    FoldingSchedule { consumed: usize, n_vars: usize },
    #[error("domain generator must be non-zero")]
    ZeroGenerator,
    #[error("domain too large: 2^{log_size} points")]
    DomainTooLarge { log_size: usize },
    #[error("domain generator does not have order 2^{log_size}")]
    GeneratorOrder { log_size: usize },
}

/// Merkle digest flavor found in the transcript.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashKind {
    /// Field-native skyscraper digests (canonical).
    Field,
    /// Raw Keccak-256 byte digests (legacy transcripts).
    Keccak,
}

impl Default for HashKind {
    fn default() -> Self {
        HashKind::Field
    }
}

fn default_commitment_ood_samples() -> usize {
    1
}

/// Verbatim mirror of the JSON config file.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub n_vars: usize,
    pub n_rounds: usize,
    pub folding_factor: Vec<usize>,
    pub ood_samples: Vec<usize>,
    pub num_queries: Vec<usize>,
    pub pow_bits: Vec<usize>,
    pub final_queries: usize,
    pub final_pow_bits: usize,
    #[serde(default)]
    pub final_folding_pow_bits: usize,
    pub domain_generator: String,
    pub rate: usize,
    pub io_pattern: String,
    pub transcript: Vec<u8>,
    pub transcript_len: usize,
    pub statement_evaluations: Vec<String>,
    #[serde(default = "default_commitment_ood_samples")]
    pub commitment_ood_samples: usize,
    #[serde(default)]
    pub hash: HashKind,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Validate and convert into the typed parameter record.
    pub fn params(&self) -> Result<Params, ConfigError> {
        if self.transcript.len() != self.transcript_len {
            return Err(ConfigError::TranscriptLength {
                expected: self.transcript_len,
                got: self.transcript.len(),
            });
        }
        for (which, arr) in [
            ("ood_samples", &self.ood_samples),
            ("num_queries", &self.num_queries),
            ("pow_bits", &self.pow_bits),
        ] {
            if arr.len() < self.n_rounds {
                return Err(ConfigError::RoundArrays {
                    which,
                    got: arr.len(),
                    need: self.n_rounds,
                });
            }
        }

        let folding = FoldingSchedule::new(&self.folding_factor, self.n_rounds)?;
        let consumed: usize = (0..=self.n_rounds).map(|r| folding.at(r)).sum();
        let final_sumcheck_rounds = self
            .n_vars
            .checked_sub(consumed)
            .ok_or(ConfigError::FoldingSchedule {
                consumed,
                n_vars: self.n_vars,
            })?;

        let log_domain_size = self.n_vars + self.rate;
        if log_domain_size >= 48 {
            return Err(ConfigError::DomainTooLarge {
                log_size: log_domain_size,
            });
        }
        let domain_size = 1usize << log_domain_size;
        let domain_generator = parse_scalar("domain_generator", &self.domain_generator)?;
        if domain_generator.is_zero() {
            return Err(ConfigError::ZeroGenerator);
        }
        // ω must generate the size-N subgroup: ω^N = 1 and ω^{N/2} ≠ 1.
        if domain_generator.pow([domain_size as u64]) != F::one()
            || (domain_size >= 2
                && domain_generator.pow([(domain_size / 2) as u64]) == F::one())
        {
            return Err(ConfigError::GeneratorOrder {
                log_size: log_domain_size,
            });
        }

        let statement_evaluations = self
            .statement_evaluations
            .iter()
            .map(|s| parse_scalar("statement_evaluations", s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Params {
            io_pattern: self.io_pattern.clone(),
            transcript: self.transcript.clone(),
            n_vars: self.n_vars,
            n_rounds: self.n_rounds,
            folding,
            ood_samples: self.ood_samples.clone(),
            num_queries: self.num_queries.clone(),
            pow_bits: self.pow_bits.clone(),
            final_queries: self.final_queries,
            final_pow_bits: self.final_pow_bits,
            final_folding_pow_bits: self.final_folding_pow_bits,
            final_sumcheck_rounds,
            commitment_ood_samples: self.commitment_ood_samples,
            domain_size,
            domain_generator,
            statement_evaluations,
            hash: self.hash,
        })
    }
}

fn parse_scalar(what: &'static str, value: &str) -> Result<F, ConfigError> {
    F::from_str(value).map_err(|_| ConfigError::Scalar {
        what,
        value: value.to_string(),
    })
}

/// Per-round folding factors. A single entry means the uniform schedule;
/// a longer vector assigns `folding_factor[r]` to round `r` (entry 0 is
/// the initial fold).
#[derive(Clone, Debug)]
pub struct FoldingSchedule {
    factors: Vec<usize>,
}

impl FoldingSchedule {
    fn new(factors: &[usize], n_rounds: usize) -> Result<Self, ConfigError> {
        if factors.is_empty() || factors.contains(&0) {
            return Err(ConfigError::ZeroFoldingFactor);
        }
        if factors.len() != 1 && factors.len() < n_rounds + 1 {
            return Err(ConfigError::RoundArrays {
                which: "folding_factor",
                got: factors.len(),
                need: n_rounds + 1,
            });
        }
        Ok(Self {
            factors: factors.to_vec(),
        })
    }

    /// Folding factor at round `r` (round 0 is the initial fold).
    pub fn at(&self, round: usize) -> usize {
        if self.factors.len() == 1 {
            self.factors[0]
        } else {
            self.factors[round]
        }
    }
}

/// Validated verifier parameters.
#[derive(Clone, Debug)]
pub struct Params {
    pub io_pattern: String,
    pub transcript: Vec<u8>,
    pub n_vars: usize,
    pub n_rounds: usize,
    pub folding: FoldingSchedule,
    pub ood_samples: Vec<usize>,
    pub num_queries: Vec<usize>,
    pub pow_bits: Vec<usize>,
    pub final_queries: usize,
    pub final_pow_bits: usize,
    pub final_folding_pow_bits: usize,
    pub final_sumcheck_rounds: usize,
    pub commitment_ood_samples: usize,
    pub domain_size: usize,
    pub domain_generator: F,
    pub statement_evaluations: Vec<F>,
    pub hash: HashKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::FftField;
    use serde_json::json;

    fn base_config() -> serde_json::Value {
        // n_vars = 5, rate = 1: domain of size 64; one main round with
        // folding factor 2 leaves a single final sum-check round.
        let omega = F::get_root_of_unity(64).expect("BN254 has 2-adicity well past 64");
        json!({
            "n_vars": 5,
            "n_rounds": 1,
            "folding_factor": [2],
            "ood_samples": [1],
            "num_queries": [3],
            "pow_bits": [0],
            "final_queries": 2,
            "final_pow_bits": 0,
            "domain_generator": omega.to_string(),
            "rate": 1,
            "io_pattern": "proto\u{0}A32root\u{0}S47ood",
            "transcript": [],
            "transcript_len": 0,
            "statement_evaluations": ["1", "2", "3"],
        })
    }

    fn config_from(value: serde_json::Value) -> Config {
        serde_json::from_value(value).expect("config deserializes")
    }

    #[test]
    fn valid_config_produces_params() {
        let params = config_from(base_config()).params().unwrap();
        assert_eq!(params.domain_size, 64);
        assert_eq!(params.final_sumcheck_rounds, 1);
        assert_eq!(params.commitment_ood_samples, 1);
        assert_eq!(params.hash, HashKind::Field);
        assert_eq!(params.statement_evaluations.len(), 3);
        assert_eq!(params.folding.at(0), 2);
        assert_eq!(params.folding.at(1), 2);
    }

    #[test]
    fn transcript_length_mismatch_is_rejected() {
        let mut value = base_config();
        value["transcript_len"] = json!(4);
        let err = config_from(value).params().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TranscriptLength {
                expected: 4,
                got: 0
            }
        ));
    }

    #[test]
    fn short_round_arrays_are_rejected() {
        let mut value = base_config();
        value["n_rounds"] = json!(2);
        value["folding_factor"] = json!([1]);
        let err = config_from(value).params().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::RoundArrays {
                which: "ood_samples",
                ..
            }
        ));
    }

    #[test]
    fn overlong_folding_schedule_is_rejected() {
        let mut value = base_config();
        value["folding_factor"] = json!([4, 4]);
        let err = config_from(value).params().unwrap_err();
        assert!(matches!(err, ConfigError::FoldingSchedule { consumed: 8, n_vars: 5 }));
    }

    #[test]
    fn non_generator_is_rejected() {
        let mut value = base_config();
        value["domain_generator"] = json!("5");
        assert!(matches!(
            config_from(value).params().unwrap_err(),
            ConfigError::GeneratorOrder { log_size: 6 }
        ));
    }

    #[test]
    fn bad_scalar_string_is_rejected() {
        let mut value = base_config();
        value["statement_evaluations"] = json!(["1", "not-a-number", "3"]);
        assert!(matches!(
            config_from(value).params().unwrap_err(),
            ConfigError::Scalar { .. }
        ));
    }

    #[test]
    fn vector_folding_schedule_is_per_round() {
        let mut value = base_config();
        value["n_vars"] = json!(7);
        value["folding_factor"] = json!([3, 2]);
        let omega = F::get_root_of_unity(256).unwrap();
        value["domain_generator"] = json!(omega.to_string());
        let params = config_from(value).params().unwrap();
        assert_eq!(params.folding.at(0), 3);
        assert_eq!(params.folding.at(1), 2);
        assert_eq!(params.final_sumcheck_rounds, 2);
    }
}
