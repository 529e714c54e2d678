//! CLI verifier
//!
//! Reads the three inputs and runs the verification predicate:
//!   verify --proof PATH --config PATH --r1cs PATH
//!
//! Exit status 0 means the transcript verified; any I/O, parse, or
//! verification failure exits non-zero with a descriptive message. The
//! config is authoritative for all protocol parameters; the R1CS file is
//! shape-checked and cross-checked against it, but the predicate itself
//! consumes only the statement evaluations the config carries.

#![forbid(unsafe_code)]

use std::{env, path::Path, process::ExitCode};

use anyhow::Context;
use tracing::warn;
use whir_verifier::{Config, Proof, R1cs, Verifier};

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn required_flag(args: &[String], key: &str) -> anyhow::Result<String> {
    parse_flag(args, key)
        .ok_or_else(|| anyhow::anyhow!("missing required flag {key} PATH (see --help)"))
}

fn usage() {
    eprintln!("Usage: verify --proof PATH --config PATH --r1cs PATH");
    eprintln!();
    eprintln!("  --proof PATH    canonical-serialized proof blob");
    eprintln!("  --config PATH   JSON verifier configuration (transcript included)");
    eprintln!("  --r1cs PATH     JSON constraint system (CSR matrices + interner)");
}

fn run(args: &[String]) -> anyhow::Result<()> {
    let config_path = required_flag(args, "--config")?;
    let proof_path = required_flag(args, "--proof")?;
    let r1cs_path = required_flag(args, "--r1cs")?;

    let config = Config::load(Path::new(&config_path))
        .with_context(|| format!("loading config from {config_path}"))?;
    let params = config.params().context("validating config")?;
    eprintln!(
        "Config: {} variables, {} rounds, {}-point domain, {} transcript bytes",
        params.n_vars,
        params.n_rounds,
        params.domain_size,
        params.transcript.len()
    );

    let r1cs = R1cs::load(Path::new(&r1cs_path))
        .with_context(|| format!("loading R1CS from {r1cs_path}"))?;
    eprintln!(
        "R1CS: {} constraints, {} witnesses ({} public), {}x{} matrices",
        r1cs.constraints,
        r1cs.witnesses,
        r1cs.public_inputs,
        r1cs.a.num_rows,
        r1cs.a.num_cols
    );
    if r1cs.padded_log_witnesses() > params.n_vars {
        warn!(
            n_vars = params.n_vars,
            padded_log_witnesses = r1cs.padded_log_witnesses(),
            "committed polynomial has fewer variables than the padded witness"
        );
    }

    let proof = Proof::load(Path::new(&proof_path))
        .with_context(|| format!("loading proof from {proof_path}"))?;
    eprintln!(
        "Proof: {} opening batches, {} statement values",
        proof.merkle_paths.len(),
        proof.statement_values_at_random_point.len()
    );

    let verifier = Verifier { params: &params };
    verifier.verify(&proof).context("verification failed")?;

    eprintln!("✓ VERIFICATION SUCCESSFUL");
    println!("Verifier result: ok");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
