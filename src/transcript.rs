//! Fiat–Shamir transcript: I/O pattern, duplex sponge, reader and writer
//!
//! The protocol's byte schedule is scripted by an **I/O pattern**: a
//! domain-separator string followed by zero-byte-delimited tokens, each
//! one `A<count><label>` (prover message, absorbed) or `S<count><label>`
//! (verifier challenge, squeezed). The pattern and the transcript bytes
//! together determine the duplex sponge's entire trajectory, and
//! therefore every challenge. Labels are informational only; counts are
//! in bytes.
//!
//! ## Sponge contract
//! The sponge is a duplex over `[F; 2]` (rate 1, capacity 1) built on the
//! skyscraper permutation:
//! - seeding: a helper sponge with zero state absorbs the raw pattern
//!   string; its first 32 squeezed bytes (little-endian mod p) become the
//!   capacity limb of the main sponge;
//! - absorbing N bytes packs them into ⌈N/32⌉ scalars (little-endian
//!   mod p, chunked per absorb call), each added into the rate limb
//!   before a permutation;
//! - squeezing serializes the rate limb to its canonical 32 little-endian
//!   bytes and permutes; a squeeze run keeps draining that stream until
//!   the next absorb resets it;
//! - scalar challenges take 47 bytes each, interpreted big-endian mod p.
//!   The 47-byte width is the statistical-security margin and is fixed.
//!
//! [`Arthur`] is the verifier-side reader; [`Merlin`] is the prover-side
//! writer over the same sponge and script, used to produce transcripts
//! (fixtures here, real provers elsewhere). Replaying a `Merlin`-written
//! transcript through `Arthur` yields byte-identical challenges.

#![forbid(unsafe_code)]

use ark_ff::{BigInteger, PrimeField, Zero};

use crate::{skyscraper, F};

/// Bytes squeezed per scalar challenge.
pub const CHALLENGE_SCALAR_BYTES: usize = 47;

/// Bytes absorbed per prover-message scalar (canonical little-endian).
pub const SCALAR_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("malformed I/O pattern: {0}")]
    Pattern(String),
    #[error("script desync at op {op_index}: requested {requested}, script has {scripted}")]
    ScriptMismatch {
        op_index: usize,
        requested: String,
        scripted: String,
    },
    #[error("transcript overrun: needed {needed} more bytes, {remaining} remain")]
    Overrun { needed: usize, remaining: usize },
    #[error("transcript not fully consumed: {remaining} trailing bytes")]
    TrailingBytes { remaining: usize },
}

/// Direction of one scripted operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    /// Prover message: bytes come from the transcript and are absorbed.
    Absorb,
    /// Verifier challenge: bytes are squeezed from the sponge.
    Squeeze,
}

impl OpKind {
    fn letter(self) -> char {
        match self {
            OpKind::Absorb => 'A',
            OpKind::Squeeze => 'S',
        }
    }
}

#[derive(Clone, Debug)]
struct IoOp {
    kind: OpKind,
    count: usize,
    label: String,
}

/// Parsed I/O pattern: domain separator plus the operation script.
#[derive(Clone, Debug)]
pub struct IoPattern {
    raw: String,
    ops: Vec<IoOp>,
}

impl IoPattern {
    /// Parse the zero-byte-delimited pattern grammar.
    pub fn parse(raw: &str) -> Result<Self, TranscriptError> {
        let mut parts = raw.split('\0');
        parts
            .next()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| TranscriptError::Pattern("empty domain separator".into()))?;
        let mut ops = Vec::new();
        for (i, token) in parts.enumerate() {
            let mut chars = token.chars();
            let kind = match chars.next() {
                Some('A') => OpKind::Absorb,
                Some('S') => OpKind::Squeeze,
                other => {
                    return Err(TranscriptError::Pattern(format!(
                        "op {i}: expected 'A' or 'S', found {other:?}"
                    )))
                }
            };
            let rest = chars.as_str();
            let digits_end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            if digits_end == 0 {
                return Err(TranscriptError::Pattern(format!(
                    "op {i}: missing byte count in {token:?}"
                )));
            }
            let count: usize = rest[..digits_end]
                .parse()
                .map_err(|e| TranscriptError::Pattern(format!("op {i}: bad count: {e}")))?;
            ops.push(IoOp {
                kind,
                count,
                label: rest[digits_end..].to_string(),
            });
        }
        if ops.is_empty() {
            return Err(TranscriptError::Pattern(
                "pattern scripts no operations".into(),
            ));
        }
        Ok(Self {
            raw: raw.to_string(),
            ops,
        })
    }

    /// The raw pattern string (seeds the sponge).
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

// ---------------------------------------------------------------------------
// Duplex sponge
// ---------------------------------------------------------------------------

struct Sponge {
    state: [F; 2],
    // Pending squeeze output; `pos == SCALAR_BYTES` means drained.
    buf: [u8; SCALAR_BYTES],
    pos: usize,
}

impl Sponge {
    fn seeded(pattern: &IoPattern) -> Self {
        let mut helper = Sponge {
            state: [F::zero(), F::zero()],
            buf: [0u8; SCALAR_BYTES],
            pos: SCALAR_BYTES,
        };
        helper.absorb_bytes(pattern.as_str().as_bytes());
        let mut tag = [0u8; SCALAR_BYTES];
        helper.squeeze_bytes(&mut tag);
        Sponge {
            state: [F::zero(), F::from_le_bytes_mod_order(&tag)],
            buf: [0u8; SCALAR_BYTES],
            pos: SCALAR_BYTES,
        }
    }

    fn absorb_scalar(&mut self, m: F) {
        // A fresh absorb invalidates any pending squeeze output.
        self.pos = SCALAR_BYTES;
        self.state[0] += m;
        skyscraper::permute(&mut self.state);
    }

    fn absorb_bytes(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(SCALAR_BYTES) {
            self.absorb_scalar(F::from_le_bytes_mod_order(chunk));
        }
    }

    fn squeeze_bytes(&mut self, out: &mut [u8]) {
        for slot in out.iter_mut() {
            if self.pos == SCALAR_BYTES {
                let rate = self.state[0].into_bigint().to_bytes_le();
                self.buf.copy_from_slice(&rate);
                skyscraper::permute(&mut self.state);
                self.pos = 0;
            }
            *slot = self.buf[self.pos];
            self.pos += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Script cursor shared by reader and writer
// ---------------------------------------------------------------------------

struct ScriptCursor {
    ops: Vec<IoOp>,
    index: usize,
    used: usize,
}

impl ScriptCursor {
    fn new(pattern: &IoPattern) -> Self {
        Self {
            ops: pattern.ops.clone(),
            index: 0,
            used: 0,
        }
    }

    /// Consume `n` bytes of direction `kind` from the script. A request
    /// may span consecutive same-kind ops; a direction mismatch or an
    /// exhausted script is a desync.
    fn consume(&mut self, kind: OpKind, n: usize) -> Result<(), TranscriptError> {
        let mut needed = n;
        while needed > 0 {
            let op = self
                .ops
                .get(self.index)
                .ok_or_else(|| TranscriptError::ScriptMismatch {
                    op_index: self.index,
                    requested: format!("{}{}", kind.letter(), needed),
                    scripted: "end of script".into(),
                })?;
            if op.kind != kind {
                return Err(TranscriptError::ScriptMismatch {
                    op_index: self.index,
                    requested: format!("{}{}", kind.letter(), needed),
                    scripted: format!("{}{}{}", op.kind.letter(), op.count, op.label),
                });
            }
            let available = op.count - self.used;
            let take = available.min(needed);
            needed -= take;
            self.used += take;
            if self.used == op.count {
                self.index += 1;
                self.used = 0;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Verifier-side reader
// ---------------------------------------------------------------------------

/// Transcript reader: yields prover messages and re-derives challenges in
/// the exact order the I/O pattern scripts.
pub struct Arthur<'a> {
    transcript: &'a [u8],
    cursor: usize,
    sponge: Sponge,
    script: ScriptCursor,
}

impl<'a> Arthur<'a> {
    pub fn new(pattern: &IoPattern, transcript: &'a [u8]) -> Self {
        Self {
            transcript,
            cursor: 0,
            sponge: Sponge::seeded(pattern),
            script: ScriptCursor::new(pattern),
        }
    }

    /// Next `n` bytes of prover message; advances the cursor and absorbs.
    pub fn next_bytes(&mut self, n: usize) -> Result<&'a [u8], TranscriptError> {
        self.script.consume(OpKind::Absorb, n)?;
        let remaining = self.transcript.len() - self.cursor;
        if n > remaining {
            return Err(TranscriptError::Overrun { needed: n, remaining });
        }
        let bytes = &self.transcript[self.cursor..self.cursor + n];
        self.cursor += n;
        self.sponge.absorb_bytes(bytes);
        Ok(bytes)
    }

    /// Next `k` prover scalars (32 little-endian bytes each, mod p).
    pub fn next_scalars(&mut self, k: usize) -> Result<Vec<F>, TranscriptError> {
        let bytes = self.next_bytes(SCALAR_BYTES * k)?;
        Ok(bytes
            .chunks(SCALAR_BYTES)
            .map(F::from_le_bytes_mod_order)
            .collect())
    }

    /// Squeeze `n` challenge bytes; the cursor does not move.
    pub fn challenge_bytes(&mut self, n: usize) -> Result<Vec<u8>, TranscriptError> {
        self.script.consume(OpKind::Squeeze, n)?;
        let mut out = vec![0u8; n];
        self.sponge.squeeze_bytes(&mut out);
        Ok(out)
    }

    /// Squeeze `k` scalar challenges (47 big-endian bytes each, mod p).
    pub fn challenge_scalars(&mut self, k: usize) -> Result<Vec<F>, TranscriptError> {
        let bytes = self.challenge_bytes(CHALLENGE_SCALAR_BYTES * k)?;
        Ok(bytes
            .chunks(CHALLENGE_SCALAR_BYTES)
            .map(F::from_be_bytes_mod_order)
            .collect())
    }

    /// Single scalar challenge.
    pub fn challenge_scalar(&mut self) -> Result<F, TranscriptError> {
        Ok(self.challenge_scalars(1)?[0])
    }

    /// Require the cursor to sit exactly at the end of the transcript.
    pub fn finish(&self) -> Result<(), TranscriptError> {
        let remaining = self.transcript.len() - self.cursor;
        if remaining != 0 {
            return Err(TranscriptError::TrailingBytes { remaining });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Prover-side writer
// ---------------------------------------------------------------------------

/// Transcript writer: the prover-side twin of [`Arthur`]. Messages are
/// appended to the byte transcript and absorbed; challenges are derived
/// from the identical sponge trajectory.
pub struct Merlin {
    bytes: Vec<u8>,
    sponge: Sponge,
    script: ScriptCursor,
}

impl Merlin {
    pub fn new(pattern: &IoPattern) -> Self {
        Self {
            bytes: Vec::new(),
            sponge: Sponge::seeded(pattern),
            script: ScriptCursor::new(pattern),
        }
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) -> Result<(), TranscriptError> {
        self.script.consume(OpKind::Absorb, bytes.len())?;
        self.bytes.extend_from_slice(bytes);
        self.sponge.absorb_bytes(bytes);
        Ok(())
    }

    pub fn add_scalars(&mut self, scalars: &[F]) -> Result<(), TranscriptError> {
        let mut buf = Vec::with_capacity(scalars.len() * SCALAR_BYTES);
        for s in scalars {
            buf.extend_from_slice(&s.into_bigint().to_bytes_le());
        }
        self.add_bytes(&buf)
    }

    pub fn challenge_bytes(&mut self, n: usize) -> Result<Vec<u8>, TranscriptError> {
        self.script.consume(OpKind::Squeeze, n)?;
        let mut out = vec![0u8; n];
        self.sponge.squeeze_bytes(&mut out);
        Ok(out)
    }

    pub fn challenge_scalars(&mut self, k: usize) -> Result<Vec<F>, TranscriptError> {
        let bytes = self.challenge_bytes(CHALLENGE_SCALAR_BYTES * k)?;
        Ok(bytes
            .chunks(CHALLENGE_SCALAR_BYTES)
            .map(F::from_be_bytes_mod_order)
            .collect())
    }

    pub fn challenge_scalar(&mut self) -> Result<F, TranscriptError> {
        Ok(self.challenge_scalars(1)?[0])
    }

    /// Bytes written so far.
    pub fn transcript_len(&self) -> usize {
        self.bytes.len()
    }

    /// Finish writing and take the transcript bytes.
    pub fn into_transcript(self) -> Vec<u8> {
        self.bytes
    }
}
