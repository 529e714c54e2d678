//! Field-native two-to-one compression ("skyscraper")
//!
//! A fixed permutation over `[F; 2]` built from alternating square and
//! byte-decomposition ("bar") rounds, plus the Davies–Meyer style
//! feed-forward that turns it into the two-to-one compression used
//! everywhere else in the crate: the Merkle tree, the duplex sponge and
//! the proof-of-work check all reduce to `compress(a, b) -> F`.
//!
//! The square rounds scale by `σ = 2^{-256} mod p` so that the map stays
//! well-mixed in Montgomery representation; the bar rounds rotate the
//! canonical little-endian byte string by half its width and pass every
//! byte through an 8-bit chi-like S-box. Round constants are fixed; the
//! first and last rounds carry none.

#![forbid(unsafe_code)]

use ark_ff::{BigInteger, Field, PrimeField, Zero};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::F;

/// Number of Feistel rounds; rounds 2 and 3 (zero-based) are bar rounds.
const ROUNDS: usize = 6;

/// Fixed per-round additive constants (decimal). Zero in the first and
/// last round.
const ROUND_CONSTANT_STRS: [&str; ROUNDS] = [
    "0",
    "4129934906838828943538718654915524397261916035337313613656709281526810186352",
    "17033921810820994142826718265683563989002941274724276124293015901258406437770",
    "9646244929537826362082050616898500016882992673528380780457815498613181823752",
    "14261220372784011950906223999264736743493223330714845126943045292172058248269",
    "0",
];

struct Constants {
    sigma: F,
    rc: [F; ROUNDS],
}

fn constants() -> &'static Constants {
    static CONSTANTS: OnceLock<Constants> = OnceLock::new();
    CONSTANTS.get_or_init(|| {
        let two_pow_256 = F::from(2u64).pow([256u64]);
        let sigma = two_pow_256
            .inverse()
            .expect("2^256 is a unit modulo the BN254 scalar prime");
        let mut rc = [F::zero(); ROUNDS];
        for (slot, s) in rc.iter_mut().zip(ROUND_CONSTANT_STRS) {
            *slot = F::from_str(s).expect("round constant is a canonical decimal scalar");
        }
        Constants { sigma, rc }
    })
}

/// 8-bit S-box applied bytewise inside the bar rounds.
#[inline]
fn sbox(b: u8) -> u8 {
    (b ^ ((!b).rotate_left(1) & b.rotate_left(2) & b.rotate_left(3))).rotate_left(1)
}

/// Bar round: canonical little-endian bytes, half-width rotation, S-box,
/// recompose modulo p.
fn bar(x: F) -> F {
    let bytes = x.into_bigint().to_bytes_le();
    let mut mixed = [0u8; 32];
    for (i, slot) in mixed.iter_mut().enumerate() {
        *slot = sbox(bytes[(i + 16) % 32]);
    }
    F::from_le_bytes_mod_order(&mixed)
}

#[inline]
fn square(x: F, sigma: F) -> F {
    x.square() * sigma
}

/// The fixed permutation over two field elements.
pub fn permute(state: &mut [F; 2]) {
    let cs = constants();
    let mut l = state[0];
    let mut r = state[1];
    for (i, rc) in cs.rc.iter().enumerate() {
        let mixed = if matches!(i, 2 | 3) { bar(l) } else { square(l, cs.sigma) };
        let next = r + mixed + rc;
        r = l;
        l = next;
    }
    state[0] = l;
    state[1] = r;
}

/// Two-to-one compression: permute `[l, r]` and feed `l` forward.
pub fn compress(l: F, r: F) -> F {
    let mut state = [l, r];
    permute(&mut state);
    state[0] + l
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{One, UniformRand, Zero};

    #[test]
    fn compress_is_deterministic() {
        let mut rng = ark_std::test_rng();
        let a = F::rand(&mut rng);
        let b = F::rand(&mut rng);
        assert_eq!(compress(a, b), compress(a, b));
    }

    #[test]
    fn compress_is_order_sensitive() {
        let a = F::from(3u64);
        let b = F::from(5u64);
        assert_ne!(compress(a, b), compress(b, a));
    }

    #[test]
    fn permute_moves_the_all_zero_state() {
        let mut state = [F::zero(), F::zero()];
        permute(&mut state);
        assert_ne!(state, [F::zero(), F::zero()]);
    }

    #[test]
    fn bar_differs_from_identity_on_small_inputs() {
        assert_ne!(bar(F::one()), F::one());
        assert_ne!(bar(F::from(0x1234_5678u64)), F::from(0x1234_5678u64));
    }

    #[test]
    fn nearby_inputs_diverge() {
        let a = F::from(42u64);
        let h0 = compress(a, F::zero());
        let h1 = compress(a + F::one(), F::zero());
        assert_ne!(h0, h1);
    }
}
