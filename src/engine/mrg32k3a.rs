//! MRG32k3a combined multiple recursive generator.
//!
//! L'Ecuyer's MRG32k3a combines two order-3 linear recurrences modulo
//! m1 = 2^32 - 209 and m2 = 2^32 - 22853. It has period ~2^191 and is the
//! workhorse of parallel sample generation because the linear structure
//! permits exact skip-ahead: jumping n steps is a 3x3 matrix power, so every
//! worker can be placed 2^67 steps apart in the base sequence at seeding
//! time instead of streaming past its predecessors.
//!
//! All operands are below 2^32, so every product here fits in u64 and no
//! wide arithmetic is needed.

use std::sync::OnceLock;

use bytemuck::{Pod, Zeroable};

use super::ParallelEngine;

/// First component modulus, 2^32 - 209.
pub const MRG_M1: u64 = 4_294_967_087;
/// Second component modulus, 2^32 - 22853.
pub const MRG_M2: u64 = 4_294_944_443;

const A12: u64 = 1_403_580;
const A13N: u64 = 810_728;
const A21: u64 = 527_612;
const A23N: u64 = 1_370_589;

/// Workers are spaced 2^67 steps apart in the base sequence.
const SUBSEQUENCE_LOG2: u32 = 67;

/// MRG32k3a engine state (48 bytes, POD).
///
/// `s1` and `s2` hold the three most recent values of each recurrence,
/// oldest first. Valid states keep `s1[i] < MRG_M1`, `s2[i] < MRG_M2`, and
/// neither triple all-zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mrg32k3aState {
    /// Recurrence 1 history, reduced modulo [`MRG_M1`].
    pub s1: [u64; 3],
    /// Recurrence 2 history, reduced modulo [`MRG_M2`].
    pub s2: [u64; 3],
}

// SAFETY: repr(C) struct of u64 arrays, no padding.
unsafe impl Zeroable for Mrg32k3aState {}
unsafe impl Pod for Mrg32k3aState {}

/// Marker type implementing [`ParallelEngine`] for MRG32k3a.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mrg32k3a;

type Mat3 = [[u64; 3]; 3];

const IDENTITY: Mat3 = [[1, 0, 0], [0, 1, 0], [0, 0, 1]];

/// One-step transition matrix of recurrence 1 acting on [oldest, .., newest].
const A1: Mat3 = [[0, 1, 0], [0, 0, 1], [MRG_M1 - A13N, A12, 0]];
/// One-step transition matrix of recurrence 2.
const A2: Mat3 = [[0, 1, 0], [0, 0, 1], [MRG_M2 - A23N, 0, A21]];

#[inline]
fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    // a, b < 2^32 so the product fits in u64.
    (a * b) % m
}

fn mat_mul(a: &Mat3, b: &Mat3, m: u64) -> Mat3 {
    let mut c = [[0u64; 3]; 3];
    for (i, row) in c.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            let mut acc = 0u64;
            for k in 0..3 {
                acc = (acc + mul_mod(a[i][k], b[k][j], m)) % m;
            }
            *cell = acc;
        }
    }
    c
}

fn mat_vec(a: &Mat3, v: &[u64; 3], m: u64) -> [u64; 3] {
    let mut out = [0u64; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        let mut acc = 0u64;
        for k in 0..3 {
            acc = (acc + mul_mod(a[i][k], v[k], m)) % m;
        }
        *slot = acc;
    }
    out
}

/// `base^exp mod m` by binary exponentiation.
fn mat_pow(base: &Mat3, mut exp: u64, m: u64) -> Mat3 {
    let mut result = IDENTITY;
    let mut sq = *base;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mat_mul(&result, &sq, m);
        }
        sq = mat_mul(&sq, &sq, m);
        exp >>= 1;
    }
    result
}

/// `base^(2^k) mod m` by repeated squaring.
fn mat_pow2k(base: &Mat3, k: u32, m: u64) -> Mat3 {
    let mut sq = *base;
    for _ in 0..k {
        sq = mat_mul(&sq, &sq, m);
    }
    sq
}

fn a1_subsequence() -> &'static Mat3 {
    static A1_P67: OnceLock<Mat3> = OnceLock::new();
    A1_P67.get_or_init(|| mat_pow2k(&A1, SUBSEQUENCE_LOG2, MRG_M1))
}

fn a2_subsequence() -> &'static Mat3 {
    static A2_P67: OnceLock<Mat3> = OnceLock::new();
    A2_P67.get_or_init(|| mat_pow2k(&A2, SUBSEQUENCE_LOG2, MRG_M2))
}

/// SplitMix64 step, used to expand the seed into the six state words.
#[inline]
fn splitmix64(x: &mut u64) -> u64 {
    *x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl Mrg32k3a {
    /// Base state for a seed, before any skip-ahead.
    ///
    /// The seed is expanded with SplitMix64 and reduced into each modulus.
    /// An all-zero triple is a fixed point of the recurrence and is remapped
    /// to the unit vector.
    fn base_state(seed: u64) -> Mrg32k3aState {
        let mut x = seed;
        let mut s1 = [0u64; 3];
        let mut s2 = [0u64; 3];
        for w in s1.iter_mut() {
            *w = splitmix64(&mut x) % MRG_M1;
        }
        for w in s2.iter_mut() {
            *w = splitmix64(&mut x) % MRG_M2;
        }
        if s1 == [0, 0, 0] {
            s1[0] = 1;
        }
        if s2 == [0, 0, 0] {
            s2[0] = 1;
        }
        Mrg32k3aState { s1, s2 }
    }
}

impl ParallelEngine for Mrg32k3a {
    type State = Mrg32k3aState;

    fn seed(seed: u64, identity: u64, offset: u64) -> Mrg32k3aState {
        let mut state = Self::base_state(seed);

        // Worker i starts at position i * 2^67 + offset of the base
        // sequence: one matrix power per recurrence, applied to the state.
        let skip1 = mat_mul(
            &mat_pow(a1_subsequence(), identity, MRG_M1),
            &mat_pow(&A1, offset, MRG_M1),
            MRG_M1,
        );
        let skip2 = mat_mul(
            &mat_pow(a2_subsequence(), identity, MRG_M2),
            &mat_pow(&A2, offset, MRG_M2),
            MRG_M2,
        );
        state.s1 = mat_vec(&skip1, &state.s1, MRG_M1);
        state.s2 = mat_vec(&skip2, &state.s2, MRG_M2);
        state
    }

    #[inline]
    fn next(state: &mut Mrg32k3aState) -> u32 {
        let p1 = (mul_mod(A12, state.s1[1], MRG_M1)
            + mul_mod(MRG_M1 - A13N, state.s1[0], MRG_M1))
            % MRG_M1;
        state.s1 = [state.s1[1], state.s1[2], p1];

        let p2 = (mul_mod(A21, state.s2[2], MRG_M2)
            + mul_mod(MRG_M2 - A23N, state.s2[0], MRG_M2))
            % MRG_M2;
        state.s2 = [state.s2[1], state.s2[2], p2];

        ((p1 + MRG_M1 - p2) % MRG_M1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_size() {
        assert_eq!(std::mem::size_of::<Mrg32k3aState>(), 48);
    }

    #[test]
    fn reproducible() {
        let mut a = Mrg32k3a::seed(42, 0, 0);
        let mut b = Mrg32k3a::seed(42, 0, 0);
        for _ in 0..100 {
            assert_eq!(Mrg32k3a::next(&mut a), Mrg32k3a::next(&mut b));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Mrg32k3a::seed(42, 0, 0);
        let mut b = Mrg32k3a::seed(43, 0, 0);
        let same = (0..10).all(|_| Mrg32k3a::next(&mut a) == Mrg32k3a::next(&mut b));
        assert!(!same, "different seeds should produce different sequences");
    }

    #[test]
    fn different_identities_diverge() {
        let mut a = Mrg32k3a::seed(42, 0, 0);
        let mut b = Mrg32k3a::seed(42, 1, 0);
        let same = (0..10).all(|_| Mrg32k3a::next(&mut a) == Mrg32k3a::next(&mut b));
        assert!(!same, "different identities should produce different streams");
    }

    #[test]
    fn output_below_modulus() {
        let mut s = Mrg32k3a::seed(7, 3, 11);
        for _ in 0..1000 {
            assert!((Mrg32k3a::next(&mut s) as u64) < MRG_M1);
        }
    }

    #[test]
    fn offset_matches_stepping() {
        // A state constructed with offset k must equal the offset-0 state
        // advanced k times. This exercises the skip-ahead matrices against
        // the plain recurrence.
        for k in [1u64, 2, 3, 17, 64, 1000] {
            let mut stepped = Mrg32k3a::seed(99, 5, 0);
            for _ in 0..k {
                Mrg32k3a::next(&mut stepped);
            }
            let skipped = Mrg32k3a::seed(99, 5, k);
            assert_eq!(skipped, stepped, "offset {k} mismatch");
        }
    }

    #[test]
    fn subsequence_consistent_with_offset() {
        // Identity 1 at offset 0 sits 2^67 steps ahead of identity 0; the
        // full jump is untestable by stepping, but composing two partial
        // skips must commute: seed(id=1, off=k) == advance_k(seed(id=1, 0)).
        let mut stepped = Mrg32k3a::seed(5, 1, 0);
        for _ in 0..37 {
            Mrg32k3a::next(&mut stepped);
        }
        assert_eq!(Mrg32k3a::seed(5, 1, 37), stepped);
    }

    #[test]
    fn zero_state_remapped() {
        // Whatever the seed, the constructed state is never the fixed point.
        for seed in 0..64u64 {
            let st = Mrg32k3a::seed(seed, 0, 0);
            assert_ne!(st.s1, [0, 0, 0]);
            assert_ne!(st.s2, [0, 0, 0]);
        }
    }
}
