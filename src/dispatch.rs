//! Host-simulated kernels: pool seeding and grid-stride generation.
//!
//! These functions are the bodies of the jobs the generator submits to its
//! stream. Each logical worker (lane) starts at its linear identity and
//! steps by the total worker count, which covers the whole output buffer
//! for any ratio of worker count to request size. A worker's engine state
//! is read once, advanced locally in the loop, and written back once, so
//! the pool sees exactly one load and one store per worker per kernel.
//!
//! Lanes touch pairwise disjoint output indices, so running them in
//! parallel is race-free by construction.

use bytemuck::Pod;
use rayon::prelude::*;

use crate::distribution::{PairedSample, SingleSample};
use crate::engine::ParallelEngine;

/// Shared output pointer for disjoint strided writes.
///
/// Lane closures must go through [`get`](SyncPtr::get): capturing the raw
/// pointer field directly would capture `*mut T` itself under disjoint
/// field capture and sidestep these impls.
struct SyncPtr<T>(*mut T);

impl<T> SyncPtr<T> {
    fn get(&self) -> *mut T {
        self.0
    }
}

// SAFETY: every lane writes a distinct set of indices (congruent to its
// identity modulo the stride), so concurrent writers never alias a slot.
unsafe impl<T: Send> Send for SyncPtr<T> {}
unsafe impl<T: Send> Sync for SyncPtr<T> {}

/// Seed every pool slot from (seed, slot identity, offset).
///
/// One engine per worker, the worker's linear index as its stream
/// identity. Overwrites all prior contents.
pub fn seed_engines<E: ParallelEngine>(states: &mut [E::State], seed: u64, offset: u64) {
    states
        .par_iter_mut()
        .enumerate()
        .for_each(|(identity, slot)| {
            *slot = E::seed(seed, identity as u64, offset);
        });
}

/// Grid-stride fill with a single-input transform.
///
/// Writes exactly `data.len()` elements: worker `i` produces the values at
/// indices `i, i + stride, i + 2 * stride, ...` where the stride is the
/// worker count. Every worker's state is written back, including workers
/// that produced nothing.
pub fn fill_single<E, D>(states: &mut [E::State], data: &mut [D::Output], dist: &D)
where
    E: ParallelEngine,
    D: SingleSample + Sync,
    D::Output: Pod + Send + Sync,
{
    let n = data.len();
    let stride = states.len();
    if stride == 0 {
        return;
    }

    let out = SyncPtr(data.as_mut_ptr());
    states.par_iter_mut().enumerate().for_each(|(lane, state)| {
        let mut index = lane;
        while index < n {
            let value = dist.sample(E::next(state));
            // SAFETY: this lane writes only indices congruent to `lane`
            // modulo `stride`; all lanes' index sets are disjoint and
            // bounded by `n`.
            unsafe { out.get().add(index).write(value) };
            index += stride;
        }
    });
}

/// Grid-stride fill with a paired-input transform.
///
/// Iterates over `data.len() / 2` packed slots; each iteration consumes two
/// raw values and stores both components. When the length is odd, worker 0
/// alone produces one extra pair after its main loop and stores only the
/// first component into the final slot; doing this on a single designated
/// worker avoids a race on the last element. The second component is
/// discarded, but the extra engine advance is part of worker 0's
/// observable state.
pub fn fill_paired<E, D>(states: &mut [E::State], data: &mut [D::Output], dist: &D)
where
    E: ParallelEngine,
    D: PairedSample + Sync,
    D::Output: Pod + Send + Sync,
{
    let n = data.len();
    let stride = states.len();
    if stride == 0 {
        return;
    }
    let pairs = n / 2;

    let out = SyncPtr(data.as_mut_ptr());
    states.par_iter_mut().enumerate().for_each(|(lane, state)| {
        let mut slot = lane;
        while slot < pairs {
            let (a, b) = dist.sample_pair(E::next(state), E::next(state));
            // SAFETY: packed slot indices are disjoint per lane and
            // `2 * slot + 1 < n` whenever `slot < pairs`.
            unsafe {
                out.get().add(2 * slot).write(a);
                out.get().add(2 * slot + 1).write(b);
            }
            slot += stride;
        }
    });

    if n % 2 == 1 {
        let state = &mut states[0];
        let (a, _) = dist.sample_pair(E::next(state), E::next(state));
        data[n - 1] = a;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::Identity;
    use crate::engine::{Mrg32k3a, ParallelEngine};

    fn seeded_states(capacity: usize, seed: u64, offset: u64) -> Vec<<Mrg32k3a as ParallelEngine>::State> {
        let mut states = vec![Default::default(); capacity];
        seed_engines::<Mrg32k3a>(&mut states, seed, offset);
        states
    }

    #[test]
    fn seeding_matches_direct_construction() {
        let states = seeded_states(8, 42, 3);
        for (i, state) in states.iter().enumerate() {
            assert_eq!(*state, Mrg32k3a::seed(42, i as u64, 3));
        }
    }

    #[test]
    fn grid_stride_round_robin() {
        // Pool capacity 4, 10 single-input identity samples: worker i emits
        // at indices i, i+4, i+8. Reference: round-robin advance of 4
        // independent engines seeded with identities 0..3.
        let mut states = seeded_states(4, 7, 0);
        let mut reference = states.clone();

        let mut out = vec![0u32; 10];
        fill_single::<Mrg32k3a, _>(&mut states, &mut out, &Identity);

        let mut expected = vec![0u32; 10];
        for lane in 0..4 {
            let mut index = lane;
            while index < 10 {
                expected[index] = Mrg32k3a::next(&mut reference[lane]);
                index += 4;
            }
        }
        assert_eq!(out, expected);
        assert_eq!(states, reference, "advanced states must be persisted");
    }

    #[test]
    fn workers_beyond_count_keep_state() {
        // 8 workers, 3 outputs: workers 3..8 produce nothing and their
        // states are written back unchanged.
        let mut states = seeded_states(8, 11, 0);
        let before = states.clone();

        let mut out = vec![0u32; 3];
        fill_single::<Mrg32k3a, _>(&mut states, &mut out, &Identity);

        for lane in 3..8 {
            assert_eq!(states[lane], before[lane]);
        }
        for lane in 0..3 {
            assert_ne!(states[lane], before[lane]);
        }
    }

    /// Packs the two raw inputs unchanged, for inspecting pair placement.
    struct RawPair;
    impl PairedSample for RawPair {
        type Output = u32;
        fn sample_pair(&self, a: u32, b: u32) -> (u32, u32) {
            (a, b)
        }
    }

    #[test]
    fn paired_even_count() {
        let mut states = seeded_states(4, 5, 0);
        let mut reference = states.clone();

        let mut out = vec![0u32; 8];
        fill_paired::<Mrg32k3a, _>(&mut states, &mut out, &RawPair);

        let mut expected = vec![0u32; 8];
        for lane in 0..4 {
            let mut slot = lane;
            while slot < 4 {
                expected[2 * slot] = Mrg32k3a::next(&mut reference[lane]);
                expected[2 * slot + 1] = Mrg32k3a::next(&mut reference[lane]);
                slot += 4;
            }
        }
        assert_eq!(out, expected);
        assert_eq!(states, reference);
    }

    #[test]
    fn paired_odd_count_tail_from_worker_zero() {
        // 4 workers, 5 outputs: slots 0..3 come from two full pairs
        // (workers 0 and 1); slot 4 is the first component of worker 0's
        // extra pair, and the second component is never written anywhere.
        let mut states = seeded_states(4, 5, 0);
        let mut reference = states.clone();

        let mut out = vec![u32::MAX; 5];
        fill_paired::<Mrg32k3a, _>(&mut states, &mut out, &RawPair);

        let mut expected = vec![u32::MAX; 5];
        for lane in 0..2 {
            expected[2 * lane] = Mrg32k3a::next(&mut reference[lane]);
            expected[2 * lane + 1] = Mrg32k3a::next(&mut reference[lane]);
        }
        // Worker 0 tail: full pair generated, only the first kept.
        expected[4] = Mrg32k3a::next(&mut reference[0]);
        let _discarded = Mrg32k3a::next(&mut reference[0]);

        assert_eq!(out, expected);
        assert_eq!(states, reference, "tail advance must persist in worker 0");
    }

    #[test]
    fn paired_count_one() {
        // A single odd element: no full pairs, only the worker-0 tail.
        let mut states = seeded_states(4, 9, 0);
        let mut reference = states.clone();

        let mut out = vec![0u32; 1];
        fill_paired::<Mrg32k3a, _>(&mut states, &mut out, &RawPair);

        assert_eq!(out[0], Mrg32k3a::next(&mut reference[0]));
        let _discarded = Mrg32k3a::next(&mut reference[0]);
        assert_eq!(states[0], reference[0]);
        for lane in 1..4 {
            assert_eq!(states[lane], reference[lane]);
        }
    }

    #[test]
    fn empty_output_advances_nothing() {
        let mut states = seeded_states(4, 13, 0);
        let before = states.clone();

        let mut out: Vec<u32> = Vec::new();
        fill_single::<Mrg32k3a, _>(&mut states, &mut out, &Identity);
        fill_paired::<Mrg32k3a, _>(&mut states, &mut out, &RawPair);

        assert_eq!(states, before);
    }
}
