//! Per-worker generator engines.
//!
//! An engine is the raw numerical primitive behind the generator: a small
//! POD state that advances deterministically, one 32-bit value per step.
//! Each worker in the pool owns one engine, seeded from the generator seed,
//! the worker's linear identity and the stream offset.

mod mrg32k3a;

pub use mrg32k3a::{Mrg32k3a, Mrg32k3aState, MRG_M1, MRG_M2};

use bytemuck::{Pod, Zeroable};

/// Capability contract for engines usable in the parallel pool.
///
/// The state must be POD so it can live in a device buffer and transfer
/// byte-for-byte between host and device. Seeding is a pure function of
/// `(seed, identity, offset)`: two workers constructed with the same triple
/// hold identical states, and distinct identities yield statistically
/// independent streams.
pub trait ParallelEngine: 'static {
    /// Engine state, one per pool slot.
    type State: Pod + Zeroable + Copy + Send + Sync + PartialEq + std::fmt::Debug;

    /// Construct the state for the worker with the given linear identity,
    /// advanced `offset` steps into that worker's stream.
    fn seed(seed: u64, identity: u64, offset: u64) -> Self::State;

    /// Advance the state by one step and return the raw 32-bit output.
    fn next(state: &mut Self::State) -> u32;
}
