//! Fixed-capacity pool of per-worker engine states.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::DeviceBuffer;
use crate::engine::ParallelEngine;
use crate::launch::LaunchShape;
use crate::Result;

/// Initialization state of the pool.
///
/// The flag is binary by design: there is no partially initialized pool.
/// A failed seeding launch leaves the pool `Uninitialized` so the next
/// generation call retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    /// Slot contents are undefined; seeding must run before generation.
    Uninitialized,
    /// Every slot holds a state seeded from the current (seed, offset).
    Ready,
}

/// An owned, fixed-capacity array of engine states, one per logical
/// worker.
///
/// Allocated once per generator and never resized; both the seeding kernel
/// (full overwrite) and generation kernels (in-place state advance) mutate
/// the slots through the device buffer.
#[derive(Debug)]
pub struct EnginePool<E: ParallelEngine> {
    states: DeviceBuffer<E::State>,
    shape: LaunchShape,
    status: PoolStatus,
}

impl<E: ParallelEngine> EnginePool<E> {
    /// Allocate an uninitialized pool sized for `shape`.
    pub fn new(shape: LaunchShape) -> Result<Self> {
        let states = DeviceBuffer::alloc(shape.workers())?;
        Ok(Self {
            states,
            shape,
            status: PoolStatus::Uninitialized,
        })
    }

    /// Number of engine slots (= logical workers).
    pub fn capacity(&self) -> usize {
        self.states.len()
    }

    /// The launch shape this pool was provisioned for.
    pub fn shape(&self) -> LaunchShape {
        self.shape
    }

    /// Whether the pool holds valid seeded states.
    pub fn is_ready(&self) -> bool {
        self.status == PoolStatus::Ready
    }

    pub(crate) fn mark_ready(&mut self) {
        self.status = PoolStatus::Ready;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.status = PoolStatus::Uninitialized;
    }

    pub(crate) fn states(&self) -> Arc<Mutex<Vec<E::State>>> {
        self.states.shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Mrg32k3a;

    #[test]
    fn capacity_tracks_shape() {
        let pool = EnginePool::<Mrg32k3a>::new(LaunchShape::new(8, 4)).unwrap();
        assert_eq!(pool.capacity(), 32);
        assert!(!pool.is_ready());
    }

    #[test]
    fn status_transitions() {
        let mut pool = EnginePool::<Mrg32k3a>::new(LaunchShape::new(2, 2)).unwrap();
        pool.mark_ready();
        assert!(pool.is_ready());
        pool.mark_dirty();
        assert!(!pool.is_ready());
    }
}
