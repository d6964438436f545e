//! Generator instance: pool ownership, lazy initialization, and the
//! public generation surface.

use bytemuck::Pod;
use tracing::debug;

use crate::device::{DeviceBuffer, DeviceStream};
use crate::dispatch;
use crate::distribution::{
    Identity, LogNormal, Normal, PairedSample, PoissonCache, SingleSample, Uniform,
};
use crate::engine::{Mrg32k3a, ParallelEngine};
use crate::launch::LaunchShape;
use crate::pool::EnginePool;
use crate::Result;

/// Seed used when the caller passes zero (a zero seed would collapse parts
/// of the state expansion).
pub const DEFAULT_SEED: u64 = 12345;

/// A device-parallel generator.
///
/// Owns a fixed pool of per-worker engine states, a seed, a stream offset,
/// a handle to an ordered execution stream, and a cache for the
/// construction-heavy Poisson sampler.
///
/// Seeding the pool is lazy and idempotent: it happens on the first
/// generation call after construction, [`reset`](Generator::reset),
/// [`set_seed`](Generator::set_seed) or
/// [`set_offset`](Generator::set_offset), never eagerly. Changing several
/// parameters before the next use therefore re-seeds once, not once per
/// change.
///
/// Calls on one instance must be serialized by the caller; jobs submitted
/// through one instance are ordered by its stream.
#[derive(Debug)]
pub struct Generator<E: ParallelEngine = Mrg32k3a> {
    pool: EnginePool<E>,
    seed: u64,
    offset: u64,
    stream: DeviceStream,
    poisson: PoissonCache,
}

impl<E: ParallelEngine> Generator<E> {
    /// Construct with the default seed, zero offset and the host launch
    /// shape.
    pub fn new(stream: DeviceStream) -> Result<Self> {
        Self::with_shape(DEFAULT_SEED, 0, stream, LaunchShape::HOST)
    }

    /// Construct with an explicit seed and offset. A zero seed maps to
    /// [`DEFAULT_SEED`].
    pub fn with_seed(seed: u64, offset: u64, stream: DeviceStream) -> Result<Self> {
        Self::with_shape(seed, offset, stream, LaunchShape::HOST)
    }

    /// Construct with an explicit launch shape (pool capacity =
    /// `shape.workers()`).
    ///
    /// Pool allocation failure aborts construction; a partially
    /// constructed generator is never returned.
    pub fn with_shape(
        seed: u64,
        offset: u64,
        stream: DeviceStream,
        shape: LaunchShape,
    ) -> Result<Self> {
        let pool = EnginePool::new(shape)?;
        let seed = if seed == 0 { DEFAULT_SEED } else { seed };
        debug!(capacity = pool.capacity(), seed, offset, "generator created");
        Ok(Self {
            pool,
            seed,
            offset,
            stream,
            poisson: PoissonCache::new(),
        })
    }

    /// Current seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current stream offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Engine pool capacity (= logical worker count).
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// The stream this generator submits to.
    pub fn stream(&self) -> &DeviceStream {
        &self.stream
    }

    /// Mark the pool for re-seeding on next use.
    pub fn reset(&mut self) {
        self.pool.mark_dirty();
    }

    /// Change the seed and mark the pool for re-seeding on next use.
    ///
    /// A zero seed maps to [`DEFAULT_SEED`].
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = if seed == 0 { DEFAULT_SEED } else { seed };
        self.pool.mark_dirty();
    }

    /// Change the stream offset and mark the pool for re-seeding on next
    /// use.
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
        self.pool.mark_dirty();
    }

    /// Seed the pool if it is not ready. Idempotent; a submission failure
    /// leaves the pool dirty so the next call retries.
    fn init(&mut self) -> Result<()> {
        if self.pool.is_ready() {
            return Ok(());
        }

        let states = self.pool.states();
        let (seed, offset) = (self.seed, self.offset);
        debug!(capacity = self.pool.capacity(), seed, offset, "seeding engine pool");
        self.stream.submit(move || {
            let mut states = states.lock();
            dispatch::seed_engines::<E>(&mut states, seed, offset);
        })?;

        // Stream jobs run in submission order, so generation jobs submitted
        // after this point observe the seeded pool even though submission
        // is asynchronous.
        self.pool.mark_ready();
        Ok(())
    }

    /// Fill `output` with raw 32-bit engine output.
    pub fn generate(&mut self, output: &mut DeviceBuffer<u32>) -> Result<()> {
        self.generate_with(output, Identity)
    }

    /// Fill `output` through a caller-supplied single-input transform.
    pub fn generate_with<D>(&mut self, output: &mut DeviceBuffer<D::Output>, dist: D) -> Result<()>
    where
        D: SingleSample + Send + Sync + 'static,
        D::Output: Pod + Send + Sync,
    {
        self.init()?;

        let states = self.pool.states();
        let data = output.shared();
        debug!(count = output.len(), "generate (single-input)");
        self.stream.submit(move || {
            let mut states = states.lock();
            let mut data = data.lock();
            dispatch::fill_single::<E, D>(&mut states, &mut data, &dist);
        })
    }

    /// Fill `output` through a caller-supplied paired-input transform.
    ///
    /// For odd lengths the final slot receives only the first component of
    /// the last produced pair.
    pub fn generate_paired_with<D>(
        &mut self,
        output: &mut DeviceBuffer<D::Output>,
        dist: D,
    ) -> Result<()>
    where
        D: PairedSample + Send + Sync + 'static,
        D::Output: Pod + Send + Sync,
    {
        self.init()?;

        let states = self.pool.states();
        let data = output.shared();
        debug!(count = output.len(), "generate (paired-input)");
        self.stream.submit(move || {
            let mut states = states.lock();
            let mut data = data.lock();
            dispatch::fill_paired::<E, D>(&mut states, &mut data, &dist);
        })
    }

    /// Fill `output` with uniform samples: the open interval (0, 1) for
    /// `f64` (`f32` narrowing can round up to 1.0), raw engine range for
    /// `u32`.
    pub fn generate_uniform<T>(&mut self, output: &mut DeviceBuffer<T>) -> Result<()>
    where
        Uniform<T>: SingleSample<Output = T> + Send + Sync + 'static,
        T: Pod + Send + Sync,
    {
        self.generate_with(output, Uniform::<T>::new())
    }

    /// Fill `output` with normal samples of the given standard deviation
    /// and mean.
    pub fn generate_normal<T>(
        &mut self,
        output: &mut DeviceBuffer<T>,
        stddev: T,
        mean: T,
    ) -> Result<()>
    where
        Normal<T>: PairedSample<Output = T> + Send + Sync + 'static,
        T: Pod + Send + Sync,
    {
        self.generate_paired_with(output, Normal::new(mean, stddev))
    }

    /// Fill `output` with log-normal samples parameterized by the
    /// underlying normal's standard deviation and mean.
    pub fn generate_log_normal<T>(
        &mut self,
        output: &mut DeviceBuffer<T>,
        stddev: T,
        mean: T,
    ) -> Result<()>
    where
        LogNormal<T>: PairedSample<Output = T> + Send + Sync + 'static,
        T: Pod + Send + Sync,
    {
        self.generate_paired_with(output, LogNormal::new(mean, stddev))
    }

    /// Fill `output` with Poisson samples of rate `lambda`.
    ///
    /// The sampler is cached: consecutive calls with the same lambda reuse
    /// the previously built one. An invalid lambda fails the call without
    /// touching the cache or the pool.
    pub fn generate_poisson(&mut self, output: &mut DeviceBuffer<u32>, lambda: f64) -> Result<()> {
        let dist = self.poisson.get_or_build(lambda)?;
        self.generate_with(output, dist)
    }
}
