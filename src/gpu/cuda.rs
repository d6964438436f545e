//! CUDA implementation of the engine-pool generator.

use std::sync::Arc;

use cudarc::driver::{CudaContext, CudaFunction, CudaSlice, CudaStream, PushKernelArg};
use cudarc::nvrtc::compile_ptx;

use super::MRG32K3A_KERNEL_SOURCE;
use crate::generator::DEFAULT_SEED;
use crate::launch::LaunchShape;
use crate::{Error, Result};

const STATE_WORDS: usize = 6;

/// MRG32k3a generator backed by a real CUDA device.
///
/// Mirrors [`Generator`](crate::Generator): one engine per worker, lazy
/// initialization, raw streams that match the host backend bit-for-bit
/// for equal seed and offset. The Poisson sampler stays host-only; copy
/// uniforms back and invert on the CPU if you need it.
pub struct CudaGenerator {
    context: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    init_fn: CudaFunction,
    generate_fn: CudaFunction,
    uniform_fn: CudaFunction,
    normal_fn: CudaFunction,
    engines: CudaSlice<u64>,
    shape: LaunchShape,
    seed: u64,
    offset: u64,
    initialized: bool,
}

impl CudaGenerator {
    /// Create a generator on the given device with the default seed.
    pub fn new(device_ordinal: usize) -> Result<Self> {
        Self::with_seed(device_ordinal, DEFAULT_SEED)
    }

    /// Create a generator on the given device with a specific seed.
    ///
    /// Seed zero is remapped to the default seed, matching the host
    /// backend.
    pub fn with_seed(device_ordinal: usize, seed: u64) -> Result<Self> {
        let context = CudaContext::new(device_ordinal)
            .map_err(|e| Error::LaunchFailed(e.to_string()))?;

        let stream = context.default_stream();

        let ptx = compile_ptx(MRG32K3A_KERNEL_SOURCE)
            .map_err(|e| Error::LaunchFailed(e.to_string()))?;

        let module = context
            .load_module(ptx)
            .map_err(|e| Error::LaunchFailed(e.to_string()))?;

        let init_fn = module
            .load_function("mrg_init_engines")
            .map_err(|e| Error::LaunchFailed(e.to_string()))?;

        let generate_fn = module
            .load_function("mrg_generate")
            .map_err(|e| Error::LaunchFailed(e.to_string()))?;

        let uniform_fn = module
            .load_function("mrg_generate_uniform")
            .map_err(|e| Error::LaunchFailed(e.to_string()))?;

        let normal_fn = module
            .load_function("mrg_generate_normal")
            .map_err(|e| Error::LaunchFailed(e.to_string()))?;

        let shape = LaunchShape::CUDA;
        let engines = stream
            .alloc_zeros::<u64>(shape.workers() * STATE_WORDS)
            .map_err(|e| Error::AllocationFailed(e.to_string()))?;

        let seed = if seed == 0 { DEFAULT_SEED } else { seed };

        Ok(Self {
            context,
            stream,
            init_fn,
            generate_fn,
            uniform_fn,
            normal_fn,
            engines,
            shape,
            seed,
            offset: 0,
            initialized: false,
        })
    }

    /// Number of engines in the pool, which is also the write stride.
    pub fn capacity(&self) -> usize {
        self.shape.workers()
    }

    /// Replace the seed. Takes effect on the next generation call.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = if seed == 0 { DEFAULT_SEED } else { seed };
        self.initialized = false;
    }

    /// Replace the sequence offset. Takes effect on the next generation
    /// call.
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
        self.initialized = false;
    }

    /// Discard all engine state. The next generation call reseeds the
    /// pool from the current seed and offset.
    pub fn reset(&mut self) {
        self.initialized = false;
    }

    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        tracing::debug!(
            seed = self.seed,
            offset = self.offset,
            capacity = self.capacity(),
            "seeding CUDA engine pool"
        );

        let cfg = self.launch_config();

        // SAFETY: Kernel arguments match the compiled PTX signature. The
        // launch covers exactly the pool capacity, one engine per thread.
        unsafe {
            self.stream
                .launch_builder(&self.init_fn)
                .arg(&mut self.engines)
                .arg(&self.seed)
                .arg(&self.offset)
                .launch(cfg)
                .map_err(|e| Error::LaunchFailed(e.to_string()))?;
        }

        self.initialized = true;
        Ok(())
    }

    fn launch_config(&self) -> cudarc::driver::LaunchConfig {
        cudarc::driver::LaunchConfig {
            grid_dim: (self.shape.blocks, 1, 1),
            block_dim: (self.shape.threads, 1, 1),
            shared_mem_bytes: 0,
        }
    }

    /// Fill a device buffer with raw 32-bit engine output.
    pub fn fill_raw(&mut self, output: &mut CudaSlice<u32>) -> Result<()> {
        self.init()?;
        let n = output.len() as u64;

        let cfg = self.launch_config();

        // SAFETY: Kernel arguments match the compiled PTX signature. Device
        // pointers are valid and allocated with sufficient size.
        unsafe {
            self.stream
                .launch_builder(&self.generate_fn)
                .arg(&mut self.engines)
                .arg(output)
                .arg(&n)
                .launch(cfg)
                .map_err(|e| Error::LaunchFailed(e.to_string()))?;
        }

        Ok(())
    }

    /// Fill a device buffer with uniform floats in `(0, 1]`.
    pub fn fill_uniform(&mut self, output: &mut CudaSlice<f32>) -> Result<()> {
        self.init()?;
        let n = output.len() as u64;

        let cfg = self.launch_config();

        // SAFETY: Kernel arguments match the compiled PTX signature. Device
        // pointers are valid and allocated with sufficient size.
        unsafe {
            self.stream
                .launch_builder(&self.uniform_fn)
                .arg(&mut self.engines)
                .arg(output)
                .arg(&n)
                .launch(cfg)
                .map_err(|e| Error::LaunchFailed(e.to_string()))?;
        }

        Ok(())
    }

    /// Fill a device buffer with normal floats via Box-Muller pairs.
    pub fn fill_normal(
        &mut self,
        output: &mut CudaSlice<f32>,
        stddev: f32,
        mean: f32,
    ) -> Result<()> {
        self.fill_gaussian(output, mean, stddev, 0)
    }

    /// Fill a device buffer with log-normal floats.
    pub fn fill_log_normal(
        &mut self,
        output: &mut CudaSlice<f32>,
        stddev: f32,
        mean: f32,
    ) -> Result<()> {
        self.fill_gaussian(output, mean, stddev, 1)
    }

    fn fill_gaussian(
        &mut self,
        output: &mut CudaSlice<f32>,
        mean: f32,
        stddev: f32,
        log_space: i32,
    ) -> Result<()> {
        self.init()?;
        let n = output.len() as u64;

        let cfg = self.launch_config();

        // SAFETY: Kernel arguments match the compiled PTX signature. Device
        // pointers are valid and allocated with sufficient size.
        unsafe {
            self.stream
                .launch_builder(&self.normal_fn)
                .arg(&mut self.engines)
                .arg(output)
                .arg(&n)
                .arg(&mean)
                .arg(&stddev)
                .arg(&log_space)
                .launch(cfg)
                .map_err(|e| Error::LaunchFailed(e.to_string()))?;
        }

        Ok(())
    }

    /// Generate raw engine output and copy it to the host.
    pub fn generate(&mut self, n: usize) -> Result<Vec<u32>> {
        let mut output = self
            .stream
            .alloc_zeros::<u32>(n)
            .map_err(|e| Error::AllocationFailed(e.to_string()))?;

        self.fill_raw(&mut output)?;

        let mut host = vec![0u32; n];
        self.stream
            .memcpy_dtoh(&output, &mut host)
            .map_err(|e| Error::LaunchFailed(e.to_string()))?;

        Ok(host)
    }

    /// Generate uniform floats in `(0, 1]` and copy them to the host.
    pub fn generate_uniform(&mut self, n: usize) -> Result<Vec<f32>> {
        let mut output = self
            .stream
            .alloc_zeros::<f32>(n)
            .map_err(|e| Error::AllocationFailed(e.to_string()))?;

        self.fill_uniform(&mut output)?;

        let mut host = vec![0.0f32; n];
        self.stream
            .memcpy_dtoh(&output, &mut host)
            .map_err(|e| Error::LaunchFailed(e.to_string()))?;

        Ok(host)
    }

    /// Generate normal floats and copy them to the host.
    pub fn generate_normal(&mut self, n: usize, stddev: f32, mean: f32) -> Result<Vec<f32>> {
        let mut output = self
            .stream
            .alloc_zeros::<f32>(n)
            .map_err(|e| Error::AllocationFailed(e.to_string()))?;

        self.fill_normal(&mut output, stddev, mean)?;

        let mut host = vec![0.0f32; n];
        self.stream
            .memcpy_dtoh(&output, &mut host)
            .map_err(|e| Error::LaunchFailed(e.to_string()))?;

        Ok(host)
    }

    /// Block until all submitted work has finished.
    pub fn synchronize(&self) -> Result<()> {
        self.context
            .synchronize()
            .map_err(|e| Error::LaunchFailed(e.to_string()))
    }

    /// Get the underlying context.
    pub fn context(&self) -> &Arc<CudaContext> {
        &self.context
    }

    /// Get the stream.
    pub fn stream(&self) -> &Arc<CudaStream> {
        &self.stream
    }
}

/// Check if a CUDA device is available.
pub fn is_cuda_available() -> bool {
    std::panic::catch_unwind(|| {
        cudarc::driver::CudaContext::device_count()
            .map(|c| c > 0)
            .unwrap_or(false)
    })
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Generator, LaunchShape};

    fn skip_if_no_cuda() -> bool {
        if !is_cuda_available() {
            println!("Skipping test: CUDA not available");
            return true;
        }
        false
    }

    #[test]
    fn cuda_uniform_in_range() {
        if skip_if_no_cuda() {
            return;
        }

        let mut rng = CudaGenerator::new(0).unwrap();
        let samples = rng.generate_uniform(10000).unwrap();
        rng.synchronize().unwrap();

        for &x in &samples {
            assert!(x > 0.0 && x <= 1.0, "uniform sample {} out of range", x);
        }

        let mean: f32 = samples.iter().sum::<f32>() / samples.len() as f32;
        assert!((mean - 0.5).abs() < 0.05, "uniform mean {} far from 0.5", mean);
    }

    #[test]
    fn cuda_normal_moments() {
        if skip_if_no_cuda() {
            return;
        }

        let mut rng = CudaGenerator::new(0).unwrap();
        let samples = rng.generate_normal(10001, 1.0, 0.0).unwrap();
        rng.synchronize().unwrap();

        let mean: f32 = samples.iter().sum::<f32>() / samples.len() as f32;
        assert!(mean.abs() < 0.1, "normal mean {} far from 0", mean);

        let variance: f32 =
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / samples.len() as f32;
        let std = variance.sqrt();
        assert!((std - 1.0).abs() < 0.1, "normal std {} far from 1", std);
    }

    #[test]
    fn cuda_matches_host_raw() {
        if skip_if_no_cuda() {
            return;
        }

        let mut gpu = CudaGenerator::with_seed(0, 777).unwrap();
        let device = gpu.generate(4096).unwrap();
        gpu.synchronize().unwrap();

        let stream = crate::DeviceStream::new().unwrap();
        let mut host_rng =
            Generator::with_shape(777, 0, stream.clone(), LaunchShape::CUDA).unwrap();
        let mut buf = crate::DeviceBuffer::<u32>::alloc(4096).unwrap();
        host_rng.generate(&mut buf).unwrap();
        let host = buf.to_host(&stream).unwrap();

        assert_eq!(device, host);
    }

    #[test]
    fn cuda_seed_zero_maps_to_default() {
        if skip_if_no_cuda() {
            return;
        }

        let mut zero = CudaGenerator::with_seed(0, 0).unwrap();
        let mut default = CudaGenerator::with_seed(0, DEFAULT_SEED).unwrap();

        assert_eq!(
            zero.generate(256).unwrap(),
            default.generate(256).unwrap()
        );
    }
}
