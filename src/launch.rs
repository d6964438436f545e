//! Execution-shape policy.
//!
//! Kernels launch with a fixed, architecture-tuned thread/block
//! configuration; the product of the two is the number of logical workers
//! and therefore the engine pool capacity. The shape is a property of the
//! generator, not of any single call: output coverage is handled by the
//! grid-stride loop, so the same shape serves every request size.

/// A fixed thread/block launch configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchShape {
    /// Threads per block.
    pub threads: u32,
    /// Blocks per grid.
    pub blocks: u32,
}

impl LaunchShape {
    /// Tuning for CUDA-class devices: modest block count, 128-wide blocks.
    pub const CUDA: Self = Self::new(128, 128);

    /// Tuning for large-wavefront devices: wide blocks, deep grid.
    pub const WAVEFRONT: Self = Self::new(256, 1024);

    /// Tuning for the host simulator: enough lanes to exercise the
    /// grid-stride schedule without making pool seeding dominate.
    pub const HOST: Self = Self::new(256, 16);

    /// A custom shape.
    pub const fn new(threads: u32, blocks: u32) -> Self {
        Self { threads, blocks }
    }

    /// Total logical workers, covering exactly the pool capacity.
    pub const fn workers(&self) -> usize {
        self.threads as usize * self.blocks as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_counts() {
        assert_eq!(LaunchShape::CUDA.workers(), 16_384);
        assert_eq!(LaunchShape::WAVEFRONT.workers(), 262_144);
        assert_eq!(LaunchShape::HOST.workers(), 4_096);
        assert_eq!(LaunchShape::new(4, 1).workers(), 4);
    }
}
