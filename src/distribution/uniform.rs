//! Uniform scaling of raw MRG32k3a output.

use std::marker::PhantomData;

use crate::engine::MRG_M1;

use super::SingleSample;

/// 1 / (m1 + 1): maps raw output into the open unit interval.
const MRG_NORM: f64 = 1.0 / ((MRG_M1 + 1) as f64);

/// Raw values are in [0, m1); adding one before scaling keeps the result
/// strictly above zero, so downstream log() calls are always finite.
#[inline]
pub(crate) fn raw_to_open01_f64(raw: u32) -> f64 {
    (raw as f64 + 1.0) * MRG_NORM
}

#[inline]
pub(crate) fn raw_to_open01_f32(raw: u32) -> f32 {
    raw_to_open01_f64(raw) as f32
}

/// Uniform distribution over the unit interval (or raw passthrough for
/// `u32`).
///
/// `Uniform<f64>` scales into the open interval (0, 1). `Uniform<f32>`
/// computes the same value and narrows it, which can round the largest
/// outputs up to exactly 1.0. `Uniform<u32>` yields the raw engine output
/// in [0, m1).
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniform<T> {
    _marker: PhantomData<T>,
}

impl<T> Uniform<T> {
    /// Create the uniform transform for the output type `T`.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl SingleSample for Uniform<f32> {
    type Output = f32;

    #[inline]
    fn sample(&self, raw: u32) -> f32 {
        raw_to_open01_f32(raw)
    }
}

impl SingleSample for Uniform<f64> {
    type Output = f64;

    #[inline]
    fn sample(&self, raw: u32) -> f64 {
        raw_to_open01_f64(raw)
    }
}

impl SingleSample for Uniform<u32> {
    type Output = u32;

    #[inline]
    fn sample(&self, raw: u32) -> u32 {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Mrg32k3a, ParallelEngine};

    #[test]
    fn f64_in_open_unit_interval() {
        let dist = Uniform::<f64>::new();
        let mut state = Mrg32k3a::seed(42, 0, 0);
        for _ in 0..10_000 {
            let u = dist.sample(Mrg32k3a::next(&mut state));
            assert!(u > 0.0 && u < 1.0, "uniform sample {u} out of range");
        }
    }

    #[test]
    fn f32_positive_and_bounded() {
        let dist = Uniform::<f32>::new();
        let mut state = Mrg32k3a::seed(42, 1, 0);
        for _ in 0..10_000 {
            let u = dist.sample(Mrg32k3a::next(&mut state));
            assert!(u > 0.0 && u <= 1.0, "uniform sample {u} out of range");
        }
    }

    #[test]
    fn mean_near_half() {
        let dist = Uniform::<f64>::new();
        let mut state = Mrg32k3a::seed(99, 0, 0);
        let n = 100_000;
        let sum: f64 = (0..n).map(|_| dist.sample(Mrg32k3a::next(&mut state))).sum();
        let mean = sum / n as f64;
        assert!((mean - 0.5).abs() < 0.01, "mean {mean} far from 0.5");
    }

    #[test]
    fn extremes_map_inside() {
        assert!(raw_to_open01_f64(0) > 0.0);
        assert!(raw_to_open01_f64((MRG_M1 - 1) as u32) < 1.0);
    }
}
