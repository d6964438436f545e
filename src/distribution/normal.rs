//! Normal and log-normal transforms (Box-Muller, paired output).

use super::{raw_to_open01_f32, raw_to_open01_f64, PairedSample};

#[inline]
fn box_muller_f32(u1: f32, u2: f32) -> (f32, f32) {
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * std::f32::consts::PI * u2;
    (r * theta.cos(), r * theta.sin())
}

#[inline]
fn box_muller_f64(u1: f64, u2: f64) -> (f64, f64) {
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * std::f64::consts::PI * u2;
    (r * theta.cos(), r * theta.sin())
}

/// Normal distribution with the given mean and standard deviation.
///
/// Consumes two raw values per Box-Muller evaluation and produces both
/// variates, so the dispatcher packs two samples per paired slot.
#[derive(Debug, Clone, Copy)]
pub struct Normal<T> {
    /// Distribution mean.
    pub mean: T,
    /// Distribution standard deviation.
    pub stddev: T,
}

impl<T> Normal<T> {
    /// Create a normal transform.
    pub fn new(mean: T, stddev: T) -> Self {
        Self { mean, stddev }
    }
}

impl PairedSample for Normal<f32> {
    type Output = f32;

    #[inline]
    fn sample_pair(&self, raw_a: u32, raw_b: u32) -> (f32, f32) {
        let (z1, z2) = box_muller_f32(raw_to_open01_f32(raw_a), raw_to_open01_f32(raw_b));
        (
            self.mean + z1 * self.stddev,
            self.mean + z2 * self.stddev,
        )
    }
}

impl PairedSample for Normal<f64> {
    type Output = f64;

    #[inline]
    fn sample_pair(&self, raw_a: u32, raw_b: u32) -> (f64, f64) {
        let (z1, z2) = box_muller_f64(raw_to_open01_f64(raw_a), raw_to_open01_f64(raw_b));
        (
            self.mean + z1 * self.stddev,
            self.mean + z2 * self.stddev,
        )
    }
}

/// Log-normal distribution: exp of a normal variate with the given
/// (log-space) mean and standard deviation.
#[derive(Debug, Clone, Copy)]
pub struct LogNormal<T> {
    /// Mean of the underlying normal.
    pub mean: T,
    /// Standard deviation of the underlying normal.
    pub stddev: T,
}

impl<T> LogNormal<T> {
    /// Create a log-normal transform.
    pub fn new(mean: T, stddev: T) -> Self {
        Self { mean, stddev }
    }
}

impl PairedSample for LogNormal<f32> {
    type Output = f32;

    #[inline]
    fn sample_pair(&self, raw_a: u32, raw_b: u32) -> (f32, f32) {
        let (z1, z2) = box_muller_f32(raw_to_open01_f32(raw_a), raw_to_open01_f32(raw_b));
        (
            (self.mean + z1 * self.stddev).exp(),
            (self.mean + z2 * self.stddev).exp(),
        )
    }
}

impl PairedSample for LogNormal<f64> {
    type Output = f64;

    #[inline]
    fn sample_pair(&self, raw_a: u32, raw_b: u32) -> (f64, f64) {
        let (z1, z2) = box_muller_f64(raw_to_open01_f64(raw_a), raw_to_open01_f64(raw_b));
        (
            (self.mean + z1 * self.stddev).exp(),
            (self.mean + z2 * self.stddev).exp(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Mrg32k3a, ParallelEngine};

    fn normal_samples(n: usize, mean: f64, stddev: f64) -> Vec<f64> {
        let dist = Normal::new(mean, stddev);
        let mut state = Mrg32k3a::seed(1234, 0, 0);
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let (a, b) = dist.sample_pair(
                Mrg32k3a::next(&mut state),
                Mrg32k3a::next(&mut state),
            );
            out.push(a);
            out.push(b);
        }
        out.truncate(n);
        out
    }

    #[test]
    fn standard_normal_moments() {
        let samples = normal_samples(100_000, 0.0, 1.0);
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 0.02, "mean {mean} far from 0");
        assert!((var.sqrt() - 1.0).abs() < 0.02, "std {} far from 1", var.sqrt());
    }

    #[test]
    fn scaled_normal_moments() {
        let samples = normal_samples(100_000, 3.0, 2.0);
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        assert!((mean - 3.0).abs() < 0.05, "mean {mean} far from 3");
        assert!((var.sqrt() - 2.0).abs() < 0.05, "std {} far from 2", var.sqrt());
    }

    #[test]
    fn log_normal_positive() {
        let dist = LogNormal::new(0.0f64, 1.0);
        let mut state = Mrg32k3a::seed(7, 0, 0);
        for _ in 0..5_000 {
            let (a, b) = dist.sample_pair(
                Mrg32k3a::next(&mut state),
                Mrg32k3a::next(&mut state),
            );
            assert!(a > 0.0 && b > 0.0);
        }
    }

    #[test]
    fn log_normal_is_exp_of_normal() {
        let normal = Normal::new(0.5f64, 0.25);
        let log_normal = LogNormal::new(0.5f64, 0.25);
        let (a, b) = normal.sample_pair(123_456_789, 987_654_321);
        let (la, lb) = log_normal.sample_pair(123_456_789, 987_654_321);
        assert!((la - a.exp()).abs() < 1e-12);
        assert!((lb - b.exp()).abs() < 1e-12);
    }
}
