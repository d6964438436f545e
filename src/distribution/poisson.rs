//! Poisson transform with a lambda-keyed sampler cache.
//!
//! Building a Poisson sampler is asymptotically costlier than sampling from
//! it (the cumulative table covers the whole usable mass of the
//! distribution), and batch workloads overwhelmingly repeat the same rate
//! parameter. [`PoissonCache`] keeps the last-built sampler and rebuilds
//! only when lambda changes.

use std::sync::Arc;

use crate::{Error, Result};

use super::{raw_to_open01_f64, SingleSample};

/// Above this rate the cumulative table would keep growing linearly with
/// lambda; the sampler switches to a rounded inverse-CDF normal
/// approximation instead.
const TABLE_LAMBDA_MAX: f64 = 512.0;

/// Tail mass left uncovered by the cumulative table.
const TABLE_TAIL_EPS: f64 = 1e-12;

/// Hard ceiling on table entries. At the largest table lambda the mass
/// beyond this k is already far below [`TABLE_TAIL_EPS`], so the cap only
/// stops the loop when summation rounding stalls short of the threshold.
const TABLE_LEN_MAX: usize = 4096;

#[derive(Debug)]
enum Sampler {
    /// Inverted cumulative table: `cdf[k] = P(X <= k)`.
    Table { cdf: Vec<f64> },
    /// Rounded normal approximation for large lambda.
    NormalApprox { lambda: f64, sd: f64 },
}

/// Poisson sampler, cheap to clone (the built table is shared).
///
/// Consumes one raw value per produced sample.
#[derive(Debug, Clone)]
pub struct Poisson {
    inner: Arc<Sampler>,
}

impl Poisson {
    /// Build a sampler for the given rate.
    ///
    /// Fails with [`Error::InvalidParameter`] when lambda is not finite or
    /// not strictly positive.
    pub fn build(lambda: f64) -> Result<Self> {
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "poisson lambda must be positive and finite, got {lambda}"
            )));
        }

        let inner = if lambda <= TABLE_LAMBDA_MAX {
            Sampler::Table {
                cdf: build_cdf(lambda),
            }
        } else {
            Sampler::NormalApprox {
                lambda,
                sd: lambda.sqrt(),
            }
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }
}

impl SingleSample for Poisson {
    type Output = u32;

    #[inline]
    fn sample(&self, raw: u32) -> u32 {
        let u = raw_to_open01_f64(raw);
        match &*self.inner {
            Sampler::Table { cdf } => {
                let k = cdf.partition_point(|&c| c < u);
                k.min(cdf.len() - 1) as u32
            }
            Sampler::NormalApprox { lambda, sd } => {
                let k = (lambda + sd * inverse_normal_cdf(u)).round();
                if k < 0.0 {
                    0
                } else {
                    k as u32
                }
            }
        }
    }
}

fn build_cdf(lambda: f64) -> Vec<f64> {
    // Recurrence p_{k+1} = p_k * lambda / (k + 1), accumulated until the
    // remaining tail is negligible. For lambda <= TABLE_LAMBDA_MAX the
    // starting term e^-lambda is well above the f64 underflow threshold.
    let mut cdf = Vec::new();
    let mut p = (-lambda).exp();
    let mut cum = p;
    cdf.push(cum);
    let mut k = 1.0f64;
    while cum < 1.0 - TABLE_TAIL_EPS && cdf.len() < TABLE_LEN_MAX {
        p *= lambda / k;
        cum += p;
        cdf.push(cum);
        k += 1.0;
    }
    cdf
}

/// Beasley-Springer-Moro approximation of the standard normal quantile.
fn inverse_normal_cdf(u: f64) -> f64 {
    const A: [f64; 4] = [
        2.506_628_238_84,
        -18.615_000_625_29,
        41.391_197_735_34,
        -25.441_060_496_37,
    ];
    const B: [f64; 4] = [
        -8.473_510_930_90,
        23.083_367_437_43,
        -21.062_241_018_26,
        3.130_829_098_33,
    ];
    const C: [f64; 9] = [
        0.337_475_482_272_614_7,
        0.976_169_019_091_718_6,
        0.160_797_971_491_820_9,
        0.027_643_881_033_386_3,
        0.003_840_572_937_360_9,
        0.000_395_189_651_191_9,
        0.000_032_176_788_176_8,
        0.000_000_288_816_736_4,
        0.000_000_396_031_518_7,
    ];

    let y = u - 0.5;
    if y.abs() < 0.42 {
        let r = y * y;
        let num = y * (((A[3] * r + A[2]) * r + A[1]) * r + A[0]);
        let den = (((B[3] * r + B[2]) * r + B[1]) * r + B[0]) * r + 1.0;
        num / den
    } else {
        let r = if y > 0.0 { 1.0 - u } else { u };
        let r = (-r.ln()).ln();
        let mut x = C[8];
        for &c in C[..8].iter().rev() {
            x = x * r + c;
        }
        if y < 0.0 {
            -x
        } else {
            x
        }
    }
}

/// Cache for the last-built Poisson sampler, keyed by lambda.
///
/// Lives as long as its owning generator. A failed build leaves the
/// previous entry untouched, so a prior valid sampler stays usable after an
/// invalid call.
#[derive(Debug, Default)]
pub struct PoissonCache {
    entry: Option<(f64, Poisson)>,
}

impl PoissonCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached sampler for `lambda`, building one if the rate
    /// changed since the last call.
    pub fn get_or_build(&mut self, lambda: f64) -> Result<Poisson> {
        self.get_or_build_with(lambda, Poisson::build)
    }

    fn get_or_build_with(
        &mut self,
        lambda: f64,
        build: impl FnOnce(f64) -> Result<Poisson>,
    ) -> Result<Poisson> {
        if let Some((cached, dist)) = &self.entry {
            if *cached == lambda {
                return Ok(dist.clone());
            }
        }
        let dist = build(lambda)?;
        self.entry = Some((lambda, dist.clone()));
        Ok(dist)
    }
}
