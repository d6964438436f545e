//! Transforms from raw engine output to typed samples.
//!
//! Two transform arities share the dispatch machinery: [`SingleSample`]
//! consumes one raw value per produced sample, [`PairedSample`] consumes two
//! raw values and produces a packed pair. The dispatcher is generic over the
//! transform, so adding a distribution never duplicates the
//! load-engine/advance/store-back sequence.

mod normal;
mod poisson;
mod uniform;

pub use normal::{LogNormal, Normal};
pub use poisson::{Poisson, PoissonCache};
pub use uniform::Uniform;

pub(crate) use uniform::{raw_to_open01_f32, raw_to_open01_f64};

/// One raw value in, one typed sample out.
pub trait SingleSample {
    /// Produced sample type.
    type Output;

    /// Transform one raw engine output into a sample.
    fn sample(&self, raw: u32) -> Self::Output;
}

/// Two raw values in, a packed pair of samples out.
///
/// Used by the normal and log-normal kinds, which produce two variates per
/// Box-Muller evaluation.
pub trait PairedSample {
    /// Produced sample type (each component of the pair).
    type Output;

    /// Transform two raw engine outputs into a pair of samples.
    fn sample_pair(&self, raw_a: u32, raw_b: u32) -> (Self::Output, Self::Output);
}

/// Raw passthrough: the engine's 32-bit output, untransformed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl SingleSample for Identity {
    type Output = u32;

    #[inline]
    fn sample(&self, raw: u32) -> u32 {
        raw
    }
}
