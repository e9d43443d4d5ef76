//! Constellations and the hard-decision oracle used by the receiver.
//!
//! A receiver only needs two things from a constellation: how many complex
//! samples make up one symbol, and a way to turn a sample into a symbol
//! index plus an estimate of how far the sample is rotated from that
//! symbol. Both are captured by the [`Constellation`] trait, so any geometry
//! can be dropped into the receiver.

pub mod arbitrary;
pub mod psk;

pub use self::arbitrary::ArbitraryConstellation;
pub use self::psk::PskConstellation;

use num::Complex;
use thiserror::Error;

/// Errors raised while building a constellation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConstellationError {
    #[error("constellation has no points")]
    Empty,
    #[error("PSK order {0} is not a power of two in [2, 256]")]
    InvalidArity(usize),
    #[error("{points} points can't be split into symbols of dimension {dimensionality}")]
    InvalidDimensionality { points: usize, dimensionality: usize },
    #[error("constellation has {0} points, symbol indices are limited to u32")]
    TooManyPoints(usize),
}

/// Hard-decision oracle over a set of constellation points.
pub trait Constellation: Send {
    /// Number of complex samples that make up one symbol.
    fn dimensionality(&self) -> usize {
        1
    }

    /// The reference points, indexed by symbol value.
    fn points(&self) -> &[Complex<f64>];

    /// Number of symbols in the constellation.
    fn arity(&self) -> usize {
        self.points().len()
    }

    /// Decides the symbol nearest to `sample`.
    ///
    /// Returns the symbol index together with the phase error
    /// `arg(sample * conj(point))`: positive when the sample leads the
    /// decided point.
    fn decide(&self, sample: &Complex<f64>) -> (u32, f64);
}

impl<C: Constellation + ?Sized> Constellation for Box<C> {
    fn dimensionality(&self) -> usize {
        (**self).dimensionality()
    }

    fn points(&self) -> &[Complex<f64>] {
        (**self).points()
    }

    fn arity(&self) -> usize {
        (**self).arity()
    }

    fn decide(&self, sample: &Complex<f64>) -> (u32, f64) {
        (**self).decide(sample)
    }
}

/// Phase by which `sample` leads `point`.
pub(crate) fn phase_error(sample: &Complex<f64>, point: &Complex<f64>) -> f64 {
    (sample * point.conj()).arg()
}
