//! Constellations built from an arbitrary list of points.

use crate::constellation::{phase_error, Constellation, ConstellationError};
use num::Complex;

/// A constellation defined only by its points. Decisions are a brute force
/// nearest-point search, which suits QAM and other irregular layouts.
///
/// # Examples
///
/// ```
/// use costas_rs::constellation::{ArbitraryConstellation, Constellation};
/// use num::Complex;
///
/// let points = vec![
///     Complex::new(1.0, 1.0),
///     Complex::new(-1.0, 1.0),
///     Complex::new(-1.0, -1.0),
///     Complex::new(1.0, -1.0),
/// ];
/// let qam = ArbitraryConstellation::new(points).unwrap();
/// assert_eq!(qam.decide(&Complex::new(-0.8, -1.1)).0, 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ArbitraryConstellation {
    points: Vec<Complex<f64>>,
    dimensionality: usize,
}

impl ArbitraryConstellation {
    /// Creates a one-dimensional constellation from `points`.
    pub fn new(points: Vec<Complex<f64>>) -> Result<Self, ConstellationError> {
        ArbitraryConstellation::with_dimensionality(points, 1)
    }

    /// Creates a constellation whose symbols span `dimensionality` complex
    /// samples. The receiver in this crate only accepts dimensionality 1;
    /// higher dimensions are for decoders that gather several samples per
    /// decision.
    pub fn with_dimensionality(
        points: Vec<Complex<f64>>,
        dimensionality: usize,
    ) -> Result<Self, ConstellationError> {
        if points.is_empty() {
            return Err(ConstellationError::Empty);
        }
        if points.len() > u32::MAX as usize {
            return Err(ConstellationError::TooManyPoints(points.len()));
        }
        if dimensionality == 0 || points.len() % dimensionality != 0 {
            return Err(ConstellationError::InvalidDimensionality {
                points: points.len(),
                dimensionality,
            });
        }
        Ok(ArbitraryConstellation {
            points,
            dimensionality,
        })
    }
}

impl Constellation for ArbitraryConstellation {
    fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    fn points(&self) -> &[Complex<f64>] {
        &self.points
    }

    fn decide(&self, sample: &Complex<f64>) -> (u32, f64) {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, point) in self.points.iter().enumerate() {
            let dist = (sample - point).norm_sqr();
            if dist < best_dist {
                best = i;
                best_dist = dist;
            }
        }
        (best as u32, phase_error(sample, &self.points[best]))
    }
}
