//! M-ary phase shift keying constellations.

use crate::constellation::{phase_error, Constellation, ConstellationError};
use num::Complex;
use std::f64::consts::PI;

/// Unit-circle PSK constellation with `m` points.
///
/// Point `k` sits at angle `2 * PI * k / m + rotation`. Decisions are made
/// by angular sector, so the cost is independent of the constellation size.
///
/// # Examples
///
/// ```
/// use costas_rs::constellation::{Constellation, PskConstellation};
/// use num::Complex;
///
/// let qpsk = PskConstellation::qpsk();
/// let (sym, err) = qpsk.decide(&Complex::new(-0.7, 0.7));
/// assert_eq!(sym, 1);
/// assert!(err.abs() < 0.01);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PskConstellation {
    points: Vec<Complex<f64>>,
    rotation: f64,
}

impl PskConstellation {
    /// Creates a new `PskConstellation`.
    ///
    /// # Arguments
    ///
    /// * `m` - Number of points; must be a power of two in [2, 256].
    /// * `rotation` - Angle of point 0 in radians.
    pub fn new(m: usize, rotation: f64) -> Result<Self, ConstellationError> {
        if m < 2 || m > 256 || !m.is_power_of_two() {
            return Err(ConstellationError::InvalidArity(m));
        }
        Ok(PskConstellation::fixed(m, rotation))
    }

    /// Antipodal BPSK on the real axis.
    pub fn bpsk() -> Self {
        PskConstellation::fixed(2, 0.0)
    }

    /// QPSK with the points on the diagonals.
    pub fn qpsk() -> Self {
        PskConstellation::fixed(4, PI / 4.0)
    }

    /// 8-PSK with point 0 on the positive real axis.
    pub fn psk8() -> Self {
        PskConstellation::fixed(8, 0.0)
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    fn fixed(m: usize, rotation: f64) -> Self {
        let points = (0..m)
            .map(|k| Complex::from_polar(1.0, 2.0 * PI * k as f64 / m as f64 + rotation))
            .collect();
        PskConstellation { points, rotation }
    }
}

impl Constellation for PskConstellation {
    fn points(&self) -> &[Complex<f64>] {
        &self.points
    }

    fn decide(&self, sample: &Complex<f64>) -> (u32, f64) {
        let m = self.points.len() as i64;
        let sector = 2.0 * PI / m as f64;
        let offset = ((sample.arg() - self.rotation) / sector).round() as i64;
        let sym = offset.rem_euclid(m) as usize;
        (sym as u32, phase_error(sample, &self.points[sym]))
    }
}
