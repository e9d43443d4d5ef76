//! Second-order carrier tracking loop.
//!
//! [`ControlLoop`] holds everything the receiver knows about the carrier:
//! the phase and frequency estimates, the frequency search bounds, and the
//! proportional (`alpha`) and integral (`beta`) gains along with the loop
//! bandwidth and damping factor they are derived from.

use crate::receiver::ReceiverError;
use crate::util::math::{branchless_clip, wrap_phase};
use log::{debug, trace, warn};
use serde::Serialize;
use std::f64::consts::FRAC_1_SQRT_2;

/// Damping factor of a critically damped loop.
pub const DEFAULT_DAMPING: f64 = FRAC_1_SQRT_2;

/// Phase and frequency state of a second-order PLL along with its tuning.
///
/// # Examples
///
/// ```
/// use costas_rs::receiver::control_loop::ControlLoop;
///
/// let mut cl = ControlLoop::new(0.05, -0.5, 0.5).unwrap();
/// cl.advance_loop(0.1);
/// assert!(cl.frequency() > 0.0);
/// assert!(cl.set_damping_factor(1.5).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ControlLoop {
    phase: f64,
    freq: f64,
    min_freq: f64,
    max_freq: f64,
    loop_bw: f64,
    damping: f64,
    alpha: f64,
    beta: f64,
}

impl ControlLoop {
    /// Creates a new `ControlLoop` with zero phase and frequency and a
    /// critically damped response.
    ///
    /// # Arguments
    ///
    /// * `loop_bw` - Normalized loop bandwidth, must be >= 0.
    /// * `min_freq` - Lower frequency bound in radians per sample.
    /// * `max_freq` - Upper frequency bound in radians per sample.
    pub fn new(loop_bw: f64, min_freq: f64, max_freq: f64) -> Result<ControlLoop, ReceiverError> {
        if !min_freq.is_finite() || !max_freq.is_finite() || min_freq > max_freq {
            return Err(ReceiverError::InvalidFrequencyRange {
                min: min_freq,
                max: max_freq,
            });
        }
        let mut cl = ControlLoop {
            phase: 0.0,
            freq: 0.0,
            min_freq,
            max_freq,
            loop_bw: 0.0,
            damping: DEFAULT_DAMPING,
            alpha: 0.0,
            beta: 0.0,
        };
        cl.set_loop_bandwidth(loop_bw)?;
        Ok(cl)
    }

    /// Re-derives `alpha` and `beta` from the bandwidth and damping factor.
    pub(crate) fn update_gains(&mut self) {
        let denom = 1.0 + 2.0 * self.damping * self.loop_bw + self.loop_bw * self.loop_bw;
        self.alpha = (4.0 * self.damping * self.loop_bw) / denom;
        self.beta = (4.0 * self.loop_bw * self.loop_bw) / denom;
        debug!(
            "loop gains updated: bw {} damping {} -> alpha {} beta {}",
            self.loop_bw, self.damping, self.alpha, self.beta
        );
    }

    /// Feeds one phase error sample through the loop.
    ///
    /// The frequency integrator is updated first and the phase then moves by
    /// the new frequency plus the proportional term. A non-finite error
    /// leaves the loop untouched.
    pub fn advance_loop(&mut self, error: f64) {
        if !error.is_finite() {
            debug!("skipping non-finite phase error {}", error);
            return;
        }
        self.freq += self.beta * error;
        self.phase += self.freq + self.alpha * error;
        self.phase = wrap_phase(self.phase);

        // Only max_freq bounds the tracked frequency, symmetrically about
        // zero. min_freq is consulted by set_frequency alone.
        self.freq = branchless_clip(self.freq, self.max_freq.abs());

        trace!("phase error: {} phase: {} freq: {}", error, self.phase, self.freq);
    }

    /// Returns phase and frequency to zero, keeping the tuning and bounds.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.freq = 0.0;
    }

    pub fn set_loop_bandwidth(&mut self, bw: f64) -> Result<(), ReceiverError> {
        if !(bw >= 0.0) {
            return Err(ReceiverError::InvalidLoopBandwidth(bw));
        }
        self.loop_bw = bw;
        self.update_gains();
        Ok(())
    }

    pub fn set_damping_factor(&mut self, df: f64) -> Result<(), ReceiverError> {
        if !(0.0..=1.0).contains(&df) {
            return Err(ReceiverError::InvalidDampingFactor(df));
        }
        self.damping = df;
        self.update_gains();
        Ok(())
    }

    /// Overrides the proportional gain. It stays in effect until the
    /// bandwidth or damping factor changes.
    pub fn set_alpha(&mut self, alpha: f64) -> Result<(), ReceiverError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(ReceiverError::InvalidAlpha(alpha));
        }
        debug!("alpha overridden: {}", alpha);
        self.alpha = alpha;
        Ok(())
    }

    /// Overrides the integral gain. It stays in effect until the bandwidth
    /// or damping factor changes.
    pub fn set_beta(&mut self, beta: f64) -> Result<(), ReceiverError> {
        if !(0.0..=1.0).contains(&beta) {
            return Err(ReceiverError::InvalidBeta(beta));
        }
        debug!("beta overridden: {}", beta);
        self.beta = beta;
        Ok(())
    }

    /// Sets the frequency estimate. A value past one bound lands on the
    /// other bound so a frequency sweep wraps around the search range.
    pub fn set_frequency(&mut self, freq: f64) {
        if !freq.is_finite() {
            warn!("ignoring non-finite frequency {}", freq);
            return;
        }
        self.freq = if freq > self.max_freq {
            self.min_freq
        } else if freq < self.min_freq {
            self.max_freq
        } else {
            freq
        };
    }

    /// Sets the phase estimate, wrapped into (-2π, 2π].
    pub fn set_phase(&mut self, phase: f64) {
        if !phase.is_finite() {
            warn!("ignoring non-finite phase {}", phase);
            return;
        }
        self.phase = wrap_phase(phase);
    }

    pub fn loop_bandwidth(&self) -> f64 {
        self.loop_bw
    }

    pub fn damping_factor(&self) -> f64 {
        self.damping
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn frequency(&self) -> f64 {
        self.freq
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn min_frequency(&self) -> f64 {
        self.min_freq
    }

    pub fn max_frequency(&self) -> f64 {
        self.max_freq
    }
}
