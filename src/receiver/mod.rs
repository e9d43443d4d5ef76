//! Decision-directed constellation receiver.
//!
//! [`ConstellationReceiver`] takes complex samples that still carry a
//! residual carrier phase and frequency offset, derotates each one by the
//! current phase estimate, decides which constellation symbol it is, and
//! feeds the decision's phase error back into a [`ControlLoop`]. Each
//! decision depends on the state left by the previous one, so samples are
//! processed strictly in order.
//!
//! Batches are handed in by whoever hosts the receiver: the receiver
//! processes as many samples as both the input and the output buffers allow
//! and reports how many that was.

pub mod config;
pub mod control_loop;
pub mod receiver_node;

pub use self::config::LoopConfig;
pub use self::control_loop::ControlLoop;

use crate::constellation::Constellation;
use log::{debug, warn};
use num::Complex;
use thiserror::Error;

/// Errors raised when building or tuning a receiver.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ReceiverError {
    #[error("receiver only works with constellations of dimension 1, got {0}")]
    InvalidDimensionality(usize),
    #[error("invalid loop bandwidth {0}, must be >= 0")]
    InvalidLoopBandwidth(f64),
    #[error("invalid damping factor {0}, must be in [0, 1]")]
    InvalidDampingFactor(f64),
    #[error("invalid alpha {0}, must be in [0, 1]")]
    InvalidAlpha(f64),
    #[error("invalid beta {0}, must be in [0, 1]")]
    InvalidBeta(f64),
    #[error("invalid frequency range [{min}, {max}]")]
    InvalidFrequencyRange { min: f64, max: f64 },
    #[error("receiver supports 1 or 4 output channels, got {0}")]
    InvalidOutputCount(usize),
    #[error("loop configuration error: {0}")]
    Config(String),
}

/// Which outputs a host has wired up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputSignature {
    /// Symbol indices only.
    SymbolsOnly,
    /// Symbol indices plus phase error, phase and frequency.
    WithDiagnostics,
}

impl OutputSignature {
    /// Maps a host's output channel count onto a signature.
    pub fn from_channel_count(count: usize) -> Result<Self, ReceiverError> {
        match count {
            1 => Ok(OutputSignature::SymbolsOnly),
            4 => Ok(OutputSignature::WithDiagnostics),
            n => {
                warn!("rejecting receiver wiring with {} output channels", n);
                Err(ReceiverError::InvalidOutputCount(n))
            }
        }
    }

    pub fn channel_count(self) -> usize {
        match self {
            OutputSignature::SymbolsOnly => 1,
            OutputSignature::WithDiagnostics => 4,
        }
    }
}

/// The three diagnostic streams. They are either all present or all absent.
pub struct DiagnosticOutputs<'a> {
    pub error: &'a mut [f64],
    pub phase: &'a mut [f64],
    pub frequency: &'a mut [f64],
}

/// Output buffers for one call to [`ConstellationReceiver::general_work`].
pub struct WorkOutputs<'a> {
    pub symbols: &'a mut [u32],
    pub diagnostics: Option<DiagnosticOutputs<'a>>,
}

impl<'a> WorkOutputs<'a> {
    pub fn signature(&self) -> OutputSignature {
        match self.diagnostics {
            Some(_) => OutputSignature::WithDiagnostics,
            None => OutputSignature::SymbolsOnly,
        }
    }

    /// Number of output slots usable on every connected stream.
    pub fn capacity(&self) -> usize {
        let symbols = self.symbols.len();
        match self.diagnostics {
            Some(ref diag) => symbols
                .min(diag.error.len())
                .min(diag.phase.len())
                .min(diag.frequency.len()),
            None => symbols,
        }
    }
}

/// Constellation receiver with decision-directed carrier tracking.
///
/// # Examples
///
/// ```
/// use costas_rs::constellation::PskConstellation;
/// use costas_rs::receiver::ConstellationReceiver;
/// use num::Complex;
///
/// let mut rx =
///     ConstellationReceiver::new(PskConstellation::bpsk(), 0.05, -0.5, 0.5)
///         .unwrap();
/// let input = vec![Complex::new(1.0, 0.0), Complex::new(-1.0, 0.0)];
/// let mut symbols = vec![0; 2];
/// assert_eq!(rx.work(&input, &mut symbols), 2);
/// assert_eq!(symbols, vec![0, 1]);
/// ```
pub struct ConstellationReceiver<C: Constellation> {
    constellation: C,
    control: ControlLoop,
}

impl<C: Constellation> ConstellationReceiver<C> {
    /// Creates a new `ConstellationReceiver`.
    ///
    /// # Arguments
    ///
    /// * `constellation` - Decision oracle; must have dimensionality 1.
    /// * `loop_bw` - Normalized loop bandwidth, must be >= 0.
    /// * `fmin` - Lower frequency search bound in radians per sample.
    /// * `fmax` - Upper frequency search bound in radians per sample.
    pub fn new(
        constellation: C,
        loop_bw: f64,
        fmin: f64,
        fmax: f64,
    ) -> Result<Self, ReceiverError> {
        let control = ControlLoop::new(loop_bw, fmin, fmax)?;
        ConstellationReceiver::with_loop(constellation, control)
    }

    /// Creates a receiver from a [`LoopConfig`].
    pub fn from_config(constellation: C, config: &LoopConfig) -> Result<Self, ReceiverError> {
        let control = config.build_loop()?;
        ConstellationReceiver::with_loop(constellation, control)
    }

    fn with_loop(constellation: C, control: ControlLoop) -> Result<Self, ReceiverError> {
        let dim = constellation.dimensionality();
        if dim != 1 {
            return Err(ReceiverError::InvalidDimensionality(dim));
        }
        debug!(
            "constellation receiver: {} points, bw {}, frequency range [{}, {}]",
            constellation.arity(),
            control.loop_bandwidth(),
            control.min_frequency(),
            control.max_frequency()
        );
        Ok(ConstellationReceiver {
            constellation,
            control,
        })
    }

    /// Processes as many samples as `input` and every output buffer allow.
    ///
    /// Returns the number of samples consumed, which is also the number of
    /// entries written to each output.
    pub fn general_work(&mut self, input: &[Complex<f64>], outputs: WorkOutputs<'_>) -> usize {
        let n = input.len().min(outputs.capacity());
        let WorkOutputs {
            symbols,
            diagnostics,
        } = outputs;

        match diagnostics {
            Some(diag) => {
                for i in 0..n {
                    let (sym, error) = self.step(&input[i]);
                    symbols[i] = sym;
                    diag.error[i] = error;
                    diag.phase[i] = self.control.phase();
                    diag.frequency[i] = self.control.frequency();
                }
            }
            None => {
                for i in 0..n {
                    symbols[i] = self.step(&input[i]).0;
                }
            }
        }
        n
    }

    /// Symbol-only shorthand for [`general_work`](Self::general_work).
    pub fn work(&mut self, input: &[Complex<f64>], symbols: &mut [u32]) -> usize {
        self.general_work(
            input,
            WorkOutputs {
                symbols,
                diagnostics: None,
            },
        )
    }

    /// Runs the receiver with all three diagnostic streams connected.
    pub fn work_with_diagnostics(
        &mut self,
        input: &[Complex<f64>],
        symbols: &mut [u32],
        error: &mut [f64],
        phase: &mut [f64],
        frequency: &mut [f64],
    ) -> usize {
        self.general_work(
            input,
            WorkOutputs {
                symbols,
                diagnostics: Some(DiagnosticOutputs {
                    error,
                    phase,
                    frequency,
                }),
            },
        )
    }

    /// Derotates one sample, decides it and updates the loop.
    fn step(&mut self, sample: &Complex<f64>) -> (u32, f64) {
        let nco = Complex::from_polar(1.0, -self.control.phase());
        let (sym, error) = self.constellation.decide(&(sample * nco));
        self.control.advance_loop(error);
        (sym, error)
    }

    pub fn constellation(&self) -> &C {
        &self.constellation
    }

    pub fn control_loop(&self) -> &ControlLoop {
        &self.control
    }

    pub fn control_loop_mut(&mut self) -> &mut ControlLoop {
        &mut self.control
    }
}

#[cfg(test)]
mod test {
    use crate::constellation::*;
    use crate::receiver::*;
    use crate::util::signal_source::OffsetSymbolSource;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::{FRAC_1_SQRT_2, PI};

    #[test]
    fn test_rejects_multidimensional_constellation() {
        let points = vec![Complex::new(1.0, 0.0), Complex::new(-1.0, 0.0)];
        let constellation = ArbitraryConstellation::with_dimensionality(points, 2).unwrap();
        let res = ConstellationReceiver::new(constellation, 0.1, -0.25, 0.25);
        assert_eq!(res.err(), Some(ReceiverError::InvalidDimensionality(2)));
    }

    #[test]
    fn test_output_signature() {
        assert_eq!(OutputSignature::from_channel_count(1), Ok(OutputSignature::SymbolsOnly));
        assert_eq!(OutputSignature::from_channel_count(4), Ok(OutputSignature::WithDiagnostics));
        for n in &[0, 2, 3, 5] {
            assert_eq!(
                OutputSignature::from_channel_count(*n),
                Err(ReceiverError::InvalidOutputCount(*n))
            );
        }
        assert_eq!(OutputSignature::WithDiagnostics.channel_count(), 4);
        assert_eq!(OutputSignature::SymbolsOnly.channel_count(), 1);
    }

    #[test]
    fn test_batch_sizing() {
        let mut rx =
            ConstellationReceiver::new(PskConstellation::qpsk(), 0.1, -0.25, 0.25).unwrap();
        let input = vec![Complex::new(0.7, 0.7); 5];

        let mut empty: Vec<u32> = vec![];
        assert_eq!(rx.work(&input, &mut empty), 0);
        let mut symbols = vec![99; 3];
        assert_eq!(rx.work(&[], &mut symbols), 0);
        assert_eq!(symbols, vec![99; 3]);
        assert_eq!(rx.control_loop().phase(), 0.0);

        assert_eq!(rx.work(&input, &mut symbols), 3);
        assert_eq!(symbols, vec![0; 3]);

        let mut symbols = vec![99; 8];
        assert_eq!(rx.work(&input, &mut symbols), 5);
        assert_eq!(&symbols[5..], &[99, 99, 99]);
    }

    #[test]
    fn test_diagnostics_in_lockstep() {
        let qpsk = PskConstellation::qpsk();
        let mut source = OffsetSymbolSource::new(qpsk.clone(), 0.02, 0.3, 64, 1).unwrap();
        let (samples, _) = source.next_batch();

        let mut rx = ConstellationReceiver::new(qpsk.clone(), 0.05, -0.5, 0.5).unwrap();
        let mut reference = ConstellationReceiver::new(qpsk, 0.05, -0.5, 0.5).unwrap();

        let n = samples.len();
        let mut symbols = vec![0; n];
        let mut error = vec![0.0; n];
        let mut phase = vec![0.0; n];
        let mut freq = vec![0.0; n];
        let count = rx.work_with_diagnostics(
            &samples,
            &mut symbols,
            &mut error,
            &mut phase,
            &mut freq,
        );
        assert_eq!(count, n);

        // Step a second receiver one sample at a time and compare every
        // index against its state.
        for i in 0..n {
            let mut sym = [0];
            assert_eq!(reference.work(&samples[i..=i], &mut sym), 1);
            assert_eq!(symbols[i], sym[0]);
            assert_eq!(phase[i], reference.control_loop().phase());
            assert_eq!(freq[i], reference.control_loop().frequency());
        }
        assert!(error.iter().any(|e| *e != 0.0));
    }

    #[test]
    fn test_diagnostics_sized_by_shortest_output() {
        let mut rx =
            ConstellationReceiver::new(PskConstellation::bpsk(), 0.1, -0.25, 0.25).unwrap();
        let input = vec![Complex::new(1.0, 0.1); 6];
        let mut symbols = vec![7; 6];
        let mut error = vec![9.0; 6];
        let mut phase = vec![9.0; 4];
        let mut freq = vec![9.0; 6];
        let n = rx.work_with_diagnostics(&input, &mut symbols, &mut error, &mut phase, &mut freq);
        assert_eq!(n, 4);
        assert_eq!(&symbols[4..], &[7, 7]);
        assert_eq!(&error[4..], &[9.0, 9.0]);
        assert_eq!(&freq[4..], &[9.0, 9.0]);
    }

    #[test]
    fn test_nan_sample_does_not_stall_loop() {
        let mut rx = ConstellationReceiver::new(PskConstellation::qpsk(), 0.05, -0.5, 0.5).unwrap();
        let input = vec![
            Complex::new(f64::NAN, 0.0),
            Complex::new(0.7, 0.7),
            Complex::new(-0.7, -0.7),
        ];
        let mut symbols = vec![9; 3];
        assert_eq!(rx.work(&input, &mut symbols), 3);
        assert_eq!(&symbols[1..], &[0, 2]);
        assert!(rx.control_loop().phase().is_finite());
        assert!(rx.control_loop().frequency().is_finite());
    }

    #[test]
    fn test_symbols_without_offset() {
        let psk8 = PskConstellation::psk8();
        let mut source = OffsetSymbolSource::new(psk8.clone(), 0.0, 0.1, 200, 5).unwrap();
        let (samples, truth) = source.next_batch();
        let mut rx = ConstellationReceiver::new(psk8, 0.05, -0.5, 0.5).unwrap();
        let mut symbols = vec![0; samples.len()];
        rx.work(&samples, &mut symbols);
        assert_eq!(symbols, truth);
        assert_approx_eq!(rx.control_loop().phase(), 0.1, 1e-3);
    }

    #[test]
    fn test_lock_acquisition() {
        for (seed, constellation) in vec![
            PskConstellation::bpsk(),
            PskConstellation::qpsk(),
            PskConstellation::psk8(),
        ]
        .into_iter()
        .enumerate()
        {
            let mut source =
                OffsetSymbolSource::new(constellation.clone(), 0.05, 0.2, 1000, seed as u64)
                    .unwrap();
            let (samples, _) = source.next_batch();

            let mut rx = ConstellationReceiver::new(constellation, 0.05, -0.5, 0.5).unwrap();
            rx.control_loop_mut().set_damping_factor(FRAC_1_SQRT_2).unwrap();

            let n = samples.len();
            let mut symbols = vec![0; n];
            let mut error = vec![0.0; n];
            let mut phase = vec![0.0; n];
            let mut freq = vec![0.0; n];
            rx.work_with_diagnostics(&samples, &mut symbols, &mut error, &mut phase, &mut freq);

            assert_approx_eq!(rx.control_loop().frequency(), 0.05, 1e-3);
            for e in &error[n - 100..] {
                assert!(e.abs() < 0.05, "phase error {} after lock", e);
            }
            for p in &phase {
                assert!(*p > -2.0 * PI && *p <= 2.0 * PI);
            }
            for f in &freq {
                assert!(f.abs() <= 0.5);
            }
        }
    }

    #[test]
    fn test_parameter_change_between_batches() {
        let qpsk = PskConstellation::qpsk();
        let mut source = OffsetSymbolSource::new(qpsk.clone(), 0.03, -0.4, 500, 9).unwrap();
        let mut rx = ConstellationReceiver::new(qpsk, 0.02, -0.5, 0.5).unwrap();
        let mut symbols = vec![0; 500];

        let (samples, _) = source.next_batch();
        rx.work(&samples, &mut symbols);
        rx.control_loop_mut().set_loop_bandwidth(0.08).unwrap();
        assert!(rx.control_loop_mut().set_damping_factor(2.0).is_err());
        assert_eq!(rx.control_loop().damping_factor(), FRAC_1_SQRT_2);

        for _ in 0..3 {
            let (samples, _) = source.next_batch();
            rx.work(&samples, &mut symbols);
        }
        assert_approx_eq!(rx.control_loop().frequency(), 0.03, 1e-3);
    }
}
