//! A random symbol source for exercising receivers.
//!
//! [`OffsetSymbolSource`] implements [`Node`] by hand: `next_batch` builds a
//! batch and `call` forwards it to every sender until the batch limit runs
//! out, at which point it reports `DataEnd`.

use num::Complex;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Normal, NormalError};

use crate::constellation::{Constellation, ConstellationError};
use crate::prelude::*;

/// A node that generates random constellation symbols carrying a carrier
/// offset.
///
/// Sample `k` is `point[s_k] * exp(j * (freq * k + phase))`, where `s_k` is
/// drawn uniformly from the constellation, optionally with complex white
/// Gaussian noise added. The sample index keeps counting across batches, so
/// consecutive batches form one continuous signal.
///
/// # Examples
///
/// ```
/// use costas_rs::constellation::PskConstellation;
/// use costas_rs::util::signal_source::OffsetSymbolSource;
///
/// let mut source =
///     OffsetSymbolSource::new(PskConstellation::qpsk(), 0.01, 0.2, 256, 0)
///         .unwrap();
/// let (samples, symbols) = source.next_batch();
/// assert_eq!(samples.len(), 256);
/// assert!(symbols.iter().all(|s| *s < 4));
/// ```
pub struct OffsetSymbolSource<C: Constellation> {
    constellation: C,
    rng: StdRng,
    dist: Uniform<u32>,
    noise: Option<Normal<f64>>,
    freq: f64,
    phase: f64,
    index: u64,
    batch_size: usize,
    batches_left: Option<usize>,
    pub sender: NodeSender<Vec<Complex<f64>>>,
}

impl<C: Constellation> OffsetSymbolSource<C> {
    /// Creates a new noiseless `OffsetSymbolSource`.
    ///
    /// # Arguments
    ///
    /// * `constellation` - Points to draw symbols from.
    /// * `freq` - Carrier frequency offset in radians per sample.
    /// * `phase` - Carrier phase offset in radians.
    /// * `batch_size` - Samples per batch.
    /// * `seed` - Seed for the symbol and noise generator.
    pub fn new(
        constellation: C,
        freq: f64,
        phase: f64,
        batch_size: usize,
        seed: u64,
    ) -> Result<Self, ConstellationError> {
        let arity = constellation.arity();
        if arity == 0 {
            return Err(ConstellationError::Empty);
        }
        if arity > u32::MAX as usize {
            return Err(ConstellationError::TooManyPoints(arity));
        }
        Ok(OffsetSymbolSource {
            constellation,
            rng: StdRng::seed_from_u64(seed),
            dist: Uniform::new(0, arity as u32),
            noise: None,
            freq,
            phase,
            index: 0,
            batch_size,
            batches_left: None,
            sender: vec![],
        })
    }

    /// Adds complex Gaussian noise with `std_dev` on each of I and Q.
    /// `std_dev` must be finite and non-negative.
    pub fn with_noise(mut self, std_dev: f64) -> Result<Self, NormalError> {
        if !(std_dev >= 0.0) || !std_dev.is_finite() {
            return Err(NormalError::BadVariance);
        }
        self.noise = Some(Normal::new(0.0, std_dev)?);
        Ok(self)
    }

    /// Stops the node after `batches` batches have been sent.
    pub fn with_batch_limit(mut self, batches: usize) -> Self {
        self.batches_left = Some(batches);
        self
    }

    /// Produces the next batch of samples together with the symbol indices
    /// that were sent.
    pub fn next_batch(&mut self) -> (Vec<Complex<f64>>, Vec<u32>) {
        let mut samples = Vec::with_capacity(self.batch_size);
        let mut symbols = Vec::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            let sym = self.rng.sample(&self.dist);
            let offset = self.freq * self.index as f64 + self.phase;
            let mut sample = self.constellation.points()[sym as usize]
                * Complex::from_polar(1.0, offset);
            if let Some(noise) = self.noise {
                sample += Complex::new(self.rng.sample(noise), self.rng.sample(noise));
            }
            samples.push(sample);
            symbols.push(sym);
            self.index += 1;
        }
        (samples, symbols)
    }
}

impl<C: Constellation> Node for OffsetSymbolSource<C> {
    fn call(&mut self) -> Result<(), NodeError> {
        if let Some(ref mut left) = self.batches_left {
            if *left == 0 {
                return Err(NodeError::DataEnd);
            }
            *left -= 1;
        }
        let (samples, _) = self.next_batch();
        for send in &self.sender {
            send.send(samples.clone()).map_err(|_| NodeError::CommError)?;
        }
        Ok(())
    }
}
