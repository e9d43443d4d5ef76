//! Serializable construction parameters for the carrier tracking loop.

use crate::receiver::control_loop::{ControlLoop, DEFAULT_DAMPING};
use crate::receiver::ReceiverError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::io::{Read, Write};

/// Loop tuning as it is stored on disk or passed between processes.
///
/// Missing fields fall back to [`LoopConfig::default`]. When `alpha` or
/// `beta` is set it overrides the gain derived from the bandwidth and
/// damping factor.
///
/// # Examples
///
/// ```
/// use costas_rs::receiver::LoopConfig;
///
/// let config = LoopConfig {
///     loop_bw: 0.05,
///     fmin: -0.5,
///     fmax: 0.5,
///     ..Default::default()
/// };
/// let mut bytes = vec![];
/// config.to_writer(&mut bytes).unwrap();
/// assert_eq!(LoopConfig::from_reader(&bytes[..]).unwrap(), config);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub loop_bw: f64,
    pub damping: f64,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub fmin: f64,
    pub fmax: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            loop_bw: 2.0 * PI / 100.0,
            damping: DEFAULT_DAMPING,
            alpha: None,
            beta: None,
            fmin: -0.25,
            fmax: 0.25,
        }
    }
}

impl LoopConfig {
    /// Reads a CBOR encoded configuration.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReceiverError> {
        serde_cbor::from_reader(reader)
            .map_err(|e| ReceiverError::Config(e.to_string()))
    }

    /// Writes the configuration as CBOR.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), ReceiverError> {
        serde_cbor::to_writer(writer, self)
            .map_err(|e| ReceiverError::Config(e.to_string()))
    }

    /// Builds a [`ControlLoop`], validating every field on the way.
    pub fn build_loop(&self) -> Result<ControlLoop, ReceiverError> {
        let mut cl = ControlLoop::new(self.loop_bw, self.fmin, self.fmax)?;
        cl.set_damping_factor(self.damping)?;
        if let Some(alpha) = self.alpha {
            cl.set_alpha(alpha)?;
        }
        if let Some(beta) = self.beta {
            cl.set_beta(beta)?;
        }
        Ok(cl)
    }
}

#[cfg(test)]
mod test {
    use crate::receiver::config::*;
    use assert_approx_eq::assert_approx_eq;
    use std::collections::BTreeMap;

    #[test]
    fn test_default_build() {
        let cl = LoopConfig::default().build_loop().unwrap();
        assert_approx_eq!(cl.loop_bandwidth(), 2.0 * PI / 100.0);
        assert_eq!(cl.damping_factor(), DEFAULT_DAMPING);
        assert_eq!(cl.min_frequency(), -0.25);
        assert_eq!(cl.max_frequency(), 0.25);
    }

    #[test]
    fn test_overrides() {
        let config = LoopConfig {
            damping: 0.5,
            alpha: Some(0.3),
            beta: Some(0.02),
            ..Default::default()
        };
        let cl = config.build_loop().unwrap();
        assert_eq!(cl.damping_factor(), 0.5);
        assert_eq!(cl.alpha(), 0.3);
        assert_eq!(cl.beta(), 0.02);
    }

    #[test]
    fn test_invalid_fields() {
        let bad_damping = LoopConfig {
            damping: 1.2,
            ..Default::default()
        };
        assert_eq!(bad_damping.build_loop(), Err(ReceiverError::InvalidDampingFactor(1.2)));
        let bad_beta = LoopConfig {
            beta: Some(-0.5),
            ..Default::default()
        };
        assert_eq!(bad_beta.build_loop(), Err(ReceiverError::InvalidBeta(-0.5)));
        let bad_range = LoopConfig {
            fmin: 1.0,
            fmax: 0.0,
            ..Default::default()
        };
        assert!(bad_range.build_loop().is_err());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let mut partial = BTreeMap::new();
        partial.insert("loop_bw".to_string(), 0.1);
        let bytes = serde_cbor::to_vec(&partial).unwrap();

        let config = LoopConfig::from_reader(&bytes[..]).unwrap();
        assert_eq!(config.loop_bw, 0.1);
        assert_eq!(config.fmax, 0.25);
        assert_eq!(config.alpha, None);
    }

    #[test]
    fn test_garbage_is_config_error() {
        let res = LoopConfig::from_reader(&[0xff, 0x00, 0x13][..]);
        match res {
            Err(ReceiverError::Config(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
