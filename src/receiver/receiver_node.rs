//! Runs a [`ConstellationReceiver`] as a node, with a handle for retuning
//! it from another thread while it runs.

use crate::constellation::Constellation;
use crate::prelude::*;
use crate::receiver::{
    ConstellationReceiver, ControlLoop, DiagnosticOutputs, OutputSignature,
    ReceiverError, WorkOutputs,
};

use num::Complex;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Per-sample phase error, phase and frequency for one batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiagnosticBatch {
    pub error: Vec<f64>,
    pub phase: Vec<f64>,
    pub frequency: Vec<f64>,
}

/// A node wrapping a [`ConstellationReceiver`].
///
/// Every batch received on `input` is decided in full and the symbol indices
/// are sent on `sender`. Diagnostics are only computed when something is
/// connected to `diagnostics`.
///
/// # Examples
///
/// ```
/// #[macro_use] extern crate costas_rs;
/// use costas_rs::constellation::PskConstellation;
/// use costas_rs::prelude::*;
/// use costas_rs::receiver::receiver_node::ConstellationReceiverNode;
/// use costas_rs::receiver::ConstellationReceiver;
/// use num::Complex;
///
/// # fn main() {
/// let rx = ConstellationReceiver::new(PskConstellation::bpsk(), 0.05, -0.5, 0.5)
///     .unwrap();
/// let mut node = ConstellationReceiverNode::new(rx);
/// let handle = node.handle();
///
/// let (send, recv) = channel::bounded(1);
/// node.input = Some(recv);
/// let (sym_send, symbols) = channel::bounded(1);
/// node.sender.push(sym_send);
///
/// start_nodes!(node);
/// send.send(vec![Complex::new(-1.0, 0.0); 4]).unwrap();
/// assert_eq!(symbols.recv().unwrap(), vec![1; 4]);
/// handle.set_loop_bandwidth(0.1).unwrap();
/// # }
/// ```
pub struct ConstellationReceiverNode<C: Constellation> {
    pub input: NodeReceiver<Vec<Complex<f64>>>,
    receiver: Arc<Mutex<ConstellationReceiver<C>>>,
    pub sender: NodeSender<Vec<u32>>,
    pub diagnostics: NodeSender<DiagnosticBatch>,
}

impl<C: Constellation> ConstellationReceiverNode<C> {
    pub fn new(receiver: ConstellationReceiver<C>) -> Self {
        ConstellationReceiverNode {
            input: None,
            receiver: Arc::new(Mutex::new(receiver)),
            sender: vec![],
            diagnostics: vec![],
        }
    }

    /// Returns a handle sharing this node's receiver.
    pub fn handle(&self) -> ReceiverHandle<C> {
        ReceiverHandle {
            inner: Arc::clone(&self.receiver),
        }
    }

    /// The outputs this node currently produces.
    pub fn signature(&self) -> OutputSignature {
        if self.diagnostics.is_empty() {
            OutputSignature::SymbolsOnly
        } else {
            OutputSignature::WithDiagnostics
        }
    }

    /// Decides one batch. Returns the symbols and, when diagnostics are
    /// connected, the diagnostic traces.
    pub fn run(&mut self, samples: &[Complex<f64>]) -> (Vec<u32>, Option<DiagnosticBatch>) {
        let n = samples.len();
        let mut symbols = vec![0; n];
        let signature = self.signature();
        let mut rx = lock(&self.receiver);
        match signature {
            OutputSignature::SymbolsOnly => {
                rx.work(samples, &mut symbols);
                (symbols, None)
            }
            OutputSignature::WithDiagnostics => {
                let mut diag = DiagnosticBatch {
                    error: vec![0.0; n],
                    phase: vec![0.0; n],
                    frequency: vec![0.0; n],
                };
                rx.general_work(
                    samples,
                    WorkOutputs {
                        symbols: &mut symbols,
                        diagnostics: Some(DiagnosticOutputs {
                            error: &mut diag.error,
                            phase: &mut diag.phase,
                            frequency: &mut diag.frequency,
                        }),
                    },
                );
                (symbols, Some(diag))
            }
        }
    }
}

impl<C: Constellation> Node for ConstellationReceiverNode<C> {
    fn call(&mut self) -> Result<(), NodeError> {
        let samples = match self.input {
            Some(ref r) => r.recv().map_err(|_| NodeError::CommError)?,
            None => return Err(NodeError::PermanentError),
        };
        let (symbols, diag) = self.run(&samples);
        for send in &self.sender {
            send.send(symbols.clone()).map_err(|_| NodeError::CommError)?;
        }
        if let Some(diag) = diag {
            for send in &self.diagnostics {
                send.send(diag.clone()).map_err(|_| NodeError::CommError)?;
            }
        }
        Ok(())
    }
}

/// Control-plane access to a receiver owned by a running node.
///
/// All access goes through a mutex shared with the node, so a parameter
/// change lands either before or after a batch, never in the middle of one.
pub struct ReceiverHandle<C: Constellation> {
    inner: Arc<Mutex<ConstellationReceiver<C>>>,
}

impl<C: Constellation> Clone for ReceiverHandle<C> {
    fn clone(&self) -> Self {
        ReceiverHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Constellation> ReceiverHandle<C> {
    fn with_loop<R>(&self, f: impl FnOnce(&mut ControlLoop) -> R) -> R {
        f(lock(&self.inner).control_loop_mut())
    }

    pub fn set_loop_bandwidth(&self, bw: f64) -> Result<(), ReceiverError> {
        self.with_loop(|cl| cl.set_loop_bandwidth(bw))
    }

    pub fn set_damping_factor(&self, df: f64) -> Result<(), ReceiverError> {
        self.with_loop(|cl| cl.set_damping_factor(df))
    }

    pub fn set_alpha(&self, alpha: f64) -> Result<(), ReceiverError> {
        self.with_loop(|cl| cl.set_alpha(alpha))
    }

    pub fn set_beta(&self, beta: f64) -> Result<(), ReceiverError> {
        self.with_loop(|cl| cl.set_beta(beta))
    }

    pub fn set_frequency(&self, freq: f64) {
        self.with_loop(|cl| cl.set_frequency(freq))
    }

    pub fn set_phase(&self, phase: f64) {
        self.with_loop(|cl| cl.set_phase(phase))
    }

    pub fn reset(&self) {
        self.with_loop(|cl| cl.reset())
    }

    pub fn loop_bandwidth(&self) -> f64 {
        self.with_loop(|cl| cl.loop_bandwidth())
    }

    pub fn damping_factor(&self) -> f64 {
        self.with_loop(|cl| cl.damping_factor())
    }

    pub fn alpha(&self) -> f64 {
        self.with_loop(|cl| cl.alpha())
    }

    pub fn beta(&self) -> f64 {
        self.with_loop(|cl| cl.beta())
    }

    pub fn frequency(&self) -> f64 {
        self.with_loop(|cl| cl.frequency())
    }

    pub fn phase(&self) -> f64 {
        self.with_loop(|cl| cl.phase())
    }

    /// Copies the whole loop state in one go.
    pub fn snapshot(&self) -> ControlLoop {
        self.with_loop(|cl| cl.clone())
    }
}

// Every loop setter validates before it writes, so the state behind a
// poisoned lock is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
