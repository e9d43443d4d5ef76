//! Provides nodes for feeding raw IQ recordings into a receiver and for
//! writing decided symbols back out.
//!
//! Samples are read as interleaved 16-bit values in host byte-order, first
//! the real then the imaginary portion, and scaled to [-1, 1). Symbols are
//! written one byte per symbol.
//!
//! Both nodes implement [`Node`] by hand: `run` does the I/O for one batch
//! and `call` moves that batch between `run` and the node's channels.

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use num::Complex;

use crate::prelude::*;
use crate::util::math::cast_complex;

use std::io::{self, Read, Write};

type IQSample = Complex<i16>;

const I16_SCALE: f64 = 1.0 / 32768.0;

/// Reads batches of samples from a raw IQ recording.
pub struct IqBatchInput<R>
where
    R: Read + Send,
{
    reader: R,
    batch_size: usize,
    done: bool,
    pub sender: NodeSender<Vec<Complex<f64>>>,
}

impl<R: Read + Send> IqBatchInput<R> {
    /// Make an IqBatchInput node that reads data from the given reader.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use std::io::BufReader;
    /// use costas_rs::io::raw_iq::IqBatchInput;
    ///
    /// let reader = BufReader::new(File::open("/tmp/raw_iq.bin").unwrap());
    /// let input = IqBatchInput::new(reader, 1024);
    /// ```
    pub fn new(reader: R, batch_size: usize) -> Self {
        IqBatchInput {
            reader,
            batch_size,
            done: false,
            sender: vec![],
        }
    }

    /// Reads up to `batch_size` samples. The batch at the end of the
    /// recording may be short; after that `DataEnd` is returned.
    pub fn run(&mut self) -> Result<Vec<Complex<f64>>, NodeError> {
        if self.done {
            return Err(NodeError::DataEnd);
        }
        let mut buf = Vec::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            match self.read_sample() {
                Ok(samp) => {
                    let samp: Complex<f64> = cast_complex(&samp).ok_or(NodeError::DataError)?;
                    buf.push(samp * I16_SCALE);
                }
                Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    debug!("raw IQ input exhausted");
                    self.done = true;
                    break;
                }
                Err(e) => {
                    warn!("unable to read IQ samples: {}", e);
                    return Err(NodeError::DataError);
                }
            }
        }
        if buf.is_empty() && self.batch_size > 0 {
            return Err(NodeError::DataEnd);
        }
        Ok(buf)
    }

    fn read_sample(&mut self) -> io::Result<IQSample> {
        let re = self.reader.read_i16::<NativeEndian>()?;
        let im = self.reader.read_i16::<NativeEndian>()?;
        Ok(Complex::new(re, im))
    }
}

impl<R: Read + Send> Node for IqBatchInput<R> {
    fn call(&mut self) -> Result<(), NodeError> {
        let samples = self.run()?;
        for send in &self.sender {
            send.send(samples.clone()).map_err(|_| NodeError::CommError)?;
        }
        Ok(())
    }
}

/// Writes symbol batches to a writer, one byte per symbol.
pub struct SymbolOutput<W>
where
    W: Write + Send,
{
    pub input: NodeReceiver<Vec<u32>>,
    writer: W,
}

impl<W: Write + Send> SymbolOutput<W> {
    /// Make a SymbolOutput node sending symbols to the given writer.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use std::io::BufWriter;
    /// use costas_rs::io::raw_iq::SymbolOutput;
    ///
    /// let writer = BufWriter::new(File::create("/tmp/symbols.bin").unwrap());
    /// let output = SymbolOutput::new(writer);
    /// ```
    pub fn new(writer: W) -> Self {
        SymbolOutput {
            input: None,
            writer,
        }
    }

    pub fn run(&mut self, symbols: &[u32]) -> Result<(), NodeError> {
        for sym in symbols {
            if *sym > u32::from(u8::MAX) {
                warn!("symbol {} does not fit in a byte", sym);
                return Err(NodeError::DataError);
            }
            self.writer.write_u8(*sym as u8).map_err(|_| NodeError::DataError)?;
        }
        self.writer.flush().map_err(|_| NodeError::DataError)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Node for SymbolOutput<W> {
    fn call(&mut self) -> Result<(), NodeError> {
        let symbols = match self.input {
            Some(ref r) => r.recv().map_err(|_| NodeError::CommError)?,
            None => return Err(NodeError::PermanentError),
        };
        self.run(&symbols)
    }
}
