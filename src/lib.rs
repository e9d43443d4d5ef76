//! Decision-directed carrier recovery for digital receive pipelines.
//!
//! The heart of the crate is [`receiver::ConstellationReceiver`], which
//! decides constellation symbols from a stream of complex samples while a
//! second-order loop tracks out the residual carrier phase and frequency.
//! The decision geometry is supplied through the
//! [`constellation::Constellation`] trait. Everything else here (nodes, raw
//! IQ I/O, test signal sources) exists to run the receiver inside a larger
//! pipeline.

#[macro_use]
pub mod node;
pub mod constellation;
pub mod io;
pub mod prelude;
pub mod receiver;
pub mod util;

pub use crossbeam::channel;
pub use crossbeam::channel::{Receiver, Sender};
