//! Provides an infrastructure to run processing nodes, connect nodes
//! together via crossbeam channels, and start nodes running in their own
//! independent threads.
//!
//! A node is any structure implementing [`Node`]. By convention, inputs are
//! `NodeReceiver<T>` fields and outputs are `NodeSender<T>` fields, so the
//! macros below can wire them together by name.
//!
//! # Example
//!
//! ```
//! #[macro_use] extern crate costas_rs;
//! use costas_rs::prelude::*;
//!
//! # fn main() {
//! struct Ones {
//!     left: u32,
//!     sender: NodeSender<u32>,
//! }
//!
//! impl Node for Ones {
//!     fn call(&mut self) -> Result<(), NodeError> {
//!         if self.left == 0 {
//!             return Err(NodeError::DataEnd);
//!         }
//!         self.left -= 1;
//!         for send in &self.sender {
//!             send.send(1).map_err(|_| NodeError::CommError)?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! struct Sum {
//!     input: NodeReceiver<u32>,
//!     total: u32,
//! }
//!
//! impl Node for Sum {
//!     fn call(&mut self) -> Result<(), NodeError> {
//!         let x = match self.input {
//!             Some(ref r) => r.recv().map_err(|_| NodeError::CommError)?,
//!             None => return Err(NodeError::PermanentError),
//!         };
//!         self.total += x;
//!         Ok(())
//!     }
//! }
//!
//! let mut ones = Ones { left: 3, sender: vec![] };
//! let mut sum = Sum { input: None, total: 0 };
//! connect_nodes!(ones, sender, sum, input);
//! start_nodes!(ones);
//! for _ in 0..3 {
//!     sum.call().unwrap();
//! }
//! assert_eq!(sum.total, 3);
//! # }
//! ```

use thiserror::Error;

/// The trait that all nodes in the library implement. Only contains a single
/// function: `call(&mut self)` which executes the node once.
pub trait Node: Send {
    fn call(&mut self) -> Result<(), NodeError>;
}

/// Reasons a node stops running.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum NodeError {
    /// An input was never connected, so the node can never run.
    #[error("node input is not connected")]
    PermanentError,
    /// A peer on one of the channels hung up.
    #[error("node peer disconnected")]
    CommError,
    /// The node received or produced data it can't handle.
    #[error("node received invalid data")]
    DataError,
    /// A source node has nothing more to produce.
    #[error("node source exhausted")]
    DataEnd,
}

/// Connects two nodes together with a rendezvous crossbeam channel.
///
/// ```
/// # #[macro_use] extern crate costas_rs;
/// # use costas_rs::prelude::*;
/// # fn main() {
/// struct Source {
///     sender: NodeSender<u32>,
/// }
/// struct Sink {
///     input: NodeReceiver<u32>,
/// }
///
/// let mut source = Source { sender: vec![] };
/// let mut sink = Sink { input: None };
///
/// // source will now send its messages to sink, which receives them on
/// // its field named `input`.
/// connect_nodes!(source, sender, sink, input);
/// assert_eq!(source.sender.len(), 1);
/// assert!(sink.input.is_some());
/// # }
/// ```
#[macro_export]
macro_rules! connect_nodes {
    ($n1:ident, $send:ident, $n2:ident, $recv:ident) => {{
        let (send, recv) = $crate::channel::bounded(0);
        $n1.$send.push(send);
        $n2.$recv = Some(recv);
    }};
}

/// Spawns a thread for each node in order. Each thread calls its node until
/// the node returns an error; the join handles are returned in the same
/// order and yield that error.
#[macro_export]
macro_rules! start_nodes {
    ($($node:ident),+ $(,)?) => {
        vec![$(
            ::std::thread::spawn(move || loop {
                if let Err(e) = $crate::node::Node::call(&mut $node) {
                    return e;
                }
            }),
        )+]
    };
}
