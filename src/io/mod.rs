//! Nodes for general input/output support.

pub mod raw_iq;
