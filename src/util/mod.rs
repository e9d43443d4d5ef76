//! Helpers that don't fit into any specific category: small math routines
//! shared by the loop code and a signal source for exercising receivers.

/// Some basic math functions used elsewhere in the project
pub mod math;
/// A node that generates constellation symbols with a carrier offset
pub mod signal_source;
