//! Array functions
//!
//! Indexing and slicing never fail on out-of-range positions: they yield
//! nil or a shorter array. The higher-order functions take a callback `cb`
//! whose body is wired into the graph around the calling node.

mod access;
mod higher_order;

pub use access::*;
pub use higher_order::*;
