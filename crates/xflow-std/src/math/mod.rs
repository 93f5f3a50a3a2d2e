//! Math functions
//!
//! Binary arithmetic takes `a` and `b` and yields `result`; unary functions
//! take `a`. Rounding and comparisons yield `out`.

mod arith;
mod compare;

pub use arith::*;
pub use compare::*;
