//! Arbitrary-precision arithmetic helpers

pub mod pure_math;

pub use pure_math::*;
