//! Pure data types for orbsh: values, parameter specifications, evaluation results.
//!
//! This crate is a leaf dependency with no async runtime, no lexer, no I/O.
//! Command modules can depend on it to describe their parameters without
//! pulling in the kernel.

pub mod param;
pub mod result;
pub mod value;

// Flat re-exports for convenience
pub use param::*;
pub use result::*;
pub use value::*;
