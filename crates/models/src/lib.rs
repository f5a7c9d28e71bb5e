//! Probabilistic programs built on the `ppl` runtime, each with its data
//! and the inference method it is usually run with.

pub mod dice;
pub mod heights;
pub mod regression;
pub mod registry;
pub mod sprinkler;

pub use registry::ModelKind;
