//! Configuration types
//!
//! Board descriptions: which pins are outputs, inputs, analog inputs or
//! interrupt sources, named the way the silkscreen names them.

pub mod board;
#[cfg(feature = "toml")]
pub mod toml;

pub use board::*;
