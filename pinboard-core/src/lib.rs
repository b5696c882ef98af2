//! Board-agnostic core pieces for Pinboard applications
//!
//! This crate contains everything that does not depend on a specific chip:
//!
//! - Board configuration types (which pin does what, by Arduino-style name)
//! - TOML loader for board descriptions (feature `toml`)
//! - Bounded inter-task message queue, safe to feed from interrupt context

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod messaging;
