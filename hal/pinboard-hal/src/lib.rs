//! Pinboard Hardware Abstraction Layer
//!
//! This crate defines the driver traits a platform backend implements so
//! that the capability-checked pin handles can run on it. The handles
//! themselves never touch registers directly; every commit and every raw
//! read goes through one of these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (board firmware, tests)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pinboard-hal-esp32 (handles, tables)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pinboard-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  ESP32 SDK    │       │ MockPlatform  │
//! │   backend     │       │ (host tests)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::GpioDriver`] - Pin configuration and digital levels
//! - [`adc::AdcDriver`] - Converter setup, raw samples, calibration fuses
//! - [`interrupt::IsrDriver`] - Shared dispatch service and per-pin handlers

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod error;
pub mod gpio;
pub mod interrupt;

// Re-export key traits at crate root for convenience
pub use adc::{
    AdcDriver, AdcUnit, Attenuation, CalibrationCurve, CalibrationFuses, CalibrationSource, Width,
};
pub use error::{HalError, Result};
pub use gpio::{Direction, GpioDriver, InterruptType, PinConfig};
pub use interrupt::{IsrContext, IsrDriver, IsrFlags, IsrHandler};

/// Everything a handle set needs from one platform
pub trait Platform: GpioDriver + AdcDriver + IsrDriver {}

// Blanket implementation for types that implement every driver
impl<T: GpioDriver + AdcDriver + IsrDriver> Platform for T {}
