//! ESP32 pin handles for Pinboard
//!
//! This crate turns the board-agnostic `pinboard-hal` driver traits into
//! capability-checked handles for the ESP32:
//!
//! - Pin capability table and Arduino-style aliases ([`pins`])
//! - ADC channel resolver and calibrated analog input ([`adc`])
//! - Pin ownership registry ([`bank`])
//! - Digital input and output handles ([`gpio`])
//! - Pin interrupts and the shared dispatch lifecycle ([`interrupt`])
//! - In-memory platform for host tests ([`mock`], feature `mock`)
//!
//! ```ignore
//! let bank = PinBank::new(sdk);
//!
//! let mut led = Output::new(&bank, "D13", false)?;
//! led.init()?;
//! led.set(true)?;
//!
//! let mut pot = AnalogInput::new(&bank, "A0")?;
//! pot.init()?;
//! let mv = pot.sample(DEFAULT_SAMPLES);
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod adc;
pub mod bank;
pub mod gpio;
pub mod interrupt;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pins;

pub use adc::{AnalogConfig, AnalogInput, Characteristics, DEFAULT_SAMPLES, DEFAULT_VREF_MV};
pub use bank::{PinBank, PinError};
pub use gpio::{Input, Output, PinState, Pull};
pub use interrupt::{DispatchState, Interrupt, IsrDispatch};
pub use pins::{GpioNum, PinRef, NOT_A_PIN};

// Re-export the driver traits for backend implementors
pub use pinboard_hal::{
    AdcDriver, GpioDriver, HalError, InterruptType, IsrContext, IsrDriver, IsrHandler, Platform,
};
