//! Pin ownership registry
//!
//! A [`PinBank`] owns the platform driver and remembers which GPIOs are held
//! by a live handle. Constructing a handle claims its pin; dropping the
//! handle resets the pin to its power-on state and hands it back. A second
//! handle on a claimed pin is refused before anything reaches the hardware.

use core::cell::Cell;
use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use pinboard_hal::{GpioDriver, PinConfig, Platform, Result};

use crate::interrupt::{global_dispatch, IsrDispatch};
use crate::pins::{is_valid, pin_name, GpioNum};

/// Error when claiming a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin is held by another live handle
    AlreadyTaken,
    /// Configured pin does not exist or lacks the capability the handle needs
    Unsupported,
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinError::AlreadyTaken => f.write_str("pin already taken"),
            PinError::Unsupported => f.write_str("pin does not support this function"),
        }
    }
}

/// Platform driver plus the set of claimed pins
///
/// Shared by reference between all handles, so it is usually placed in a
/// `static` or kept alive for the whole program.
pub struct PinBank<H: Platform> {
    hal: H,
    claimed: Mutex<CriticalSectionRawMutex, Cell<u64>>,
    dispatch: &'static IsrDispatch,
}

impl<H: Platform> PinBank<H> {
    /// Create a pin bank bound to the process-wide interrupt dispatch
    pub fn new(hal: H) -> Self {
        Self::with_dispatch(hal, global_dispatch())
    }

    /// Create a pin bank bound to a caller-provided interrupt dispatch
    ///
    /// Use one dispatch per interrupt controller; two banks on the same
    /// controller must share it.
    pub fn with_dispatch(hal: H, dispatch: &'static IsrDispatch) -> Self {
        Self {
            hal,
            claimed: Mutex::new(Cell::new(0)),
            dispatch,
        }
    }

    /// Platform driver
    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Interrupt dispatch this bank installs into
    pub fn dispatch(&self) -> &'static IsrDispatch {
        self.dispatch
    }

    /// Check if a pin is free to be claimed
    pub fn is_available(&self, pin: GpioNum) -> bool {
        is_valid(pin) && self.claimed.lock(|c| c.get() & (1u64 << pin as u32) == 0)
    }

    /// Number of pins held by live handles
    pub fn claimed_count(&self) -> u32 {
        self.claimed.lock(|c| c.get().count_ones())
    }

    /// Claim a valid pin
    pub(crate) fn claim(&self, pin: GpioNum) -> core::result::Result<PinGuard<'_, H>, PinError> {
        debug_assert!(is_valid(pin));
        let mask = 1u64 << pin as u32;

        self.claimed.lock(|c| {
            let claimed = c.get();
            if claimed & mask != 0 {
                return Err(PinError::AlreadyTaken);
            }
            c.set(claimed | mask);
            Ok(())
        })?;

        trace!("GPIO {} ({:?}) claimed", pin, pin_name(pin));
        Ok(PinGuard { bank: self, pin })
    }

    fn release(&self, pin: GpioNum) {
        self.claimed.lock(|c| c.set(c.get() & !(1u64 << pin as u32)));
        trace!("GPIO {} released", pin);
    }
}

/// Claim on one pin, released on drop
pub(crate) struct PinGuard<'b, H: Platform> {
    bank: &'b PinBank<H>,
    pin: GpioNum,
}

impl<'b, H: Platform> PinGuard<'b, H> {
    pub fn pin(&self) -> GpioNum {
        self.pin
    }

    /// SDK pin number; valid pins are never negative
    pub fn num(&self) -> u8 {
        self.pin as u8
    }

    pub fn bank(&self) -> &'b PinBank<H> {
        self.bank
    }

    pub fn hal(&self) -> &'b H {
        &self.bank.hal
    }

    /// Commit a pin configuration, logging a failure
    pub fn commit(&self, config: &PinConfig) -> Result<()> {
        self.hal().configure(config).inspect_err(|e| {
            error!("GPIO {} configure failed: {:?}", self.pin, e);
        })
    }
}

impl<H: Platform> Drop for PinGuard<'_, H> {
    fn drop(&mut self) {
        self.bank.hal.reset(self.num());
        self.bank.release(self.pin);
    }
}
