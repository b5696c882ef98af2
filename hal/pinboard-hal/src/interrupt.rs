//! Pin interrupt abstractions
//!
//! The platform routes every GPIO interrupt through one shared dispatch
//! service. The service is installed once; after that each pin attaches
//! and detaches its own handler.

use crate::error::Result;
use crate::gpio::InterruptType;

/// Allocation flags for the shared dispatch service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IsrFlags {
    /// Allocate a low/medium priority interrupt (C handlers allowed)
    pub low_med: bool,
    /// Allocate an edge-triggered CPU interrupt instead of a level one
    pub edge: bool,
}

impl IsrFlags {
    /// Flags for a dispatch service serving the given trigger type
    pub const fn for_trigger(trigger: InterruptType) -> Self {
        Self {
            low_med: true,
            edge: trigger.is_edge(),
        }
    }
}

/// Context handed to a pin handler
///
/// Identifies which handle the event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IsrContext {
    /// GPIO number that fired
    pub pin: u8,
    /// Trigger the pin was configured with
    pub trigger: InterruptType,
}

/// Pin interrupt handler
///
/// Runs in interrupt context: must not block or allocate.
pub type IsrHandler = fn(IsrContext);

/// Interrupt driver
pub trait IsrDriver {
    /// Install the shared dispatch service
    ///
    /// # Errors
    ///
    /// Returns `HalError::InvalidState` if the service is already installed.
    fn install_isr_service(&self, flags: IsrFlags) -> Result<()>;

    /// Attach a handler to a pin
    fn add_isr_handler(&self, pin: u8, handler: IsrHandler, context: IsrContext) -> Result<()>;

    /// Detach the handler of a pin
    fn remove_isr_handler(&self, pin: u8) -> Result<()>;

    /// Disable the interrupt of a pin
    fn disable_interrupt(&self, pin: u8) -> Result<()>;
}

impl<T: IsrDriver + ?Sized> IsrDriver for &T {
    fn install_isr_service(&self, flags: IsrFlags) -> Result<()> {
        (**self).install_isr_service(flags)
    }

    fn add_isr_handler(&self, pin: u8, handler: IsrHandler, context: IsrContext) -> Result<()> {
        (**self).add_isr_handler(pin, handler, context)
    }

    fn remove_isr_handler(&self, pin: u8) -> Result<()> {
        (**self).remove_isr_handler(pin)
    }

    fn disable_interrupt(&self, pin: u8) -> Result<()> {
        (**self).disable_interrupt(pin)
    }
}
