//! GPIO pin abstractions
//!
//! Provides the configuration descriptor a handle commits for its pin and
//! the driver trait a platform implements to commit it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Input and output disabled
    #[default]
    Disabled,
    /// Input only
    Input,
    /// Output only (push-pull)
    Output,
    /// Input and output
    InputOutput,
}

/// Interrupt trigger type for a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InterruptType {
    /// No interrupt
    #[default]
    Disabled,
    /// Rising edge
    Rising,
    /// Falling edge
    Falling,
    /// Either edge
    AnyEdge,
    /// Input low level
    LowLevel,
    /// Input high level
    HighLevel,
}

impl InterruptType {
    /// Check if this trigger fires on an edge rather than a level
    pub const fn is_edge(self) -> bool {
        matches!(
            self,
            InterruptType::Rising | InterruptType::Falling | InterruptType::AnyEdge
        )
    }
}

/// Hardware configuration descriptor for one pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    /// GPIO number
    pub pin: u8,
    /// Pin direction
    pub direction: Direction,
    /// Enable internal pull-up
    pub pull_up: bool,
    /// Enable internal pull-down
    pub pull_down: bool,
    /// Interrupt trigger
    pub interrupt: InterruptType,
}

impl PinConfig {
    /// Create a config with everything disabled
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            direction: Direction::Disabled,
            pull_up: false,
            pull_down: false,
            interrupt: InterruptType::Disabled,
        }
    }

    /// Set the direction
    pub const fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the pull resistors
    pub const fn with_pulls(mut self, pull_up: bool, pull_down: bool) -> Self {
        self.pull_up = pull_up;
        self.pull_down = pull_down;
        self
    }

    /// Set the interrupt trigger
    pub const fn with_interrupt(mut self, interrupt: InterruptType) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Bit mask for this pin, as used by pin-mask based SDK calls
    pub const fn pin_mask(&self) -> u64 {
        1u64 << self.pin
    }
}

/// GPIO driver
///
/// Implementations perform the actual register writes for the chip.
/// Methods take `&self`: GPIO registers are a single shared block and
/// backends serialise access internally.
pub trait GpioDriver {
    /// Commit a pin configuration (direction, pulls, trigger type)
    fn configure(&self, config: &PinConfig) -> Result<()>;

    /// Return a pin to its power-on default state
    fn reset(&self, pin: u8);

    /// Read the physical input level
    fn level(&self, pin: u8) -> bool;

    /// Drive the physical output level
    fn set_level(&self, pin: u8, high: bool) -> Result<()>;
}

impl<T: GpioDriver + ?Sized> GpioDriver for &T {
    fn configure(&self, config: &PinConfig) -> Result<()> {
        (**self).configure(config)
    }

    fn reset(&self, pin: u8) {
        (**self).reset(pin)
    }

    fn level(&self, pin: u8) -> bool {
        (**self).level(pin)
    }

    fn set_level(&self, pin: u8, high: bool) -> Result<()> {
        (**self).set_level(pin, high)
    }
}
