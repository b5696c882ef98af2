//! Digital pin handles
//!
//! Thin wrappers that commit a pin configuration and read or drive the
//! level, with optional active-low logic. The capability of the pin is
//! checked when the handle is built; building an output on an input-only
//! pin is a programming error and panics before any register is touched.

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};
use pinboard_core::config::{InputConfig, OutputConfig};
use pinboard_hal::{Direction, GpioDriver, HalError, PinConfig, Platform, Result};

use crate::bank::{PinBank, PinError, PinGuard};
use crate::pins::{has_pulls, is_input, is_output, GpioNum, PinRef};

/// Logical level of a handle
///
/// Outputs report the level last written, inputs the level read now,
/// analog inputs whether the reading is above the reference voltage.
pub trait PinState {
    fn state(&self) -> bool;
}

/// Internal pull resistor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    None,
    Up,
    Down,
}

impl Pull {
    /// Pull-down where the pin has pull resistors, none otherwise
    pub const fn default_for(pin: GpioNum) -> Self {
        if has_pulls(pin) {
            Pull::Down
        } else {
            Pull::None
        }
    }

    const fn flags(self) -> (bool, bool) {
        match self {
            Pull::None => (false, false),
            Pull::Up => (true, false),
            Pull::Down => (false, true),
        }
    }
}

/// Digital output
pub struct Output<'b, H: Platform> {
    pin: PinGuard<'b, H>,
    config: PinConfig,
    inverted: bool,
    state: bool,
}

impl<'b, H: Platform> Output<'b, H> {
    /// Claim an output-capable pin
    ///
    /// # Panics
    ///
    /// Panics if the pin cannot be driven.
    pub fn new<'n>(
        bank: &'b PinBank<H>,
        pin: impl Into<PinRef<'n>>,
        inverted: bool,
    ) -> core::result::Result<Self, PinError> {
        let gpio = pin.into().gpio();
        assert!(is_output(gpio), "GPIO {} is not output-capable", gpio);

        let pin = bank.claim(gpio)?;
        let config = PinConfig::new(pin.num())
            .with_direction(Direction::Output)
            .with_pulls(false, true);

        Ok(Self {
            pin,
            config,
            inverted,
            state: false,
        })
    }

    /// Build an output from its board description
    ///
    /// Returns `PinError::Unsupported` instead of panicking when the named
    /// pin cannot be driven.
    pub fn from_config(
        bank: &'b PinBank<H>,
        config: &OutputConfig,
    ) -> core::result::Result<Self, PinError> {
        let gpio = PinRef::from(&config.pin).gpio();
        if !is_output(gpio) {
            return Err(PinError::Unsupported);
        }
        Self::new(bank, gpio, config.pin.inverted)
    }

    /// Commit the configuration and drive the logical low level
    pub fn init(&mut self) -> Result<()> {
        self.pin.commit(&self.config)?;
        self.set(false)
    }

    /// Drive a logical level
    ///
    /// The recorded state only changes if the write succeeds.
    pub fn set(&mut self, on: bool) -> Result<()> {
        self.pin.hal().set_level(self.pin.num(), on ^ self.inverted)?;
        self.state = on;
        Ok(())
    }

    /// Invert the logical level
    pub fn toggle(&mut self) -> Result<()> {
        self.set(!self.state)
    }

    pub fn pin(&self) -> GpioNum {
        self.pin.pin()
    }

    pub fn config(&self) -> &PinConfig {
        &self.config
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }
}

impl<H: Platform> PinState for Output<'_, H> {
    fn state(&self) -> bool {
        self.state
    }
}

impl<H: Platform> ErrorType for Output<'_, H> {
    type Error = HalError;
}

impl<H: Platform> OutputPin for Output<'_, H> {
    fn set_low(&mut self) -> Result<()> {
        self.set(false)
    }

    fn set_high(&mut self) -> Result<()> {
        self.set(true)
    }
}

impl<H: Platform> StatefulOutputPin for Output<'_, H> {
    fn is_set_high(&mut self) -> Result<bool> {
        Ok(self.state)
    }

    fn is_set_low(&mut self) -> Result<bool> {
        Ok(!self.state)
    }
}

/// Digital input
pub struct Input<'b, H: Platform> {
    pin: PinGuard<'b, H>,
    config: PinConfig,
    inverted: bool,
}

impl<'b, H: Platform> Input<'b, H> {
    /// Claim an input pin with the default pull for that pin
    ///
    /// # Panics
    ///
    /// Panics if the pin does not exist.
    pub fn new<'n>(
        bank: &'b PinBank<H>,
        pin: impl Into<PinRef<'n>>,
        inverted: bool,
    ) -> core::result::Result<Self, PinError> {
        let gpio = pin.into().gpio();
        Self::with_pull(bank, gpio, inverted, Pull::default_for(gpio))
    }

    /// Claim an input pin with an explicit pull
    ///
    /// # Panics
    ///
    /// Panics if the pin does not exist, or if a pull resistor is requested
    /// on an input-only pin.
    pub fn with_pull<'n>(
        bank: &'b PinBank<H>,
        pin: impl Into<PinRef<'n>>,
        inverted: bool,
        pull: Pull,
    ) -> core::result::Result<Self, PinError> {
        let gpio = pin.into().gpio();
        assert!(is_input(gpio), "GPIO {} is not input-capable", gpio);
        assert!(
            pull == Pull::None || has_pulls(gpio),
            "GPIO {} has no pull resistors",
            gpio
        );

        let pin = bank.claim(gpio)?;
        let (up, down) = pull.flags();
        let config = PinConfig::new(pin.num())
            .with_direction(Direction::Input)
            .with_pulls(up, down);

        Ok(Self {
            pin,
            config,
            inverted,
        })
    }

    /// Build an input from its board description
    ///
    /// A `^` pull-up on an input-only pin is rejected as unsupported.
    pub fn from_config(
        bank: &'b PinBank<H>,
        config: &InputConfig,
    ) -> core::result::Result<Self, PinError> {
        let gpio = PinRef::from(&config.pin).gpio();
        if !is_input(gpio) || (config.pin.pull_up && !has_pulls(gpio)) {
            return Err(PinError::Unsupported);
        }
        let pull = if config.pin.pull_up {
            Pull::Up
        } else {
            Pull::default_for(gpio)
        };
        Self::with_pull(bank, gpio, config.pin.inverted, pull)
    }

    /// Commit the configuration
    pub fn init(&mut self) -> Result<()> {
        self.pin.commit(&self.config)
    }

    /// Read the logical level
    pub fn get(&self) -> bool {
        self.pin.hal().level(self.pin.num()) ^ self.inverted
    }

    pub fn pin(&self) -> GpioNum {
        self.pin.pin()
    }

    pub fn config(&self) -> &PinConfig {
        &self.config
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }
}

impl<H: Platform> PinState for Input<'_, H> {
    fn state(&self) -> bool {
        self.get()
    }
}

impl<H: Platform> ErrorType for Input<'_, H> {
    type Error = HalError;
}

impl<H: Platform> InputPin for Input<'_, H> {
    fn is_high(&mut self) -> Result<bool> {
        Ok(self.get())
    }

    fn is_low(&mut self) -> Result<bool> {
        Ok(!self.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::IsrDispatch;
    use crate::mock::{MockCall, MockPlatform};
    use pinboard_core::config::PinSpec;

    static DISPATCH: IsrDispatch = IsrDispatch::new();

    fn bank() -> PinBank<MockPlatform> {
        PinBank::with_dispatch(MockPlatform::new(), &DISPATCH)
    }

    #[test]
    fn test_output_init_drives_low() {
        let bank = bank();
        let mut led = Output::new(&bank, "D5", false).unwrap();
        assert_eq!(led.pin(), 16);
        led.init().unwrap();

        let cfg = bank.hal().config(16).unwrap();
        assert_eq!(cfg.direction, Direction::Output);
        assert!(cfg.pull_down);
        assert!(!cfg.pull_up);
        assert!(!bank.hal().level_of(16));
        assert!(!led.state());
    }

    #[test]
    fn test_inverted_output() {
        let bank = bank();
        let mut led = Output::new(&bank, 16i8, true).unwrap();
        led.init().unwrap();
        // Logical low on an active-low pin is a high physical level
        assert!(bank.hal().level_of(16));

        led.set(true).unwrap();
        assert!(led.state());
        assert!(!bank.hal().level_of(16));

        led.toggle().unwrap();
        assert!(!led.state());
        assert!(bank.hal().level_of(16));
    }

    #[test]
    fn test_failed_write_keeps_state() {
        let bank = bank();
        let mut led = Output::new(&bank, 16i8, false).unwrap();
        led.init().unwrap();
        bank.hal().fail_set_level(16);
        assert_eq!(led.set(true), Err(HalError::Fail));
        assert!(!led.state());
    }

    #[test]
    #[should_panic(expected = "not output-capable")]
    fn test_output_on_input_only_pin_panics() {
        let bank = bank();
        let _ = Output::new(&bank, "A0", false);
    }

    #[test]
    fn test_output_contract_checked_before_hardware() {
        let bank = bank();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = Output::new(&bank, 34i8, false);
        }));
        assert!(result.is_err());
        assert!(bank.hal().calls().is_empty());
        assert!(bank.is_available(34));
    }

    #[test]
    fn test_second_handle_on_same_pin_refused() {
        let bank = bank();
        let _led = Output::new(&bank, "D13", false).unwrap();
        assert_eq!(
            Input::new(&bank, 18i8, false).err(),
            Some(PinError::AlreadyTaken)
        );
        assert!(bank.hal().calls().is_empty());
    }

    #[test]
    fn test_drop_resets_and_releases() {
        let bank = bank();
        {
            let mut led = Output::new(&bank, "D13", false).unwrap();
            bank.hal().fail_configure(18);
            // Release happens even after a failed init
            assert!(led.init().is_err());
        }
        assert!(bank.is_available(18));
        assert_eq!(bank.hal().calls().last(), Some(&MockCall::Reset(18)));
        assert!(Output::new(&bank, "D13", false).is_ok());
    }

    #[test]
    fn test_input_default_pulls() {
        let bank = bank();
        let button = Input::new(&bank, "D4", false).unwrap();
        assert!(button.config().pull_down);

        let sensor = Input::new(&bank, "A1", false).unwrap();
        assert!(!sensor.config().pull_down);
        assert!(!sensor.config().pull_up);
    }

    #[test]
    #[should_panic(expected = "no pull resistors")]
    fn test_pull_on_input_only_pin_panics() {
        let bank = bank();
        let _ = Input::with_pull(&bank, 35i8, false, Pull::Up);
    }

    #[test]
    fn test_input_inversion() {
        let bank = bank();
        let mut button = Input::new(&bank, 17i8, true).unwrap();
        button.init().unwrap();
        assert_eq!(bank.hal().config(17).unwrap().direction, Direction::Input);

        bank.hal().set_input_level(17, false);
        assert!(button.get());
        assert!(button.is_high().unwrap());

        bank.hal().set_input_level(17, true);
        assert!(!button.state());
        assert!(button.is_low().unwrap());
    }

    #[test]
    fn test_embedded_hal_output() {
        let bank = bank();
        let mut led = Output::new(&bank, 2i8, false).unwrap();
        led.init().unwrap();
        led.set_high().unwrap();
        assert!(led.is_set_high().unwrap());
        StatefulOutputPin::toggle(&mut led).unwrap();
        assert!(led.is_set_low().unwrap());
        assert!(!bank.hal().level_of(2));
    }

    #[test]
    fn test_from_config() {
        let bank = bank();
        let out = OutputConfig {
            pin: PinSpec::parse("!D5").unwrap(),
        };
        let led = Output::from_config(&bank, &out).unwrap();
        assert!(led.is_inverted());

        let input = InputConfig {
            pin: PinSpec::parse("^D4").unwrap(),
        };
        let button = Input::from_config(&bank, &input).unwrap();
        assert!(button.config().pull_up);
        assert!(!button.config().pull_down);

        let bad = OutputConfig {
            pin: PinSpec::parse("A0").unwrap(),
        };
        assert_eq!(
            Output::from_config(&bank, &bad).err(),
            Some(PinError::Unsupported)
        );
        let unknown = InputConfig {
            pin: PinSpec::parse("D99").unwrap(),
        };
        assert_eq!(
            Input::from_config(&bank, &unknown).err(),
            Some(PinError::Unsupported)
        );
        let pulled = InputConfig {
            pin: PinSpec::parse("^A3").unwrap(),
        };
        assert_eq!(
            Input::from_config(&bank, &pulled).err(),
            Some(PinError::Unsupported)
        );
    }
}
