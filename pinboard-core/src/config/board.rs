//! Board configuration types
//!
//! These types describe the pins an application wants, by name, together
//! with the per-peripheral settings each handle is constructed with.

use core::fmt;

use heapless::{String, Vec};
use pinboard_hal::{Attenuation, InterruptType, Width};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum length of a pin alias ("D13", "SDA", ...)
pub const MAX_PIN_NAME_LEN: usize = 8;

/// Maximum length of a pin spec string ("!^gpio16")
pub const MAX_PIN_SPEC_LEN: usize = 16;

/// Maximum outputs per config
pub const MAX_OUTPUTS: usize = 16;

/// Maximum digital inputs per config
pub const MAX_INPUTS: usize = 16;

/// Maximum analog inputs per config
pub const MAX_ANALOG: usize = 8;

/// Maximum interrupt pins per config
pub const MAX_INTERRUPTS: usize = 16;

/// Default reference voltage for analog threshold decisions (mV)
pub const DEFAULT_VREF_MV: u32 = 1100;

/// Default number of raw samples averaged per analog reading
pub const DEFAULT_SAMPLES: u32 = 10;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Pin spec string could not be parsed
    InvalidPin,
    /// Too many entries for the fixed-capacity tables
    TooManyItems,
    /// The same pin is used by two entries
    DuplicatePin,
    /// Malformed configuration document
    Parse,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConfigError::InvalidPin => "invalid pin spec",
            ConfigError::TooManyItems => "too many entries",
            ConfigError::DuplicatePin => "pin used twice",
            ConfigError::Parse => "malformed configuration",
        };
        f.write_str(msg)
    }
}

/// How a pin is named in the config
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinName {
    /// Board alias, resolved against the chip's alias table
    Alias(String<MAX_PIN_NAME_LEN>),
    /// Raw GPIO number
    Gpio(u8),
}

/// Pin reference with optional inversion and pull-up
///
/// Parsed from strings such as:
/// - `"D5"` -> alias D5
/// - `"!D5"` -> alias D5, inverted (active-low)
/// - `"^D4"` -> alias D4 with pull-up
/// - `"gpio16"` -> GPIO 16
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String<MAX_PIN_SPEC_LEN>"))]
pub struct PinSpec {
    /// Pin name
    pub name: PinName,
    /// Pin is active-low (inverted)
    pub inverted: bool,
    /// Enable internal pull-up
    pub pull_up: bool,
}

impl PinSpec {
    /// Create a spec for a raw GPIO number
    pub const fn gpio(pin: u8) -> Self {
        Self {
            name: PinName::Gpio(pin),
            inverted: false,
            pull_up: false,
        }
    }

    /// Create a spec for a board alias
    pub fn alias(name: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            name: PinName::Alias(parse_alias(name)?),
            inverted: false,
            pull_up: false,
        })
    }

    /// Mark the pin as active-low
    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    /// Parse a pin spec string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let mut s = s.trim();
        let mut inverted = false;
        let mut pull_up = false;

        // Modifiers may appear in either order
        loop {
            if let Some(rest) = s.strip_prefix('!') {
                inverted = true;
                s = rest;
            } else if let Some(rest) = s.strip_prefix('^') {
                pull_up = true;
                s = rest;
            } else {
                break;
            }
        }

        let name = match s.strip_prefix("gpio") {
            Some(num) => PinName::Gpio(num.parse().map_err(|_| ConfigError::InvalidPin)?),
            None => PinName::Alias(parse_alias(s)?),
        };

        Ok(Self {
            name,
            inverted,
            pull_up,
        })
    }

    /// Check if two specs refer to the same pin name
    pub fn same_pin(&self, other: &PinSpec) -> bool {
        self.name == other.name
    }
}

fn parse_alias(s: &str) -> Result<String<MAX_PIN_NAME_LEN>, ConfigError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ConfigError::InvalidPin);
    }
    let mut name = String::new();
    name.push_str(s).map_err(|_| ConfigError::InvalidPin)?;
    Ok(name)
}

impl fmt::Display for PinSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            f.write_str("!")?;
        }
        if self.pull_up {
            f.write_str("^")?;
        }
        match &self.name {
            PinName::Alias(name) => f.write_str(name),
            PinName::Gpio(num) => write!(f, "gpio{}", num),
        }
    }
}

impl TryFrom<String<MAX_PIN_SPEC_LEN>> for PinSpec {
    type Error = ConfigError;

    fn try_from(s: String<MAX_PIN_SPEC_LEN>) -> Result<Self, Self::Error> {
        PinSpec::parse(&s)
    }
}

#[cfg(feature = "serde")]
impl Serialize for PinSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Digital output
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutputConfig {
    /// Output pin (inversion honoured)
    pub pin: PinSpec,
}

/// Digital input
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InputConfig {
    /// Input pin (inversion and pull-up honoured)
    pub pin: PinSpec,
}

/// Analog input
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalogInputConfig {
    /// Analog-capable pin
    pub pin: PinSpec,
    /// Sampling width in bits
    #[cfg_attr(feature = "serde", serde(default))]
    pub width: Width,
    /// Input attenuation
    #[cfg_attr(feature = "serde", serde(default))]
    pub attenuation: Attenuation,
    /// Reference voltage for threshold decisions (mV)
    #[cfg_attr(feature = "serde", serde(default = "default_vref_mv"))]
    pub vref_mv: u32,
    /// Raw samples averaged per reading
    #[cfg_attr(feature = "serde", serde(default = "default_samples"))]
    pub samples: u32,
}

impl AnalogInputConfig {
    /// Create an analog input with default width, attenuation and vref
    pub fn new(pin: PinSpec) -> Self {
        Self {
            pin,
            width: Width::default(),
            attenuation: Attenuation::default(),
            vref_mv: DEFAULT_VREF_MV,
            samples: DEFAULT_SAMPLES,
        }
    }
}

#[cfg(feature = "serde")]
fn default_vref_mv() -> u32 {
    DEFAULT_VREF_MV
}

#[cfg(feature = "serde")]
fn default_samples() -> u32 {
    DEFAULT_SAMPLES
}

/// Interrupt source
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterruptConfig {
    /// Interrupt-capable pin
    pub pin: PinSpec,
    /// Trigger type
    pub trigger: InterruptType,
}

/// Complete board description
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoardConfig {
    /// Digital outputs
    #[cfg_attr(feature = "serde", serde(default, rename = "output"))]
    pub outputs: Vec<OutputConfig, MAX_OUTPUTS>,
    /// Digital inputs
    #[cfg_attr(feature = "serde", serde(default, rename = "input"))]
    pub inputs: Vec<InputConfig, MAX_INPUTS>,
    /// Analog inputs
    #[cfg_attr(feature = "serde", serde(default))]
    pub analog: Vec<AnalogInputConfig, MAX_ANALOG>,
    /// Interrupt sources
    #[cfg_attr(feature = "serde", serde(default, rename = "interrupt"))]
    pub interrupts: Vec<InterruptConfig, MAX_INTERRUPTS>,
}

impl BoardConfig {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output
    pub fn add_output(&mut self, output: OutputConfig) -> Result<(), ConfigError> {
        self.outputs.push(output).map_err(|_| ConfigError::TooManyItems)
    }

    /// Add an input
    pub fn add_input(&mut self, input: InputConfig) -> Result<(), ConfigError> {
        self.inputs.push(input).map_err(|_| ConfigError::TooManyItems)
    }

    /// Add an analog input
    pub fn add_analog(&mut self, analog: AnalogInputConfig) -> Result<(), ConfigError> {
        self.analog.push(analog).map_err(|_| ConfigError::TooManyItems)
    }

    /// Add an interrupt source
    pub fn add_interrupt(&mut self, interrupt: InterruptConfig) -> Result<(), ConfigError> {
        self.interrupts
            .push(interrupt)
            .map_err(|_| ConfigError::TooManyItems)
    }

    /// Find an output by pin name
    pub fn find_output(&self, name: &str) -> Option<&OutputConfig> {
        self.outputs.iter().find(|o| name_matches(&o.pin, name))
    }

    /// Find an input by pin name
    pub fn find_input(&self, name: &str) -> Option<&InputConfig> {
        self.inputs.iter().find(|i| name_matches(&i.pin, name))
    }

    /// Find an analog input by pin name
    pub fn find_analog(&self, name: &str) -> Option<&AnalogInputConfig> {
        self.analog.iter().find(|a| name_matches(&a.pin, name))
    }

    /// Find an interrupt source by pin name
    pub fn find_interrupt(&self, name: &str) -> Option<&InterruptConfig> {
        self.interrupts.iter().find(|i| name_matches(&i.pin, name))
    }

    /// Check that no pin name is used by more than one entry
    ///
    /// Aliases and raw GPIO numbers are compared by name only; an alias
    /// and the number it resolves to are caught later, when the pin bank
    /// refuses the second claim.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pins = self
            .outputs
            .iter()
            .map(|o| &o.pin)
            .chain(self.inputs.iter().map(|i| &i.pin))
            .chain(self.analog.iter().map(|a| &a.pin))
            .chain(self.interrupts.iter().map(|i| &i.pin));

        for (i, a) in pins.clone().enumerate() {
            if pins.clone().skip(i + 1).any(|b| a.same_pin(b)) {
                return Err(ConfigError::DuplicatePin);
            }
        }
        Ok(())
    }
}

fn name_matches(spec: &PinSpec, name: &str) -> bool {
    match &spec.name {
        PinName::Alias(alias) => alias.as_str() == name,
        PinName::Gpio(num) => name
            .strip_prefix("gpio")
            .and_then(|n| n.parse::<u8>().ok())
            .is_some_and(|n| n == *num),
    }
}
