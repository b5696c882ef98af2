//! ESP32 pin capability table
//!
//! Maps the Arduino-style silkscreen names of the board to GPIO numbers and
//! classifies every GPIO number along five axes: valid, input, output,
//! interrupt and analog. All of it is const data evaluated at compile time;
//! nothing here touches hardware.
//!
//! ```ignore
//! const LED: GpioNum = pins::resolve("D13");
//! const _: () = assert!(pins::is_output(LED));
//! ```

use pinboard_core::config::{PinName, PinSpec};

use crate::adc::channel::{adc1_channel, adc2_channel};

/// GPIO number as used by the ESP32 SDK
pub type GpioNum = i8;

/// Sentinel for a name that resolves to no pin; never a valid pin
pub const NOT_A_PIN: GpioNum = -1;

/// Number of GPIO slots on the ESP32 (not all of them bonded out)
pub const GPIO_COUNT: GpioNum = 40;

/// GPIO 20, 24 and 28..=31 do not exist on the ESP32
const MISSING_MASK: u64 = (1 << 20) | (1 << 24) | (0xF << 28);

const VALID_MASK: u64 = ((1u64 << GPIO_COUNT as u32) - 1) & !MISSING_MASK;

/// GPIO 34..=39 have no output driver and no internal pulls
const INPUT_ONLY_MASK: u64 = 0x3F << 34;

/// GPIO 36 and 39 (SENSOR_VP/VN) are reserved by the radio for interrupts
const NO_INTERRUPT_MASK: u64 = (1 << 36) | (1 << 39);

/// Board aliases, as printed on the silkscreen
const ALIASES: [(&str, GpioNum); 23] = [
    ("D0", 3),
    ("D1", 1),
    ("D2", 26),
    ("D3", 25),
    ("D4", 17),
    ("D5", 16),
    ("D6", 27),
    ("D7", 14),
    ("D8", 12),
    ("D9", 13),
    ("D10", 5),
    ("D11", 23),
    ("D12", 19),
    ("D13", 18),
    ("A0", 39),
    ("A1", 36),
    ("A2", 34),
    ("A3", 35),
    ("A4", 4),
    ("A5", 2),
    ("SDA", 21),
    ("SCL", 22),
    ("OD", 0),
];

const fn str_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn bit(pin: GpioNum) -> u64 {
    if pin < 0 || pin >= GPIO_COUNT {
        0
    } else {
        1u64 << pin as u32
    }
}

/// Resolve a board alias to its GPIO number
///
/// Exact, case-sensitive match. Returns [`NOT_A_PIN`] for unknown names.
pub const fn resolve(name: &str) -> GpioNum {
    let mut i = 0;
    while i < ALIASES.len() {
        if str_eq(ALIASES[i].0, name) {
            return ALIASES[i].1;
        }
        i += 1;
    }
    NOT_A_PIN
}

/// First board alias of a GPIO number, for log output
pub const fn pin_name(pin: GpioNum) -> Option<&'static str> {
    let mut i = 0;
    while i < ALIASES.len() {
        if ALIASES[i].1 == pin {
            return Some(ALIASES[i].0);
        }
        i += 1;
    }
    None
}

/// Check if a GPIO number exists on the chip
pub const fn is_valid(pin: GpioNum) -> bool {
    VALID_MASK & bit(pin) != 0
}

/// Check if a pin can be read
pub const fn is_input(pin: GpioNum) -> bool {
    is_valid(pin)
}

/// Check if a pin can be driven
pub const fn is_output(pin: GpioNum) -> bool {
    is_valid(pin) && INPUT_ONLY_MASK & bit(pin) == 0
}

/// Check if a pin can be both read and driven
pub const fn is_input_and_output(pin: GpioNum) -> bool {
    is_input(pin) && is_output(pin)
}

/// Check if a pin can be read but not driven
pub const fn is_input_only(pin: GpioNum) -> bool {
    is_input(pin) && !is_output(pin)
}

/// Check if a pin can raise a GPIO interrupt
pub const fn is_interrupt_capable(pin: GpioNum) -> bool {
    is_valid(pin) && NO_INTERRUPT_MASK & bit(pin) == 0
}

/// Check if a pin is wired to a converter channel
pub const fn is_analog_capable(pin: GpioNum) -> bool {
    is_valid(pin) && (adc1_channel(pin).is_some() || adc2_channel(pin).is_some())
}

/// Check if internal pull resistors are available on a pin
pub const fn has_pulls(pin: GpioNum) -> bool {
    is_output(pin)
}

/// Capability record of one pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities {
    pub input: bool,
    pub output: bool,
    pub interrupt: bool,
    pub analog: bool,
}

impl Capabilities {
    /// Readable but not drivable
    pub const fn input_only(&self) -> bool {
        self.input && !self.output
    }

    /// Readable and drivable
    pub const fn input_and_output(&self) -> bool {
        self.input && self.output
    }
}

/// Capability record of a pin, or `None` if the pin does not exist
pub const fn capabilities(pin: GpioNum) -> Option<Capabilities> {
    if !is_valid(pin) {
        return None;
    }
    Some(Capabilities {
        input: is_input(pin),
        output: is_output(pin),
        interrupt: is_interrupt_capable(pin),
        analog: is_analog_capable(pin),
    })
}

/// Pin given by number or by board alias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRef<'a> {
    Num(GpioNum),
    Name(&'a str),
}

impl PinRef<'_> {
    /// GPIO number this reference points at, or [`NOT_A_PIN`]
    pub const fn gpio(self) -> GpioNum {
        match self {
            PinRef::Num(pin) => pin,
            PinRef::Name(name) => resolve(name),
        }
    }
}

impl From<GpioNum> for PinRef<'_> {
    fn from(pin: GpioNum) -> Self {
        PinRef::Num(pin)
    }
}

impl<'a> From<&'a str> for PinRef<'a> {
    fn from(name: &'a str) -> Self {
        PinRef::Name(name)
    }
}

impl<'a> From<&'a PinName> for PinRef<'a> {
    fn from(name: &'a PinName) -> Self {
        match name {
            PinName::Alias(alias) => PinRef::Name(alias.as_str()),
            PinName::Gpio(num) => PinRef::Num(GpioNum::try_from(*num).unwrap_or(NOT_A_PIN)),
        }
    }
}

impl<'a> From<&'a PinSpec> for PinRef<'a> {
    fn from(spec: &'a PinSpec) -> Self {
        PinRef::from(&spec.name)
    }
}
