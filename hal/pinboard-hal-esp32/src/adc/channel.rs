//! Converter channel resolver
//!
//! Each analog-capable pin is wired to exactly one channel of one of the
//! two converter units. ADC2 channels 0..=3 (GPIO 4, 0, 2, 15) exist in
//! silicon but are strapping or board pins and are never claimed here.

use pinboard_hal::AdcUnit;

use crate::pins::GpioNum;

/// ADC1 channel table: (GPIO, channel)
const ADC1_CHANNELS: [(GpioNum, u8); 8] = [
    (36, 0),
    (37, 1),
    (38, 2),
    (39, 3),
    (32, 4),
    (33, 5),
    (34, 6),
    (35, 7),
];

/// ADC2 channel table: (GPIO, channel)
const ADC2_CHANNELS: [(GpioNum, u8); 6] = [
    (13, 4),
    (12, 5),
    (14, 6),
    (27, 7),
    (25, 8),
    (26, 9),
];

const fn lookup(table: &[(GpioNum, u8)], pin: GpioNum) -> Option<u8> {
    let mut i = 0;
    while i < table.len() {
        if table[i].0 == pin {
            return Some(table[i].1);
        }
        i += 1;
    }
    None
}

/// ADC1 channel of a pin
pub const fn adc1_channel(pin: GpioNum) -> Option<u8> {
    lookup(&ADC1_CHANNELS, pin)
}

/// ADC2 channel of a pin
pub const fn adc2_channel(pin: GpioNum) -> Option<u8> {
    lookup(&ADC2_CHANNELS, pin)
}

const fn tables_disjoint() -> bool {
    let mut i = 0;
    while i < ADC1_CHANNELS.len() {
        if adc2_channel(ADC1_CHANNELS[i].0).is_some() {
            return false;
        }
        i += 1;
    }
    true
}

const _: () = ::core::assert!(tables_disjoint(), "a GPIO appears in both ADC channel tables");

/// Converter unit and unit-local channel a pin is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcBinding {
    pub unit: AdcUnit,
    pub channel: u8,
}

/// Resolve a pin to its converter binding
///
/// Returns `None` for pins without analog capability. A pin claimed by
/// both tables also yields `None` rather than picking a unit.
pub const fn resolve_binding(pin: GpioNum) -> Option<AdcBinding> {
    match (adc1_channel(pin), adc2_channel(pin)) {
        (Some(channel), None) => Some(AdcBinding {
            unit: AdcUnit::Adc1,
            channel,
        }),
        (None, Some(channel)) => Some(AdcBinding {
            unit: AdcUnit::Adc2,
            channel,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::{is_analog_capable, resolve};
    use proptest::prelude::*;

    #[test]
    fn test_a0_is_adc1_channel_3() {
        assert_eq!(
            resolve_binding(resolve("A0")),
            Some(AdcBinding {
                unit: AdcUnit::Adc1,
                channel: 3
            })
        );
    }

    #[test]
    fn test_adc2_pins() {
        let d6 = resolve_binding(resolve("D6")).unwrap();
        assert_eq!(d6.unit, AdcUnit::Adc2);
        assert_eq!(d6.channel, 7);

        assert_eq!(resolve_binding(13).unwrap().channel, 4);
        assert_eq!(resolve_binding(26).unwrap().channel, 9);
    }

    #[test]
    fn test_strapping_pins_unclaimed() {
        for pin in [0, 2, 4, 15] {
            assert_eq!(resolve_binding(pin), None);
            assert!(!is_analog_capable(pin));
        }
    }

    #[test]
    fn test_every_channel_bound_once() {
        for (pin, channel) in ADC1_CHANNELS {
            assert_eq!(resolve_binding(pin).unwrap().channel, channel);
        }
        for (pin, channel) in ADC2_CHANNELS {
            assert_eq!(resolve_binding(pin).unwrap().channel, channel);
        }
    }

    proptest! {
        #[test]
        fn prop_binding_iff_analog(pin in any::<i8>()) {
            prop_assert_eq!(resolve_binding(pin).is_some(), is_analog_capable(pin));
        }

        #[test]
        fn prop_binding_is_single_unit(pin in any::<i8>()) {
            if let Some(binding) = resolve_binding(pin) {
                let expected = match binding.unit {
                    AdcUnit::Adc1 => adc1_channel(pin),
                    AdcUnit::Adc2 => adc2_channel(pin),
                };
                prop_assert_eq!(expected, Some(binding.channel));
                prop_assert!(adc1_channel(pin).is_none() || adc2_channel(pin).is_none());
            }
        }
    }
}
