//! Calibrated analog input
//!
//! An [`AnalogInput`] binds its pin to a converter channel once, at
//! construction. `init()` programs width and attenuation and captures the
//! calibration curve; after that every reading is the mean of several raw
//! samples mapped through that curve to millivolts.
//!
//! ADC2 shares its hardware with the radio, so single ADC2 samples can fail.
//! Failed samples are left out of the mean; only a reading where every
//! sample failed is an error.

pub mod calibration;
pub mod channel;

use pinboard_core::config::AnalogInputConfig;
pub use pinboard_core::config::{DEFAULT_SAMPLES, DEFAULT_VREF_MV};
use pinboard_hal::{
    AdcDriver, AdcUnit, Attenuation, CalibrationCurve, CalibrationFuses, CalibrationSource,
    HalError, Platform, Result, Width,
};

pub use calibration::{characterize_vref, vref_from_efuse};
pub use channel::{resolve_binding, AdcBinding};

use crate::bank::{PinBank, PinError, PinGuard};
use crate::gpio::PinState;
use crate::pins::{is_analog_capable, GpioNum, PinRef};

/// Construction overrides for an analog input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogConfig {
    pub width: Width,
    pub attenuation: Attenuation,
    /// Threshold for [`AnalogInput::state`] and reference for the curve (mV)
    pub vref_mv: u32,
}

impl Default for AnalogConfig {
    fn default() -> Self {
        Self {
            width: Width::default(),
            attenuation: Attenuation::default(),
            vref_mv: DEFAULT_VREF_MV,
        }
    }
}

/// Calibration captured by `init()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Characteristics {
    /// Factory calibration present in eFuse
    pub fuses: CalibrationFuses,
    pub source: CalibrationSource,
    pub curve: CalibrationCurve,
}

/// Analog input on one converter channel
pub struct AnalogInput<'b, H: Platform> {
    pin: PinGuard<'b, H>,
    binding: AdcBinding,
    config: AnalogConfig,
    samples: u32,
    characteristics: Option<Characteristics>,
}

impl<'b, H: Platform> AnalogInput<'b, H> {
    /// Claim an analog pin with 12-bit width and no attenuation
    ///
    /// # Panics
    ///
    /// Panics if the pin is not wired to a converter channel.
    pub fn new<'n>(
        bank: &'b PinBank<H>,
        pin: impl Into<PinRef<'n>>,
    ) -> core::result::Result<Self, PinError> {
        Self::with_config(bank, pin, AnalogConfig::default())
    }

    /// Claim an analog pin with explicit width, attenuation and vref
    ///
    /// # Panics
    ///
    /// Panics if the pin is not wired to exactly one converter channel.
    pub fn with_config<'n>(
        bank: &'b PinBank<H>,
        pin: impl Into<PinRef<'n>>,
        config: AnalogConfig,
    ) -> core::result::Result<Self, PinError> {
        let gpio = pin.into().gpio();
        assert!(is_analog_capable(gpio), "GPIO {} is not analog-capable", gpio);
        let binding = match resolve_binding(gpio) {
            Some(binding) => binding,
            None => panic!("GPIO {} has no unique converter channel", gpio),
        };

        let pin = bank.claim(gpio)?;
        Ok(Self {
            pin,
            binding,
            config,
            samples: DEFAULT_SAMPLES,
            characteristics: None,
        })
    }

    /// Build an analog input from its board description
    pub fn from_config(
        bank: &'b PinBank<H>,
        config: &AnalogInputConfig,
    ) -> core::result::Result<Self, PinError> {
        let gpio = PinRef::from(&config.pin).gpio();
        if !is_analog_capable(gpio) {
            return Err(PinError::Unsupported);
        }
        let analog = AnalogConfig {
            width: config.width,
            attenuation: config.attenuation,
            vref_mv: config.vref_mv,
        };
        let mut input = Self::with_config(bank, gpio, analog)?;
        input.samples = config.samples;
        Ok(input)
    }

    /// Program the converter and capture the calibration curve
    ///
    /// On failure the handle stays usable and `init()` can be retried;
    /// readings fail until it succeeds.
    pub fn init(&mut self) -> Result<()> {
        self.characteristics = None;

        let hal = self.pin.hal();
        let AdcBinding { unit, channel } = self.binding;
        let AnalogConfig {
            width,
            attenuation,
            vref_mv,
        } = self.config;

        let fuses = hal.calibration_fuses();
        let source = fuses.source();

        let programmed = match unit {
            // ADC1 width is a unit-wide register
            AdcUnit::Adc1 => hal
                .configure_width(unit, width)
                .and_then(|()| hal.configure_channel(unit, channel, attenuation)),
            // ADC2 takes its width with every sample
            AdcUnit::Adc2 => hal.configure_channel(unit, channel, attenuation),
        };
        programmed.inspect_err(|e| {
            error!("GPIO {}: converter setup failed: {:?}", self.pin.pin(), e);
        })?;

        let curve = hal.characterize(unit, attenuation, width, vref_mv);
        info!(
            "GPIO {}: {:?} channel {}, calibration {:?}",
            self.pin.pin(),
            unit,
            channel,
            source
        );

        self.characteristics = Some(Characteristics {
            fuses,
            source,
            curve,
        });
        Ok(())
    }

    /// Averaged, calibrated reading in millivolts
    ///
    /// # Errors
    ///
    /// `HalError::InvalidState` before a successful `init()`, and
    /// `HalError::NoValidSample` if no sample succeeded (including
    /// `samples == 0`).
    pub fn try_sample(&self, samples: u32) -> Result<u32> {
        let characteristics = self.characteristics.ok_or(HalError::InvalidState)?;
        let hal = self.pin.hal();
        let AdcBinding { unit, channel } = self.binding;

        let mut sum: u64 = 0;
        let mut valid: u32 = 0;
        for _ in 0..samples {
            let raw = match unit {
                AdcUnit::Adc1 => Ok(hal.read_adc1(channel)),
                AdcUnit::Adc2 => hal.read_adc2(channel, self.config.width),
            };
            if let Ok(raw) = raw {
                sum += raw as u64;
                valid += 1;
            }
        }

        let failed = samples - valid;
        if failed > 0 {
            warn!(
                "ADC2 channel {}: {} of {} samples failed",
                channel,
                failed,
                samples
            );
        }
        if valid == 0 {
            return Err(HalError::NoValidSample);
        }

        let mean = (sum / valid as u64) as u32;
        Ok(characteristics.curve.raw_to_millivolts(mean))
    }

    /// Averaged, calibrated reading in millivolts, or 0 if nothing could be
    /// read
    ///
    /// A zero here is either a true 0 mV or a failed acquisition; use
    /// [`try_sample`](Self::try_sample) to tell them apart.
    pub fn sample(&self, samples: u32) -> u32 {
        self.try_sample(samples).unwrap_or(0)
    }

    /// Reading with the configured sample count
    pub fn read(&self) -> u32 {
        self.sample(self.samples)
    }

    /// Check if the reading is above the reference voltage
    pub fn state(&self) -> bool {
        self.read() > self.config.vref_mv
    }

    /// Calibration captured by the last successful `init()`
    pub fn characteristics(&self) -> Option<&Characteristics> {
        self.characteristics.as_ref()
    }

    pub fn binding(&self) -> AdcBinding {
        self.binding
    }

    pub fn config(&self) -> &AnalogConfig {
        &self.config
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn pin(&self) -> GpioNum {
        self.pin.pin()
    }
}

impl<H: Platform> PinState for AnalogInput<'_, H> {
    fn state(&self) -> bool {
        AnalogInput::state(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::IsrDispatch;
    use crate::mock::{MockCall, MockPlatform};
    use pinboard_core::config::PinSpec;
    use proptest::prelude::*;

    static DISPATCH: IsrDispatch = IsrDispatch::new();

    fn bank() -> PinBank<MockPlatform> {
        PinBank::with_dispatch(MockPlatform::new(), &DISPATCH)
    }

    #[test]
    fn test_defaults() {
        let bank = bank();
        let a0 = AnalogInput::new(&bank, "A0").unwrap();
        assert_eq!(
            a0.binding(),
            AdcBinding {
                unit: AdcUnit::Adc1,
                channel: 3
            }
        );
        assert_eq!(a0.config().width, Width::Bits12);
        assert_eq!(a0.config().attenuation, Attenuation::Db0);
        assert_eq!(a0.config().vref_mv, 1100);
        assert_eq!(a0.samples(), 10);
        assert!(a0.characteristics().is_none());
    }

    #[test]
    fn test_adc1_init_programs_width_and_channel() {
        let bank = bank();
        let config = AnalogConfig {
            width: Width::Bits10,
            attenuation: Attenuation::Db11,
            ..AnalogConfig::default()
        };
        let mut a2 = AnalogInput::with_config(&bank, "A2", config).unwrap();
        a2.init().unwrap();

        assert_eq!(
            bank.hal().calls().as_slice(),
            &[
                MockCall::ConfigureWidth(AdcUnit::Adc1, Width::Bits10),
                MockCall::ConfigureChannel(AdcUnit::Adc1, 6, Attenuation::Db11),
            ]
        );
        let c = a2.characteristics().unwrap();
        assert_eq!(c.source, CalibrationSource::DefaultVref);
        assert_eq!(c.curve.width, Width::Bits10);
        assert_eq!(c.curve.attenuation, Attenuation::Db11);
    }

    #[test]
    fn test_adc2_init_programs_channel_only() {
        let bank = bank();
        let mut d6 = AnalogInput::new(&bank, "D6").unwrap();
        d6.init().unwrap();
        assert_eq!(
            bank.hal().calls().as_slice(),
            &[MockCall::ConfigureChannel(AdcUnit::Adc2, 7, Attenuation::Db0)]
        );
    }

    #[test]
    fn test_calibration_source_recorded() {
        let bank = bank();
        bank.hal().set_calibration_fuses(CalibrationFuses {
            two_point: true,
            vref: true,
        });
        let mut a0 = AnalogInput::new(&bank, "A0").unwrap();
        a0.init().unwrap();
        let c = a0.characteristics().unwrap();
        assert!(c.fuses.two_point);
        assert_eq!(c.source, CalibrationSource::TwoPoint);
    }

    #[test]
    fn test_failed_init_can_be_retried() {
        let bank = bank();
        let mut a0 = AnalogInput::new(&bank, "A0").unwrap();
        bank.hal().fail_adc_config(Some(HalError::InvalidArg));
        assert_eq!(a0.init(), Err(HalError::InvalidArg));
        assert!(a0.characteristics().is_none());
        assert_eq!(a0.try_sample(4), Err(HalError::InvalidState));
        assert_eq!(a0.sample(4), 0);

        bank.hal().fail_adc_config(None);
        a0.init().unwrap();
        assert!(a0.characteristics().is_some());
    }

    #[test]
    fn test_adc1_mean_through_curve() {
        let bank = bank();
        let mut a0 = AnalogInput::new(&bank, "A0").unwrap();
        a0.init().unwrap();

        for raw in [4000, 4095, 4095, 4090] {
            bank.hal().push_adc1_sample(raw);
        }
        let curve = a0.characteristics().unwrap().curve;
        // (4000 + 4095 + 4095 + 4090) / 4 = 4070
        assert_eq!(a0.sample(4), curve.raw_to_millivolts(4070));
    }

    #[test]
    fn test_zero_samples_reads_zero() {
        let bank = bank();
        let mut a0 = AnalogInput::new(&bank, "A0").unwrap();
        a0.init().unwrap();
        assert_eq!(a0.sample(0), 0);
        assert_eq!(a0.try_sample(0), Err(HalError::NoValidSample));
    }

    #[test]
    fn test_adc2_all_failed_reads_zero() {
        let bank = bank();
        let mut d9 = AnalogInput::new(&bank, "D9").unwrap();
        d9.init().unwrap();
        for _ in 0..3 {
            bank.hal().push_adc2_sample(Err(HalError::Timeout));
        }
        assert_eq!(d9.try_sample(3), Err(HalError::NoValidSample));

        for _ in 0..3 {
            bank.hal().push_adc2_sample(Err(HalError::Busy));
        }
        assert_eq!(d9.sample(3), 0);
    }

    #[test]
    fn test_threshold_state() {
        let bank = bank();
        let config = AnalogConfig {
            attenuation: Attenuation::Db11,
            ..AnalogConfig::default()
        };
        let mut a3 = AnalogInput::with_config(&bank, "A3", config).unwrap();
        a3.init().unwrap();

        // Channel 7 of ADC1; 11 dB spans roughly 0.14 V to 3.4 V
        bank.hal().set_adc_raw(AdcUnit::Adc1, 7, 3000);
        assert!(a3.read() > 1100);
        assert!(PinState::state(&a3));

        bank.hal().set_adc_raw(AdcUnit::Adc1, 7, 100);
        assert!(!a3.state());
    }

    #[test]
    #[should_panic(expected = "not analog-capable")]
    fn test_digital_only_pin_panics() {
        let bank = bank();
        let _ = AnalogInput::new(&bank, "SDA");
    }

    #[test]
    fn test_from_config() {
        let bank = bank();
        let mut config = AnalogInputConfig::new(PinSpec::parse("gpio32").unwrap());
        config.width = Width::Bits9;
        config.samples = 4;

        let input = AnalogInput::from_config(&bank, &config).unwrap();
        assert_eq!(input.binding().channel, 4);
        assert_eq!(input.config().width, Width::Bits9);
        assert_eq!(input.samples(), 4);

        let strapping = AnalogInputConfig::new(PinSpec::parse("A4").unwrap());
        assert_eq!(
            AnalogInput::from_config(&bank, &strapping).err(),
            Some(PinError::Unsupported)
        );
    }

    proptest! {
        #[test]
        fn prop_adc2_failures_excluded_from_mean(
            samples in proptest::collection::vec(proptest::option::of(0u16..4096), 1..20),
        ) {
            let bank = bank();
            let mut d6 = AnalogInput::new(&bank, "D6").unwrap();
            d6.init().unwrap();

            for s in &samples {
                bank.hal().push_adc2_sample(s.ok_or(HalError::Busy));
            }

            let ok: std::vec::Vec<u32> = samples.iter().flatten().map(|&r| r as u32).collect();
            let reading = d6.sample(samples.len() as u32);

            if ok.is_empty() {
                prop_assert_eq!(reading, 0);
            } else {
                let mean = ok.iter().sum::<u32>() / ok.len() as u32;
                let curve = d6.characteristics().unwrap().curve;
                prop_assert_eq!(reading, curve.raw_to_millivolts(mean));
            }
        }
    }
}
