//! Analog-to-digital converter abstractions
//!
//! Converter units, sampling width, input attenuation and the linear
//! calibration curve that maps a raw conversion code to millivolts.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Raw code range of a 12-bit conversion
pub const RAW_12_BIT_RANGE: u32 = 4096;

/// Fixed-point scale of the curve slope
const COEFF_A_SCALE: u64 = 65536;
const COEFF_A_ROUND: u64 = COEFF_A_SCALE / 2;

/// Converter unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcUnit {
    /// ADC1: unit-wide width register, never contended
    Adc1,
    /// ADC2: width per sample, shared with the radio
    Adc2,
}

/// Sampling resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub enum Width {
    /// 9-bit resolution
    Bits9,
    /// 10-bit resolution
    Bits10,
    /// 11-bit resolution
    Bits11,
    /// 12-bit resolution
    #[default]
    Bits12,
}

impl Width {
    /// Number of bits per sample
    pub const fn bits(self) -> u8 {
        match self {
            Width::Bits9 => 9,
            Width::Bits10 => 10,
            Width::Bits11 => 11,
            Width::Bits12 => 12,
        }
    }

    /// Largest raw code at this width
    pub const fn max_raw(self) -> u16 {
        (1u16 << self.bits()) - 1
    }

    /// Look up a width by bit count
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            9 => Some(Width::Bits9),
            10 => Some(Width::Bits10),
            11 => Some(Width::Bits11),
            12 => Some(Width::Bits12),
            _ => None,
        }
    }
}

/// Bit count that is not a supported sampling width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidWidth(pub u8);

impl fmt::Display for InvalidWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported ADC width: {} bits", self.0)
    }
}

impl TryFrom<u8> for Width {
    type Error = InvalidWidth;

    fn try_from(bits: u8) -> core::result::Result<Self, Self::Error> {
        Width::from_bits(bits).ok_or(InvalidWidth(bits))
    }
}

impl From<Width> for u8 {
    fn from(width: Width) -> u8 {
        width.bits()
    }
}

/// Input attenuation applied before conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Attenuation {
    /// 0 dB, full scale around 1.1 V
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "0dB"))]
    Db0,
    /// 2.5 dB, full scale around 1.5 V
    #[cfg_attr(feature = "serde", serde(rename = "2.5dB"))]
    Db2_5,
    /// 6 dB, full scale around 2.2 V
    #[cfg_attr(feature = "serde", serde(rename = "6dB"))]
    Db6,
    /// 11 dB, full scale around 3.9 V
    #[cfg_attr(feature = "serde", serde(rename = "11dB"))]
    Db11,
}

impl Attenuation {
    /// Index into per-attenuation tables
    pub const fn index(self) -> usize {
        match self {
            Attenuation::Db0 => 0,
            Attenuation::Db2_5 => 1,
            Attenuation::Db6 => 2,
            Attenuation::Db11 => 3,
        }
    }
}

/// Presence of factory calibration data in the chip's eFuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationFuses {
    /// Two-point (low/high) calibration values burned
    pub two_point: bool,
    /// Measured reference voltage burned
    pub vref: bool,
}

/// Where the calibration data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationSource {
    /// Factory two-point values
    TwoPoint,
    /// Factory reference voltage
    EfuseVref,
    /// Nominal reference voltage supplied by the caller
    DefaultVref,
}

impl CalibrationFuses {
    /// Best calibration source these fuses allow
    pub const fn source(&self) -> CalibrationSource {
        if self.two_point {
            CalibrationSource::TwoPoint
        } else if self.vref {
            CalibrationSource::EfuseVref
        } else {
            CalibrationSource::DefaultVref
        }
    }
}

/// Linear raw-code to millivolt mapping
///
/// `mV = (coeff_a * raw12 + 32768) / 65536 + coeff_b`, where `raw12` is
/// the raw code rescaled to 12 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationCurve {
    /// Unit the curve was characterised for
    pub unit: AdcUnit,
    /// Attenuation the curve was characterised for
    pub attenuation: Attenuation,
    /// Width of the raw codes fed to the curve
    pub width: Width,
    /// Reference voltage in mV
    pub vref_mv: u32,
    /// Slope, scaled by 65536
    pub coeff_a: u32,
    /// Offset in mV
    pub coeff_b: u32,
}

impl CalibrationCurve {
    /// Convert a raw code to millivolts
    pub fn raw_to_millivolts(&self, raw: u32) -> u32 {
        let shift = 12 - self.width.bits() as u32;
        let raw12 = raw.saturating_mul(1 << shift).min(RAW_12_BIT_RANGE - 1);
        let scaled = (self.coeff_a as u64 * raw12 as u64 + COEFF_A_ROUND) / COEFF_A_SCALE;
        scaled as u32 + self.coeff_b
    }
}

/// ADC driver
///
/// Raw register-level access to both converter units plus the chip's
/// calibration data.
pub trait AdcDriver {
    /// Program a unit-wide sampling width (ADC1 only on ESP32)
    fn configure_width(&self, unit: AdcUnit, width: Width) -> Result<()>;

    /// Program the attenuation of one channel
    fn configure_channel(&self, unit: AdcUnit, channel: u8, attenuation: Attenuation) -> Result<()>;

    /// Take one raw sample from an ADC1 channel
    ///
    /// ADC1 is never contended, so this cannot fail.
    fn read_adc1(&self, channel: u8) -> u16;

    /// Take one raw sample from an ADC2 channel at the given width
    ///
    /// # Errors
    ///
    /// Returns `HalError::Busy` or `HalError::Timeout` when the radio holds
    /// the converter.
    fn read_adc2(&self, channel: u8, width: Width) -> Result<u16>;

    /// Query which calibration values are burned into eFuse
    fn calibration_fuses(&self) -> CalibrationFuses;

    /// Compute the calibration curve for a unit/attenuation/width
    fn characterize(
        &self,
        unit: AdcUnit,
        attenuation: Attenuation,
        width: Width,
        vref_mv: u32,
    ) -> CalibrationCurve;
}

impl<T: AdcDriver + ?Sized> AdcDriver for &T {
    fn configure_width(&self, unit: AdcUnit, width: Width) -> Result<()> {
        (**self).configure_width(unit, width)
    }

    fn configure_channel(&self, unit: AdcUnit, channel: u8, attenuation: Attenuation) -> Result<()> {
        (**self).configure_channel(unit, channel, attenuation)
    }

    fn read_adc1(&self, channel: u8) -> u16 {
        (**self).read_adc1(channel)
    }

    fn read_adc2(&self, channel: u8, width: Width) -> Result<u16> {
        (**self).read_adc2(channel, width)
    }

    fn calibration_fuses(&self) -> CalibrationFuses {
        (**self).calibration_fuses()
    }

    fn characterize(
        &self,
        unit: AdcUnit,
        attenuation: Attenuation,
        width: Width,
        vref_mv: u32,
    ) -> CalibrationCurve {
        (**self).characterize(unit, attenuation, width, vref_mv)
    }
}
