//! ESP32 reference-voltage characterisation
//!
//! The ESP32 converter response is approximated by a line whose slope is
//! the reference voltage times a per-unit, per-attenuation scale factor,
//! and whose offset is a fixed per-unit, per-attenuation constant. Both
//! tables were measured by the chip vendor across production lots.

use pinboard_core::config::DEFAULT_VREF_MV;
use pinboard_hal::adc::RAW_12_BIT_RANGE;
use pinboard_hal::{AdcUnit, Attenuation, CalibrationCurve, Width};

/// Step of the eFuse reference voltage field (mV per LSB)
const EFUSE_VREF_STEP_MV: u32 = 7;

/// eFuse vref field: 4 magnitude bits plus a sign bit
const EFUSE_VREF_MAGNITUDE: u8 = 0x0F;
const EFUSE_VREF_SIGN: u8 = 0x10;

/// Slope scale per attenuation, indexed by [`Attenuation::index`]
const ADC1_SCALE: [u32; 4] = [57431, 76236, 105481, 196602];
const ADC2_SCALE: [u32; 4] = [57236, 76554, 105867, 195999];

/// Offset (mV) per attenuation
const ADC1_OFFSET: [u32; 4] = [75, 78, 107, 142];
const ADC2_OFFSET: [u32; 4] = [76, 82, 106, 137];

/// Build the calibration curve for a unit and attenuation from a
/// reference voltage
pub fn characterize_vref(
    unit: AdcUnit,
    attenuation: Attenuation,
    width: Width,
    vref_mv: u32,
) -> CalibrationCurve {
    let (scale, offset) = match unit {
        AdcUnit::Adc1 => (ADC1_SCALE, ADC1_OFFSET),
        AdcUnit::Adc2 => (ADC2_SCALE, ADC2_OFFSET),
    };
    let i = attenuation.index();
    let coeff_a = (vref_mv as u64 * scale[i] as u64 / RAW_12_BIT_RANGE as u64) as u32;

    CalibrationCurve {
        unit,
        attenuation,
        width,
        vref_mv,
        coeff_a,
        coeff_b: offset[i],
    }
}

/// Decode the reference voltage burned into eFuse
///
/// The field is sign-magnitude, in steps of 7 mV around 1100 mV.
pub const fn vref_from_efuse(bits: u8) -> u32 {
    let delta = (bits & EFUSE_VREF_MAGNITUDE) as u32 * EFUSE_VREF_STEP_MV;
    if bits & EFUSE_VREF_SIGN != 0 {
        DEFAULT_VREF_MV - delta
    } else {
        DEFAULT_VREF_MV + delta
    }
}
