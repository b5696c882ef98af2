//! In-memory platform for host tests
//!
//! Implements every driver trait over plain state behind a critical-section
//! mutex, so it can be shared between threads the same way the real SDK is
//! shared between tasks and interrupt handlers. Hardware writes are recorded
//! as [`MockCall`]s; converter samples and failures can be scripted, and
//! registered pin handlers can be fired on demand.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::{Deque, Vec};
use pinboard_hal::{
    AdcDriver, AdcUnit, Attenuation, CalibrationCurve, CalibrationFuses, GpioDriver, HalError,
    IsrContext, IsrDriver, IsrFlags, IsrHandler, PinConfig, Result, Width,
};

use crate::adc::calibration::{characterize_vref, vref_from_efuse};

/// Recorded call capacity; later calls are dropped
pub const MAX_CALLS: usize = 128;

/// Scripted samples per converter unit
pub const SCRIPT_LEN: usize = 64;

const PIN_SLOTS: usize = 40;
const ADC1_CHANNELS: usize = 8;
const ADC2_CHANNELS: usize = 10;

/// Hardware write seen by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCall {
    Configure(PinConfig),
    Reset(u8),
    SetLevel(u8, bool),
    ConfigureWidth(AdcUnit, Width),
    ConfigureChannel(AdcUnit, u8, Attenuation),
    InstallIsr(IsrFlags),
    AddHandler(u8),
    RemoveHandler(u8),
    DisableInterrupt(u8),
}

struct State {
    configs: [Option<PinConfig>; PIN_SLOTS],
    levels: u64,
    fail_configure: u64,
    fail_set_level: u64,
    calls: Vec<MockCall, MAX_CALLS>,

    adc1_width: Width,
    adc1_raw: [u16; ADC1_CHANNELS],
    adc2_raw: [u16; ADC2_CHANNELS],
    adc1_script: Deque<u16, SCRIPT_LEN>,
    adc2_script: Deque<Result<u16>, SCRIPT_LEN>,
    fail_adc_config: Option<HalError>,
    fuses: CalibrationFuses,
    efuse_vref: u8,

    isr_installed: bool,
    install_calls: u32,
    fail_next_install: Option<HalError>,
    handlers: [Option<(IsrHandler, IsrContext)>; PIN_SLOTS],
}

impl State {
    fn new() -> Self {
        Self {
            configs: [None; PIN_SLOTS],
            levels: 0,
            fail_configure: 0,
            fail_set_level: 0,
            calls: Vec::new(),
            adc1_width: Width::default(),
            adc1_raw: [0; ADC1_CHANNELS],
            adc2_raw: [0; ADC2_CHANNELS],
            adc1_script: Deque::new(),
            adc2_script: Deque::new(),
            fail_adc_config: None,
            fuses: CalibrationFuses::default(),
            efuse_vref: 0,
            isr_installed: false,
            install_calls: 0,
            fail_next_install: None,
            handlers: [None; PIN_SLOTS],
        }
    }

    fn record(&mut self, call: MockCall) {
        let _ = self.calls.push(call);
    }
}

fn pin_bit(pin: u8) -> u64 {
    if (pin as usize) < PIN_SLOTS {
        1 << pin
    } else {
        0
    }
}

/// Platform double implementing every driver trait
pub struct MockPlatform {
    state: Mutex<CriticalSectionRawMutex, RefCell<State>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State::new())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        self.state.lock(|s| f(&mut s.borrow_mut()))
    }

    /// Hardware writes so far, oldest first
    pub fn calls(&self) -> Vec<MockCall, MAX_CALLS> {
        self.with(|s| s.calls.clone())
    }

    pub fn clear_calls(&self) {
        self.with(|s| s.calls.clear())
    }

    /// Last committed configuration of a pin
    pub fn config(&self, pin: u8) -> Option<PinConfig> {
        self.with(|s| s.configs.get(pin as usize).copied().flatten())
    }

    /// Physical level of a pin (driven or injected)
    pub fn level_of(&self, pin: u8) -> bool {
        self.with(|s| s.levels & pin_bit(pin) != 0)
    }

    /// Inject the physical level seen by an input
    pub fn set_input_level(&self, pin: u8, high: bool) {
        self.with(|s| {
            if high {
                s.levels |= pin_bit(pin);
            } else {
                s.levels &= !pin_bit(pin);
            }
        })
    }

    /// Make every configure of a pin fail
    pub fn fail_configure(&self, pin: u8) {
        self.with(|s| s.fail_configure |= pin_bit(pin))
    }

    /// Make every level write of a pin fail
    pub fn fail_set_level(&self, pin: u8) {
        self.with(|s| s.fail_set_level |= pin_bit(pin))
    }

    /// Steady raw value of a converter channel, used when no script is queued
    pub fn set_adc_raw(&self, unit: AdcUnit, channel: u8, raw: u16) {
        self.with(|s| {
            let slot = match unit {
                AdcUnit::Adc1 => s.adc1_raw.get_mut(channel as usize),
                AdcUnit::Adc2 => s.adc2_raw.get_mut(channel as usize),
            };
            if let Some(slot) = slot {
                *slot = raw;
            }
        })
    }

    /// Queue one ADC1 sample
    pub fn push_adc1_sample(&self, raw: u16) {
        self.with(|s| {
            let _ = s.adc1_script.push_back(raw);
        })
    }

    /// Queue one ADC2 sample or failure
    pub fn push_adc2_sample(&self, sample: Result<u16>) {
        self.with(|s| {
            let _ = s.adc2_script.push_back(sample);
        })
    }

    /// Make converter configuration calls fail
    pub fn fail_adc_config(&self, error: Option<HalError>) {
        self.with(|s| s.fail_adc_config = error)
    }

    pub fn set_calibration_fuses(&self, fuses: CalibrationFuses) {
        self.with(|s| s.fuses = fuses)
    }

    /// Raw eFuse reference voltage field, used when `fuses.vref` is set
    pub fn set_efuse_vref(&self, bits: u8) {
        self.with(|s| s.efuse_vref = bits)
    }

    /// Make the next dispatch install fail
    pub fn fail_next_install(&self, error: HalError) {
        self.with(|s| s.fail_next_install = Some(error))
    }

    /// Pretend something else already installed the dispatch service
    pub fn preinstall_isr_service(&self) {
        self.with(|s| s.isr_installed = true)
    }

    /// Number of install calls, successful or not
    pub fn install_count(&self) -> u32 {
        self.with(|s| s.install_calls)
    }

    pub fn isr_installed(&self) -> bool {
        self.with(|s| s.isr_installed)
    }

    pub fn has_handler(&self, pin: u8) -> bool {
        self.with(|s| matches!(s.handlers.get(pin as usize), Some(Some(_))))
    }

    /// Run the handler registered for a pin, as the interrupt would
    ///
    /// Returns `false` if no handler is registered.
    pub fn fire(&self, pin: u8) -> bool {
        let entry = self.with(|s| s.handlers.get(pin as usize).copied().flatten());
        match entry {
            Some((handler, context)) => {
                handler(context);
                true
            }
            None => false,
        }
    }
}

impl GpioDriver for MockPlatform {
    fn configure(&self, config: &PinConfig) -> Result<()> {
        self.with(|s| {
            if config.pin as usize >= PIN_SLOTS {
                return Err(HalError::InvalidArg);
            }
            if s.fail_configure & pin_bit(config.pin) != 0 {
                return Err(HalError::Fail);
            }
            s.configs[config.pin as usize] = Some(*config);
            s.record(MockCall::Configure(*config));
            Ok(())
        })
    }

    fn reset(&self, pin: u8) {
        self.with(|s| {
            if let Some(slot) = s.configs.get_mut(pin as usize) {
                *slot = None;
            }
            s.levels &= !pin_bit(pin);
            s.record(MockCall::Reset(pin));
        })
    }

    fn level(&self, pin: u8) -> bool {
        self.level_of(pin)
    }

    fn set_level(&self, pin: u8, high: bool) -> Result<()> {
        self.with(|s| {
            if pin as usize >= PIN_SLOTS {
                return Err(HalError::InvalidArg);
            }
            if s.fail_set_level & pin_bit(pin) != 0 {
                return Err(HalError::Fail);
            }
            if high {
                s.levels |= pin_bit(pin);
            } else {
                s.levels &= !pin_bit(pin);
            }
            s.record(MockCall::SetLevel(pin, high));
            Ok(())
        })
    }
}

impl AdcDriver for MockPlatform {
    fn configure_width(&self, unit: AdcUnit, width: Width) -> Result<()> {
        self.with(|s| {
            if let Some(e) = s.fail_adc_config {
                return Err(e);
            }
            if unit == AdcUnit::Adc1 {
                s.adc1_width = width;
            }
            s.record(MockCall::ConfigureWidth(unit, width));
            Ok(())
        })
    }

    fn configure_channel(&self, unit: AdcUnit, channel: u8, attenuation: Attenuation) -> Result<()> {
        self.with(|s| {
            if let Some(e) = s.fail_adc_config {
                return Err(e);
            }
            s.record(MockCall::ConfigureChannel(unit, channel, attenuation));
            Ok(())
        })
    }

    fn read_adc1(&self, channel: u8) -> u16 {
        self.with(|s| {
            let raw = match s.adc1_script.pop_front() {
                Some(raw) => raw,
                None => s.adc1_raw.get(channel as usize).copied().unwrap_or(0),
            };
            raw.min(s.adc1_width.max_raw())
        })
    }

    fn read_adc2(&self, channel: u8, width: Width) -> Result<u16> {
        self.with(|s| {
            let raw = match s.adc2_script.pop_front() {
                Some(sample) => sample?,
                None => s
                    .adc2_raw
                    .get(channel as usize)
                    .copied()
                    .ok_or(HalError::InvalidArg)?,
            };
            Ok(raw.min(width.max_raw()))
        })
    }

    fn calibration_fuses(&self) -> CalibrationFuses {
        self.with(|s| s.fuses)
    }

    fn characterize(
        &self,
        unit: AdcUnit,
        attenuation: Attenuation,
        width: Width,
        vref_mv: u32,
    ) -> CalibrationCurve {
        let (fuses, bits) = self.with(|s| (s.fuses, s.efuse_vref));
        let vref_mv = if fuses.vref {
            vref_from_efuse(bits)
        } else {
            vref_mv
        };
        characterize_vref(unit, attenuation, width, vref_mv)
    }
}

impl IsrDriver for MockPlatform {
    fn install_isr_service(&self, flags: IsrFlags) -> Result<()> {
        self.with(|s| {
            s.install_calls += 1;
            s.record(MockCall::InstallIsr(flags));
            if let Some(e) = s.fail_next_install.take() {
                return Err(e);
            }
            if s.isr_installed {
                return Err(HalError::InvalidState);
            }
            s.isr_installed = true;
            Ok(())
        })
    }

    fn add_isr_handler(&self, pin: u8, handler: IsrHandler, context: IsrContext) -> Result<()> {
        self.with(|s| {
            if !s.isr_installed {
                return Err(HalError::InvalidState);
            }
            let slot = s.handlers.get_mut(pin as usize).ok_or(HalError::InvalidArg)?;
            *slot = Some((handler, context));
            s.record(MockCall::AddHandler(pin));
            Ok(())
        })
    }

    fn remove_isr_handler(&self, pin: u8) -> Result<()> {
        self.with(|s| {
            if !s.isr_installed {
                return Err(HalError::InvalidState);
            }
            let slot = s.handlers.get_mut(pin as usize).ok_or(HalError::InvalidArg)?;
            *slot = None;
            s.record(MockCall::RemoveHandler(pin));
            Ok(())
        })
    }

    fn disable_interrupt(&self, pin: u8) -> Result<()> {
        self.with(|s| {
            if pin as usize >= PIN_SLOTS {
                return Err(HalError::InvalidArg);
            }
            if let Some(Some(config)) = s.configs.get_mut(pin as usize) {
                config.interrupt = pinboard_hal::InterruptType::Disabled;
            }
            s.record(MockCall::DisableInterrupt(pin));
            Ok(())
        })
    }
}
