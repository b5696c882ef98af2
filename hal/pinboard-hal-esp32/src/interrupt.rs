//! Pin interrupt handles and the shared dispatch lifecycle
//!
//! All GPIO interrupts are routed through one dispatch service that has to
//! be installed exactly once per interrupt controller. The first
//! [`Interrupt`] to initialise installs it, choosing edge or level mode
//! from its own trigger; every later handle only attaches its handler. The
//! service stays installed after the last handle is dropped.
//!
//! ```ignore
//! static EVENTS: TaskQueue<IsrContext, 8> = TaskQueue::new(1);
//!
//! fn on_button(ctx: IsrContext) {
//!     let _ = EVENTS.send(ctx);
//! }
//!
//! let mut button = Interrupt::new(&bank, "D2", InterruptType::Falling)?;
//! button.init(on_button)?;
//! ```

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::digital::{ErrorType, InputPin};
use pinboard_core::config::InterruptConfig;
use pinboard_hal::{
    Direction, GpioDriver, HalError, InterruptType, IsrContext, IsrDriver, IsrFlags, IsrHandler,
    PinConfig, Platform, Result,
};

use crate::bank::{PinBank, PinError, PinGuard};
use crate::gpio::PinState;
use crate::pins::{has_pulls, is_interrupt_capable, GpioNum, PinRef};

/// Lifecycle of the shared dispatch service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchState {
    Uninstalled,
    Installed,
}

/// Install-once guard for the shared dispatch service
///
/// The check and the install run inside one critical section, so two
/// handles initialising at the same time install the service once.
pub struct IsrDispatch {
    state: Mutex<CriticalSectionRawMutex, Cell<DispatchState>>,
}

impl IsrDispatch {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(DispatchState::Uninstalled)),
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state.lock(|s| s.get())
    }

    pub fn is_installed(&self) -> bool {
        self.state() == DispatchState::Installed
    }

    /// Install the service unless it is already installed
    ///
    /// A failed install leaves the state `Uninstalled`; the next handle to
    /// initialise tries again.
    fn ensure_installed<D: IsrDriver>(&self, driver: &D, trigger: InterruptType) -> Result<()> {
        self.state.lock(|state| {
            if state.get() == DispatchState::Installed {
                return Ok(());
            }

            let flags = IsrFlags::for_trigger(trigger);
            match driver.install_isr_service(flags) {
                Ok(()) => {
                    info!("GPIO dispatch installed (edge: {})", flags.edge);
                }
                // Installed by someone else before us
                Err(HalError::InvalidState) => {
                    debug!("GPIO dispatch already installed");
                }
                Err(e) => {
                    error!("GPIO dispatch install failed: {:?}", e);
                    return Err(e);
                }
            }
            state.set(DispatchState::Installed);
            Ok(())
        })
    }
}

impl Default for IsrDispatch {
    fn default() -> Self {
        Self::new()
    }
}

static DISPATCH: IsrDispatch = IsrDispatch::new();

/// Dispatch shared by every bank created with [`PinBank::new`]
pub(crate) fn global_dispatch() -> &'static IsrDispatch {
    &DISPATCH
}

/// Pin interrupt source
pub struct Interrupt<'b, H: Platform> {
    pin: PinGuard<'b, H>,
    config: PinConfig,
    inverted: bool,
    registered: bool,
}

impl<'b, H: Platform> Interrupt<'b, H> {
    /// Claim an interrupt-capable pin
    ///
    /// The pin is an input without pull resistors.
    ///
    /// # Panics
    ///
    /// Panics if the pin cannot raise interrupts.
    pub fn new<'n>(
        bank: &'b PinBank<H>,
        pin: impl Into<PinRef<'n>>,
        trigger: InterruptType,
    ) -> core::result::Result<Self, PinError> {
        Self::build(bank, pin.into().gpio(), trigger, false, false)
    }

    /// Build an interrupt source from its board description
    pub fn from_config(
        bank: &'b PinBank<H>,
        config: &InterruptConfig,
    ) -> core::result::Result<Self, PinError> {
        let gpio = PinRef::from(&config.pin).gpio();
        if !is_interrupt_capable(gpio) || (config.pin.pull_up && !has_pulls(gpio)) {
            return Err(PinError::Unsupported);
        }
        Self::build(
            bank,
            gpio,
            config.trigger,
            config.pin.pull_up,
            config.pin.inverted,
        )
    }

    fn build(
        bank: &'b PinBank<H>,
        gpio: GpioNum,
        trigger: InterruptType,
        pull_up: bool,
        inverted: bool,
    ) -> core::result::Result<Self, PinError> {
        assert!(
            is_interrupt_capable(gpio),
            "GPIO {} is not interrupt-capable",
            gpio
        );

        let pin = bank.claim(gpio)?;
        let config = PinConfig::new(pin.num())
            .with_direction(Direction::Input)
            .with_pulls(pull_up, false)
            .with_interrupt(trigger);

        Ok(Self {
            pin,
            config,
            inverted,
            registered: false,
        })
    }

    /// Commit the pin, install the dispatch service if needed and attach
    /// `handler`
    ///
    /// Stops at the first failing step; earlier steps are not undone.
    pub fn init(&mut self, handler: IsrHandler) -> Result<()> {
        self.pin.commit(&self.config)?;

        let hal = self.pin.hal();
        self.pin
            .bank()
            .dispatch()
            .ensure_installed(hal, self.config.interrupt)?;

        let context = IsrContext {
            pin: self.pin.num(),
            trigger: self.config.interrupt,
        };
        hal.add_isr_handler(self.pin.num(), handler, context)
            .inspect_err(|e| error!("GPIO {} handler add failed: {:?}", self.pin.pin(), e))?;

        self.registered = true;
        debug!("GPIO {} handler attached", self.pin.pin());
        Ok(())
    }

    /// Disable the interrupt and detach the handler
    ///
    /// The shared dispatch service stays installed.
    pub fn remove(&mut self) -> Result<()> {
        self.registered = false;
        self.detach()
    }

    fn detach(&self) -> Result<()> {
        let hal = self.pin.hal();
        let num = self.pin.num();
        let disabled = hal.disable_interrupt(num);
        let removed = hal.remove_isr_handler(num);
        trace!("GPIO {} handler detached", self.pin.pin());
        disabled.and(removed)
    }

    /// Read the logical level
    pub fn get(&self) -> bool {
        self.pin.hal().level(self.pin.num()) ^ self.inverted
    }

    /// Check if the handler is attached
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn trigger(&self) -> InterruptType {
        self.config.interrupt
    }

    pub fn pin(&self) -> GpioNum {
        self.pin.pin()
    }

    pub fn config(&self) -> &PinConfig {
        &self.config
    }
}

impl<H: Platform> Drop for Interrupt<'_, H> {
    fn drop(&mut self) {
        if let Err(e) = self.detach() {
            warn!("GPIO {} detach failed: {:?}", self.pin.pin(), e);
        }
    }
}

impl<H: Platform> PinState for Interrupt<'_, H> {
    fn state(&self) -> bool {
        self.get()
    }
}

impl<H: Platform> ErrorType for Interrupt<'_, H> {
    type Error = HalError;
}

impl<H: Platform> InputPin for Interrupt<'_, H> {
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
    use crate::mock::{MockCall, MockPlatform};
    use pinboard_core::config::PinSpec;
    use pinboard_core::messaging::TaskQueue;
    use std::sync::Barrier;

    fn noop(_: IsrContext) {}

    #[test]
    fn test_first_init_installs_with_edge_flags() {
        static DISPATCH: IsrDispatch = IsrDispatch::new();
        let bank = PinBank::with_dispatch(MockPlatform::new(), &DISPATCH);

        let mut button = Interrupt::new(&bank, "D2", InterruptType::Falling).unwrap();
        assert_eq!(DISPATCH.state(), DispatchState::Uninstalled);
        button.init(noop).unwrap();

        assert!(DISPATCH.is_installed());
        assert!(button.is_registered());
        assert_eq!(bank.hal().install_count(), 1);

        let cfg = bank.hal().config(26).unwrap();
        assert_eq!(cfg.direction, Direction::Input);
        assert_eq!(cfg.interrupt, InterruptType::Falling);
        assert!(!cfg.pull_up && !cfg.pull_down);

        let calls = bank.hal().calls();
        assert!(calls.contains(&MockCall::InstallIsr(IsrFlags {
            low_med: true,
            edge: true
        })));
        assert_eq!(calls.last(), Some(&MockCall::AddHandler(26)));
    }

    #[test]
    fn test_level_trigger_installs_level_mode() {
        static DISPATCH: IsrDispatch = IsrDispatch::new();
        let bank = PinBank::with_dispatch(MockPlatform::new(), &DISPATCH);

        let mut alarm = Interrupt::new(&bank, 4i8, InterruptType::LowLevel).unwrap();
        alarm.init(noop).unwrap();
        assert!(bank.hal().calls().contains(&MockCall::InstallIsr(IsrFlags {
            low_med: true,
            edge: false
        })));
    }

    #[test]
    fn test_second_handle_does_not_reinstall() {
        static DISPATCH: IsrDispatch = IsrDispatch::new();
        let bank = PinBank::with_dispatch(MockPlatform::new(), &DISPATCH);

        let mut a = Interrupt::new(&bank, "D2", InterruptType::Rising).unwrap();
        let mut b = Interrupt::new(&bank, "D3", InterruptType::HighLevel).unwrap();
        a.init(noop).unwrap();
        b.init(noop).unwrap();

        assert_eq!(bank.hal().install_count(), 1);
        assert!(bank.hal().has_handler(26));
        assert!(bank.hal().has_handler(25));

        // Handlers are removable independently
        a.remove().unwrap();
        assert!(!a.is_registered());
        assert!(!bank.hal().has_handler(26));
        assert!(bank.hal().has_handler(25));
        assert!(DISPATCH.is_installed());
    }

    #[test]
    fn test_concurrent_init_installs_once() {
        static DISPATCH: IsrDispatch = IsrDispatch::new();
        let bank = PinBank::with_dispatch(MockPlatform::new(), &DISPATCH);
        let barrier = Barrier::new(2);

        std::thread::scope(|s| {
            for pin in [26i8, 25] {
                let bank = &bank;
                let barrier = &barrier;
                s.spawn(move || {
                    let mut irq = Interrupt::new(bank, pin, InterruptType::AnyEdge).unwrap();
                    barrier.wait();
                    irq.init(noop).unwrap();
                    assert!(irq.is_registered());
                    // Keep the handler attached until both threads are done
                    barrier.wait();
                });
            }
        });

        assert_eq!(bank.hal().install_count(), 1);
        assert!(DISPATCH.is_installed());
        // Both handles were dropped at the end of their threads
        assert!(!bank.hal().has_handler(26));
        assert!(!bank.hal().has_handler(25));
    }

    #[test]
    fn test_foreign_install_counts_as_installed() {
        static DISPATCH: IsrDispatch = IsrDispatch::new();
        let bank = PinBank::with_dispatch(MockPlatform::new(), &DISPATCH);
        bank.hal().preinstall_isr_service();

        let mut irq = Interrupt::new(&bank, 5i8, InterruptType::Rising).unwrap();
        irq.init(noop).unwrap();
        assert!(DISPATCH.is_installed());
        assert!(irq.is_registered());
    }

    #[test]
    fn test_failed_install_retried_by_next_init() {
        static DISPATCH: IsrDispatch = IsrDispatch::new();
        let bank = PinBank::with_dispatch(MockPlatform::new(), &DISPATCH);
        bank.hal().fail_next_install(HalError::Fail);

        let mut a = Interrupt::new(&bank, 5i8, InterruptType::Rising).unwrap();
        assert_eq!(a.init(noop), Err(HalError::Fail));
        assert_eq!(DISPATCH.state(), DispatchState::Uninstalled);
        assert!(!a.is_registered());
        // Pin configuration is not rolled back
        assert!(bank.hal().config(5).is_some());

        let mut b = Interrupt::new(&bank, 18i8, InterruptType::Rising).unwrap();
        b.init(noop).unwrap();
        assert_eq!(bank.hal().install_count(), 2);
        assert!(DISPATCH.is_installed());
    }

    #[test]
    fn test_commit_failure_skips_install() {
        static DISPATCH: IsrDispatch = IsrDispatch::new();
        let bank = PinBank::with_dispatch(MockPlatform::new(), &DISPATCH);
        bank.hal().fail_configure(5);

        let mut irq = Interrupt::new(&bank, 5i8, InterruptType::Rising).unwrap();
        assert_eq!(irq.init(noop), Err(HalError::Fail));
        assert_eq!(bank.hal().install_count(), 0);
    }

    #[test]
    fn test_drop_detaches_but_keeps_service() {
        static DISPATCH: IsrDispatch = IsrDispatch::new();
        let bank = PinBank::with_dispatch(MockPlatform::new(), &DISPATCH);
        {
            let mut irq = Interrupt::new(&bank, "D4", InterruptType::Falling).unwrap();
            irq.init(noop).unwrap();
            bank.hal().clear_calls();
        }

        assert_eq!(
            bank.hal().calls().as_slice(),
            &[
                MockCall::DisableInterrupt(17),
                MockCall::RemoveHandler(17),
                MockCall::Reset(17)
            ]
        );
        assert!(DISPATCH.is_installed());
        assert!(bank.hal().isr_installed());
        assert!(bank.is_available(17));
    }

    #[test]
    fn test_handler_feeds_task_queue() {
        static DISPATCH: IsrDispatch = IsrDispatch::new();
        static EVENTS: TaskQueue<IsrContext, 4> = TaskQueue::new(1);

        fn on_edge(ctx: IsrContext) {
            let _ = EVENTS.send(ctx);
        }

        let bank = PinBank::with_dispatch(MockPlatform::new(), &DISPATCH);
        let mut irq = Interrupt::new(&bank, "D2", InterruptType::Falling).unwrap();
        irq.init(on_edge).unwrap();

        assert!(bank.hal().fire(26));
        assert!(bank.hal().fire(26));
        assert_eq!(EVENTS.len(), 2);
        assert_eq!(
            EVENTS.receive(),
            Ok(IsrContext {
                pin: 26,
                trigger: InterruptType::Falling
            })
        );

        drop(irq);
        assert!(!bank.hal().fire(26));
    }

    #[test]
    #[should_panic(expected = "not interrupt-capable")]
    fn test_reserved_pin_panics() {
        static DISPATCH: IsrDispatch = IsrDispatch::new();
        let bank = PinBank::with_dispatch(MockPlatform::new(), &DISPATCH);
        let _ = Interrupt::new(&bank, "A0", InterruptType::Rising);
    }

    #[test]
    fn test_from_config() {
        static DISPATCH: IsrDispatch = IsrDispatch::new();
        let bank = PinBank::with_dispatch(MockPlatform::new(), &DISPATCH);

        let config = InterruptConfig {
            pin: PinSpec::parse("!^D2").unwrap(),
            trigger: InterruptType::AnyEdge,
        };
        let irq = Interrupt::from_config(&bank, &config).unwrap();
        assert_eq!(irq.trigger(), InterruptType::AnyEdge);
        assert!(irq.config().pull_up);

        bank.hal().set_input_level(26, false);
        assert!(irq.get());

        let reserved = InterruptConfig {
            pin: PinSpec::parse("A1").unwrap(),
            trigger: InterruptType::Rising,
        };
        assert_eq!(
            Interrupt::from_config(&bank, &reserved).err(),
            Some(PinError::Unsupported)
        );
    }

    #[test]
    fn test_global_dispatch() {
        let bank = PinBank::new(MockPlatform::new());
        let mut irq = Interrupt::new(&bank, 13i8, InterruptType::Rising).unwrap();
        irq.init(noop).unwrap();
        assert!(global_dispatch().is_installed());
        assert!(core::ptr::eq(bank.dispatch(), global_dispatch()));
    }
}
