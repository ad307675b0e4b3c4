//! Calendar / real-time counter.
//!
//! The calendar peripheral is a 32-bit seconds counter running from the
//! clock source described in [`clk`](crate::clk). A compare register and a
//! granularity mask raise the alarm interrupt when the masked fields of the
//! counter equal those of the compare value.
//!
//! Normal API calls run on the main execution context; the alarm callback
//! runs on the interrupt context (see [`IrqRegistry`]). The driver does not
//! arbitrate between the two: state shared with a callback must use an
//! interrupt-safe access discipline on the caller side.
//!
//! [`IrqRegistry`]: crate::irq::IrqRegistry

mod alarm;

pub use alarm::{AlarmConfig, AlarmMatch, AlarmMode};

use crate::irq::IrqLine;
use chrono::NaiveDateTime;
use core::fmt;

/// Calendar errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Operation attempted from a state that forbids it.
    State,
    /// Register write was not acknowledged within the synchronization
    /// window.
    ///
    /// The poll bound is set with [`Config::set_sync_poll_limit`].
    Sync,
    /// The hardware handle does not map to a responsive peripheral.
    Handle,
    /// Date-time is not representable in the 32-bit seconds counter.
    Timestamp,
}

/// Calendar register contract.
///
/// The peripheral register layout is hardware specific; the driver only
/// relies on this trait. On target this is implemented over the
/// memory-mapped register block; [`SimRtc`](crate::sim::SimRtc) implements
/// it for host use.
///
/// `COUNT`, `COMP`, and the enable bit are in the RTC clock domain: writes
/// to them are bridged and [`syncbusy`](Self::syncbusy) reads `true` until
/// the bridge acknowledges. The interrupt enable, interrupt flag, and match
/// mask registers take effect immediately.
pub trait Instance {
    /// Returns `true` if the handle maps to a responsive peripheral.
    fn probe(&self) -> bool;
    /// Request a software reset: counter and compare cleared, match mask
    /// disabled, counter stopped.
    fn reset(&self);
    /// Set the counter-run bit.
    fn set_enabled(&self, en: bool);
    /// Read the counter-run bit.
    fn is_enabled(&self) -> bool;
    /// Write the `COUNT` register.
    fn set_count(&self, count: u32);
    /// Read the `COUNT` register.
    fn count(&self) -> u32;
    /// Write the `COMP` register.
    fn set_comp(&self, comp: u32);
    /// Read the `COMP` register.
    fn comp(&self) -> u32;
    /// Write the alarm match mask.
    fn set_alarm_mask(&self, mask: AlarmMatch);
    /// Read the alarm match mask.
    fn alarm_mask(&self) -> AlarmMatch;
    /// Mask or unmask the alarm interrupt.
    fn set_alarm_irq_enabled(&self, en: bool);
    /// Read the alarm interrupt flag.
    fn alarm_flag(&self) -> bool;
    /// Clear the alarm interrupt flag.
    fn clear_alarm_flag(&self);
    /// Returns `true` while a register write is still bridging into the RTC
    /// clock domain.
    fn syncbusy(&self) -> bool;
}

impl<T: Instance + ?Sized> Instance for &T {
    #[inline]
    fn probe(&self) -> bool {
        (**self).probe()
    }
    #[inline]
    fn reset(&self) {
        (**self).reset()
    }
    #[inline]
    fn set_enabled(&self, en: bool) {
        (**self).set_enabled(en)
    }
    #[inline]
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
    #[inline]
    fn set_count(&self, count: u32) {
        (**self).set_count(count)
    }
    #[inline]
    fn count(&self) -> u32 {
        (**self).count()
    }
    #[inline]
    fn set_comp(&self, comp: u32) {
        (**self).set_comp(comp)
    }
    #[inline]
    fn comp(&self) -> u32 {
        (**self).comp()
    }
    #[inline]
    fn set_alarm_mask(&self, mask: AlarmMatch) {
        (**self).set_alarm_mask(mask)
    }
    #[inline]
    fn alarm_mask(&self) -> AlarmMatch {
        (**self).alarm_mask()
    }
    #[inline]
    fn set_alarm_irq_enabled(&self, en: bool) {
        (**self).set_alarm_irq_enabled(en)
    }
    #[inline]
    fn alarm_flag(&self) -> bool {
        (**self).alarm_flag()
    }
    #[inline]
    fn clear_alarm_flag(&self) {
        (**self).clear_alarm_flag()
    }
    #[inline]
    fn syncbusy(&self) -> bool {
        (**self).syncbusy()
    }
}

/// Alarm callback.
///
/// At most one handler is registered per device at a time; registering a new
/// one replaces the prior one. The handler runs on the interrupt context and
/// receives only the device reference; re-read counter or compare state from
/// there if needed.
///
/// # Example
///
/// ```
/// use core::cell::Cell;
/// use saml2x_hal::calendar::{AlarmHandler, Calendar, Instance};
///
/// #[derive(Default)]
/// struct Latch(Cell<bool>);
///
/// impl<R: Instance> AlarmHandler<R> for Latch {
///     fn on_alarm(&self, _cal: &Calendar<R>) {
///         self.0.set(true);
///     }
/// }
/// ```
pub trait AlarmHandler<R: Instance> {
    /// Called once per alarm match dispatched while the device is enabled.
    fn on_alarm(&self, cal: &Calendar<'_, R>);
}

/// Calendar configuration.
///
/// # Example
///
/// ```
/// use saml2x_hal::calendar::{AlarmConfig, AlarmMatch, AlarmMode, Config};
///
/// const CFG: Config = Config::DEFAULT
///     .set_alarm(
///         AlarmConfig::DEFAULT
///             .set_mask(AlarmMatch::Second)
///             .set_mode(AlarmMode::Repeat),
///     )
///     .set_sync_poll_limit(1_000);
/// # assert_eq!(CFG.sync_poll_limit(), 1_000);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    alarm: AlarmConfig,
    sync_poll_limit: u32,
    deinit_while_enabled: bool,
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Config {
    /// Default configuration, as a constant.
    ///
    /// Alarm disabled, 10 000 synchronization polls, deinit-while-enabled
    /// rejected.
    pub const DEFAULT: Self = Self {
        alarm: AlarmConfig::DEFAULT,
        sync_poll_limit: 10_000,
        deinit_while_enabled: false,
    };

    /// Set the alarm configuration applied at [`Calendar::enable`].
    #[must_use = "set_alarm returns a modified Config"]
    pub const fn set_alarm(mut self, alarm: AlarmConfig) -> Self {
        self.alarm = alarm;
        self
    }

    /// Get the alarm configuration.
    #[must_use]
    pub const fn alarm(&self) -> AlarmConfig {
        self.alarm
    }

    /// Set the synchronization poll bound.
    ///
    /// Register writes into the RTC clock domain are polled for completion
    /// at most this many times before the operation fails with
    /// [`Error::Sync`]. A limit of zero fails every synchronized write.
    #[must_use = "set_sync_poll_limit returns a modified Config"]
    pub const fn set_sync_poll_limit(mut self, limit: u32) -> Self {
        self.sync_poll_limit = limit;
        self
    }

    /// Get the synchronization poll bound.
    #[must_use]
    pub const fn sync_poll_limit(&self) -> u32 {
        self.sync_poll_limit
    }

    /// Allow [`Calendar::deinit`] on an enabled device.
    ///
    /// When allowed, deinit disables the device first. Rejected by default
    /// to avoid tearing down a device with a live alarm interrupt.
    #[must_use = "set_deinit_while_enabled returns a modified Config"]
    pub const fn set_deinit_while_enabled(mut self, allow: bool) -> Self {
        self.deinit_while_enabled = allow;
        self
    }

    /// Returns `true` if deinit on an enabled device is allowed.
    #[must_use]
    pub const fn deinit_while_enabled(&self) -> bool {
        self.deinit_while_enabled
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum State {
    Uninit,
    Disabled,
    Enabled,
}

/// Calendar driver.
///
/// One instance per physical peripheral; the register handle is exclusively
/// owned for the lifetime of the driver.
///
/// # Example
///
/// ```
/// use saml2x_hal::{
///     calendar::{Calendar, Config},
///     sim::SimRtc,
/// };
///
/// let rtc = SimRtc::new();
/// let mut cal = Calendar::new(&rtc, Config::default());
/// cal.init()?;
/// cal.enable()?;
/// cal.disable()?;
/// cal.deinit()?;
/// # Ok::<(), saml2x_hal::calendar::Error>(())
/// ```
pub struct Calendar<'h, R: Instance> {
    regs: R,
    cfg: Config,
    alarm: AlarmConfig,
    state: State,
    handler: Option<&'h dyn AlarmHandler<R>>,
    irq: Option<IrqLine>,
}

impl<R: Instance + fmt::Debug> fmt::Debug for Calendar<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calendar")
            .field("regs", &self.regs)
            .field("cfg", &self.cfg)
            .field("alarm", &self.alarm)
            .field("state", &self.state)
            .field("handler", &self.handler.is_some())
            .field("irq", &self.irq)
            .finish()
    }
}

impl<'h, R: Instance> Calendar<'h, R> {
    /// Create a new calendar driver over a register handle.
    ///
    /// The device starts uninitialized; every operation other than
    /// [`init`](Self::init), [`register_callback`](Self::register_callback),
    /// and [`set_irq`](Self::set_irq) is rejected until initialized.
    pub const fn new(regs: R, cfg: Config) -> Self {
        Self {
            regs,
            cfg,
            alarm: cfg.alarm,
            state: State::Uninit,
            handler: None,
            irq: None,
        }
    }

    /// Initialize the peripheral.
    ///
    /// Brings the hardware to a known, stopped, reset-configuration state:
    /// counter cleared, alarm match disabled, interrupt masked.
    ///
    /// # Errors
    ///
    /// * [`Error::Handle`] if the handle does not map to a responsive
    ///   peripheral.
    /// * [`Error::State`] if the device is already initialized, or the
    ///   peripheral counter is already running.
    /// * [`Error::Sync`] if the reset does not synchronize in time.
    pub fn init(&mut self) -> Result<(), Error> {
        if self.state != State::Uninit {
            return Err(Error::State);
        }
        if !self.regs.probe() {
            return Err(Error::Handle);
        }
        if self.regs.is_enabled() {
            return Err(Error::State);
        }

        self.regs.reset();
        self.wait_sync()?;
        self.regs.set_alarm_mask(AlarmMatch::Disabled);
        self.regs.set_alarm_irq_enabled(false);
        self.regs.clear_alarm_flag();

        self.alarm = self.cfg.alarm;
        self.state = State::Disabled;
        Ok(())
    }

    /// Deinitialize the peripheral.
    ///
    /// Clears the callback reference, releases the interrupt association,
    /// and returns the device to the uninitialized state. The device must
    /// be disabled unless [`Config::set_deinit_while_enabled`] opted in, in
    /// which case it is disabled first.
    ///
    /// # Errors
    ///
    /// * [`Error::State`] if the device is uninitialized, or enabled with
    ///   the default deinit policy.
    /// * [`Error::Sync`] if an opted-in disable does not synchronize.
    pub fn deinit(&mut self) -> Result<(), Error> {
        match self.state {
            State::Uninit => return Err(Error::State),
            State::Enabled => {
                if !self.cfg.deinit_while_enabled {
                    return Err(Error::State);
                }
                self.disable()?;
            }
            State::Disabled => {}
        }

        self.handler = None;
        self.irq = None;
        self.state = State::Uninit;
        Ok(())
    }

    /// Start the counter from its current value.
    ///
    /// Unmasks the alarm interrupt if a match granularity other than
    /// [`AlarmMatch::Disabled`] is configured. Enabling an already-enabled
    /// device is a no-op.
    ///
    /// # Errors
    ///
    /// * [`Error::State`] if the device is uninitialized.
    /// * [`Error::Sync`] on synchronization timeout; the device stays
    ///   disabled.
    pub fn enable(&mut self) -> Result<(), Error> {
        match self.state {
            State::Uninit => Err(Error::State),
            State::Enabled => Ok(()),
            State::Disabled => {
                if self.alarm.mask() != AlarmMatch::Disabled {
                    self.regs.set_alarm_mask(self.alarm.mask());
                    self.regs.set_alarm_irq_enabled(true);
                } else {
                    self.regs.set_alarm_irq_enabled(false);
                }
                self.regs.set_enabled(true);
                self.wait_sync()?;
                self.state = State::Enabled;
                Ok(())
            }
        }
    }

    /// Stop the counter and mask the alarm interrupt.
    ///
    /// Counter and compare values are preserved. Disabling an
    /// already-disabled device is a no-op.
    ///
    /// # Errors
    ///
    /// * [`Error::State`] if the device is uninitialized.
    /// * [`Error::Sync`] on synchronization timeout; the device stays
    ///   enabled.
    pub fn disable(&mut self) -> Result<(), Error> {
        match self.state {
            State::Uninit => Err(Error::State),
            State::Disabled => Ok(()),
            State::Enabled => {
                self.regs.set_enabled(false);
                self.regs.set_alarm_irq_enabled(false);
                self.wait_sync()?;
                self.state = State::Disabled;
                Ok(())
            }
        }
    }

    /// Set the counter, in seconds.
    ///
    /// The driver does not validate the new value against an armed compare
    /// value; depending on ordering a match can fire immediately or be
    /// skipped. Sequencing counter writes against the compare value is the
    /// caller's responsibility.
    ///
    /// # Errors
    ///
    /// * [`Error::State`] if the device is uninitialized.
    /// * [`Error::Sync`] on synchronization timeout.
    pub fn set_counter(&mut self, count: u32) -> Result<(), Error> {
        self.require_init()?;
        self.regs.set_count(count);
        self.wait_sync()
    }

    /// Read the counter, in seconds.
    ///
    /// Returns the last-synchronized hardware value: a pending write is
    /// waited out first.
    ///
    /// # Errors
    ///
    /// * [`Error::State`] if the device is uninitialized.
    /// * [`Error::Sync`] on synchronization timeout.
    pub fn counter(&self) -> Result<u32, Error> {
        self.require_init()?;
        self.wait_sync()?;
        Ok(self.regs.count())
    }

    /// Set the alarm compare value, in seconds.
    ///
    /// The granularity mask selects which fields of the compare value
    /// participate in the match; see [`AlarmMatch`].
    ///
    /// # Errors
    ///
    /// * [`Error::State`] if the device is uninitialized.
    /// * [`Error::Sync`] on synchronization timeout.
    pub fn set_comp(&mut self, comp: u32) -> Result<(), Error> {
        self.require_init()?;
        self.regs.set_comp(comp);
        self.wait_sync()
    }

    /// Read the alarm compare value, in seconds.
    ///
    /// # Errors
    ///
    /// * [`Error::State`] if the device is uninitialized.
    /// * [`Error::Sync`] on synchronization timeout.
    pub fn comp(&self) -> Result<u32, Error> {
        self.require_init()?;
        self.wait_sync()?;
        Ok(self.regs.comp())
    }

    /// Reconfigure the alarm.
    ///
    /// Applied to the hardware immediately if the device is enabled,
    /// otherwise at the next [`enable`](Self::enable). This is also the
    /// re-arm path after a oneshot alarm has fired.
    ///
    /// # Errors
    ///
    /// * [`Error::State`] if the device is uninitialized.
    pub fn set_alarm(&mut self, alarm: AlarmConfig) -> Result<(), Error> {
        self.require_init()?;
        self.alarm = alarm;
        if self.state == State::Enabled {
            self.regs.set_alarm_mask(alarm.mask());
            self.regs
                .set_alarm_irq_enabled(alarm.mask() != AlarmMatch::Disabled);
        }
        Ok(())
    }

    /// Get the active alarm configuration.
    ///
    /// After a oneshot alarm fires the mask reads back as
    /// [`AlarmMatch::Disabled`] until reconfigured.
    #[must_use]
    pub fn alarm(&self) -> AlarmConfig {
        self.alarm
    }

    /// Register the alarm callback, replacing any prior one.
    ///
    /// `None` suppresses callback invocation without disabling the hardware
    /// alarm itself. The handler's lifetime is the caller's responsibility.
    pub fn register_callback(&mut self, handler: Option<&'h dyn AlarmHandler<R>>) {
        self.handler = handler;
    }

    /// Associate the device with its interrupt line.
    ///
    /// Must happen after [`init`](Self::init) and before
    /// [`enable`](Self::enable) for the alarm path to function; calling it
    /// again rebinds without error. [`IrqRegistry::bind`] calls this on the
    /// device it binds.
    ///
    /// [`IrqRegistry::bind`]: crate::irq::IrqRegistry::bind
    pub fn set_irq(&mut self, line: IrqLine) {
        self.irq = Some(line);
    }

    /// Get the associated interrupt line, if any.
    #[must_use]
    pub fn irq(&self) -> Option<IrqLine> {
        self.irq
    }

    /// Returns `true` if the counter is running.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state == State::Enabled
    }

    /// Returns `true` if the device has been initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state != State::Uninit
    }

    /// Read the counter as a calendar date and time.
    ///
    /// # Errors
    ///
    /// Same as [`counter`](Self::counter).
    pub fn date_time(&self) -> Result<NaiveDateTime, Error> {
        let count: u32 = self.counter()?;
        // every u32 is a valid number of seconds after the epoch
        Ok(chrono::DateTime::from_timestamp(i64::from(count), 0)
            .unwrap()
            .naive_utc())
    }

    /// Set the counter from a calendar date and time.
    ///
    /// # Errors
    ///
    /// * [`Error::Timestamp`] if the date-time is before 1970-01-01 or past
    ///   the 32-bit counter range.
    /// * Otherwise same as [`set_counter`](Self::set_counter).
    pub fn set_date_time(&mut self, date_time: NaiveDateTime) -> Result<(), Error> {
        let secs: u32 =
            u32::try_from(date_time.and_utc().timestamp()).map_err(|_| Error::Timestamp)?;
        self.set_counter(secs)
    }

    /// Alarm interrupt entry point.
    ///
    /// Called from the interrupt context, normally through
    /// [`IrqRegistry::dispatch`]. Clears the hardware alarm flag and invokes
    /// the registered callback. For a oneshot alarm the match mask is
    /// disabled before the callback runs, so the callback may re-arm via
    /// [`set_alarm`](Self::set_alarm).
    ///
    /// Spurious calls (device not enabled, or flag not set) return without
    /// effect.
    ///
    /// [`IrqRegistry::dispatch`]: crate::irq::IrqRegistry::dispatch
    pub fn on_interrupt(&mut self) {
        if self.state != State::Enabled {
            return;
        }
        if !self.regs.alarm_flag() {
            return;
        }
        self.regs.clear_alarm_flag();

        if self.alarm.mode() == AlarmMode::Oneshot {
            self.alarm = self.alarm.set_mask(AlarmMatch::Disabled);
            self.regs.set_alarm_mask(AlarmMatch::Disabled);
            self.regs.set_alarm_irq_enabled(false);
        }

        if let Some(handler) = self.handler {
            handler.on_alarm(self);
        }
    }

    /// Release the register handle, consuming the driver.
    #[must_use]
    pub fn release(self) -> R {
        self.regs
    }

    fn require_init(&self) -> Result<(), Error> {
        if self.state == State::Uninit {
            Err(Error::State)
        } else {
            Ok(())
        }
    }

    fn wait_sync(&self) -> Result<(), Error> {
        for _ in 0..self.cfg.sync_poll_limit {
            if !self.regs.syncbusy() {
                return Ok(());
            }
        }
        Err(Error::Sync)
    }
}
