//! Interrupt dispatch.
//!
//! The hardware binds interrupt lines to handlers through a vector table;
//! this module makes the association explicit instead: [`IrqRegistry`] maps
//! interrupt-line identifiers to calendar devices, is populated at bind
//! time, and is consulted by the dispatch layer when a line fires. No
//! hidden global state is involved; on target the registry is expected to
//! live behind a critical section.

use crate::calendar::{Calendar, Instance};
use core::cell::RefCell;

/// Interrupt line identifier.
///
/// The value is the peripheral's interrupt number in the vector table.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqLine(pub u16);

/// Interrupt registry errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// All `CAP` registry slots are bound.
    Full,
}

type Slot<'a, 'h, R> = (IrqLine, &'a RefCell<Calendar<'h, R>>);

/// Registry mapping interrupt lines to calendar devices.
///
/// `CAP` bounds the number of simultaneously bound lines.
///
/// # Example
///
/// ```
/// use core::cell::RefCell;
/// use saml2x_hal::{
///     calendar::{Calendar, Config},
///     irq::{IrqLine, IrqRegistry},
///     sim::SimRtc,
/// };
///
/// const RTC_IRQ: IrqLine = IrqLine(2);
///
/// let rtc = SimRtc::new();
/// let mut cal = Calendar::new(&rtc, Config::default());
/// cal.init()?;
/// let cal = RefCell::new(cal);
///
/// let mut registry: IrqRegistry<&SimRtc, 4> = IrqRegistry::new();
/// registry.bind(RTC_IRQ, &cal).unwrap();
///
/// // dispatch reaches the bound device; unknown lines find nothing
/// assert!(registry.dispatch(RTC_IRQ));
/// assert!(!registry.dispatch(IrqLine(3)));
/// # Ok::<(), saml2x_hal::calendar::Error>(())
/// ```
pub struct IrqRegistry<'a, 'h, R: Instance, const CAP: usize> {
    slots: [Option<Slot<'a, 'h, R>>; CAP],
}

impl<'a, 'h, R: Instance, const CAP: usize> Default for IrqRegistry<'a, 'h, R, CAP> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, 'h, R: Instance, const CAP: usize> IrqRegistry<'a, 'h, R, CAP> {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            slots: [None; CAP],
        }
    }

    /// Bind a device to an interrupt line.
    ///
    /// Records the device's line in its interrupt descriptor (see
    /// [`Calendar::set_irq`]) and enters it into the dispatch table.
    /// Binding a line that is already bound rebinds it without error.
    ///
    /// # Errors
    ///
    /// * [`Error::Full`] if the line is new and every slot is in use.
    pub fn bind(
        &mut self,
        line: IrqLine,
        dev: &'a RefCell<Calendar<'h, R>>,
    ) -> Result<(), Error> {
        dev.borrow_mut().set_irq(line);

        for slot in self.slots.iter_mut() {
            if matches!(slot, Some((bound, _)) if *bound == line) {
                *slot = Some((line, dev));
                return Ok(());
            }
        }
        for slot in self.slots.iter_mut() {
            if slot.is_none() {
                *slot = Some((line, dev));
                return Ok(());
            }
        }
        Err(Error::Full)
    }

    /// Remove the binding for a line, if any.
    ///
    /// Returns `true` if a binding was removed.
    pub fn unbind(&mut self, line: IrqLine) -> bool {
        for slot in self.slots.iter_mut() {
            if matches!(slot, Some((bound, _)) if *bound == line) {
                *slot = None;
                return true;
            }
        }
        false
    }

    /// Dispatch a fired interrupt line to its bound device.
    ///
    /// Locates the device bound to `line` and runs its
    /// [`on_interrupt`](Calendar::on_interrupt) entry. A device whose
    /// interrupt descriptor no longer names `line` (released by
    /// [`deinit`](Calendar::deinit)) is not invoked.
    ///
    /// Returns `true` if a bound device was invoked.
    ///
    /// # Panics
    ///
    /// * The caller must not hold a borrow of the bound device across
    ///   dispatch.
    pub fn dispatch(&self, line: IrqLine) -> bool {
        for (bound, dev) in self.slots.iter().flatten() {
            if *bound == line {
                let mut dev = dev.borrow_mut();
                if dev.irq() == Some(line) {
                    dev.on_interrupt();
                    return true;
                }
            }
        }
        false
    }
}
