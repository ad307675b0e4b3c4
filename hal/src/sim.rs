//! Host-side model of the calendar peripheral.
//!
//! [`SimRtc`] implements [`Instance`] over plain cells instead of
//! memory-mapped registers: the counter advances under test control via
//! [`advance`](SimRtc::advance), masked matches latch the interrupt flag,
//! and register writes into the counter clock domain take a configurable
//! number of synchronization polls to land. Interior mutability mirrors the
//! register block: the model is shared between the driver under test and
//! the test itself.

use crate::calendar::{AlarmMatch, Instance};
use core::cell::Cell;

/// Simulated calendar register block.
///
/// # Example
///
/// ```
/// use saml2x_hal::{calendar::Instance, sim::SimRtc};
///
/// let rtc = SimRtc::new();
/// rtc.set_enabled(true);
/// rtc.set_comp(30);
/// rtc.set_alarm_mask(saml2x_hal::calendar::AlarmMatch::Second);
///
/// rtc.advance(29);
/// assert!(!rtc.alarm_flag());
/// rtc.advance(1);
/// assert!(rtc.alarm_flag());
/// ```
#[derive(Debug)]
pub struct SimRtc {
    count: Cell<u32>,
    comp: Cell<u32>,
    mask: Cell<AlarmMatch>,
    enabled: Cell<bool>,
    irq_en: Cell<bool>,
    flag: Cell<bool>,
    busy: Cell<u32>,
    write_sync: u32,
    sync_responds: bool,
    present: bool,
}

impl Default for SimRtc {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl SimRtc {
    const fn base(write_sync: u32, sync_responds: bool, present: bool) -> Self {
        Self {
            count: Cell::new(0),
            comp: Cell::new(0),
            mask: Cell::new(AlarmMatch::Disabled),
            enabled: Cell::new(false),
            irq_en: Cell::new(false),
            flag: Cell::new(false),
            busy: Cell::new(0),
            write_sync,
            sync_responds,
            present,
        }
    }

    /// Create a responsive model with a two-poll synchronization window.
    pub const fn new() -> Self {
        Self::base(2, true, true)
    }

    /// Create a responsive model with an `n`-poll synchronization window
    /// per clock-domain register write.
    pub const fn with_write_sync(n: u32) -> Self {
        Self::base(n, true, true)
    }

    /// Create a model whose synchronization never completes.
    ///
    /// Every synchronized operation on the driver times out.
    pub const fn unresponsive() -> Self {
        Self::base(0, false, true)
    }

    /// Create a model that does not respond to a probe.
    ///
    /// Initialization against it fails with a handle error.
    pub const fn absent() -> Self {
        Self::base(0, true, false)
    }

    /// Advance simulated time by `secs` seconds.
    ///
    /// While the counter-run bit is set the counter increments once per
    /// second, evaluating the masked compare on every tick exactly as the
    /// hardware does; a match latches the alarm interrupt flag. With the
    /// counter stopped this is a no-op.
    pub fn advance(&self, secs: u32) {
        for _ in 0..secs {
            if !self.enabled.get() {
                return;
            }
            let count: u32 = self.count.get().wrapping_add(1);
            self.count.set(count);
            if self.mask.get().matches(count, self.comp.get()) {
                self.flag.set(true);
            }
        }
    }

    /// Returns `true` while the interrupt line is asserted: flag latched
    /// and interrupt unmasked.
    #[must_use]
    pub fn irq_asserted(&self) -> bool {
        self.flag.get() && self.irq_en.get()
    }

    fn start_sync(&self) {
        self.busy.set(self.write_sync);
    }
}

impl Instance for SimRtc {
    fn probe(&self) -> bool {
        self.present
    }

    fn reset(&self) {
        self.count.set(0);
        self.comp.set(0);
        self.mask.set(AlarmMatch::Disabled);
        self.enabled.set(false);
        self.irq_en.set(false);
        self.flag.set(false);
        self.start_sync();
    }

    fn set_enabled(&self, en: bool) {
        self.enabled.set(en);
        self.start_sync();
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn set_count(&self, count: u32) {
        self.count.set(count);
        self.start_sync();
    }

    fn count(&self) -> u32 {
        self.count.get()
    }

    fn set_comp(&self, comp: u32) {
        self.comp.set(comp);
        self.start_sync();
    }

    fn comp(&self) -> u32 {
        self.comp.get()
    }

    fn set_alarm_mask(&self, mask: AlarmMatch) {
        self.mask.set(mask);
    }

    fn alarm_mask(&self) -> AlarmMatch {
        self.mask.get()
    }

    fn set_alarm_irq_enabled(&self, en: bool) {
        self.irq_en.set(en);
    }

    fn alarm_flag(&self) -> bool {
        self.flag.get()
    }

    fn clear_alarm_flag(&self) {
        self.flag.set(false);
    }

    fn syncbusy(&self) -> bool {
        if !self.sync_responds {
            return true;
        }
        let busy: u32 = self.busy.get();
        if busy > 0 {
            self.busy.set(busy - 1);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AlarmMatch, Instance, SimRtc};

    #[test]
    fn stopped_counter_holds() {
        let rtc = SimRtc::new();
        rtc.set_count(41);
        rtc.advance(10);
        assert_eq!(rtc.count(), 41);
    }

    #[test]
    fn syncbusy_counts_down() {
        let rtc = SimRtc::with_write_sync(3);
        rtc.set_count(1);
        assert!(rtc.syncbusy());
        assert!(rtc.syncbusy());
        assert!(rtc.syncbusy());
        assert!(!rtc.syncbusy());
    }

    #[test]
    fn match_latches_flag_once_armed() {
        let rtc = SimRtc::new();
        rtc.set_enabled(true);
        rtc.set_comp(5);
        rtc.advance(10);
        // mask disabled, no match
        assert!(!rtc.alarm_flag());

        rtc.set_alarm_mask(AlarmMatch::Year);
        rtc.set_count(4);
        rtc.advance(1);
        assert!(rtc.alarm_flag());
        rtc.clear_alarm_flag();
        assert!(!rtc.alarm_flag());
    }

    #[test]
    fn irq_line_is_masked() {
        let rtc = SimRtc::new();
        rtc.set_enabled(true);
        rtc.set_comp(1);
        rtc.set_alarm_mask(AlarmMatch::Year);
        rtc.advance(1);
        assert!(rtc.alarm_flag());
        assert!(!rtc.irq_asserted());
        rtc.set_alarm_irq_enabled(true);
        assert!(rtc.irq_asserted());
    }
}
