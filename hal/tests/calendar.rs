use core::cell::{Cell, RefCell};
use saml2x_hal::{
    calendar::{
        AlarmConfig, AlarmHandler, AlarmMatch, AlarmMode, Calendar, Config, Error, Instance,
    },
    chrono::{NaiveDate, NaiveDateTime},
    clk,
    irq::{self, IrqLine, IrqRegistry},
    sim::SimRtc,
};
use static_assertions::{assert_impl_all, const_assert_eq};

const RTC_IRQ: IrqLine = IrqLine(2);

assert_impl_all!(Error: Copy, Send, Sync);
assert_impl_all!(Config: Copy);
assert_impl_all!(AlarmConfig: Copy);
const_assert_eq!(clk::tick_hz(), 1);

#[derive(Default)]
struct Hits {
    n: Cell<u32>,
    last_count: Cell<Option<u32>>,
}

impl<R: Instance> AlarmHandler<R> for Hits {
    fn on_alarm(&self, cal: &Calendar<R>) {
        self.n.set(self.n.get() + 1);
        self.last_count.set(cal.counter().ok());
    }
}

fn alarm_cfg(mask: AlarmMatch, mode: AlarmMode) -> Config {
    Config::DEFAULT.set_alarm(AlarmConfig::DEFAULT.set_mask(mask).set_mode(mode))
}

#[test]
fn lifecycle_round_trip() {
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::default());

    cal.init().unwrap();
    assert!(cal.is_initialized());
    cal.enable().unwrap();
    assert!(cal.is_enabled());
    cal.disable().unwrap();
    assert!(!cal.is_enabled());
    cal.deinit().unwrap();
    assert!(!cal.is_initialized());

    // a deinitialized device can be brought up again
    cal.init().unwrap();
    assert!(cal.is_initialized());
}

#[test]
fn enable_disable_idempotent() {
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::default());
    cal.init().unwrap();

    cal.enable().unwrap();
    cal.enable().unwrap();
    assert!(cal.is_enabled());
    cal.disable().unwrap();
    cal.disable().unwrap();
    assert!(!cal.is_enabled());
}

#[test]
fn deinit_requires_disabled() {
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::default());
    cal.init().unwrap();
    cal.enable().unwrap();

    assert_eq!(cal.deinit(), Err(Error::State));
    assert!(cal.is_enabled());

    cal.disable().unwrap();
    cal.deinit().unwrap();
    assert!(!cal.is_initialized());
}

#[test]
fn deinit_while_enabled_opt_in() {
    let rtc = SimRtc::new();
    let cfg: Config = Config::DEFAULT.set_deinit_while_enabled(true);
    let mut cal = Calendar::new(&rtc, cfg);
    cal.init().unwrap();
    cal.enable().unwrap();

    cal.deinit().unwrap();
    assert!(!cal.is_initialized());
    // the opted-in deinit stopped the counter first
    assert!(!rtc.is_enabled());
}

#[test]
fn init_rejects_absent_handle() {
    let rtc = SimRtc::absent();
    let mut cal = Calendar::new(&rtc, Config::default());
    assert_eq!(cal.init(), Err(Error::Handle));
    assert!(!cal.is_initialized());
}

#[test]
fn init_rejects_running_peripheral() {
    let rtc = SimRtc::new();
    rtc.set_enabled(true);

    let mut cal = Calendar::new(&rtc, Config::default());
    assert_eq!(cal.init(), Err(Error::State));
}

#[test]
fn double_init_rejected() {
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::default());
    cal.init().unwrap();
    assert_eq!(cal.init(), Err(Error::State));
}

#[test]
fn ops_require_init() {
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::default());

    assert_eq!(cal.enable(), Err(Error::State));
    assert_eq!(cal.disable(), Err(Error::State));
    assert_eq!(cal.deinit(), Err(Error::State));
    assert_eq!(cal.set_counter(1), Err(Error::State));
    assert_eq!(cal.counter(), Err(Error::State));
    assert_eq!(cal.set_comp(1), Err(Error::State));
    assert_eq!(cal.comp(), Err(Error::State));
    assert_eq!(cal.set_alarm(AlarmConfig::DEFAULT), Err(Error::State));
}

#[test]
fn sync_timeout_reported() {
    let rtc = SimRtc::unresponsive();
    let mut cal = Calendar::new(&rtc, Config::default());
    assert_eq!(cal.init(), Err(Error::Sync));

    // a zero poll bound fails every synchronized write
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::DEFAULT.set_sync_poll_limit(0));
    assert_eq!(cal.init(), Err(Error::Sync));

    // synchronization window longer than the poll bound
    let rtc = SimRtc::with_write_sync(100);
    let mut cal = Calendar::new(&rtc, Config::DEFAULT.set_sync_poll_limit(10));
    assert_eq!(cal.init(), Err(Error::Sync));
}

#[test]
fn counter_round_trip() {
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::default());
    cal.init().unwrap();

    for value in [0, 1, 30, u32::MAX] {
        cal.set_counter(value).unwrap();
        assert_eq!(cal.counter(), Ok(value));
    }
}

#[test]
fn comp_round_trip() {
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::default());
    cal.init().unwrap();

    for value in [0, 1, 30, u32::MAX] {
        cal.set_comp(value).unwrap();
        assert_eq!(cal.comp(), Ok(value));
    }
}

#[test]
fn counter_preserved_across_disable() {
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::default());
    cal.init().unwrap();
    cal.set_counter(100).unwrap();
    cal.set_comp(7).unwrap();

    cal.enable().unwrap();
    rtc.advance(5);
    assert_eq!(cal.counter(), Ok(105));

    cal.disable().unwrap();
    rtc.advance(10);
    assert_eq!(cal.counter(), Ok(105));
    assert_eq!(cal.comp(), Ok(7));

    cal.enable().unwrap();
    rtc.advance(1);
    assert_eq!(cal.counter(), Ok(106));
}

#[test]
fn oneshot_alarm_fires_once() {
    let rtc = SimRtc::new();
    let hits = Hits::default();
    let mut cal = Calendar::new(&rtc, alarm_cfg(AlarmMatch::Second, AlarmMode::Oneshot));
    cal.init().unwrap();
    cal.register_callback(Some(&hits));
    let cal = RefCell::new(cal);

    let mut registry: IrqRegistry<&SimRtc, 4> = IrqRegistry::new();
    registry.bind(RTC_IRQ, &cal).unwrap();

    cal.borrow_mut().set_comp(30).unwrap();
    cal.borrow_mut().enable().unwrap();

    rtc.advance(30);
    assert!(rtc.irq_asserted());
    assert!(registry.dispatch(RTC_IRQ));
    assert_eq!(hits.n.get(), 1);
    assert_eq!(hits.last_count.get(), Some(30));

    // the match is disarmed until reconfigured
    assert_eq!(cal.borrow().alarm().mask(), AlarmMatch::Disabled);
    rtc.advance(120);
    assert!(!rtc.irq_asserted());
    assert!(registry.dispatch(RTC_IRQ));
    assert_eq!(hits.n.get(), 1);
}

#[test]
fn repeat_alarm_fires_every_boundary() {
    let rtc = SimRtc::new();
    let hits = Hits::default();
    let mut cal = Calendar::new(&rtc, alarm_cfg(AlarmMatch::Second, AlarmMode::Repeat));
    cal.init().unwrap();
    cal.register_callback(Some(&hits));
    let cal = RefCell::new(cal);

    let mut registry: IrqRegistry<&SimRtc, 4> = IrqRegistry::new();
    registry.bind(RTC_IRQ, &cal).unwrap();

    cal.borrow_mut().set_comp(30).unwrap();
    cal.borrow_mut().enable().unwrap();

    // seconds field matches at 30, 90, 150, ...
    rtc.advance(30);
    registry.dispatch(RTC_IRQ);
    assert_eq!(hits.n.get(), 1);

    rtc.advance(59);
    assert!(!rtc.irq_asserted());
    rtc.advance(1);
    registry.dispatch(RTC_IRQ);
    assert_eq!(hits.n.get(), 2);

    rtc.advance(60);
    registry.dispatch(RTC_IRQ);
    assert_eq!(hits.n.get(), 3);
    assert_eq!(cal.borrow().alarm().mask(), AlarmMatch::Second);
}

#[test]
fn null_callback_suppresses_dispatch() {
    let rtc = SimRtc::new();
    let hits = Hits::default();
    let mut cal = Calendar::new(&rtc, alarm_cfg(AlarmMatch::Second, AlarmMode::Repeat));
    cal.init().unwrap();
    cal.register_callback(Some(&hits));
    cal.register_callback(None);
    let cal = RefCell::new(cal);

    let mut registry: IrqRegistry<&SimRtc, 4> = IrqRegistry::new();
    registry.bind(RTC_IRQ, &cal).unwrap();

    cal.borrow_mut().set_comp(30).unwrap();
    cal.borrow_mut().enable().unwrap();

    rtc.advance(30);
    // the hardware alarm still fired, only the callback is suppressed
    assert!(rtc.irq_asserted());
    assert!(registry.dispatch(RTC_IRQ));
    assert_eq!(hits.n.get(), 0);
    assert!(!rtc.irq_asserted());
}

#[test]
fn callback_replacement() {
    let rtc = SimRtc::new();
    let first = Hits::default();
    let second = Hits::default();
    let mut cal = Calendar::new(&rtc, alarm_cfg(AlarmMatch::Second, AlarmMode::Repeat));
    cal.init().unwrap();
    cal.register_callback(Some(&first));
    let cal = RefCell::new(cal);

    let mut registry: IrqRegistry<&SimRtc, 4> = IrqRegistry::new();
    registry.bind(RTC_IRQ, &cal).unwrap();

    cal.borrow_mut().set_comp(30).unwrap();
    cal.borrow_mut().enable().unwrap();

    rtc.advance(30);
    registry.dispatch(RTC_IRQ);
    assert_eq!(first.n.get(), 1);

    cal.borrow_mut().register_callback(Some(&second));
    rtc.advance(60);
    registry.dispatch(RTC_IRQ);
    assert_eq!(first.n.get(), 1);
    assert_eq!(second.n.get(), 1);
}

#[test]
fn rearm_after_oneshot() {
    let rtc = SimRtc::new();
    let hits = Hits::default();
    let mut cal = Calendar::new(&rtc, alarm_cfg(AlarmMatch::Second, AlarmMode::Oneshot));
    cal.init().unwrap();
    cal.register_callback(Some(&hits));
    let cal = RefCell::new(cal);

    let mut registry: IrqRegistry<&SimRtc, 4> = IrqRegistry::new();
    registry.bind(RTC_IRQ, &cal).unwrap();

    cal.borrow_mut().set_comp(30).unwrap();
    cal.borrow_mut().enable().unwrap();

    rtc.advance(30);
    registry.dispatch(RTC_IRQ);
    assert_eq!(hits.n.get(), 1);

    cal.borrow_mut()
        .set_alarm(
            AlarmConfig::DEFAULT
                .set_mask(AlarmMatch::Second)
                .set_mode(AlarmMode::Oneshot),
        )
        .unwrap();

    rtc.advance(60);
    registry.dispatch(RTC_IRQ);
    assert_eq!(hits.n.get(), 2);
}

#[test]
fn registry_rebind_and_unbind() {
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::default());
    cal.init().unwrap();
    let cal = RefCell::new(cal);

    let mut registry: IrqRegistry<&SimRtc, 2> = IrqRegistry::new();
    registry.bind(RTC_IRQ, &cal).unwrap();
    // rebinding the same line is not an error and does not take a new slot
    registry.bind(RTC_IRQ, &cal).unwrap();
    assert_eq!(cal.borrow().irq(), Some(RTC_IRQ));

    assert!(registry.unbind(RTC_IRQ));
    assert!(!registry.unbind(RTC_IRQ));
    assert!(!registry.dispatch(RTC_IRQ));
}

#[test]
fn registry_full() {
    let rtc_a = SimRtc::new();
    let rtc_b = SimRtc::new();
    let cal_a = RefCell::new(Calendar::new(&rtc_a, Config::default()));
    let cal_b = RefCell::new(Calendar::new(&rtc_b, Config::default()));

    let mut registry: IrqRegistry<&SimRtc, 1> = IrqRegistry::new();
    registry.bind(IrqLine(2), &cal_a).unwrap();
    assert_eq!(registry.bind(IrqLine(3), &cal_b), Err(irq::Error::Full));
}

#[test]
fn deinit_releases_irq_association() {
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::default());
    cal.init().unwrap();
    let cal = RefCell::new(cal);

    let mut registry: IrqRegistry<&SimRtc, 4> = IrqRegistry::new();
    registry.bind(RTC_IRQ, &cal).unwrap();
    assert_eq!(cal.borrow().irq(), Some(RTC_IRQ));

    cal.borrow_mut().deinit().unwrap();
    assert_eq!(cal.borrow().irq(), None);
    // the stale table entry no longer reaches the device
    assert!(!registry.dispatch(RTC_IRQ));
}

#[test]
fn date_time_round_trip() {
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::default());
    cal.init().unwrap();

    let dt: NaiveDateTime = NaiveDate::from_ymd_opt(2021, 10, 20)
        .unwrap()
        .and_hms_opt(12, 2, 5)
        .unwrap();
    cal.set_date_time(dt).unwrap();
    assert_eq!(cal.counter(), Ok(1_634_731_325));
    assert_eq!(cal.date_time(), Ok(dt));
}

#[test]
fn date_time_out_of_range() {
    let rtc = SimRtc::new();
    let mut cal = Calendar::new(&rtc, Config::default());
    cal.init().unwrap();

    let before_epoch: NaiveDateTime = NaiveDate::from_ymd_opt(1969, 12, 31)
        .unwrap()
        .and_hms_opt(23, 59, 59)
        .unwrap();
    assert_eq!(cal.set_date_time(before_epoch), Err(Error::Timestamp));

    let past_counter_range: NaiveDateTime = NaiveDate::from_ymd_opt(2200, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(cal.set_date_time(past_counter_range), Err(Error::Timestamp));
}
