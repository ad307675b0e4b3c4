//! Calendar clock configuration.
//!
//! The peripheral's input clock is selected and divided by the generic
//! clock controller at configuration time; the driver consumes the result
//! as compile-time constants and performs no clock-source selection itself.

/// RTC generic clock source frequency in hertz.
pub const GCLK_RTC_HZ: u32 = 32_768;

/// RTC input prescaler.
pub const RTC_PRESCALER: u32 = 32_768;

/// Counter tick rate in hertz.
///
/// # Example
///
/// ```
/// use saml2x_hal::clk::tick_hz;
///
/// // one counter tick per second
/// assert_eq!(tick_hz(), 1);
/// ```
pub const fn tick_hz() -> u32 {
    GCLK_RTC_HZ / RTC_PRESCALER
}
