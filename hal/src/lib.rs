//! SAM L2x calendar/RTC HAL.
//!
//! This crate provides a driver for the calendar peripheral: a 32-bit
//! seconds counter with a compare register and a maskable alarm interrupt.
//! The register block is reached through the [`calendar::Instance`] trait so
//! the driver runs unchanged against real hardware or against the register
//! model in [`sim`].
//!
//! # Example
//!
//! ```
//! use saml2x_hal::{
//!     calendar::{Calendar, Config},
//!     sim::SimRtc,
//! };
//!
//! let rtc = SimRtc::new();
//! let mut cal = Calendar::new(&rtc, Config::default());
//! cal.init()?;
//! cal.set_counter(1_000)?;
//! cal.enable()?;
//! # Ok::<(), saml2x_hal::calendar::Error>(())
//! ```
#![cfg_attr(not(test), no_std)]

pub mod calendar;
pub mod clk;
pub mod irq;
pub mod sim;

pub use chrono;
