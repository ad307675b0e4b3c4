use chrono::{Datelike, NaiveDateTime, Timelike};

/// Alarm match granularity.
///
/// Selects which fields of the broken-down counter value participate in the
/// compare, cumulatively from the seconds field up. The discriminants are
/// the `MASK.SEL` register field values.
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AlarmMatch {
    /// Alarm disabled.
    #[default]
    Disabled = 0,
    /// Match on seconds.
    Second = 1,
    /// Match on seconds and minutes.
    Minute = 2,
    /// Match on seconds, minutes, and hours.
    Hour = 3,
    /// Match on seconds, minutes, hours, and day.
    Day = 4,
    /// Match on seconds, minutes, hours, day, and month.
    Month = 5,
    /// Match on seconds, minutes, hours, day, month, and year.
    Year = 6,
}

impl AlarmMatch {
    /// Convert from the `MASK.SEL` register field value.
    ///
    /// Returns `None` for reserved field values.
    ///
    /// # Example
    ///
    /// ```
    /// use saml2x_hal::calendar::AlarmMatch;
    ///
    /// assert_eq!(AlarmMatch::from_bits(0), Some(AlarmMatch::Disabled));
    /// assert_eq!(AlarmMatch::from_bits(1), Some(AlarmMatch::Second));
    /// assert_eq!(AlarmMatch::from_bits(7), None);
    /// ```
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Disabled),
            1 => Some(Self::Second),
            2 => Some(Self::Minute),
            3 => Some(Self::Hour),
            4 => Some(Self::Day),
            5 => Some(Self::Month),
            6 => Some(Self::Year),
            _ => None,
        }
    }

    /// `MASK.SEL` register field value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Evaluate the masked compare between a counter value and a compare
    /// value, both in seconds.
    ///
    /// This is the comparison the hardware performs every counter tick.
    ///
    /// # Example
    ///
    /// ```
    /// use saml2x_hal::calendar::AlarmMatch;
    ///
    /// // 30 is 00:00:30, 90 is 00:01:30
    /// assert!(AlarmMatch::Second.matches(90, 30));
    /// assert!(!AlarmMatch::Minute.matches(90, 30));
    /// assert!(AlarmMatch::Year.matches(90, 90));
    /// assert!(!AlarmMatch::Disabled.matches(90, 90));
    /// ```
    #[must_use]
    pub fn matches(self, count: u32, comp: u32) -> bool {
        match self {
            Self::Disabled => false,
            Self::Year => count == comp,
            _ => {
                let count: NaiveDateTime = fields(count);
                let comp: NaiveDateTime = fields(comp);

                let mut eq: bool = count.second() == comp.second();
                if self >= Self::Minute {
                    eq &= count.minute() == comp.minute();
                }
                if self >= Self::Hour {
                    eq &= count.hour() == comp.hour();
                }
                if self >= Self::Day {
                    eq &= count.day() == comp.day();
                }
                if self >= Self::Month {
                    eq &= count.month() == comp.month();
                }
                eq
            }
        }
    }
}

// every u32 is a valid number of seconds after the epoch
fn fields(secs: u32) -> NaiveDateTime {
    chrono::DateTime::from_timestamp(i64::from(secs), 0)
        .unwrap()
        .naive_utc()
}

/// Alarm mode.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmMode {
    /// The alarm fires once, then reads back as disabled until reconfigured.
    #[default]
    Oneshot,
    /// The alarm fires at every boundary matching the granularity mask.
    Repeat,
}

/// Alarm settings.
///
/// # Example
///
/// ```
/// use saml2x_hal::calendar::{AlarmConfig, AlarmMatch, AlarmMode};
///
/// const EVERY_MINUTE: AlarmConfig = AlarmConfig::DEFAULT
///     .set_mask(AlarmMatch::Second)
///     .set_mode(AlarmMode::Repeat);
/// # assert_eq!(EVERY_MINUTE.mask(), AlarmMatch::Second);
/// # assert_eq!(EVERY_MINUTE.mode(), AlarmMode::Repeat);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmConfig {
    mask: AlarmMatch,
    mode: AlarmMode,
}

impl Default for AlarmConfig {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl AlarmConfig {
    /// Default alarm settings, as a constant.
    ///
    /// Match disabled, oneshot mode.
    ///
    /// # Example
    ///
    /// ```
    /// use saml2x_hal::calendar::AlarmConfig;
    ///
    /// assert_eq!(AlarmConfig::DEFAULT, AlarmConfig::default());
    /// ```
    pub const DEFAULT: Self = Self {
        mask: AlarmMatch::Disabled,
        mode: AlarmMode::Oneshot,
    };

    /// Set the match granularity.
    #[must_use = "set_mask returns a modified AlarmConfig"]
    pub const fn set_mask(mut self, mask: AlarmMatch) -> Self {
        self.mask = mask;
        self
    }

    /// Get the match granularity.
    #[must_use]
    pub const fn mask(&self) -> AlarmMatch {
        self.mask
    }

    /// Set the alarm mode.
    #[must_use = "set_mode returns a modified AlarmConfig"]
    pub const fn set_mode(mut self, mode: AlarmMode) -> Self {
        self.mode = mode;
        self
    }

    /// Get the alarm mode.
    #[must_use]
    pub const fn mode(&self) -> AlarmMode {
        self.mode
    }
}
