//! Creation timestamps as stored in directory entries.
//!
//! Both values are packed into 16 bits:
//! - time: `hour << 11 | min << 5 | sec >> 1` (two-second resolution)
//! - date: `(year - 1980) << 9 | month << 5 | day`

use chrono::{Datelike, Local, Timelike};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Date {
    /// Valid range is [1980, 2107].
    year: u16,
    /// Valid range is [1, 12].
    month: u8,
    /// Valid range is [1, 31].
    day: u8,
}

impl Date {
    pub const MIN_YEAR: u16 = 1980;
    pub const MAX_YEAR: u16 = 2107;

    /// Creates a new `Date`, clamping the year into the encodable range.
    ///
    /// # Panics
    ///
    /// Panics if month or day are out of range.
    #[must_use]
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        assert!((1..=12).contains(&month), "month out of range");
        assert!((1..=31).contains(&day), "day out of range");
        let year = year.clamp(Self::MIN_YEAR, Self::MAX_YEAR);
        Self { year, month, day }
    }

    #[must_use]
    pub fn pack(self) -> u16 {
        ((self.year - Self::MIN_YEAR) << 9) | (u16::from(self.month) << 5) | u16::from(self.day)
    }

    #[must_use]
    pub fn unpack(raw: u16) -> Self {
        Self {
            year: (raw >> 9) + Self::MIN_YEAR,
            month: ((raw >> 5) & 0xF) as u8,
            day: (raw & 0x1F) as u8,
        }
    }

    #[must_use]
    #[inline]
    pub const fn year(&self) -> u16 {
        self.year
    }

    #[must_use]
    #[inline]
    pub const fn month(&self) -> u8 {
        self.month
    }

    #[must_use]
    #[inline]
    pub const fn day(&self) -> u8 {
        self.day
    }
}

impl core::fmt::Display for Date {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Time {
    hour: u8,
    min: u8,
    sec: u8,
}

impl Time {
    /// # Panics
    ///
    /// Panics if one of provided arguments is out of the supported range.
    #[must_use]
    pub fn new(hour: u8, min: u8, sec: u8) -> Self {
        assert!(hour <= 23 && min <= 59 && sec <= 59, "time out of range");
        Self { hour, min, sec }
    }

    /// Odd seconds are lost.
    #[must_use]
    pub fn pack(self) -> u16 {
        (u16::from(self.hour) << 11) | (u16::from(self.min) << 5) | (u16::from(self.sec) >> 1)
    }

    #[must_use]
    pub fn unpack(raw: u16) -> Self {
        Self {
            hour: (raw >> 11) as u8,
            min: ((raw >> 5) & 0x3F) as u8,
            sec: ((raw & 0x1F) << 1) as u8,
        }
    }

    #[must_use]
    #[inline]
    pub const fn hour(&self) -> u8 {
        self.hour
    }

    #[must_use]
    #[inline]
    pub const fn min(&self) -> u8 {
        self.min
    }

    #[must_use]
    #[inline]
    pub const fn sec(&self) -> u8 {
        self.sec
    }
}

impl core::fmt::Display for Time {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.min, self.sec)
    }
}

/// A current time and date provider.
pub trait TimeProvider {
    fn current_date(&self) -> Date;
    fn current_time(&self) -> Time;
}

/// Wall clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl TimeProvider for LocalClock {
    fn current_date(&self) -> Date {
        let now = Local::now();
        let year = u16::try_from(now.year()).unwrap_or(Date::MIN_YEAR);
        Date::new(year, now.month() as u8, now.day() as u8)
    }

    fn current_time(&self) -> Time {
        let now = Local::now();
        // Leap seconds show up as second 60.
        Time::new(now.hour() as u8, now.minute() as u8, now.second().min(59) as u8)
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    date: Date,
    time: Time,
}

impl FixedClock {
    #[must_use]
    pub const fn new(date: Date, time: Time) -> Self {
        Self { date, time }
    }
}

impl Default for FixedClock {
    /// 1980-01-01 00:00:00, the smallest encodable instant.
    fn default() -> Self {
        Self::new(Date::new(Date::MIN_YEAR, 1, 1), Time::new(0, 0, 0))
    }
}

impl TimeProvider for FixedClock {
    fn current_date(&self) -> Date {
        self.date
    }

    fn current_time(&self) -> Time {
        self.time
    }
}
