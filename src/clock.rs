//! Hardware clock access behind a trait.
//!
//! Deployment RTCs report two-digit calendar fields: [`Clock::year`] is
//! years since 2000, everything else is the usual 1-based calendar value.
//! [`FatClock`] bridges the same RTC into [`embedded_sdmmc::TimeSource`]
//! so directory entries carry real modification times.

use embedded_sdmmc::{TimeSource, Timestamp};

/// One snapshot of the six RTC fields, each 0-99.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimeFields {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

/// Read access to a real-time clock.
///
/// `year` is years since 2000 (RTC convention), `month` and `day` are
/// 1-based, the time fields are 0-based.
pub trait Clock {
    fn year(&self) -> u8;
    fn month(&self) -> u8;
    fn day(&self) -> u8;
    fn hours(&self) -> u8;
    fn minutes(&self) -> u8;
    fn seconds(&self) -> u8;

    /// All six fields in one pass. Getters are read in sequence; a read
    /// near a second boundary can mix old and new fields.
    fn fields(&self) -> TimeFields {
        TimeFields {
            year: self.year(),
            month: self.month(),
            day: self.day(),
            hours: self.hours(),
            minutes: self.minutes(),
            seconds: self.seconds(),
        }
    }
}

/// A [`Clock`] that always reports the same fields. Stands in for the RTC
/// before it is configured, and in host tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedClock(pub TimeFields);

impl Clock for FixedClock {
    fn year(&self) -> u8 {
        self.0.year
    }

    fn month(&self) -> u8 {
        self.0.month
    }

    fn day(&self) -> u8 {
        self.0.day
    }

    fn hours(&self) -> u8 {
        self.0.hours
    }

    fn minutes(&self) -> u8 {
        self.0.minutes
    }

    fn seconds(&self) -> u8 {
        self.0.seconds
    }
}

/// Adapts a [`Clock`] to the FAT timestamp convention: years since 1970,
/// zero-indexed month and day. Out-of-range calendar fields saturate
/// rather than wrap.
pub struct FatClock<C>(pub C)
where
    C: Clock;

impl<C> TimeSource for FatClock<C>
where
    C: Clock,
{
    fn get_timestamp(&self) -> Timestamp {
        let f = self.0.fields();
        Timestamp {
            year_since_1970: f.year.saturating_add(30),
            zero_indexed_month: f.month.saturating_sub(1),
            zero_indexed_day: f.day.saturating_sub(1),
            hours: f.hours,
            minutes: f.minutes,
            seconds: f.seconds,
        }
    }
}
