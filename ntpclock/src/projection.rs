//! Wall-clock projection of a synchronized epoch
//!
//! Everything here is a pure function of a [`SynchronizedEpoch`], the user time
//! offset and the current monotonic counter reading.
use core::fmt::{Display, Formatter};

use crate::SynchronizedEpoch;

pub(crate) const SECONDS_PER_MINUTE: u64 = 60;
pub(crate) const SECONDS_PER_HOUR: u64 = 3_600;
pub(crate) const SECONDS_PER_DAY: u64 = 86_400;
pub(crate) const MSEC_IN_SEC: u32 = 1_000;
const EPOCH_YEAR: u32 = 1970;
// every 400 consecutive Gregorian years hold exactly 97 leap years
const DAYS_PER_400_YEARS: u64 = 146_097;
const MONTH_DAYS: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Seconds since UNIX EPOCH extrapolated from `epoch` to `now_millis`, plus `offset_seconds`.
///
/// A negative offset larger than the epoch itself saturates at zero.
#[must_use]
pub fn current_epoch_seconds(
    epoch: &SynchronizedEpoch,
    offset_seconds: i32,
    now_millis: u32,
) -> u64 {
    let elapsed = u64::from(epoch.elapsed_millis(now_millis) / MSEC_IN_SEC);

    epoch
        .epoch_seconds
        .saturating_add(elapsed)
        .saturating_add_signed(i64::from(offset_seconds))
}

/// Hour of the day, `0..24`
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn hours(epoch_seconds: u64) -> u8 {
    ((epoch_seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR) as u8
}

/// Minute of the hour, `0..60`
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn minutes(epoch_seconds: u64) -> u8 {
    ((epoch_seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE) as u8
}

/// Second of the minute, `0..60`
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn seconds(epoch_seconds: u64) -> u8 {
    (epoch_seconds % SECONDS_PER_MINUTE) as u8
}

/// Proleptic Gregorian leap year rule
#[must_use]
pub fn is_leap_year(year: u32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_year(year: u32) -> u64 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

fn days_in_month(year: u32, month_index: usize) -> u8 {
    if month_index == 1 && is_leap_year(year) {
        29
    } else {
        MONTH_DAYS[month_index]
    }
}

/// Gregorian calendar date
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Date {
    pub year: u32,
    /// `1..=12`
    pub month: u8,
    /// `1..=31`
    pub day: u8,
}

impl Date {
    /// Last representable date, returned for instants past the end of year `u32::MAX`
    pub const MAX: Date = Date {
        year: u32::MAX,
        month: 12,
        day: 31,
    };
}

/// Convert seconds since UNIX EPOCH into a calendar date.
///
/// Skips whole 400-year cycles, walks forward one year at a time within the
/// last cycle, then one month at a time within the final year. Instants past
/// the end of year `u32::MAX` saturate at [`Date::MAX`].
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn calendar_date(epoch_seconds: u64) -> Date {
    let total_days = epoch_seconds / SECONDS_PER_DAY;
    let mut days = total_days % DAYS_PER_400_YEARS;

    let Some(mut year) = u32::try_from(total_days / DAYS_PER_400_YEARS)
        .ok()
        .and_then(|cycles| cycles.checked_mul(400))
        .and_then(|years| years.checked_add(EPOCH_YEAR))
    else {
        return Date::MAX;
    };

    while days >= days_in_year(year) {
        days -= days_in_year(year);
        year = match year.checked_add(1) {
            Some(next) => next,
            None => return Date::MAX,
        };
    }

    let mut month_index = 0;

    while month_index < MONTH_DAYS.len() - 1 {
        let length = u64::from(days_in_month(year, month_index));

        if days < length {
            break;
        }
        days -= length;
        month_index += 1;
    }

    Date {
        year,
        month: month_index as u8 + 1,
        day: days as u8 + 1,
    }
}

/// Time of day rendered as `HH:MM:SS`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClockTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl ClockTime {
    #[must_use]
    pub fn from_epoch(epoch_seconds: u64) -> Self {
        ClockTime {
            hours: hours(epoch_seconds),
            minutes: minutes(epoch_seconds),
            seconds: seconds(epoch_seconds),
        }
    }
}

impl Display for ClockTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Date and time rendered as ISO 8601 `YYYY-MM-DDTHH:MM:SSZ`
///
/// The `Z` designator is always printed, even when the value was projected with
/// a non-zero time offset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IsoDateTime {
    pub date: Date,
    pub time: ClockTime,
}

impl IsoDateTime {
    #[must_use]
    pub fn from_epoch(epoch_seconds: u64) -> Self {
        IsoDateTime {
            date: calendar_date(epoch_seconds),
            time: ClockTime::from_epoch(epoch_seconds),
        }
    }
}

impl Display for IsoDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{}Z",
            self.date.year, self.date.month, self.date.day, self.time
        )
    }
}
