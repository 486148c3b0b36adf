//! Daylight-saving correction from two bias scalars.
//!
//! Biases follow the Windows convention: `utc = local + bias`, in minutes.
//! A zone one hour east of UTC has a standard bias of `-60` and, with
//! summer time, a daylight bias of `-60` on top of it.

use jiff::civil::{Date, DateTime, Time};
use jiff::SignedDuration;

use crate::calendar::nth_weekday;
use crate::error::ExpandError;
use crate::model::{Month, Weekday, WeekdayOrdinal};

/// A yearly switch moment: the `ordinal` `weekday` of `month` at `time`.
///
/// `Fifth` means the last such weekday when the month has only four.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionRule {
    pub month: Month,
    pub ordinal: WeekdayOrdinal,
    pub weekday: Weekday,
    pub time: Time,
}

impl TransitionRule {
    pub const fn new(month: Month, ordinal: WeekdayOrdinal, weekday: Weekday, time: Time) -> Self {
        Self {
            month,
            ordinal,
            weekday,
            time,
        }
    }

    /// The wall-clock moment of this transition in `year`.
    pub fn in_year(&self, year: i16) -> Option<DateTime> {
        let first = Date::new(year, self.month.number(), 1).ok()?;
        let day = nth_weekday(first, self.ordinal, self.weekday).or_else(|| match self.ordinal {
            WeekdayOrdinal::Fifth => nth_weekday(first, WeekdayOrdinal::Last, self.weekday),
            _ => None,
        })?;
        Some(day.to_datetime(self.time))
    }
}

/// When daylight time starts and ends each year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DaylightRule {
    pub start: TransitionRule,
    pub end: TransitionRule,
}

impl Default for DaylightRule {
    /// Last Sunday of March 02:00 to last Sunday of October 03:00.
    fn default() -> Self {
        Self {
            start: TransitionRule::new(
                Month::March,
                WeekdayOrdinal::Last,
                Weekday::Sunday,
                Time::constant(2, 0, 0, 0),
            ),
            end: TransitionRule::new(
                Month::October,
                WeekdayOrdinal::Last,
                Weekday::Sunday,
                Time::constant(3, 0, 0, 0),
            ),
        }
    }
}

impl DaylightRule {
    /// Whether `dt` falls in `[start, end)` of its own year.
    ///
    /// A start later in the year than the end (southern hemisphere) wraps
    /// around the new year.
    pub fn contains(&self, dt: DateTime) -> bool {
        let year = dt.date().year();
        let (Some(start), Some(end)) = (self.start.in_year(year), self.end.in_year(year)) else {
            return false;
        };
        if start <= end {
            start <= dt && dt < end
        } else {
            !(end <= dt && dt < start)
        }
    }
}

/// Standard and daylight bias for the one timezone governing a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimezoneBias {
    pub standard_minutes: i32,
    /// Added to the standard bias inside the daylight window. Zero means the
    /// zone observes no daylight time.
    pub daylight_minutes: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rule: DaylightRule,
}

impl TimezoneBias {
    pub fn new(standard_minutes: i32, daylight_minutes: i32) -> Self {
        Self {
            standard_minutes,
            daylight_minutes,
            rule: DaylightRule::default(),
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: DaylightRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn is_daylight(&self, local: DateTime) -> bool {
        self.daylight_minutes != 0 && self.rule.contains(local)
    }

    /// Effective bias at the wall-clock time `local`.
    pub fn bias_at(&self, local: DateTime) -> i32 {
        if self.is_daylight(local) {
            self.standard_minutes + self.daylight_minutes
        } else {
            self.standard_minutes
        }
    }
}

/// Moves generated occurrences so they keep the anchor's absolute time of
/// day across daylight transitions.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneAdjuster {
    bias: TimezoneBias,
    anchor_bias: i32,
}

impl TimezoneAdjuster {
    pub fn new(bias: TimezoneBias, anchor_start: DateTime) -> Self {
        Self {
            bias,
            anchor_bias: bias.bias_at(anchor_start),
        }
    }

    /// Minutes to add to an occurrence starting at `start`.
    pub fn shift_minutes(&self, start: DateTime) -> i32 {
        self.anchor_bias - self.bias.bias_at(start)
    }

    /// Shift `start` and `end` by the same amount, keeping the duration.
    pub fn adjust(&self, start: DateTime, end: DateTime) -> Result<(DateTime, DateTime), ExpandError> {
        let minutes = self.shift_minutes(start);
        if minutes == 0 {
            return Ok((start, end));
        }
        let shift = SignedDuration::from_mins(i64::from(minutes));
        Ok((start.checked_add(shift)?, end.checked_add(shift)?))
    }
}
