use std::collections::VecDeque;

use jiff::civil::{Date, DateTime};
use jiff::SignedDuration;

use crate::calendar::{add_days, clamped_day, month_offset, nth_weekday, week_start};
use crate::model::{RecurrencePattern, RecurrenceRange, Weekday};

/// Periods in a row without a candidate before the series is declared over.
const MAX_EMPTY_PERIODS: u32 = 1000;

/// One scheduled occurrence, before exceptions and daylight correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub start: DateTime,
    pub end: DateTime,
}

/// Generate the scheduled occurrences of a series.
///
/// The first item is always the anchor itself. Each later item keeps the
/// anchor's time of day and duration. Starts are strictly increasing.
///
/// Nothing here caps the series: `RecurrenceRange::NoEnd` yields forever and
/// the caller decides how much to consume.
pub fn generate(
    anchor_start: DateTime,
    anchor_end: DateTime,
    pattern: &RecurrencePattern,
    range: &RecurrenceRange,
) -> Occurrences {
    Occurrences::new(anchor_start, anchor_end, *pattern, *range)
}

/// Lazy iterator over the scheduled occurrences of one series.
///
/// Cloning before iteration gives an independent copy that starts over from
/// the anchor.
#[derive(Debug, Clone)]
pub struct Occurrences {
    pattern: RecurrencePattern,
    range: RecurrenceRange,
    anchor: DateTime,
    duration: SignedDuration,
    period: i64,
    pending: VecDeque<Date>,
    emitted: u32,
    done: bool,
}

impl Occurrences {
    pub fn new(
        anchor_start: DateTime,
        anchor_end: DateTime,
        pattern: RecurrencePattern,
        range: RecurrenceRange,
    ) -> Self {
        Self {
            pattern,
            range,
            anchor: anchor_start,
            duration: anchor_start.duration_until(anchor_end),
            period: 0,
            pending: VecDeque::new(),
            emitted: 0,
            done: false,
        }
    }

    fn finish(&mut self) -> Option<Occurrence> {
        self.done = true;
        self.pending.clear();
        None
    }

    /// Next candidate start strictly after the anchor.
    fn next_candidate(&mut self) -> Option<DateTime> {
        let time = self.anchor.time();
        let mut empty_periods = 0;
        loop {
            while let Some(date) = self.pending.pop_front() {
                let start = date.to_datetime(time);
                if start > self.anchor {
                    return Some(start);
                }
            }
            if empty_periods >= MAX_EMPTY_PERIODS {
                tracing::debug!(
                    pattern = ?self.pattern,
                    "no candidate in {MAX_EMPTY_PERIODS} periods, ending series"
                );
                return None;
            }
            let Some(dates) = self.period_dates(self.period) else {
                tracing::debug!(period = self.period, "calendar arithmetic overflow, ending series");
                return None;
            };
            self.period += 1;
            if dates.is_empty() {
                empty_periods += 1;
            } else {
                empty_periods = 0;
            }
            self.pending.extend(dates);
        }
    }

    /// Candidate dates of the `k`th period after the anchor's, in order.
    ///
    /// Returns `None` only on arithmetic overflow. A period with no matching
    /// day (a fifth weekday that does not exist) yields an empty list.
    fn period_dates(&self, k: i64) -> Option<Vec<Date>> {
        let anchor = self.anchor.date();
        let step = k.checked_mul(i64::from(self.pattern.interval()))?;

        match self.pattern {
            RecurrencePattern::Daily { .. } => Some(vec![add_days(anchor, step)?]),

            RecurrencePattern::Weekly {
                days, week_start: first_day, ..
            } => {
                let window = add_days(week_start(anchor, first_day)?, step.checked_mul(7)?)?;
                days.with(Weekday::from_jiff(anchor.weekday()))
                    .iter_from(first_day)
                    .map(|day| {
                        let offset = (i64::from(day.index()) - i64::from(first_day.index()))
                            .rem_euclid(7);
                        add_days(window, offset)
                    })
                    .collect()
            }

            RecurrencePattern::MonthlyByDate { day, .. } => {
                let first = month_offset(anchor, step)?;
                Some(vec![clamped_day(first, day)?])
            }

            RecurrencePattern::MonthlyByDay {
                ordinal, weekday, ..
            } => {
                let first = month_offset(anchor, step)?;
                Some(nth_weekday(first, ordinal, weekday).into_iter().collect())
            }

            RecurrencePattern::YearlyByDate { month, day, .. } => {
                let first = first_of_year_month(anchor, step, month.number())?;
                Some(vec![clamped_day(first, day)?])
            }

            RecurrencePattern::YearlyByDay {
                month,
                ordinal,
                weekday,
                ..
            } => {
                let first = first_of_year_month(anchor, step, month.number())?;
                Some(nth_weekday(first, ordinal, weekday).into_iter().collect())
            }
        }
    }
}

fn first_of_year_month(anchor: Date, years: i64, month: i8) -> Option<Date> {
    let year = i16::try_from(i64::from(anchor.year()).checked_add(years)?).ok()?;
    Date::new(year, month, 1).ok()
}

impl Iterator for Occurrences {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let RecurrenceRange::EndAfterCount(n) = self.range {
            if self.emitted >= n {
                return self.finish();
            }
        }

        let start = if self.emitted == 0 {
            self.anchor
        } else {
            match self.next_candidate() {
                Some(start) => start,
                None => return self.finish(),
            }
        };

        if let RecurrenceRange::EndByDate(bound) = self.range {
            if start > bound {
                return self.finish();
            }
        }

        let Ok(end) = start.checked_add(self.duration) else {
            return self.finish();
        };
        self.emitted += 1;
        Some(Occurrence { start, end })
    }
}

impl std::iter::FusedIterator for Occurrences {}
