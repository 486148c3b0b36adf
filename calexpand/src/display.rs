use std::fmt;

use crate::model::*;

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RecurrencePattern::Daily { interval } => write_every(f, interval, "day", "days"),
            RecurrencePattern::Weekly {
                interval,
                days,
                week_start,
            } => {
                write_every(f, interval, "week", "weeks")?;
                write!(f, " on ")?;
                for (i, day) in days.iter_from(week_start).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", day.short())?;
                }
                write!(f, " (week starts {})", week_start.as_str())
            }
            RecurrencePattern::MonthlyByDate { interval, day } => {
                write_every(f, interval, "month", "months")?;
                write!(f, " on day {day}")
            }
            RecurrencePattern::MonthlyByDay {
                interval,
                ordinal,
                weekday,
            } => {
                write_every(f, interval, "month", "months")?;
                write!(f, " on the {} {}", ordinal.as_str(), weekday.short())
            }
            RecurrencePattern::YearlyByDate {
                interval,
                month,
                day,
            } => {
                write_every(f, interval, "year", "years")?;
                write!(f, " on {} {day}", month.as_str())
            }
            RecurrencePattern::YearlyByDay {
                interval,
                month,
                ordinal,
                weekday,
            } => {
                write_every(f, interval, "year", "years")?;
                write!(
                    f,
                    " on the {} {} of {}",
                    ordinal.as_str(),
                    weekday.short(),
                    month.as_str()
                )
            }
        }
    }
}

fn write_every(f: &mut fmt::Formatter<'_>, interval: u32, one: &str, many: &str) -> fmt::Result {
    if interval == 1 {
        write!(f, "every {one}")
    } else {
        write!(f, "every {interval} {many}")
    }
}

impl fmt::Display for RecurrenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceRange::EndAfterCount(1) => write!(f, "once"),
            RecurrenceRange::EndAfterCount(n) => write!(f, "{n} times"),
            RecurrenceRange::EndByDate(bound) => write!(f, "until {bound}"),
            RecurrenceRange::NoEnd => write!(f, "forever"),
        }
    }
}

/// Human-readable summary of a rule, e.g.
/// `every 2 weeks on mon, wed (week starts sunday), 10 times`.
pub fn describe(pattern: &RecurrencePattern, range: &RecurrenceRange) -> String {
    format!("{pattern}, {range}")
}

/// Renders a rule in the XML grammar accepted by [`crate::parse`].
///
/// End dates are written as UTC timestamps, which read back as the same
/// wall-clock value. `WeekdayOrdinal::Fifth` has no spelling the reader
/// accepts.
#[derive(Debug, Clone, Copy)]
pub struct RecurrenceXml<'a> {
    pattern: &'a RecurrencePattern,
    range: &'a RecurrenceRange,
}

impl<'a> RecurrenceXml<'a> {
    pub fn new(pattern: &'a RecurrencePattern, range: &'a RecurrenceRange) -> Self {
        Self { pattern, range }
    }
}

impl fmt::Display for RecurrenceXml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first_day = match self.pattern {
            RecurrencePattern::Weekly { week_start, .. } => *week_start,
            _ => Weekday::Sunday,
        };
        write!(
            f,
            "<recurrence><rule><firstDayOfWeek>{}</firstDayOfWeek><repeat>",
            first_day.code()
        )?;

        let kind = self.pattern.kind_name();
        match *self.pattern {
            RecurrencePattern::Daily { interval } => {
                write!(f, r#"<{kind} dayFrequency="{interval}" />"#)?;
            }
            RecurrencePattern::Weekly { interval, days, .. } => {
                write!(f, "<{kind} ")?;
                for day in days.iter() {
                    write!(f, r#"{}="TRUE" "#, day.code())?;
                }
                write!(f, r#"weekFrequency="{interval}" />"#)?;
            }
            RecurrencePattern::MonthlyByDate { interval, day } => {
                write!(f, r#"<{kind} monthFrequency="{interval}" day="{day}" />"#)?;
            }
            RecurrencePattern::MonthlyByDay {
                interval,
                ordinal,
                weekday,
            } => {
                write!(
                    f,
                    r#"<{kind} {}="TRUE" weekdayOfMonth="{}" monthFrequency="{interval}" />"#,
                    weekday.code(),
                    ordinal.as_str()
                )?;
            }
            RecurrencePattern::YearlyByDate {
                interval,
                month,
                day,
            } => {
                write!(
                    f,
                    r#"<{kind} yearFrequency="{interval}" month="{}" day="{day}" />"#,
                    month.number()
                )?;
            }
            RecurrencePattern::YearlyByDay {
                interval,
                month,
                ordinal,
                weekday,
            } => {
                write!(
                    f,
                    r#"<{kind} yearFrequency="{interval}" {}="TRUE" weekdayOfMonth="{}" month="{}" />"#,
                    weekday.code(),
                    ordinal.as_str(),
                    month.number()
                )?;
            }
        }

        write!(f, "</repeat>")?;
        match self.range {
            RecurrenceRange::EndAfterCount(n) => write!(f, "<repeatInstances>{n}</repeatInstances>")?,
            RecurrenceRange::EndByDate(bound) => write!(f, "<windowEnd>{bound}Z</windowEnd>")?,
            RecurrenceRange::NoEnd => write!(f, "<repeatForever>FALSE</repeatForever>")?,
        }
        write!(f, "</rule></recurrence>")
    }
}
