use jiff::civil::Date;
use jiff::Span;

use crate::model::{Weekday, WeekdayOrdinal};

/// First day of the month `months` after the month containing `date`.
pub(crate) fn month_offset(date: Date, months: i64) -> Option<Date> {
    date.first_of_month()
        .checked_add(Span::new().try_months(months).ok()?)
        .ok()
}

/// `day` of the month starting at `first`, clamped to the month's length.
pub(crate) fn clamped_day(first: Date, day: u8) -> Option<Date> {
    let last = first.days_in_month();
    let day = i8::try_from(day).ok()?.clamp(1, last);
    Date::new(first.year(), first.month(), day).ok()
}

/// The `ordinal` `weekday` of the month containing `date`.
///
/// `None` when the month has no such day (e.g. a fifth Monday).
pub(crate) fn nth_weekday(date: Date, ordinal: WeekdayOrdinal, weekday: Weekday) -> Option<Date> {
    date.first_of_month()
        .nth_weekday_of_month(ordinal.nth(), weekday.to_jiff())
        .ok()
}

/// Start of the week containing `date`, for weeks beginning on `week_start`.
pub(crate) fn week_start(date: Date, week_start: Weekday) -> Option<Date> {
    let back = (i64::from(date.weekday().to_sunday_zero_offset())
        - i64::from(week_start.index()))
    .rem_euclid(7);
    add_days(date, -back)
}

pub(crate) fn add_days(date: Date, days: i64) -> Option<Date> {
    date.checked_add(Span::new().try_days(days).ok()?).ok()
}
