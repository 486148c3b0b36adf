//! calexpand: recurring calendar event expansion.
//!
//! Turns master event records carrying an XML recurrence rule, plus
//! per-occurrence exceptions, into the concrete, time-ordered instances of
//! each series. Daylight-saving shifts are corrected from two bias values
//! instead of a timezone database.
//!
//! # Examples
//!
//! ```
//! use calexpand::{ExceptionRecord, MasterRecord};
//! use jiff::civil::date;
//!
//! let weekly = r#"<recurrence><rule><firstDayOfWeek>su</firstDayOfWeek>
//!     <repeat><weekly mo="TRUE" weekFrequency="1" /></repeat>
//!     <repeatInstances>4</repeatInstances></rule></recurrence>"#;
//! let master = MasterRecord::recurring(
//!     1,
//!     date(2026, 3, 2).at(9, 0, 0, 0),
//!     date(2026, 3, 2).at(10, 0, 0, 0),
//!     weekly,
//! );
//! let cancelled = ExceptionRecord::deleted(1, date(2026, 3, 16).at(9, 0, 0, 0));
//!
//! let expansion = calexpand::expand(&[master], &[cancelled], 0, 0, None, None);
//! let days: Vec<_> = expansion.instances.iter().map(|i| i.start().day()).collect();
//! assert_eq!(days, [2, 9, 23]);
//! ```

mod calendar;
pub mod config;
pub mod display;
pub mod error;
pub mod expander;
pub mod generator;
pub mod merge;
pub mod model;
pub mod parser;
pub mod timezone;

pub use config::ExpanderConfig;
pub use display::{describe, RecurrenceXml};
pub use error::{AnomalyWarning, ExpandError, MasterFailure, ParseError};
pub use expander::{Expander, Expansion};
pub use generator::{generate, Occurrence, Occurrences};
pub use merge::{merge, Merge, MergedOccurrence};
pub use model::{
    ExceptionKind, ExceptionRecord, MasterRecord, Month, RecurrenceInstance, RecurrencePattern,
    RecurrenceRange, Weekday, WeekdayOrdinal, WeekdaySet,
};
pub use parser::parse_datetime;
pub use timezone::{DaylightRule, TimezoneAdjuster, TimezoneBias, TransitionRule};

use jiff::civil::DateTime;

/// Parse a recurrence description anchored at `anchor_start`.
pub fn parse(
    raw: &str,
    anchor_start: DateTime,
) -> Result<(RecurrencePattern, RecurrenceRange), ParseError> {
    parser::parse(raw, anchor_start)
}

/// Expand a batch with the default daylight window.
///
/// Biases are in minutes with `utc = local + bias`. Either window bound may
/// be omitted; unbounded series then need a window end.
pub fn expand(
    masters: &[MasterRecord],
    exceptions: &[ExceptionRecord],
    standard_bias: i32,
    daylight_bias: i32,
    window_start: Option<DateTime>,
    window_end: Option<DateTime>,
) -> Expansion {
    let mut expander = Expander::new(TimezoneBias::new(standard_bias, daylight_bias));
    if let Some(start) = window_start {
        expander = expander.with_window_start(start);
    }
    if let Some(end) = window_end {
        expander = expander.with_window_end(end);
    }
    expander.expand(masters, exceptions)
}
