//! Reader for the host's XML recurrence descriptions.
//!
//! ```xml
//! <recurrence><rule>
//!   <firstDayOfWeek>su</firstDayOfWeek>
//!   <repeat><weekly mo="TRUE" we="TRUE" weekFrequency="2" /></repeat>
//!   <repeatInstances>10</repeatInstances>
//! </rule></recurrence>
//! ```
//!
//! Elements and attributes are matched by local name. Anything the grammar
//! does not name is ignored.

use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use jiff::Timestamp;
use quick_xml::events::{BytesStart, Event};

use crate::error::ParseError;
use crate::model::{
    parse_ordinal, parse_weekday, Month, RecurrencePattern, RecurrenceRange, Weekday,
    WeekdayOrdinal, WeekdaySet,
};

/// Host pseudo-weekdays that stand for several days at once.
const PSEUDO_WEEKDAYS: [&str; 3] = ["day", "weekday", "weekend_day"];

/// Parse a recurrence description into its pattern and range.
///
/// `anchor_start` is the start of the series' first occurrence. An end date
/// before it is rejected.
pub fn parse(
    raw: &str,
    anchor_start: DateTime,
) -> Result<(RecurrencePattern, RecurrenceRange), ParseError> {
    let rule = RawRule::read(raw)?;
    let pattern = rule.pattern()?;
    let range = rule.range(anchor_start)?;
    Ok((pattern, range))
}

/// Parse a wall-clock datetime, accepting the host's `...Z` timestamps.
///
/// A trailing `Z` or offset is resolved to UTC wall-clock time. A bare civil
/// datetime (or date) is taken as is.
pub fn parse_datetime(s: &str) -> Option<DateTime> {
    let s = s.trim();
    if let Ok(ts) = s.parse::<Timestamp>() {
        return Some(ts.to_zoned(TimeZone::UTC).datetime());
    }
    // Beyond the timestamp range a `Z` value is still a valid wall-clock.
    s.strip_suffix(['Z', 'z']).unwrap_or(s).parse::<DateTime>().ok()
}

/// The pattern element found inside `<repeat>`, not yet validated.
#[derive(Debug, Default)]
struct RawPattern {
    kind: String,
    attrs: Vec<(String, String)>,
}

/// Everything the reader collected before validation.
#[derive(Debug, Default)]
struct RawRule {
    first_day: Option<String>,
    pattern: Option<RawPattern>,
    repeat_instances: Option<String>,
    window_end: Option<String>,
    repeat_forever: bool,
}

impl RawRule {
    fn read(xml: &str) -> Result<Self, ParseError> {
        if xml.trim().is_empty() {
            return Err(ParseError::malformed("empty recurrence description"));
        }

        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut rule = RawRule::default();
        let mut path: Vec<Vec<u8>> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    rule.open(e, path.last())?;
                    path.push(e.name().local_name().into_inner().to_vec());
                }
                Event::Empty(ref e) => rule.open(e, path.last())?,
                Event::Text(ref text) => {
                    if let Some(element) = path.last() {
                        rule.text(element, utf8(text)?.trim());
                    }
                }
                Event::End(_) => {
                    path.pop();
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = path.last() {
            return Err(ParseError::malformed(format!(
                "unexpected end of input inside <{}>",
                String::from_utf8_lossy(open)
            )));
        }
        Ok(rule)
    }

    fn open(&mut self, e: &BytesStart<'_>, parent: Option<&Vec<u8>>) -> Result<(), ParseError> {
        let name = e.name().local_name().into_inner();

        if parent.is_some_and(|p| p.as_slice() == b"repeat") {
            if self.pattern.is_some() {
                return Err(ParseError::malformed("more than one pattern inside <repeat>"));
            }
            self.pattern = Some(RawPattern {
                kind: utf8(name)?.to_owned(),
                attrs: read_attributes(e)?,
            });
            return Ok(());
        }

        if name == b"repeatForever" {
            self.repeat_forever = true;
        }
        Ok(())
    }

    fn text(&mut self, element: &[u8], value: &str) {
        match element {
            b"firstDayOfWeek" => self.first_day = Some(value.to_owned()),
            b"repeatInstances" => self.repeat_instances = Some(value.to_owned()),
            b"windowEnd" => self.window_end = Some(value.to_owned()),
            _ => {}
        }
    }

    fn week_start(&self) -> Result<Weekday, ParseError> {
        match self.first_day.as_deref() {
            None => Ok(Weekday::Sunday),
            Some(code) => parse_weekday(code).ok_or_else(|| ParseError::out_of_domain("firstDayOfWeek")),
        }
    }

    fn pattern(&self) -> Result<RecurrencePattern, ParseError> {
        let raw = self
            .pattern
            .as_ref()
            .ok_or_else(|| ParseError::missing("repeat"))?;

        match raw.kind.as_str() {
            "daily" => Ok(RecurrencePattern::Daily {
                interval: raw.frequency("dayFrequency")?,
            }),
            "weekly" => {
                let interval = raw.frequency("weekFrequency")?;
                let days = raw.weekdays();
                if days.is_empty() {
                    return Err(ParseError::missing("weekday"));
                }
                Ok(RecurrencePattern::Weekly {
                    interval,
                    days,
                    week_start: self.week_start()?,
                })
            }
            "monthly" => Ok(RecurrencePattern::MonthlyByDate {
                interval: raw.frequency("monthFrequency")?,
                day: raw.day()?,
            }),
            "monthlyByDay" => Ok(RecurrencePattern::MonthlyByDay {
                interval: raw.frequency("monthFrequency")?,
                ordinal: raw.ordinal()?,
                weekday: raw.single_weekday()?,
            }),
            "yearly" => Ok(RecurrencePattern::YearlyByDate {
                interval: raw.optional_frequency("yearFrequency")?,
                month: raw.month()?,
                day: raw.day()?,
            }),
            "yearlyByDay" => Ok(RecurrencePattern::YearlyByDay {
                interval: raw.optional_frequency("yearFrequency")?,
                month: raw.month()?,
                ordinal: raw.ordinal()?,
                weekday: raw.single_weekday()?,
            }),
            other => Err(ParseError::UnknownPatternKind(other.to_owned())),
        }
    }

    /// `repeatInstances` wins over `windowEnd`, which wins over
    /// `repeatForever`.
    fn range(&self, anchor_start: DateTime) -> Result<RecurrenceRange, ParseError> {
        if let Some(count) = &self.repeat_instances {
            return match count.parse::<u32>() {
                Ok(0) => Err(ParseError::invalid_range("repeatInstances must be at least 1")),
                Ok(n) => Ok(RecurrenceRange::EndAfterCount(n)),
                Err(_) => Err(ParseError::invalid_range(format!(
                    "repeatInstances '{count}' is not a count"
                ))),
            };
        }

        if let Some(end) = &self.window_end {
            let bound = parse_datetime(end).ok_or_else(|| {
                ParseError::invalid_range(format!("windowEnd '{end}' is not a timestamp"))
            })?;
            if bound < anchor_start {
                return Err(ParseError::invalid_range(format!(
                    "windowEnd {bound} precedes the first occurrence at {anchor_start}"
                )));
            }
            return Ok(RecurrenceRange::EndByDate(bound));
        }

        if self.repeat_forever {
            return Ok(RecurrenceRange::NoEnd);
        }
        Err(ParseError::missing("range"))
    }
}

impl RawPattern {
    fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn required(&self, name: &str) -> Result<&str, ParseError> {
        self.get(name).ok_or_else(|| ParseError::missing(name))
    }

    fn flagged(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| v.eq_ignore_ascii_case("TRUE"))
    }

    fn frequency(&self, name: &str) -> Result<u32, ParseError> {
        positive(name, self.required(name)?)
    }

    fn optional_frequency(&self, name: &str) -> Result<u32, ParseError> {
        self.get(name).map_or(Ok(1), |v| positive(name, v))
    }

    fn day(&self) -> Result<u8, ParseError> {
        match self.required("day")?.parse::<u8>() {
            Ok(day @ 1..=31) => Ok(day),
            _ => Err(ParseError::out_of_domain("day")),
        }
    }

    fn month(&self) -> Result<Month, ParseError> {
        self.required("month")?
            .parse::<i64>()
            .ok()
            .and_then(Month::from_number)
            .ok_or_else(|| ParseError::out_of_domain("month"))
    }

    fn ordinal(&self) -> Result<WeekdayOrdinal, ParseError> {
        match parse_ordinal(self.required("weekdayOfMonth")?) {
            Some(WeekdayOrdinal::Fifth) | None => Err(ParseError::out_of_domain("weekdayOfMonth")),
            Some(ordinal) => Ok(ordinal),
        }
    }

    fn weekdays(&self) -> WeekdaySet {
        Weekday::ALL
            .into_iter()
            .filter(|day| self.flagged(day.code()))
            .collect()
    }

    fn single_weekday(&self) -> Result<Weekday, ParseError> {
        if PSEUDO_WEEKDAYS.iter().any(|name| self.flagged(name)) {
            return Err(ParseError::out_of_domain("weekday"));
        }
        let days = self.weekdays();
        let mut iter = days.iter();
        match (iter.next(), iter.next()) {
            (Some(day), None) => Ok(day),
            (None, _) => Err(ParseError::missing("weekday")),
            (Some(_), Some(_)) => Err(ParseError::out_of_domain("weekday")),
        }
    }
}

fn positive(name: &str, value: &str) -> Result<u32, ParseError> {
    match value.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ParseError::out_of_domain(name)),
    }
}

fn read_attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, ParseError> {
    e.attributes()
        .map(|attr| {
            let attr = attr.map_err(|err| ParseError::malformed(err.to_string()))?;
            let key = utf8(attr.key.local_name().into_inner())?.to_owned();
            let value = utf8(&attr.value)?.trim().to_owned();
            Ok((key, value))
        })
        .collect()
}

fn utf8(bytes: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|e| ParseError::malformed(format!("invalid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    fn anchor() -> DateTime {
        date(2026, 3, 2).at(9, 0, 0, 0)
    }

    fn rule(repeat: &str, range: &str) -> String {
        format!(
            "<recurrence><rule><firstDayOfWeek>su</firstDayOfWeek>\
             <repeat>{repeat}</repeat>{range}</rule></recurrence>"
        )
    }

    fn parse_ok(repeat: &str, range: &str) -> (RecurrencePattern, RecurrenceRange) {
        parse(&rule(repeat, range), anchor()).unwrap()
    }

    fn parse_err(repeat: &str, range: &str) -> ParseError {
        parse(&rule(repeat, range), anchor()).unwrap_err()
    }

    const FOREVER: &str = "<repeatForever>FALSE</repeatForever>";

    #[test]
    fn daily() {
        let (pattern, range) = parse_ok(
            r#"<daily dayFrequency="3" />"#,
            "<repeatInstances>10</repeatInstances>",
        );
        assert_eq!(pattern, RecurrencePattern::Daily { interval: 3 });
        assert_eq!(range, RecurrenceRange::EndAfterCount(10));
    }

    #[test]
    fn weekly_with_first_day() {
        let xml = "<recurrence><rule><firstDayOfWeek>mo</firstDayOfWeek>\
                   <repeat><weekly we=\"TRUE\" mo=\"true\" fr=\"FALSE\" weekFrequency=\"2\" /></repeat>\
                   <repeatForever>FALSE</repeatForever></rule></recurrence>";
        let (pattern, range) = parse(xml, anchor()).unwrap();
        let days: WeekdaySet = [Weekday::Monday, Weekday::Wednesday].into_iter().collect();
        assert_eq!(
            pattern,
            RecurrencePattern::Weekly {
                interval: 2,
                days,
                week_start: Weekday::Monday,
            }
        );
        assert_eq!(range, RecurrenceRange::NoEnd);
    }

    #[test]
    fn week_start_defaults_to_sunday() {
        let xml = r#"<recurrence><rule><repeat><weekly tu="TRUE" weekFrequency="1"/></repeat>
                     <repeatForever/></rule></recurrence>"#;
        let (pattern, _) = parse(xml, anchor()).unwrap();
        assert!(matches!(
            pattern,
            RecurrencePattern::Weekly {
                week_start: Weekday::Sunday,
                ..
            }
        ));
    }

    #[test]
    fn monthly_and_by_day() {
        let (pattern, _) = parse_ok(r#"<monthly monthFrequency="1" day="31"/>"#, FOREVER);
        assert_eq!(
            pattern,
            RecurrencePattern::MonthlyByDate {
                interval: 1,
                day: 31
            }
        );

        let (pattern, _) = parse_ok(
            r#"<monthlyByDay tu="TRUE" weekdayOfMonth="third" monthFrequency="2"/>"#,
            FOREVER,
        );
        assert_eq!(
            pattern,
            RecurrencePattern::MonthlyByDay {
                interval: 2,
                ordinal: WeekdayOrdinal::Third,
                weekday: Weekday::Tuesday,
            }
        );
    }

    #[test]
    fn yearly_defaults_interval() {
        let (pattern, _) = parse_ok(r#"<yearly month="2" day="29"/>"#, FOREVER);
        assert_eq!(
            pattern,
            RecurrencePattern::YearlyByDate {
                interval: 1,
                month: Month::February,
                day: 29,
            }
        );

        let (pattern, _) = parse_ok(
            r#"<yearlyByDay yearFrequency="2" th="TRUE" weekdayOfMonth="last" month="11"/>"#,
            FOREVER,
        );
        assert_eq!(
            pattern,
            RecurrencePattern::YearlyByDay {
                interval: 2,
                month: Month::November,
                ordinal: WeekdayOrdinal::Last,
                weekday: Weekday::Thursday,
            }
        );
    }

    #[test]
    fn kind_names_match_element_names() {
        for repeat in [
            r#"<daily dayFrequency="1"/>"#,
            r#"<weekly mo="TRUE" weekFrequency="1"/>"#,
            r#"<monthly monthFrequency="1" day="2"/>"#,
            r#"<monthlyByDay mo="TRUE" weekdayOfMonth="first" monthFrequency="1"/>"#,
            r#"<yearly month="3" day="2"/>"#,
            r#"<yearlyByDay mo="TRUE" weekdayOfMonth="first" month="3"/>"#,
        ] {
            let (pattern, _) = parse_ok(repeat, FOREVER);
            let element = &repeat[1..repeat.find(' ').unwrap()];
            assert_eq!(pattern.kind_name(), element);
        }
    }

    #[test]
    fn window_end_accepts_utc_timestamps() {
        let (_, range) = parse_ok(
            r#"<daily dayFrequency="1"/>"#,
            "<windowEnd>2026-12-31T09:00:00Z</windowEnd>",
        );
        assert_eq!(
            range,
            RecurrenceRange::EndByDate(date(2026, 12, 31).at(9, 0, 0, 0))
        );
    }

    #[test]
    fn range_precedence() {
        let (_, range) = parse_ok(
            r#"<daily dayFrequency="1"/>"#,
            "<windowEnd>2026-12-31T00:00:00Z</windowEnd>\
             <repeatInstances>4</repeatInstances>\
             <repeatForever>FALSE</repeatForever>",
        );
        assert_eq!(range, RecurrenceRange::EndAfterCount(4));

        let (_, range) = parse_ok(
            r#"<daily dayFrequency="1"/>"#,
            "<repeatForever>FALSE</repeatForever><windowEnd>2026-12-31T00:00:00Z</windowEnd>",
        );
        assert!(matches!(range, RecurrenceRange::EndByDate(_)));
    }

    #[test]
    fn unknown_kind() {
        assert_eq!(
            parse_err(r#"<hourly hourFrequency="1"/>"#, FOREVER),
            ParseError::UnknownPatternKind("hourly".into())
        );
    }

    #[test]
    fn missing_fields() {
        assert_eq!(
            parse_err(r#"<daily weekday="TRUE"/>"#, FOREVER),
            ParseError::missing("dayFrequency")
        );
        assert_eq!(
            parse_err(r#"<weekly weekFrequency="1"/>"#, FOREVER),
            ParseError::missing("weekday")
        );
        assert_eq!(
            parse_err(r#"<monthly monthFrequency="1"/>"#, FOREVER),
            ParseError::missing("day")
        );
        assert_eq!(
            parse_err(r#"<daily dayFrequency="1"/>"#, ""),
            ParseError::missing("range")
        );
        assert_eq!(parse_err("", FOREVER), ParseError::missing("repeat"));
        assert_eq!(
            parse("<recurrence><rule/></recurrence>", anchor()).unwrap_err(),
            ParseError::missing("repeat")
        );
    }

    #[test]
    fn out_of_domain_values() {
        assert_eq!(
            parse_err(r#"<daily dayFrequency="0"/>"#, FOREVER),
            ParseError::out_of_domain("dayFrequency")
        );
        assert_eq!(
            parse_err(r#"<monthly monthFrequency="1" day="32"/>"#, FOREVER),
            ParseError::out_of_domain("day")
        );
        assert_eq!(
            parse_err(r#"<yearly month="13" day="1"/>"#, FOREVER),
            ParseError::out_of_domain("month")
        );
        assert_eq!(
            parse_err(
                r#"<monthlyByDay mo="TRUE" weekdayOfMonth="fifth" monthFrequency="1"/>"#,
                FOREVER
            ),
            ParseError::out_of_domain("weekdayOfMonth")
        );
        assert_eq!(
            parse_err(
                r#"<monthlyByDay weekday="TRUE" weekdayOfMonth="first" monthFrequency="1"/>"#,
                FOREVER
            ),
            ParseError::out_of_domain("weekday")
        );
        assert_eq!(
            parse_err(
                r#"<monthlyByDay mo="TRUE" tu="TRUE" weekdayOfMonth="first" monthFrequency="1"/>"#,
                FOREVER
            ),
            ParseError::out_of_domain("weekday")
        );
    }

    #[test]
    fn invalid_ranges() {
        assert!(matches!(
            parse_err(r#"<daily dayFrequency="1"/>"#, "<repeatInstances>0</repeatInstances>"),
            ParseError::InvalidRange(_)
        ));
        assert!(matches!(
            parse_err(
                r#"<daily dayFrequency="1"/>"#,
                "<windowEnd>2026-01-01T00:00:00Z</windowEnd>"
            ),
            ParseError::InvalidRange(_)
        ));
        assert!(matches!(
            parse_err(r#"<daily dayFrequency="1"/>"#, "<windowEnd>soon</windowEnd>"),
            ParseError::InvalidRange(_)
        ));
    }

    #[test]
    fn malformed_xml() {
        assert!(matches!(
            parse("<recurrence><rule>", anchor()),
            Err(ParseError::Malformed(_))
        ));
        assert!(matches!(
            parse("<recurrence></rule>", anchor()),
            Err(ParseError::Malformed(_))
        ));
        assert!(matches!(parse("   ", anchor()), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn parse_datetime_forms() {
        assert_eq!(
            parse_datetime("2026-03-02T09:00:00Z"),
            Some(date(2026, 3, 2).at(9, 0, 0, 0))
        );
        assert_eq!(
            parse_datetime("2026-03-02T09:00:00"),
            Some(date(2026, 3, 2).at(9, 0, 0, 0))
        );
        assert_eq!(parse_datetime("yesterday"), None);
    }
}
