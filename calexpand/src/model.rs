use jiff::civil::DateTime;

/// A stored calendar event definition: the first occurrence and, when
/// recurring, the raw recurrence description the host attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MasterRecord {
    pub id: i64,
    pub start: DateTime,
    pub end: DateTime,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_recurring: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub recurrence_data: Option<String>,
}

impl MasterRecord {
    /// A one-off event.
    pub fn single(id: i64, start: DateTime, end: DateTime) -> Self {
        Self {
            id,
            start,
            end,
            is_recurring: false,
            recurrence_data: None,
        }
    }

    /// A recurring event anchored at `start`/`end`.
    pub fn recurring(id: i64, start: DateTime, end: DateTime, description: impl Into<String>) -> Self {
        Self {
            id,
            start,
            end,
            is_recurring: true,
            recurrence_data: Some(description.into()),
        }
    }
}

/// A per-occurrence override, keyed by the scheduled start it replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExceptionRecord {
    pub master_id: i64,
    pub original_start: DateTime,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: ExceptionKind,
}

impl ExceptionRecord {
    pub fn deleted(master_id: i64, original_start: DateTime) -> Self {
        Self {
            master_id,
            original_start,
            kind: ExceptionKind::Deleted,
        }
    }

    pub fn replaced(master_id: i64, original_start: DateTime, start: DateTime, end: DateTime) -> Self {
        Self {
            master_id,
            original_start,
            kind: ExceptionKind::Replaced { start, end },
        }
    }
}

/// What an exception does to the occurrence it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ExceptionKind {
    /// The occurrence was cancelled.
    Deleted,
    /// The occurrence was moved and/or resized.
    Replaced { start: DateTime, end: DateTime },
}

/// One concrete occurrence in the expanded output.
///
/// This is a plain value: nothing in it refers back to the pattern or the
/// generator that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecurrenceInstance {
    id: i64,
    start: DateTime,
    end: DateTime,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    original_start: Option<DateTime>,
}

impl RecurrenceInstance {
    pub fn new(id: i64, start: DateTime, end: DateTime, original_start: Option<DateTime>) -> Self {
        Self {
            id,
            start,
            end,
            original_start,
        }
    }

    /// Id of the master record this instance was expanded from.
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn start(&self) -> DateTime {
        self.start
    }

    pub fn end(&self) -> DateTime {
        self.end
    }

    /// Scheduled start of the occurrence this instance came from, before any
    /// exception or daylight correction. `None` for non-recurring masters.
    pub fn original_start(&self) -> Option<DateTime> {
        self.original_start
    }

    /// Per-occurrence identity in the host's `{id}.0.{original start}` form.
    pub fn occurrence_key(&self) -> String {
        match self.original_start {
            Some(original) => format!("{}.0.{}", self.id, original),
            None => self.id.to_string(),
        }
    }
}

/// The repeat rule of a recurring master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum RecurrencePattern {
    /// Every `interval` days.
    Daily { interval: u32 },
    /// On the given weekdays of every `interval`-th week.
    Weekly {
        interval: u32,
        days: WeekdaySet,
        week_start: Weekday,
    },
    /// On day `day` of every `interval`-th month, clamped to the month length.
    MonthlyByDate { interval: u32, day: u8 },
    /// On the `ordinal` `weekday` of every `interval`-th month.
    MonthlyByDay {
        interval: u32,
        ordinal: WeekdayOrdinal,
        weekday: Weekday,
    },
    /// On `month`/`day` of every `interval`-th year.
    YearlyByDate { interval: u32, month: Month, day: u8 },
    /// On the `ordinal` `weekday` of `month` every `interval`-th year.
    YearlyByDay {
        interval: u32,
        month: Month,
        ordinal: WeekdayOrdinal,
        weekday: Weekday,
    },
}

impl RecurrencePattern {
    pub fn interval(&self) -> u32 {
        match *self {
            Self::Daily { interval }
            | Self::Weekly { interval, .. }
            | Self::MonthlyByDate { interval, .. }
            | Self::MonthlyByDay { interval, .. }
            | Self::YearlyByDate { interval, .. }
            | Self::YearlyByDay { interval, .. } => interval,
        }
    }

    /// The element name used for this kind in the recurrence description.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Daily { .. } => "daily",
            Self::Weekly { .. } => "weekly",
            Self::MonthlyByDate { .. } => "monthly",
            Self::MonthlyByDay { .. } => "monthlyByDay",
            Self::YearlyByDate { .. } => "yearly",
            Self::YearlyByDay { .. } => "yearlyByDay",
        }
    }
}

/// How long a series runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RecurrenceRange {
    /// No occurrence starts after this datetime.
    EndByDate(DateTime),
    /// Exactly this many occurrences, the anchor included.
    EndAfterCount(u32),
    /// Unbounded.
    NoEnd,
}

impl RecurrenceRange {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::NoEnd)
    }
}

/// Weekday with the host's two-letter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Self::Sunday,
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "sunday",
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
        }
    }

    /// Two-letter code used as an attribute name in recurrence descriptions.
    pub fn code(self) -> &'static str {
        match self {
            Self::Sunday => "su",
            Self::Monday => "mo",
            Self::Tuesday => "tu",
            Self::Wednesday => "we",
            Self::Thursday => "th",
            Self::Friday => "fr",
            Self::Saturday => "sa",
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Self::Sunday => "sun",
            Self::Monday => "mon",
            Self::Tuesday => "tue",
            Self::Wednesday => "wed",
            Self::Thursday => "thu",
            Self::Friday => "fri",
            Self::Saturday => "sat",
        }
    }

    /// Sunday=0 .. Saturday=6.
    pub fn index(self) -> u8 {
        match self {
            Self::Sunday => 0,
            Self::Monday => 1,
            Self::Tuesday => 2,
            Self::Wednesday => 3,
            Self::Thursday => 4,
            Self::Friday => 5,
            Self::Saturday => 6,
        }
    }

    pub fn from_index(n: u8) -> Option<Self> {
        Self::ALL.get(usize::from(n)).copied()
    }

    pub fn to_jiff(self) -> jiff::civil::Weekday {
        match self {
            Self::Sunday => jiff::civil::Weekday::Sunday,
            Self::Monday => jiff::civil::Weekday::Monday,
            Self::Tuesday => jiff::civil::Weekday::Tuesday,
            Self::Wednesday => jiff::civil::Weekday::Wednesday,
            Self::Thursday => jiff::civil::Weekday::Thursday,
            Self::Friday => jiff::civil::Weekday::Friday,
            Self::Saturday => jiff::civil::Weekday::Saturday,
        }
    }

    pub fn from_jiff(wd: jiff::civil::Weekday) -> Self {
        match wd {
            jiff::civil::Weekday::Sunday => Self::Sunday,
            jiff::civil::Weekday::Monday => Self::Monday,
            jiff::civil::Weekday::Tuesday => Self::Tuesday,
            jiff::civil::Weekday::Wednesday => Self::Wednesday,
            jiff::civil::Weekday::Thursday => Self::Thursday,
            jiff::civil::Weekday::Friday => Self::Friday,
            jiff::civil::Weekday::Saturday => Self::Saturday,
        }
    }
}

/// Accepts two-letter codes, short names and full names, case-insensitively.
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_lowercase().as_str() {
        "su" | "sun" | "sunday" => Some(Weekday::Sunday),
        "mo" | "mon" | "monday" => Some(Weekday::Monday),
        "tu" | "tue" | "tuesday" => Some(Weekday::Tuesday),
        "we" | "wed" | "wednesday" => Some(Weekday::Wednesday),
        "th" | "thu" | "thursday" => Some(Weekday::Thursday),
        "fr" | "fri" | "friday" => Some(Weekday::Friday),
        "sa" | "sat" | "saturday" => Some(Weekday::Saturday),
        _ => None,
    }
}

/// A set of weekdays, one bit per day (Sunday = bit 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);

    pub fn single(day: Weekday) -> Self {
        Self::EMPTY.with(day)
    }

    #[must_use]
    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | (1 << day.index()))
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.index()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in week order beginning at `week_start`.
    pub fn iter_from(self, week_start: Weekday) -> impl Iterator<Item = Weekday> {
        let first = week_start.index();
        (0..7u8)
            .filter_map(move |i| Weekday::from_index((first + i) % 7))
            .filter(move |d| self.contains(*d))
    }

    /// Members from Sunday to Saturday.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        self.iter_from(Weekday::Sunday)
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<T: IntoIterator<Item = Weekday>>(iter: T) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for WeekdaySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for WeekdaySet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let days = Vec::<Weekday>::deserialize(deserializer)?;
        Ok(days.into_iter().collect())
    }
}

/// Which matching weekday of a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WeekdayOrdinal {
    First,
    Second,
    Third,
    Fourth,
    /// Only exists in some months; those without one are skipped.
    Fifth,
    Last,
}

impl WeekdayOrdinal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
            Self::Third => "third",
            Self::Fourth => "fourth",
            Self::Fifth => "fifth",
            Self::Last => "last",
        }
    }

    /// Argument for `jiff::civil::Date::nth_weekday_of_month`.
    pub fn nth(self) -> i8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
            Self::Fourth => 4,
            Self::Fifth => 5,
            Self::Last => -1,
        }
    }
}

pub fn parse_ordinal(s: &str) -> Option<WeekdayOrdinal> {
    match s.trim().to_lowercase().as_str() {
        "first" => Some(WeekdayOrdinal::First),
        "second" => Some(WeekdayOrdinal::Second),
        "third" => Some(WeekdayOrdinal::Third),
        "fourth" => Some(WeekdayOrdinal::Fourth),
        "fifth" => Some(WeekdayOrdinal::Fifth),
        "last" => Some(WeekdayOrdinal::Last),
        _ => None,
    }
}

/// Month of the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::January => "jan",
            Self::February => "feb",
            Self::March => "mar",
            Self::April => "apr",
            Self::May => "may",
            Self::June => "jun",
            Self::July => "jul",
            Self::August => "aug",
            Self::September => "sep",
            Self::October => "oct",
            Self::November => "nov",
            Self::December => "dec",
        }
    }

    pub fn number(self) -> i8 {
        match self {
            Self::January => 1,
            Self::February => 2,
            Self::March => 3,
            Self::April => 4,
            Self::May => 5,
            Self::June => 6,
            Self::July => 7,
            Self::August => 8,
            Self::September => 9,
            Self::October => 10,
            Self::November => 11,
            Self::December => 12,
        }
    }

    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(Self::January),
            2 => Some(Self::February),
            3 => Some(Self::March),
            4 => Some(Self::April),
            5 => Some(Self::May),
            6 => Some(Self::June),
            7 => Some(Self::July),
            8 => Some(Self::August),
            9 => Some(Self::September),
            10 => Some(Self::October),
            11 => Some(Self::November),
            12 => Some(Self::December),
            _ => None,
        }
    }
}
