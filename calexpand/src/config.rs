use jiff::civil::DateTime;

use crate::expander::Expander;
use crate::timezone::{DaylightRule, TimezoneBias};

/// Settings for an [`Expander`], as loaded from a configuration file.
///
/// ```toml
/// standard_bias = -60
/// daylight_bias = -60
/// instance_cap = 500
/// window_start = "2026-01-01T00:00:00"
/// window_end = "2027-01-01T00:00:00"
/// workers = 4
///
/// [daylight.start]
/// month = "march"
/// ordinal = "last"
/// weekday = "sunday"
/// time = "02:00:00"
///
/// [daylight.end]
/// month = "october"
/// ordinal = "last"
/// weekday = "sunday"
/// time = "03:00:00"
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ExpanderConfig {
    /// Minutes, `utc = local + bias`.
    pub standard_bias: i32,
    /// Extra minutes inside the daylight window; 0 for none.
    pub daylight_bias: i32,
    /// Daylight window; defaults to the last Sundays of March and October.
    pub daylight: Option<DaylightRule>,
    pub instance_cap: Option<u32>,
    pub window_start: Option<DateTime>,
    pub window_end: Option<DateTime>,
    pub workers: usize,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            standard_bias: 0,
            daylight_bias: 0,
            daylight: None,
            instance_cap: None,
            window_start: None,
            window_end: None,
            workers: 1,
        }
    }
}

impl ExpanderConfig {
    pub fn bias(&self) -> TimezoneBias {
        TimezoneBias::new(self.standard_bias, self.daylight_bias)
            .with_rule(self.daylight.unwrap_or_default())
    }
}

impl Expander {
    pub fn from_config(config: &ExpanderConfig) -> Self {
        let mut expander = Expander::new(config.bias()).with_workers(config.workers);
        if let Some(start) = config.window_start {
            expander = expander.with_window_start(start);
        }
        if let Some(end) = config.window_end {
            expander = expander.with_window_end(end);
        }
        if let Some(cap) = config.instance_cap {
            expander = expander.with_instance_cap(cap);
        }
        expander
    }
}

impl From<&ExpanderConfig> for Expander {
    fn from(config: &ExpanderConfig) -> Self {
        Expander::from_config(config)
    }
}
