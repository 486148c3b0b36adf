use std::collections::{BTreeMap, HashMap};

use jiff::civil::DateTime;
use jiff::SignedDuration;

use crate::error::{AnomalyWarning, ExpandError, MasterFailure, ParseError};
use crate::generator::{generate, Occurrence};
use crate::merge::{merge, MergedOccurrence};
use crate::model::{ExceptionKind, ExceptionRecord, MasterRecord, RecurrenceInstance};
use crate::parser;
use crate::timezone::{TimezoneAdjuster, TimezoneBias};

/// Result of expanding a batch.
///
/// A master either contributes instances or a failure, never both. Warnings
/// never stop a master from expanding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Sorted by start, then master id, then end.
    pub instances: Vec<RecurrenceInstance>,
    pub failures: Vec<MasterFailure>,
    pub warnings: Vec<AnomalyWarning>,
}

impl Expansion {
    /// No failures and no warnings.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty()
    }
}

/// Expands batches of masters under one timezone bias.
///
/// # Example
///
/// ```
/// use calexpand::{Expander, MasterRecord, TimezoneBias};
/// use jiff::civil::date;
///
/// let master = MasterRecord::recurring(
///     1,
///     date(2026, 3, 2).at(9, 0, 0, 0),
///     date(2026, 3, 2).at(10, 0, 0, 0),
///     r#"<recurrence><rule><repeat><daily dayFrequency="1"/></repeat>
///        <repeatInstances>3</repeatInstances></rule></recurrence>"#,
/// );
/// let expansion = Expander::new(TimezoneBias::new(0, 0)).expand(&[master], &[]);
/// assert_eq!(expansion.instances.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Expander {
    bias: TimezoneBias,
    window_start: Option<DateTime>,
    window_end: Option<DateTime>,
    instance_cap: Option<u32>,
    workers: usize,
}

impl Expander {
    pub fn new(bias: TimezoneBias) -> Self {
        Self {
            bias,
            window_start: None,
            window_end: None,
            instance_cap: None,
            workers: 1,
        }
    }

    /// Keep only instances overlapping `[start, end)`.
    #[must_use]
    pub fn with_window(self, start: DateTime, end: DateTime) -> Self {
        self.with_window_start(start).with_window_end(end)
    }

    #[must_use]
    pub fn with_window_start(mut self, start: DateTime) -> Self {
        self.window_start = Some(start);
        self
    }

    #[must_use]
    pub fn with_window_end(mut self, end: DateTime) -> Self {
        self.window_end = Some(end);
        self
    }

    /// Generate at most `cap` occurrences per master, whatever its range.
    #[must_use]
    pub fn with_instance_cap(mut self, cap: u32) -> Self {
        self.instance_cap = Some(cap);
        self
    }

    /// Expand on up to `workers` threads. Output does not depend on it.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn bias(&self) -> &TimezoneBias {
        &self.bias
    }

    pub fn window(&self) -> (Option<DateTime>, Option<DateTime>) {
        (self.window_start, self.window_end)
    }

    pub fn instance_cap(&self) -> Option<u32> {
        self.instance_cap
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Expand every master, applying the exceptions that name it.
    pub fn expand(&self, masters: &[MasterRecord], exceptions: &[ExceptionRecord]) -> Expansion {
        let mut by_master: HashMap<i64, Vec<&ExceptionRecord>> = HashMap::new();
        for exception in exceptions {
            by_master.entry(exception.master_id).or_default().push(exception);
        }

        let mut expansion = Expansion {
            warnings: unknown_masters(masters, &by_master),
            ..Expansion::default()
        };
        for warning in &expansion.warnings {
            tracing::warn!(master_id = warning.master_id(), "{warning}");
        }

        for outcome in self.run(masters, &by_master) {
            expansion.instances.extend(outcome.instances);
            expansion.warnings.extend(outcome.warnings);
            expansion.failures.extend(outcome.failure);
        }

        expansion
            .instances
            .sort_by_key(|i| (i.start(), i.id(), i.end(), i.original_start()));
        expansion.instances.dedup();

        tracing::debug!(
            masters = masters.len(),
            instances = expansion.instances.len(),
            failures = expansion.failures.len(),
            warnings = expansion.warnings.len(),
            "expansion finished"
        );
        expansion
    }

    fn run(
        &self,
        masters: &[MasterRecord],
        by_master: &HashMap<i64, Vec<&ExceptionRecord>>,
    ) -> Vec<Outcome> {
        let workers = self.workers.min(masters.len());
        if workers <= 1 {
            return masters.iter().map(|m| self.outcome(m, by_master)).collect();
        }

        let chunk_len = masters.len().div_ceil(workers);
        std::thread::scope(|scope| {
            let handles: Vec<_> = masters
                .chunks(chunk_len)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|m| self.outcome(m, by_master))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }

    fn outcome(
        &self,
        master: &MasterRecord,
        by_master: &HashMap<i64, Vec<&ExceptionRecord>>,
    ) -> Outcome {
        let _span = tracing::debug_span!("master", master_id = master.id).entered();
        let exceptions = by_master.get(&master.id).map_or(&[][..], Vec::as_slice);

        match self.expand_master(master, exceptions) {
            Ok((instances, warnings)) => {
                for warning in &warnings {
                    tracing::warn!(master_id = master.id, "{warning}");
                }
                tracing::debug!(instances = instances.len(), "expanded");
                Outcome {
                    instances,
                    warnings,
                    failure: None,
                }
            }
            Err(error) => {
                tracing::warn!(master_id = master.id, %error, "master failed");
                Outcome {
                    instances: Vec::new(),
                    warnings: Vec::new(),
                    failure: Some(MasterFailure::new(master.id, error)),
                }
            }
        }
    }

    fn expand_master(
        &self,
        master: &MasterRecord,
        exceptions: &[&ExceptionRecord],
    ) -> Result<(Vec<RecurrenceInstance>, Vec<AnomalyWarning>), ExpandError> {
        if master.end <= master.start {
            return Err(ExpandError::InvalidAnchor {
                start: master.start,
                end: master.end,
            });
        }

        if !master.is_recurring {
            let mut instances = Vec::new();
            if self.overlaps(master.start, master.end) {
                instances.push(RecurrenceInstance::new(master.id, master.start, master.end, None));
            }
            let orphans = exceptions
                .iter()
                .map(|e| AnomalyWarning::OrphanedException {
                    master_id: e.master_id,
                    original_start: e.original_start,
                })
                .collect();
            return Ok((instances, orphans));
        }

        let raw = master
            .recurrence_data
            .as_deref()
            .ok_or_else(|| ParseError::missing("recurrence_data"))?;
        let (pattern, range) = parser::parse(raw, master.start)?;
        tracing::debug!(kind = pattern.kind_name(), %pattern, %range, "parsed recurrence");

        let horizon = self.horizon(exceptions);
        if range.is_unbounded() && horizon.is_none() && self.instance_cap.is_none() {
            return Err(ExpandError::UnboundedRangeWithoutWindow);
        }

        let adjuster = TimezoneAdjuster::new(self.bias, master.start);
        let series = Bounded::new(
            generate(master.start, master.end, &pattern, &range),
            horizon,
            self.instance_cap,
        );
        let mut merged = merge(series, exceptions.iter().copied());

        let mut occurrences = Vec::new();
        for occ in merged.by_ref() {
            if occ.replaced {
                occurrences.push(occ);
            } else {
                let (start, end) = adjuster.adjust(occ.start, occ.end)?;
                occurrences.push(MergedOccurrence { start, end, ..occ });
            }
        }

        let reached = merged.get_ref().reached();
        let mut warnings = merged.finish(reached);
        let instances = drop_conflicts(master.id, occurrences, &mut warnings)
            .into_iter()
            .filter(|occ| self.overlaps(occ.start, occ.end))
            .map(|occ| {
                RecurrenceInstance::new(master.id, occ.start, occ.end, Some(occ.scheduled_start))
            })
            .collect();
        Ok((instances, warnings))
    }

    /// Latest scheduled start worth generating, if the window has an end.
    ///
    /// Reaches past the window end far enough to catch occurrences that a
    /// replacement or the daylight shift moves back into it.
    fn horizon(&self, exceptions: &[&ExceptionRecord]) -> Option<DateTime> {
        let end = self.window_end?;
        let moved_back = exceptions
            .iter()
            .filter_map(|e| match e.kind {
                ExceptionKind::Replaced { start, .. } => Some(start.duration_until(e.original_start)),
                ExceptionKind::Deleted => None,
            })
            .filter(|d| d.is_positive())
            .max()
            .unwrap_or(SignedDuration::ZERO);
        let daylight = SignedDuration::from_mins(i64::from(self.bias.daylight_minutes.unsigned_abs()));
        let lookahead = moved_back.saturating_add(daylight);
        Some(end.checked_add(lookahead).unwrap_or(DateTime::MAX))
    }

    fn overlaps(&self, start: DateTime, end: DateTime) -> bool {
        self.window_start.map_or(true, |ws| end > ws) && self.window_end.map_or(true, |we| start < we)
    }
}

struct Outcome {
    instances: Vec<RecurrenceInstance>,
    warnings: Vec<AnomalyWarning>,
    failure: Option<MasterFailure>,
}

/// Drops replacements that overlap another occurrence of the same series.
///
/// Scheduled occurrences always stay. Replacements are checked in schedule
/// order against everything kept so far, so of two colliding replacements
/// the earlier-scheduled one wins.
fn drop_conflicts(
    master_id: i64,
    occurrences: Vec<MergedOccurrence>,
    warnings: &mut Vec<AnomalyWarning>,
) -> Vec<MergedOccurrence> {
    let (mut kept, moved): (Vec<_>, Vec<_>) =
        occurrences.into_iter().partition(|occ| !occ.replaced);

    for occ in moved {
        let clash = kept
            .iter()
            .find(|other| other.start < occ.end && occ.start < other.end);
        match clash {
            Some(other) => warnings.push(AnomalyWarning::ConflictingReplacement {
                master_id,
                original_start: occ.scheduled_start,
                conflicts_with: other.scheduled_start,
            }),
            None => kept.push(occ),
        }
    }
    kept
}

/// Exceptions naming a master that is not in the batch, in id order.
fn unknown_masters(
    masters: &[MasterRecord],
    by_master: &HashMap<i64, Vec<&ExceptionRecord>>,
) -> Vec<AnomalyWarning> {
    let known: std::collections::HashSet<i64> = masters.iter().map(|m| m.id).collect();
    let unknown: BTreeMap<i64, &Vec<&ExceptionRecord>> = by_master
        .iter()
        .filter(|(id, _)| !known.contains(*id))
        .map(|(id, list)| (*id, list))
        .collect();
    unknown
        .into_values()
        .flatten()
        .map(|e| AnomalyWarning::UnknownMaster {
            master_id: e.master_id,
            original_start: e.original_start,
        })
        .collect()
}

/// Stops a series at a horizon or after a fixed number of occurrences.
#[derive(Debug)]
struct Bounded<I> {
    inner: I,
    horizon: Option<DateTime>,
    remaining: Option<u32>,
    last: Option<DateTime>,
    truncated: bool,
    reached: DateTime,
}

impl<I> Bounded<I> {
    fn new(inner: I, horizon: Option<DateTime>, cap: Option<u32>) -> Self {
        Self {
            inner,
            horizon,
            remaining: cap,
            last: None,
            truncated: false,
            reached: DateTime::MIN,
        }
    }

    /// How far the series was followed when it was cut short, or `None`
    /// when it ran to its own end.
    fn reached(&self) -> Option<DateTime> {
        self.truncated.then_some(self.reached)
    }
}

impl<I> Iterator for Bounded<I>
where
    I: Iterator<Item = Occurrence>,
{
    type Item = Occurrence;

    fn next(&mut self) -> Option<Self::Item> {
        if self.truncated {
            return None;
        }
        let occ = self.inner.next()?;
        if self.remaining == Some(0) {
            // Only a series with more to give counts as cut short.
            self.truncated = true;
            self.reached = self.last.unwrap_or(DateTime::MIN);
            return None;
        }
        if let Some(horizon) = self.horizon {
            if occ.start > horizon {
                self.truncated = true;
                self.reached = horizon;
                return None;
            }
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        self.last = Some(occ.start);
        Some(occ)
    }
}
