use std::collections::HashMap;

use jiff::civil::DateTime;

use crate::error::AnomalyWarning;
use crate::generator::Occurrence;
use crate::model::{ExceptionKind, ExceptionRecord};

/// A generated occurrence after its exception, if any, has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedOccurrence {
    /// Start as generated, before any replacement.
    pub scheduled_start: DateTime,
    pub start: DateTime,
    pub end: DateTime,
    /// Whether an exception moved or resized this occurrence.
    pub replaced: bool,
}

impl MergedOccurrence {
    fn pristine(occ: Occurrence) -> Self {
        Self {
            scheduled_start: occ.start,
            start: occ.start,
            end: occ.end,
            replaced: false,
        }
    }
}

/// Apply `exceptions` to `occurrences`, matching on the exact scheduled start.
///
/// Deleted occurrences are dropped, replaced ones carry the replacement
/// times, everything else passes through. Emission order is generation
/// order.
pub fn merge<'a, I, E>(occurrences: I, exceptions: E) -> Merge<'a, I::IntoIter>
where
    I: IntoIterator<Item = Occurrence>,
    E: IntoIterator<Item = &'a ExceptionRecord>,
{
    let mut index: HashMap<DateTime, &'a ExceptionRecord> = HashMap::new();
    let mut anomalies = Vec::new();

    for exception in exceptions {
        if let ExceptionKind::Replaced { start, end } = exception.kind {
            if end <= start {
                anomalies.push(AnomalyWarning::InvalidReplacement {
                    master_id: exception.master_id,
                    original_start: exception.original_start,
                });
                continue;
            }
        }
        if index.insert(exception.original_start, exception).is_some() {
            anomalies.push(AnomalyWarning::DuplicateException {
                master_id: exception.master_id,
                original_start: exception.original_start,
            });
        }
    }

    Merge {
        inner: occurrences.into_iter(),
        index,
        anomalies,
    }
}

/// Iterator returned by [`merge`].
#[derive(Debug)]
pub struct Merge<'a, I> {
    inner: I,
    index: HashMap<DateTime, &'a ExceptionRecord>,
    anomalies: Vec<AnomalyWarning>,
}

impl<'a, I> Merge<'a, I> {
    /// The underlying occurrence iterator.
    pub fn get_ref(&self) -> &I {
        &self.inner
    }

    /// Exceptions not matched so far whose original start is at or before
    /// `reached`. With `None` the series is taken to have ended and every
    /// unmatched exception is an orphan.
    pub fn orphans(&self, reached: Option<DateTime>) -> Vec<AnomalyWarning> {
        let mut unmatched: Vec<&ExceptionRecord> = self
            .index
            .values()
            .copied()
            .filter(|e| reached.map_or(true, |r| e.original_start <= r))
            .collect();
        unmatched.sort_by_key(|e| e.original_start);
        unmatched
            .into_iter()
            .map(|e| AnomalyWarning::OrphanedException {
                master_id: e.master_id,
                original_start: e.original_start,
            })
            .collect()
    }

    /// All anomalies: invalid or duplicate exceptions found up front, then
    /// orphans as of `reached`.
    pub fn finish(self, reached: Option<DateTime>) -> Vec<AnomalyWarning> {
        let orphans = self.orphans(reached);
        let mut anomalies = self.anomalies;
        anomalies.extend(orphans);
        anomalies
    }
}

impl<I> Iterator for Merge<'_, I>
where
    I: Iterator<Item = Occurrence>,
{
    type Item = MergedOccurrence;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let occ = self.inner.next()?;
            let Some(exception) = self.index.remove(&occ.start) else {
                return Some(MergedOccurrence::pristine(occ));
            };
            match exception.kind {
                ExceptionKind::Deleted => continue,
                ExceptionKind::Replaced { start, end } => {
                    return Some(MergedOccurrence {
                        scheduled_start: occ.start,
                        start,
                        end,
                        replaced: true,
                    })
                }
            }
        }
    }
}
