//! A single contiguous run of cached values for one `(security, metric)` key.

use cache_core::Interval;
use chrono::NaiveDate;

use crate::date_index::DateIndex;

/// The unit of storage in a [`SecurityMetricCache`](crate::SecurityMetricCache).
///
/// A dense item's values correspond to `DateIndex[start_idx + i]`; a
/// local-date item carries its own `local_dates` vector instead. Exclusively
/// owned by the key's item list; external callers only ever receive copies
/// built from a slice of an item's values, never a reference into it.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheItem {
    /// The logical interval this item claims to cover (the request-time
    /// horizon, possibly trimmed by recent-days truncation).
    pub period: Interval,
    /// The interval actually spanned by `values`
    /// (`[dates.first(), dates.last()]`). Always a subset of `period`.
    pub covered_period: Interval,
    /// Ordered values. For dense items, `values[i]` is `DateIndex[start_idx +
    /// i]`'s value; for local-date items, `values[i]` is `local_dates[i]`'s.
    pub values: Vec<f64>,
    /// True for sparse metrics, which always carry their own date index.
    pub is_local_date: bool,
    /// Present iff `is_local_date`; strictly ascending and within `period`.
    pub local_dates: Vec<NaiveDate>,
    /// Index into the shared `DateIndex` of this item's first covered day.
    /// Meaningless (left at 0) for local-date items.
    pub start_idx: usize,
}

impl CacheItem {
    /// Builds a dense item. `start_idx` must be the position in `date_index`
    /// of `covered_period.begin`.
    #[must_use]
    pub fn dense(period: Interval, covered_period: Interval, values: Vec<f64>, start_idx: usize) -> Self {
        Self {
            period,
            covered_period,
            values,
            is_local_date: false,
            local_dates: Vec::new(),
            start_idx,
        }
    }

    /// Builds a local-date (sparse) item. `local_dates.len()` must equal
    /// `values.len()`.
    #[must_use]
    pub fn local(period: Interval, covered_period: Interval, local_dates: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        Self {
            period,
            covered_period,
            values,
            is_local_date: true,
            local_dates,
            start_idx: 0,
        }
    }

    /// True for sparse-metric items backed by their own date vector.
    #[must_use]
    pub fn is_local_date_index(&self) -> bool {
        self.is_local_date
    }

    /// The local date vector, empty for dense items.
    #[must_use]
    pub fn local_dates(&self) -> &[NaiveDate] {
        &self.local_dates
    }

    /// The dates this item actually covers, resolved against the shared
    /// `DateIndex` for dense items or returned directly for local-date items.
    #[must_use]
    pub fn effective_dates<'a>(&'a self, date_index: &'a DateIndex) -> &'a [NaiveDate] {
        if self.is_local_date {
            &self.local_dates
        } else {
            let end = self.start_idx + self.values.len();
            &date_index.days()[self.start_idx.min(date_index.len())..end.min(date_index.len())]
        }
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if this item holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Size in bytes: `values.len() * 8`.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        (self.values.len() as u64) * 8
    }

    /// Replaces all fields with `other`'s, in place. The sole way a merged
    /// value takes over an existing item's slot in the owning list without
    /// reallocating the list itself.
    pub fn copy_from(&mut self, other: Self) {
        *self = other;
    }
}
