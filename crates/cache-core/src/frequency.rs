//! Frequency filtering for dense day vectors.
//!
//! [`Frequency`] is not part of the cache itself, it consumes the cache's
//! output, filtering a dense vector of trading days down to period boundaries
//! (e.g. the last trading day of each month).

use serde::{Deserialize, Serialize};

use chrono::{Datelike, NaiveDate};

/// A closed enumeration of period-boundary filters over a dense day vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Every day, unfiltered.
    Daily,
    /// The first trading day of each ISO week.
    WeekBegin,
    /// The last trading day of each ISO week.
    WeekEnd,
    /// The first trading day of each month.
    MonthBegin,
    /// The last trading day of each month.
    MonthEnd,
    /// The first trading day of each year.
    YearBegin,
    /// The last trading day of each year.
    YearEnd,
}

impl Frequency {
    /// Filters a strictly ascending vector of trading days down to this
    /// frequency's period boundaries.
    ///
    /// `days` is assumed sorted ascending and free of duplicates, as every
    /// [`DateIndex`](https://docs.rs/cache) slice the cache hands out is.
    #[must_use]
    pub fn boundary_dates(&self, days: &[NaiveDate]) -> Vec<NaiveDate> {
        if days.is_empty() {
            return Vec::new();
        }
        match self {
            Self::Daily => days.to_vec(),
            Self::WeekBegin => Self::filter_boundaries(days, |d| d.iso_week(), true),
            Self::WeekEnd => Self::filter_boundaries(days, |d| d.iso_week(), false),
            Self::MonthBegin => Self::filter_boundaries(days, |d| (d.year(), d.month()), true),
            Self::MonthEnd => Self::filter_boundaries(days, |d| (d.year(), d.month()), false),
            Self::YearBegin => Self::filter_boundaries(days, |d| d.year(), true),
            Self::YearEnd => Self::filter_boundaries(days, |d| d.year(), false),
        }
    }

    /// Keeps the first (if `begin`) or last (otherwise) day of each run of
    /// equal `key(day)`.
    fn filter_boundaries<K: PartialEq>(
        days: &[NaiveDate],
        key: impl Fn(NaiveDate) -> K,
        begin: bool,
    ) -> Vec<NaiveDate> {
        let mut out = Vec::new();
        for (i, &day) in days.iter().enumerate() {
            let this_key = key(day);
            let boundary = if begin {
                i == 0 || key(days[i - 1]) != this_key
            } else {
                i + 1 == days.len() || key(days[i + 1]) != this_key
            };
            if boundary {
                out.push(day);
            }
        }
        out
    }
}
