//! The master date index: the process-wide vector of trading days.

use chrono::NaiveDate;

/// The monotonically increasing sequence of trading days shared by the cache.
///
/// Conceptually each entry sits at 16:00 local (market close) on a fixed
/// timezone; day precision is all the interval algebra needs, so the index is
/// stored as plain [`NaiveDate`]s. It is rebuilt wholesale once a day by a
/// background task (see `cache-manager`); live [`CacheItem`](crate::CacheItem)s
/// are unaffected by a rebuild because they carry their own `covered_period`
/// and only re-resolve `start_idx` the next time they're touched by an insert.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DateIndex {
    days: Vec<NaiveDate>,
}

impl DateIndex {
    /// Builds a date index from a strictly ascending, deduplicated vector of
    /// trading days.
    #[must_use]
    pub fn new(days: Vec<NaiveDate>) -> Self {
        debug_assert!(
            days.windows(2).all(|w| w[0] < w[1]),
            "DateIndex must be strictly ascending"
        );
        Self { days }
    }

    /// An empty date index, useful before the first calendar refresh.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// All trading days, ascending.
    #[must_use]
    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    /// Number of trading days in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// True if the index has no days (e.g. before the first refresh).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Index of the first trading day `>= date`, or `self.len()` if `date` is
    /// after every trading day in the index.
    #[must_use]
    pub fn first_at_or_after(&self, date: NaiveDate) -> usize {
        self.days.partition_point(|&d| d < date)
    }

    /// The trading day at `idx`, if in range.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<NaiveDate> {
        self.days.get(idx).copied()
    }

    /// The index position of `date` if it is itself a trading day.
    #[must_use]
    pub fn position_of(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.first_at_or_after(date);
        (self.days.get(idx) == Some(&date)).then_some(idx)
    }

    /// The trading day immediately following `date` in the index, i.e. the
    /// trading-day successor used to decide Friday/Monday contiguity across a
    /// weekend. `None` if `date` is the last trading day or after it.
    #[must_use]
    pub fn trading_day_successor(&self, date: NaiveDate) -> Option<NaiveDate> {
        let idx = self.first_at_or_after(date);
        match self.days.get(idx) {
            Some(&d) if d == date => self.days.get(idx + 1).copied(),
            Some(&d) => Some(d),
            None => None,
        }
    }
}
