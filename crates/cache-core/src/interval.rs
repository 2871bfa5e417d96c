//! Inclusive date intervals and their predicates.

use chrono::{Days, NaiveDate};

use crate::error::{CacheError, Result};

/// An inclusive `[begin, end]` date interval at day precision.
///
/// Validity requires `begin <= end`. Adjacency uses calendar-day `+1`/`-1`, not
/// trading-day succession, so the interval algebra stays independent of any
/// trading calendar; only [`cache`](https://docs.rs/cache)'s `DateIndex`-aware
/// helpers reach into the calendar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    /// Start of the interval, inclusive.
    pub begin: NaiveDate,
    /// End of the interval, inclusive.
    pub end: NaiveDate,
}

impl Interval {
    /// Creates a new interval without validating `begin <= end`.
    #[must_use]
    pub const fn new(begin: NaiveDate, end: NaiveDate) -> Self {
        Self { begin, end }
    }

    /// Validates that `begin <= end`.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidTimeRange`] if `end < begin`.
    pub fn valid(&self) -> Result<()> {
        if self.end < self.begin {
            return Err(CacheError::InvalidTimeRange {
                begin: self.begin,
                end: self.end,
            });
        }
        Ok(())
    }

    /// True if `self` fully contains `other`.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }

    /// True if `self` and `other` share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }

    /// True if `self` and `other` are calendar-day adjacent (one ends the day
    /// before the other begins), in either orientation.
    #[must_use]
    pub fn adjacent(&self, other: &Self) -> bool {
        let Some(day_after_self_end) = self.end.checked_add_days(Days::new(1)) else {
            return false;
        };
        let Some(day_after_other_end) = other.end.checked_add_days(Days::new(1)) else {
            return false;
        };
        day_after_self_end == other.begin || day_after_other_end == self.begin
    }

    /// True if `self` and `other` overlap or are calendar-day adjacent.
    #[must_use]
    pub fn contiguous(&self, other: &Self) -> bool {
        self.overlaps(other) || self.adjacent(other)
    }

    /// Returns the union of `self` and `other`. Callers should only call this
    /// when the two are [`contiguous`](Self::contiguous) or one contains the
    /// other; it is otherwise a meaningless span.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn valid_rejects_end_before_begin() {
        let iv = Interval::new(d(2024, 1, 5), d(2024, 1, 1));
        assert!(matches!(
            iv.valid(),
            Err(CacheError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn contains_is_inclusive_subset() {
        let outer = Interval::new(d(2024, 1, 1), d(2024, 1, 31));
        let inner = Interval::new(d(2024, 1, 10), d(2024, 1, 20));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn overlaps_detects_shared_day() {
        let a = Interval::new(d(2024, 1, 1), d(2024, 1, 10));
        let b = Interval::new(d(2024, 1, 10), d(2024, 1, 20));
        assert!(a.overlaps(&b));
        let c = Interval::new(d(2024, 1, 11), d(2024, 1, 20));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn adjacent_requires_calendar_day_successor() {
        let a = Interval::new(d(2024, 1, 1), d(2024, 1, 10));
        let b = Interval::new(d(2024, 1, 11), d(2024, 1, 20));
        assert!(a.adjacent(&b));
        assert!(b.adjacent(&a));

        // Friday -> Monday is NOT calendar-adjacent; only trading-day adjacent,
        // which is handled separately against the DateIndex.
        let fri = Interval::new(d(2024, 1, 1), d(2024, 1, 5));
        let mon = Interval::new(d(2024, 1, 8), d(2024, 1, 12));
        assert!(!fri.adjacent(&mon));
    }

    #[test]
    fn contiguous_is_overlap_or_adjacency() {
        let a = Interval::new(d(2024, 1, 1), d(2024, 1, 10));
        let b = Interval::new(d(2024, 1, 11), d(2024, 1, 20));
        let c = Interval::new(d(2024, 1, 5), d(2024, 1, 8));
        let far = Interval::new(d(2024, 2, 1), d(2024, 2, 5));
        assert!(a.contiguous(&b));
        assert!(a.contiguous(&c));
        assert!(!a.contiguous(&far));
    }
}
