//! The engine: a keyed store of `(security, metric) -> ordered CacheItem list`
//! with byte accounting, LRU timestamps, and a single-writer/many-reader lock.

use std::collections::HashMap;
use std::sync::Arc;

use cache_core::{CacheError, CacheKey, Frame, Interval, Metric, Result, Security};
use chrono::{DateTime, Days, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use crate::date_index::DateIndex;
use crate::item::CacheItem;
use crate::list_ops::insert_item;

/// How close to "now" an inserted range's end must be before its stored
/// `period.end` is truncated to the last real data point. See "recent-days
/// truncation" on [`SecurityMetricCache::set`].
const RECENT_DAYS_WINDOW: u64 = 7;

#[derive(Default)]
struct CacheState {
    items: HashMap<CacheKey, Vec<CacheItem>>,
    last_seen: HashMap<CacheKey, DateTime<Utc>>,
    size_bytes: u64,
}

/// An in-memory, byte-budgeted, LRU-evicting cache of per-security-metric
/// time series.
///
/// Reads (`check`, `get`, `get_partial`, `size`, `count`, `item_count`)
/// acquire a shared read guard; writes (`set`, `set_with_local_dates`, and the
/// LRU eviction they may trigger) acquire the exclusive write guard. The
/// `last_seen` touch happens inside that same write guard, so no additional
/// synchronization is needed for LRU bookkeeping.
#[derive(Debug)]
pub struct SecurityMetricCache {
    max_bytes: u64,
    date_index: Arc<RwLock<DateIndex>>,
    state: RwLock<CacheState>,
}

impl std::fmt::Debug for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheState")
            .field("keys", &self.items.len())
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

impl SecurityMetricCache {
    /// Creates an empty cache with the given byte budget, sharing a
    /// `DateIndex` with whatever task keeps it refreshed.
    #[must_use]
    pub fn new(max_bytes: u64, date_index: Arc<RwLock<DateIndex>>) -> Self {
        Self {
            max_bytes,
            date_index,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Reports whether some existing item fully covers `[begin,end]`, and
    /// lists every item whose `period` merely overlaps the request.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidTimeRange`] if `begin > end`.
    #[instrument(skip(self), fields(security = %security, metric = ?metric))]
    pub async fn check(
        &self,
        security: &Security,
        metric: Metric,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<(bool, Vec<Interval>)> {
        let requested = Interval::new(begin, end);
        let key = CacheKey::new(security, metric);
        if let Err(err) = requested.valid() {
            warn!(%key, %begin, %end, operation = "check", "invalid time range");
            return Err(err);
        }
        let state = self.state.read().await;
        match state.items.get(&key) {
            None => Ok((false, Vec::new())),
            Some(list) => {
                let covered = list.iter().any(|item| item.period.contains(&requested));
                let touching = list
                    .iter()
                    .filter(|item| item.period.overlaps(&requested))
                    .map(|item| item.period)
                    .collect();
                Ok((covered, touching))
            }
        }
    }

    /// Cuts a frame from the single item whose `period` contains
    /// `[begin,end]`.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidTimeRange`] if `begin > end`, or
    /// [`CacheError::RangeDoesNotExist`] if no single item contains the
    /// requested range.
    #[instrument(skip(self), fields(security = %security, metric = ?metric))]
    pub async fn get(
        &self,
        security: &Security,
        metric: Metric,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<Frame> {
        let requested = Interval::new(begin, end);
        let key = CacheKey::new(security, metric);
        if let Err(err) = requested.valid() {
            warn!(%key, %begin, %end, operation = "get", "invalid time range");
            return Err(err);
        }

        let date_index = self.date_index.read().await;
        let state = self.state.read().await;
        let item = state
            .items
            .get(&key)
            .and_then(|list| list.iter().find(|item| item.period.contains(&requested)));

        match item {
            Some(item) => Ok(extract_range(item, begin, end, &date_index)),
            None => {
                warn!(%key, %begin, %end, "no item covers requested range");
                Err(CacheError::RangeDoesNotExist {
                    key: key.to_string(),
                    begin,
                    end,
                })
            }
        }
    }

    /// Cuts a frame from the first item whose `period` overlaps
    /// `[begin,end]`. Returns an empty frame (never an error) if the range is
    /// invalid or nothing overlaps; used by fast paths where absence is
    /// expected.
    #[instrument(skip(self), fields(security = %security, metric = ?metric))]
    pub async fn get_partial(
        &self,
        security: &Security,
        metric: Metric,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Frame {
        let requested = Interval::new(begin, end);
        if requested.valid().is_err() {
            warn!(%begin, %end, "get_partial called with an invalid range");
            return Frame::empty();
        }
        let key = CacheKey::new(security, metric);

        let date_index = self.date_index.read().await;
        let state = self.state.read().await;
        let Some(item) = state
            .items
            .get(&key)
            .and_then(|list| list.iter().find(|item| item.period.overlaps(&requested)))
        else {
            return Frame::empty();
        };

        extract_range(item, begin, end, &date_index)
    }

    /// Inserts a dense frame. The frame's dates need not align exactly with
    /// the `DateIndex`: non-trading-day rows are dropped, and the remainder
    /// is split into maximal aligned runs, each inserted independently so a
    /// gap in the supplied frame never silently bridges two trading days
    /// that the calendar says are not adjacent.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidTimeRange`] if `begin > end`,
    /// [`CacheError::NoData`] if `frame` is empty, or
    /// [`CacheError::DataLargerThanCache`] if any aligned run alone exceeds
    /// the byte budget.
    #[instrument(skip(self, frame), fields(security = %security, metric = ?metric))]
    pub async fn set(
        &self,
        security: &Security,
        metric: Metric,
        begin: NaiveDate,
        end: NaiveDate,
        frame: Frame,
    ) -> Result<()> {
        let key = CacheKey::new(security, metric);
        if let Err(err) = Interval::new(begin, end).valid() {
            warn!(%key, %begin, %end, operation = "set", "invalid time range");
            return Err(err);
        }
        if frame.values.is_empty() {
            warn!(%key, %begin, %end, operation = "set", "set called with an empty frame");
            return Err(CacheError::NoData(key.to_string()));
        }

        let date_index = self.date_index.read().await.clone();
        if date_index.is_empty() {
            warn!(%key, %begin, %end, operation = "set", "no trading days in shared date index");
            return Err(CacheError::NoTradingDays);
        }

        let positions: Vec<Option<usize>> = frame
            .dates
            .iter()
            .map(|date| date_index.position_of(*date))
            .collect();

        let mut i = 0;
        while i < frame.dates.len() {
            if positions[i].is_none() {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            while j < frame.dates.len() {
                match (positions[j - 1], positions[j]) {
                    (Some(a), Some(b)) if b == a + 1 => j += 1,
                    _ => break,
                }
            }

            let sub_begin = frame.dates[i].max(begin);
            let sub_end = frame.dates[j - 1].min(end);
            let sub_values = frame.values[i..j].to_vec();
            let start_idx = positions[i].expect("run start was checked Some above");

            self.set_matched_dense(&key, sub_begin, sub_end, sub_values, start_idx, &date_index)
                .await?;
            i = j;
        }

        Ok(())
    }

    /// Inserts a sparse (event-day) frame with its own local date vector.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidTimeRange`] if `begin > end`,
    /// [`CacheError::DateLengthDoesNotMatch`] if `dates.len() != values.len()`,
    /// [`CacheError::NoData`] if both are empty, or
    /// [`CacheError::DataLargerThanCache`] if the frame alone exceeds the
    /// byte budget.
    #[instrument(skip(self, dates, values), fields(security = %security, metric = ?metric))]
    pub async fn set_with_local_dates(
        &self,
        security: &Security,
        metric: Metric,
        begin: NaiveDate,
        end: NaiveDate,
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
    ) -> Result<()> {
        let key = CacheKey::new(security, metric);
        if let Err(err) = Interval::new(begin, end).valid() {
            warn!(%key, %begin, %end, operation = "set_with_local_dates", "invalid time range");
            return Err(err);
        }

        if dates.len() != values.len() {
            warn!(
                %key, %begin, %end, operation = "set_with_local_dates",
                dates = dates.len(), values = values.len(),
                "date length does not match value length"
            );
            return Err(CacheError::DateLengthDoesNotMatch {
                key: key.to_string(),
                dates: dates.len(),
                values: values.len(),
            });
        }
        if values.is_empty() {
            warn!(%key, %begin, %end, operation = "set_with_local_dates", "set called with an empty frame");
            return Err(CacheError::NoData(key.to_string()));
        }

        let bytes = (values.len() as u64) * 8;
        if bytes > self.max_bytes {
            warn!(
                %key, %begin, %end, operation = "set_with_local_dates",
                bytes, max_bytes = self.max_bytes,
                "frame exceeds cache capacity"
            );
            return Err(CacheError::DataLargerThanCache {
                key: key.to_string(),
                bytes,
                max_bytes: self.max_bytes,
            });
        }

        let covered_period = Interval::new(
            *dates.first().expect("checked non-empty above"),
            *dates.last().expect("checked non-empty above"),
        );
        let period = Interval::new(begin, truncate_recent_end(end, covered_period.end));
        let new_item = CacheItem::local(period, covered_period, dates, values);

        let date_index = self.date_index.read().await.clone();
        let mut state = self.state.write().await;
        if state.size_bytes + bytes > self.max_bytes {
            delete_lru(&mut state, bytes);
        }
        let items = state.items.entry(key.clone()).or_default();
        let added = insert_item(items, new_item, &date_index);
        state.size_bytes += added;
        state.last_seen.insert(key, Utc::now());

        Ok(())
    }

    /// Total bytes held across every key.
    pub async fn size(&self) -> u64 {
        self.state.read().await.size_bytes
    }

    /// Number of distinct `(security, metric)` keys with at least one item.
    pub async fn count(&self) -> usize {
        self.state.read().await.items.len()
    }

    /// Number of non-contiguous items held under one key.
    pub async fn item_count(&self, security: &Security, metric: Metric) -> usize {
        let key = CacheKey::new(security, metric);
        self.state
            .read()
            .await
            .items
            .get(&key)
            .map_or(0, Vec::len)
    }

    async fn set_matched_dense(
        &self,
        key: &CacheKey,
        begin: NaiveDate,
        end: NaiveDate,
        values: Vec<f64>,
        start_idx: usize,
        date_index: &DateIndex,
    ) -> Result<()> {
        let bytes = (values.len() as u64) * 8;
        if bytes > self.max_bytes {
            warn!(
                %key, %begin, %end, operation = "set_matched_dense",
                bytes, max_bytes = self.max_bytes,
                "frame exceeds cache capacity"
            );
            return Err(CacheError::DataLargerThanCache {
                key: key.to_string(),
                bytes,
                max_bytes: self.max_bytes,
            });
        }

        let covered_begin = date_index.get(start_idx).ok_or(CacheError::NoTradingDays)?;
        let covered_end = date_index
            .get(start_idx + values.len() - 1)
            .ok_or(CacheError::NoTradingDays)?;
        let covered_period = Interval::new(covered_begin, covered_end);
        let period = Interval::new(begin, truncate_recent_end(end, covered_period.end));
        let new_item = CacheItem::dense(period, covered_period, values, start_idx);

        let mut state = self.state.write().await;
        if state.size_bytes + bytes > self.max_bytes {
            delete_lru(&mut state, bytes);
        }
        let items = state.items.entry(key.clone()).or_default();
        let added = insert_item(items, new_item, date_index);
        state.size_bytes += added;
        state.last_seen.insert(key.clone(), Utc::now());

        Ok(())
    }
}

/// Clamps `end` to the last real data point when the caller's range reaches
/// into the last [`RECENT_DAYS_WINDOW`] calendar days of "now", so the cache
/// never claims coverage of a day the data source has not published yet.
fn truncate_recent_end(end: NaiveDate, covered_end: NaiveDate) -> NaiveDate {
    let now = Utc::now().date_naive();
    let Some(cutoff) = now.checked_sub_days(Days::new(RECENT_DAYS_WINDOW)) else {
        return end;
    };
    if end >= cutoff {
        covered_end.max(cutoff)
    } else {
        end
    }
}

/// Evicts whole keys, oldest `last_seen` first, until more than
/// `bytes_to_delete` bytes have been freed. Returns the total freed.
fn delete_lru(state: &mut CacheState, bytes_to_delete: u64) -> u64 {
    let mut by_age: Vec<(CacheKey, DateTime<Utc>)> = state
        .last_seen
        .iter()
        .map(|(key, seen)| (key.clone(), *seen))
        .collect();
    by_age.sort_by_key(|(_, seen)| *seen);

    let mut cleared = 0u64;
    for (key, _) in by_age {
        let Some(items) = state.items.remove(&key) else {
            continue;
        };
        let freed: u64 = items.iter().map(CacheItem::byte_size).sum();
        state.last_seen.remove(&key);
        cleared += freed;
        warn!(%key, freed, "evicted key under LRU pressure");
        if cleared > bytes_to_delete {
            break;
        }
    }

    state.size_bytes = state.size_bytes.saturating_sub(cleared);
    cleared
}

/// Cuts `[begin,end]` out of `item`'s values, following the range-extraction
/// algorithm: clamp `end` to what the item actually covers, binary-search the
/// boundary indices, and fall back to an empty frame for every "no values
/// here" edge case (weekend inside a covered period, a sparse item's
/// non-event day, a request past what the item covers).
fn extract_range(item: &CacheItem, begin: NaiveDate, end: NaiveDate, date_index: &DateIndex) -> Frame {
    let dates = item.effective_dates(date_index);
    if dates.is_empty() {
        return Frame::empty();
    }

    let covered = item.covered_period;
    let end = end.min(covered.end);

    let mut no_values_found = begin > covered.end || end < covered.begin;

    let begin_idx = dates.partition_point(|&d| d < begin);
    if item.is_local_date_index() && begin_idx >= dates.len() {
        no_values_found = true;
    }

    let mut end_idx = dates.partition_point(|&d| d < end);
    if end_idx >= dates.len() {
        end_idx = dates.len() - 1;
    }

    let end_is_exact = dates[end_idx] == end;
    if !end_is_exact && begin_idx != end_idx {
        end_idx -= 1;
    }

    if !no_values_found {
        match dates.get(begin_idx) {
            Some(&first_included) if first_included <= end => {}
            _ => no_values_found = true,
        }
    }

    if no_values_found || begin_idx >= dates.len() || begin_idx > end_idx {
        return Frame::empty();
    }

    Frame::new(
        dates[begin_idx..=end_idx].to_vec(),
        item.values[begin_idx..=end_idx].to_vec(),
    )
}
