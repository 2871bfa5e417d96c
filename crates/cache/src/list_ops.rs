//! Insert/merge/defrag routines over the sorted per-key list of [`CacheItem`]s.
//!
//! These functions maintain the per-key invariant that the list stays sorted
//! by `period.begin` and that no two neighbors remain
//! [`contiguous`](cache_core::Interval::contiguous) once a mutation settles.

use chrono::NaiveDate;

use crate::date_index::DateIndex;
use crate::item::CacheItem;

/// True if `a` and `b` should be treated as contiguous and thus merged: either
/// their logical periods and covered periods are both calendar-contiguous, or
/// (the Friday/Monday case) they are dense items whose covered ranges are
/// adjacent with no missing trading day between them per the shared
/// `DateIndex`, even though the calendar gap disqualifies plain
/// [`Interval::contiguous`](cache_core::Interval::contiguous).
#[must_use]
pub fn items_are_contiguous(a: &CacheItem, b: &CacheItem, date_index: &DateIndex) -> bool {
    let periods_contiguous =
        a.period.contiguous(&b.period) && a.covered_period.contiguous(&b.covered_period);
    periods_contiguous || contiguous_by_date_index(a, b, date_index)
}

/// True if two dense items' covered ranges are adjacent in trading-day terms:
/// the trading day immediately following the earlier item's last covered day
/// falls at or before the later item's last covered day, i.e. no trading day
/// sits uncovered between them. Always `false` for local-date (sparse) items,
/// which have no shared `DateIndex` position to compare.
#[must_use]
pub fn contiguous_by_date_index(a: &CacheItem, b: &CacheItem, date_index: &DateIndex) -> bool {
    if a.is_local_date_index() || b.is_local_date_index() {
        return false;
    }
    let (lo, hi) = order_by_covered_begin(a, b);
    match date_index.trading_day_successor(lo.covered_period.end) {
        Some(successor) => successor <= hi.covered_period.end,
        None => false,
    }
}

fn order_by_covered_begin<'a>(a: &'a CacheItem, b: &'a CacheItem) -> (&'a CacheItem, &'a CacheItem) {
    if a.covered_period.begin <= b.covered_period.begin {
        (a, b)
    } else {
        (b, a)
    }
}

/// Merges two (possibly overlapping or merely contiguous) items into one,
/// concatenating their value runs with any duplicated overlap counted once
/// and preserving ascending date order. Panics if the two items disagree on
/// `is_local_date`: that would mean the caller mixed a dense and a sparse
/// item under the same key, which is an invariant violation, not a runtime
/// condition this function is expected to recover from.
#[must_use]
pub fn merge(receiver: &CacheItem, incoming: &CacheItem, date_index: &DateIndex) -> CacheItem {
    assert_eq!(
        receiver.is_local_date_index(),
        incoming.is_local_date_index(),
        "cannot merge a dense item with a local-date item"
    );

    let period = receiver.period.union(&incoming.period);

    if receiver.is_local_date_index() {
        merge_local(receiver, incoming, period)
    } else {
        merge_dense(receiver, incoming, date_index, period)
    }
}

fn merge_dense(
    receiver: &CacheItem,
    incoming: &CacheItem,
    date_index: &DateIndex,
    period: cache_core::Interval,
) -> CacheItem {
    let (lo, hi) = if receiver.start_idx <= incoming.start_idx {
        (receiver, incoming)
    } else {
        (incoming, receiver)
    };
    let lo_end = lo.start_idx + lo.values.len();

    let mut values = lo.values.clone();
    if hi.start_idx >= lo_end {
        // Adjacent or exactly touching: append all of hi's values.
        values.extend_from_slice(&hi.values);
    } else {
        // Overlapping: skip the portion of hi already covered by lo.
        let overlap = lo_end - hi.start_idx;
        if overlap < hi.values.len() {
            values.extend_from_slice(&hi.values[overlap..]);
        }
    }

    let covered_period = lo.covered_period.union(&hi.covered_period);
    let start_idx = lo.start_idx;
    let _ = date_index; // resolved purely from index positions already carried by the items
    CacheItem::dense(period, covered_period, values, start_idx)
}

fn merge_local(receiver: &CacheItem, incoming: &CacheItem, period: cache_core::Interval) -> CacheItem {
    let mut dates: Vec<NaiveDate> = Vec::with_capacity(receiver.local_dates.len() + incoming.local_dates.len());
    let mut values: Vec<f64> = Vec::with_capacity(receiver.values.len() + incoming.values.len());

    let (mut i, mut j) = (0usize, 0usize);
    let (r_dates, r_values) = (&receiver.local_dates, &receiver.values);
    let (n_dates, n_values) = (&incoming.local_dates, &incoming.values);

    while i < r_dates.len() && j < n_dates.len() {
        match r_dates[i].cmp(&n_dates[j]) {
            std::cmp::Ordering::Less => {
                dates.push(r_dates[i]);
                values.push(r_values[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                dates.push(n_dates[j]);
                values.push(n_values[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                // Duplicate day: keep the receiver's value, count it once.
                dates.push(r_dates[i]);
                values.push(r_values[i]);
                i += 1;
                j += 1;
            }
        }
    }
    dates.extend_from_slice(&r_dates[i..]);
    values.extend_from_slice(&r_values[i..]);
    dates.extend_from_slice(&n_dates[j..]);
    values.extend_from_slice(&n_values[j..]);

    let covered_period = receiver.covered_period.union(&incoming.covered_period);
    CacheItem::local(period, covered_period, dates, values)
}

/// Inserts `new` into the sorted, non-contiguous item list for one key,
/// merging with or being absorbed by an existing item as needed, and runs a
/// [`defrag`] pass if the list grew past one element. Returns the number of
/// bytes added to the key's total size (`new cells * 8`).
pub fn insert_item(items: &mut Vec<CacheItem>, new: CacheItem, date_index: &DateIndex) -> u64 {
    if items.is_empty() {
        let added = new.byte_size();
        items.push(new);
        return added;
    }

    let mut insertion_point = items.len();
    let mut added: Option<u64> = None;

    for i in 0..items.len() {
        let existing = &items[i];

        if existing.period.contains(&new.period) {
            added = Some(0);
            break;
        }
        if new.period.contains(&existing.period) {
            let delta = new.byte_size().saturating_sub(existing.byte_size());
            items[i] = new;
            added = Some(delta);
            break;
        }
        if items_are_contiguous(existing, &new, date_index) {
            let merged = merge(existing, &new, date_index);
            let delta = merged.byte_size().saturating_sub(existing.byte_size());
            items[i] = merged;
            added = Some(delta);
            break;
        }
        if insertion_point == items.len() && existing.period.begin > new.period.begin {
            insertion_point = i;
        }
    }

    let added = match added {
        Some(a) => a,
        None => {
            let a = new.byte_size();
            items.insert(insertion_point, new);
            a
        }
    };

    if items.len() > 1 {
        defrag(items, date_index);
    }

    added
}

/// Coalesces any newly-adjacent pairs in a sorted item list. A single pass
/// suffices: the list was sorted going in and at most one merge per adjacent
/// pair can occur from a single insertion.
pub fn defrag(items: &mut Vec<CacheItem>, date_index: &DateIndex) {
    let mut i = 0;
    while i + 1 < items.len() {
        if items[i].period.contains(&items[i + 1].period) {
            items.remove(i + 1);
            continue;
        }
        if items_are_contiguous(&items[i], &items[i + 1], date_index) {
            let merged = merge(&items[i], &items[i + 1], date_index);
            items[i] = merged;
            items.remove(i + 1);
            continue;
        }
        i += 1;
    }
}
