//! The [`Frame`] data currency exchanged between fetchers, the cache, and callers.

use chrono::NaiveDate;
use polars::prelude::{Column, DataFrame, PlSmallStr};

use crate::error::{CacheError, Result};

/// A tuple of parallel vectors: dates and the values observed on them.
///
/// `dates` is always strictly ascending. `Frame` is the boundary type a fetcher
/// hands back and a cache `get`/`get_partial` call returns; the cache's internal
/// storage ([`CacheItem`](https://docs.rs/cache)) operates on these same plain
/// vectors directly rather than through Polars, since the interval algebra needs
/// cheap binary search and slicing. Polars is only used at the edges, via
/// [`Frame::from_dataframe`]/[`Frame::to_dataframe`], to stay aligned with the
/// rest of the data stack.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    /// Dates of each observation, strictly ascending.
    pub dates: Vec<NaiveDate>,
    /// Values parallel to `dates`.
    pub values: Vec<f64>,
    /// Optional column name, carried through for display/debugging only.
    pub name: Option<String>,
}

impl Frame {
    /// Creates a new frame from parallel date/value vectors.
    #[must_use]
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        Self {
            dates,
            values,
            name: None,
        }
    }

    /// Sets the optional column name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// An empty frame, used as the degraded-but-not-erroring result of
    /// `get_partial` and of `get` over a fully empty window.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// True if there are no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Size in bytes, `values.len() * 8`, per the cache's byte accounting.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        (self.values.len() as u64) * 8
    }

    /// Builds a frame from a two-column Polars `DataFrame` with `date` and
    /// `value` columns, as an `EodFetcher` implementation backed by a SQL
    /// query result set would hand back.
    ///
    /// # Errors
    /// Returns [`CacheError::Other`] if the expected columns are missing or of
    /// the wrong dtype.
    pub fn from_dataframe(df: &DataFrame, value_column: &str) -> Result<Self> {
        let date_col = df
            .column("date")
            .map_err(|e| CacheError::Other(e.to_string()))?
            .date()
            .map_err(|e| CacheError::Other(e.to_string()))?;
        let value_col = df
            .column(value_column)
            .map_err(|e| CacheError::Other(e.to_string()))?
            .f64()
            .map_err(|e| CacheError::Other(e.to_string()))?;

        let mut dates = Vec::with_capacity(df.height());
        let mut values = Vec::with_capacity(df.height());
        for (day, value) in date_col.into_iter().zip(value_col.into_iter()) {
            let (Some(day), Some(value)) = (day, value) else {
                continue;
            };
            // Polars physical date is days since the Unix epoch (1970-01-01).
            let date = NaiveDate::from_num_days_from_ce_opt(day + 719_163)
                .ok_or_else(|| CacheError::Other("invalid polars date value".to_string()))?;
            dates.push(date);
            values.push(value);
        }

        Ok(Self::new(dates, values).with_name(value_column.to_string()))
    }

    /// Converts this frame into a two-column Polars `DataFrame` (`date`, and
    /// the frame's name or `"value"`).
    ///
    /// # Errors
    /// Returns [`CacheError::Other`] if the Polars columns cannot be built.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let column_name = self.name.clone().unwrap_or_else(|| "value".to_string());
        let date_strs: Vec<String> = self.dates.iter().map(ToString::to_string).collect();

        let df = DataFrame::new(vec![
            Column::new(PlSmallStr::from("date"), date_strs),
            Column::new(PlSmallStr::from(column_name), self.values.clone()),
        ])
        .map_err(|e| CacheError::Other(e.to_string()))?;

        df.lazy()
            .with_column(polars::prelude::col("date").cast(polars::prelude::DataType::Date))
            .collect()
            .map_err(|e| CacheError::Other(e.to_string()))
    }

    /// The `[first_date, last_date]` interval actually spanned by this frame's
    /// dates, or `None` if empty. `dates` is assumed sorted ascending.
    #[must_use]
    pub fn covered_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn byte_size_is_eight_bytes_per_value() {
        let frame = Frame::new(vec![d(2024, 1, 2), d(2024, 1, 3)], vec![1.0, 2.0]);
        assert_eq!(frame.byte_size(), 16);
    }

    #[test]
    fn empty_frame_has_zero_size() {
        assert!(Frame::empty().is_empty());
        assert_eq!(Frame::empty().byte_size(), 0);
    }

    #[test]
    fn dataframe_round_trip_preserves_values() {
        let frame = Frame::new(
            vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)],
            vec![1.5, 2.5, 3.5],
        )
        .with_name("close");
        let df = frame.to_dataframe().unwrap();
        let round_tripped = Frame::from_dataframe(&df, "close").unwrap();
        assert_eq!(round_tripped.dates, frame.dates);
        assert_eq!(round_tripped.values, frame.values);
    }
}
