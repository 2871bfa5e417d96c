//! Error types for the security-metric cache.
//!
//! This module defines [`CacheError`], the closed taxonomy of errors that can occur
//! across the cache engine, the manager, and the external fetcher/calendar contracts.

use thiserror::Error;

/// Errors that can occur during cache and manager operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// `begin > end`, or an [`Interval`](crate::interval::Interval) failed validation.
    #[error("invalid time range: begin {begin} is after end {end}")]
    InvalidTimeRange {
        /// The requested (or constructed) range start.
        begin: chrono::NaiveDate,
        /// The requested (or constructed) range end.
        end: chrono::NaiveDate,
    },

    /// Manager-layer alias for [`CacheError::InvalidTimeRange`], surfaced to callers
    /// of request-level APIs that use caller-facing vocabulary rather than
    /// cache-internal vocabulary.
    #[error("begin is after end")]
    BeginAfterEnd,

    /// `get` found no single item covering the requested range.
    #[error("no cached item covers {key} for {begin}..={end}")]
    RangeDoesNotExist {
        /// The cache key that was queried.
        key: String,
        /// Start of the requested range.
        begin: chrono::NaiveDate,
        /// End of the requested range.
        end: chrono::NaiveDate,
    },

    /// `set` was called with an empty frame.
    #[error("set called with no data for {0}")]
    NoData(String),

    /// The input frame alone exceeds `max_bytes`; no partial admission is performed.
    #[error("frame of {bytes} bytes exceeds cache capacity of {max_bytes} bytes for {key}")]
    DataLargerThanCache {
        /// The cache key being inserted.
        key: String,
        /// Size in bytes of the rejected frame.
        bytes: u64,
        /// The cache's configured byte budget.
        max_bytes: u64,
    },

    /// `set_with_local_dates` was called with mismatched `dates`/`values` lengths.
    #[error("date length {dates} does not match value length {values} for {key}")]
    DateLengthDoesNotMatch {
        /// The cache key being inserted.
        key: String,
        /// Length of the supplied date vector.
        dates: usize,
        /// Length of the supplied value vector.
        values: usize,
    },

    /// The manager could not resolve a security by FIGI or ticker.
    #[error("security not found: {0}")]
    SecurityNotFound(String),

    /// The calendar provider returned no trading days for the requested window.
    #[error("no trading days in requested window")]
    NoTradingDays,

    /// The fetcher was asked for a metric it does not implement.
    #[error("unsupported metric: {0:?}")]
    UnsupportedMetric(crate::security::Metric),

    /// `get_metric_on_or_before` was asked for a date before anything the fetcher
    /// or cache has ever covered.
    #[error("{symbol} has no value at or before {date}")]
    OutsideCoveredTime {
        /// The symbol that was queried.
        symbol: String,
        /// The requested as-of date.
        date: chrono::NaiveDate,
    },

    /// A manager-layer request expected exactly one security/metric pair and got
    /// zero or more than one.
    #[error("expected a single security/metric pair, got {0}")]
    Single(usize),

    /// A manager-layer request does not support multiple securities or metrics
    /// for this operation.
    #[error("multiple securities/metrics are not supported for this operation")]
    MultipleNotSupported,

    /// Transient I/O failure from the fetcher or calendar provider. Never cached.
    #[error("I/O error: {0}")]
    Io(String),

    /// Any other error, surfaced unmodified from a collaborator.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`CacheError`].
pub type Result<T> = std::result::Result<T, CacheError>;
