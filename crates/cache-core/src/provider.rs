//! Contracts for the external collaborators the manager consults.
//!
//! These traits are deliberately thin: no concrete SQL-backed fetcher,
//! Tiingo/FRED HTTP client, or trading-day calendar provider lives in this
//! crate. Only the shape of the contract lives here, split between base
//! metadata and capability-specific fetch methods.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt::Debug;

use crate::error::Result;
use crate::frame::Frame;
use crate::security::{Metric, Security};

/// Fetches end-of-day data from the database-backed source of record.
///
/// Implementations are expected to surface transient failures (network,
/// timeout) as [`crate::error::CacheError::Io`] and to represent "no data for
/// this (security, metric)" as an absent key in the returned map, never as
/// an error. The manager relies on this to distinguish "ask again later"
/// from "this security/metric genuinely has nothing here."
#[async_trait]
pub trait EodFetcher: Send + Sync + Debug {
    /// Fetches one frame per realized `(security, metric)` pair present in the
    /// underlying database, for securities and metrics that actually had data
    /// in `[begin, end]`. Missing pairs are simply absent from the map.
    ///
    /// Frames for dense metrics are indexed on trading days; for
    /// `DividendCash`/`SplitFactor` the frame carries the event-day local index.
    async fn get_eod(
        &self,
        securities: &[Security],
        metrics: &[Metric],
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<String, Frame>>;

    /// Fetches the most recent value at or before `date` for a single
    /// `(security, metric)` pair, used by the manager's direct fallback path
    /// when the cache cannot be warmed in time.
    async fn get_eod_on_or_before(
        &self,
        security: &Security,
        metric: Metric,
        date: NaiveDate,
    ) -> Result<(f64, NaiveDate)>;
}

/// Provides the trading-day calendar backing the shared
/// [`DateIndex`](https://docs.rs/cache).
#[async_trait]
pub trait TradingCalendar: Send + Sync + Debug {
    /// Returns the inclusive, ascending vector of trading days in
    /// `[begin, end]`, excluding weekends and holidays.
    async fn trading_days(&self, begin: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>>;

    /// Eagerly loads market holidays. Called once on manager construction so
    /// that subsequent `trading_days` calls do not pay for holiday-table I/O.
    async fn load_market_holidays(&self) -> Result<()>;
}
