//! The daily `DateIndex` refresh background task.

use std::sync::Arc;
use std::time::Duration;

use cache::DateIndex;
use cache_core::{Result, TradingCalendar};
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{error, info, instrument};

/// The epoch the master date index is built from: every market-open day
/// since 1980-01-01 is in scope.
#[must_use]
pub fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1980, 1, 1).expect("1980-01-01 is a valid date")
}

/// Rebuilds the shared `DateIndex` wholesale from `epoch` through today and
/// swaps it in under the write lock. Live `CacheItem`s are unaffected: they
/// carry their own `covered_period` and only re-resolve `start_idx` the next
/// time they're touched by an insert.
///
/// # Errors
/// Returns whatever the calendar provider returns, unmodified.
#[instrument(skip(date_index, calendar))]
pub async fn refresh_once(
    date_index: &RwLock<DateIndex>,
    calendar: &dyn TradingCalendar,
    epoch: NaiveDate,
) -> Result<()> {
    let today = chrono::Utc::now().date_naive();
    let days = calendar.trading_days(epoch, today).await?;
    let len = days.len();
    *date_index.write().await = DateIndex::new(days);
    info!(days = len, "refreshed DateIndex");
    Ok(())
}

/// Spawns the cooperative task that keeps the shared `DateIndex` current,
/// rebuilding it once per `interval` (daily, in production). The task runs
/// until its `JoinHandle` is dropped or aborted.
pub fn spawn_daily_refresh(
    date_index: Arc<RwLock<DateIndex>>,
    calendar: Arc<dyn TradingCalendar>,
    epoch: NaiveDate,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = refresh_once(&date_index, calendar.as_ref(), epoch).await {
                error!(%err, "daily DateIndex refresh failed, keeping the previous index");
            }
        }
    })
}
