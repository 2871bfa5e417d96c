//! In-memory `EodFetcher`/`TradingCalendar` implementations.
//!
//! Useful for local development and tests: seed an [`InMemoryFetcher`] with a
//! handful of frames and point a [`Manager`](crate::Manager) at it instead of
//! a real SQL-backed fetcher and calendar service.

use std::collections::HashMap;

use async_trait::async_trait;
use cache_core::{CacheError, CacheKey, EodFetcher, Frame, Metric, Result, Security, TradingCalendar};
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::trace;

/// A trading calendar backed by a fixed, pre-supplied vector of trading days.
#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    days: Vec<NaiveDate>,
}

impl InMemoryCalendar {
    /// Builds a calendar from an already-sorted, deduplicated vector of
    /// trading days.
    #[must_use]
    pub fn new(days: Vec<NaiveDate>) -> Self {
        Self { days }
    }
}

#[async_trait]
impl TradingCalendar for InMemoryCalendar {
    async fn trading_days(&self, begin: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        Ok(self
            .days
            .iter()
            .copied()
            .filter(|&d| d >= begin && d <= end)
            .collect())
    }

    async fn load_market_holidays(&self) -> Result<()> {
        trace!("InMemoryCalendar: load_market_holidays is a no-op");
        Ok(())
    }
}

/// An `EodFetcher` backed by a `RwLock`-protected map of pre-seeded frames,
/// keyed the same way [`CacheKey`] renders (`"{figi}:{metric}"`).
#[derive(Debug, Default)]
pub struct InMemoryFetcher {
    frames: RwLock<HashMap<String, Frame>>,
}

impl InMemoryFetcher {
    /// Creates an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one `(security, metric)`'s full history.
    pub async fn seed(&self, security: &Security, metric: Metric, frame: Frame) {
        self.frames
            .write()
            .await
            .insert(CacheKey::new(security, metric).to_string(), frame);
    }
}

#[async_trait]
impl EodFetcher for InMemoryFetcher {
    async fn get_eod(
        &self,
        securities: &[Security],
        metrics: &[Metric],
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<String, Frame>> {
        let frames = self.frames.read().await;
        let mut out = HashMap::new();
        for security in securities {
            for &metric in metrics {
                let key = CacheKey::new(security, metric).to_string();
                let Some(frame) = frames.get(&key) else {
                    continue;
                };
                let clipped = clip(frame, begin, end);
                if !clipped.is_empty() {
                    out.insert(key, clipped);
                }
            }
        }
        Ok(out)
    }

    async fn get_eod_on_or_before(
        &self,
        security: &Security,
        metric: Metric,
        date: NaiveDate,
    ) -> Result<(f64, NaiveDate)> {
        let frames = self.frames.read().await;
        let key = CacheKey::new(security, metric).to_string();
        let frame = frames.get(&key).ok_or_else(|| CacheError::OutsideCoveredTime {
            symbol: security.ticker.clone(),
            date,
        })?;

        let idx = frame.dates.partition_point(|&d| d <= date);
        if idx == 0 {
            return Err(CacheError::OutsideCoveredTime {
                symbol: security.ticker.clone(),
                date,
            });
        }
        Ok((frame.values[idx - 1], frame.dates[idx - 1]))
    }
}

fn clip(frame: &Frame, begin: NaiveDate, end: NaiveDate) -> Frame {
    let mut dates = Vec::new();
    let mut values = Vec::new();
    for (&date, &value) in frame.dates.iter().zip(frame.values.iter()) {
        if date >= begin && date <= end {
            dates.push(date);
            values.push(value);
        }
    }
    Frame::new(dates, values)
}
