//! The coordinator: consults the cache, asks the fetcher for gaps, and
//! inserts returned frames back into the cache before assembling the result.

use std::collections::HashMap;
use std::sync::Arc;

use cache::{DateIndex, SecurityMetricCache};
use cache_core::{
    CacheConfig, CacheError, CacheKey, EodFetcher, Frame, Metric, Result, Security, TradingCalendar,
};
use chrono::{Days, NaiveDate};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::refresh::epoch;

/// Expands a requested metric list with the implicit warm set: requesting
/// any price-bar metric also warms `DividendCash`/`SplitFactor` so downstream
/// adjustment logic has what it needs. The implicit metrics are never
/// returned to the caller.
fn expand_metrics(metrics: &[Metric]) -> Vec<Metric> {
    let mut expanded: Vec<Metric> = metrics.to_vec();
    if metrics.iter().any(Metric::is_price_bar) {
        if !expanded.contains(&Metric::DividendCash) {
            expanded.push(Metric::DividendCash);
        }
        if !expanded.contains(&Metric::SplitFactor) {
            expanded.push(Metric::SplitFactor);
        }
    }
    expanded
}

/// Drops a documented-but-unexplained row from a sparse metric's frame
/// before it's stored: the element at index 0 for `DividendCash`, the
/// element at index 1 for `SplitFactor`. Upstream is not
/// `std::convert::Into`, behavior preserved pending a known-semantics
/// source; flagged here as suspicious, not silently corrected.
fn normalize_sparse_frame(metric: Metric, frame: Frame) -> Frame {
    match metric {
        Metric::DividendCash => {
            if frame.dates.is_empty() {
                return Frame::empty();
            }
            Frame::new(frame.dates[1..].to_vec(), frame.values[1..].to_vec())
        }
        Metric::SplitFactor => {
            if frame.dates.len() <= 1 {
                return Frame::empty();
            }
            let mut dates = frame.dates;
            let mut values = frame.values;
            dates.remove(1);
            values.remove(1);
            Frame::new(dates, values)
        }
        _ => frame,
    }
}

/// The coordinator that sits in front of a [`SecurityMetricCache`],
/// consulting an [`EodFetcher`]/[`TradingCalendar`] pair to fill gaps.
///
/// Owns the shared `DateIndex` and the cache it backs; callers construct one
/// per process via [`Manager::connect`] and share it behind an `Arc`.
#[derive(Debug)]
pub struct Manager {
    cache: SecurityMetricCache,
    fetcher: Arc<dyn EodFetcher>,
    calendar: Arc<dyn TradingCalendar>,
    date_index: Arc<RwLock<DateIndex>>,
    config: CacheConfig,
    known_securities: RwLock<HashMap<String, Security>>,
}

impl Manager {
    /// Builds a manager: loads market holidays once, then performs the first
    /// `DateIndex` build from the epoch (1980-01-01) to today before returning.
    ///
    /// # Errors
    /// Returns whatever the calendar provider returns from
    /// `load_market_holidays`/`trading_days`.
    #[instrument(skip(fetcher, calendar, config))]
    pub async fn connect(
        fetcher: Arc<dyn EodFetcher>,
        calendar: Arc<dyn TradingCalendar>,
        config: CacheConfig,
    ) -> Result<Self> {
        calendar.load_market_holidays().await?;
        let today = chrono::Utc::now().date_naive();
        let days = calendar.trading_days(epoch(), today).await?;
        let date_index = Arc::new(RwLock::new(DateIndex::new(days)));
        let cache = SecurityMetricCache::new(config.metric_bytes, date_index.clone());

        Ok(Self {
            cache,
            fetcher,
            calendar,
            date_index,
            config,
            known_securities: RwLock::new(HashMap::new()),
        })
    }

    /// Registers a security so it can later be resolved by ticker or FIGI.
    /// `CASH` never needs registering: it is recognized directly.
    pub async fn register_security(&self, security: Security) {
        let mut known = self.known_securities.write().await;
        known.insert(security.composite_figi.clone(), security.clone());
        known.insert(security.ticker.clone(), security);
    }

    /// Resolves `identifier` to a canonical [`Security`], FIGI first, then
    /// ticker. `$CASH` is passed through directly.
    ///
    /// # Errors
    /// Returns [`CacheError::SecurityNotFound`] if `identifier` matches
    /// neither a registered FIGI nor a registered ticker.
    pub async fn resolve_security(&self, identifier: &str) -> Result<Security> {
        let cash = Security::cash();
        if identifier == cash.composite_figi {
            return Ok(cash);
        }
        self.known_securities
            .read()
            .await
            .get(identifier)
            .cloned()
            .ok_or_else(|| CacheError::SecurityNotFound(identifier.to_string()))
    }

    /// The handle to the shared `DateIndex`, for wiring a
    /// [`spawn_daily_refresh`](crate::refresh::spawn_daily_refresh) task.
    #[must_use]
    pub fn date_index(&self) -> Arc<RwLock<DateIndex>> {
        self.date_index.clone()
    }

    /// Fetches a set of `(security, metric)` pairs over `[begin, end]`,
    /// filling any cache gaps from the fetcher first.
    ///
    /// # Errors
    /// Returns [`CacheError::BeginAfterEnd`] if `begin > end`, or
    /// [`CacheError::SecurityNotFound`] surfaced from the fetch step.
    #[instrument(skip(self, securities, metrics))]
    pub async fn get_metrics(
        &self,
        securities: &[Security],
        metrics: &[Metric],
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<String, Frame>> {
        if begin > end {
            return Err(CacheError::BeginAfterEnd);
        }

        let expanded = expand_metrics(metrics);
        let priced: Vec<&Security> = securities.iter().filter(|s| !s.is_cash()).collect();

        let mut pull_securities: Vec<Security> = Vec::new();
        let mut pull_metrics: Vec<Metric> = Vec::new();
        for security in priced.iter().copied() {
            let mut security_has_gap = false;
            for &metric in &expanded {
                let (covered, _touching) = self.cache.check(security, metric, begin, end).await?;
                if !covered {
                    security_has_gap = true;
                    if !pull_metrics.contains(&metric) {
                        pull_metrics.push(metric);
                    }
                }
            }
            if security_has_gap {
                pull_securities.push(security.clone());
            }
        }

        let padded_end = pad_end(begin, end, self.config.min_request_duration);

        if !pull_securities.is_empty() {
            let trading_days = self.calendar.trading_days(begin, padded_end).await?;
            if trading_days.is_empty() {
                warn!(%begin, %padded_end, "calendar returned no trading days for the pull window");
            }

            let fetched = self
                .fetcher
                .get_eod(&pull_securities, &pull_metrics, begin, padded_end)
                .await?;

            for security in &pull_securities {
                for &metric in &pull_metrics {
                    let key = CacheKey::new(security, metric).to_string();
                    let Some(frame) = fetched.get(&key) else {
                        continue;
                    };
                    self.store_fetched_frame(security, metric, begin, padded_end, frame.clone())
                        .await?;
                }
            }
        }

        let mut result = HashMap::with_capacity(securities.len() * metrics.len());
        for security in securities {
            for &metric in metrics {
                let frame = if security.is_cash() {
                    Frame::empty()
                } else {
                    self.cache.get_partial(security, metric, begin, end).await
                };
                result.insert(format!("{}:{}", security.composite_figi, metric.name()), frame);
            }
        }
        Ok(result)
    }

    async fn store_fetched_frame(
        &self,
        security: &Security,
        metric: Metric,
        begin: NaiveDate,
        end: NaiveDate,
        frame: Frame,
    ) -> Result<()> {
        if metric.is_sparse() {
            let normalized = normalize_sparse_frame(metric, frame);
            if normalized.is_empty() {
                return Ok(());
            }
            self.cache
                .set_with_local_dates(security, metric, begin, end, normalized.dates, normalized.values)
                .await
        } else {
            if frame.is_empty() {
                return Ok(());
            }
            self.cache.set(security, metric, begin, end, frame).await
        }
    }

    /// Returns the most recent value at or before `date` for a single
    /// `(security, metric)` pair: cache-first, populating on a miss via
    /// [`Manager::get_metrics`], and finally falling back to the fetcher's
    /// direct `get_eod_on_or_before` if the cache still can't serve it.
    ///
    /// # Errors
    /// Returns [`CacheError::OutsideCoveredTime`] if neither the cache nor
    /// the fetcher has anything at or before `date`.
    #[instrument(skip(self))]
    pub async fn get_metric_on_or_before(
        &self,
        security: &Security,
        metric: Metric,
        date: NaiveDate,
    ) -> Result<(f64, NaiveDate)> {
        let lookback_begin = date
            .checked_sub_days(Days::new(self.config.min_request_duration.as_secs() / 86_400))
            .unwrap_or(date);

        if let Some(hit) = self.last_value_on_or_before(security, metric, lookback_begin, date).await {
            return Ok(hit);
        }

        debug!(%security, ?metric, %date, "on-or-before cache miss, populating");
        self.get_metrics(&[security.clone()], &[metric], lookback_begin, date)
            .await?;

        if let Some(hit) = self.last_value_on_or_before(security, metric, lookback_begin, date).await {
            return Ok(hit);
        }

        warn!(%security, ?metric, %date, "on-or-before falling back to direct fetcher call");
        self.fetcher.get_eod_on_or_before(security, metric, date).await
    }

    async fn last_value_on_or_before(
        &self,
        security: &Security,
        metric: Metric,
        begin: NaiveDate,
        date: NaiveDate,
    ) -> Option<(f64, NaiveDate)> {
        let frame = self.cache.get_partial(security, metric, begin, date).await;
        let last_date = *frame.dates.last()?;
        let last_value = *frame.values.last()?;
        Some((last_value, last_date))
    }

    /// Warms the cache for a full portfolio plan ahead of a strategy run.
    /// Each entry is one security and the metrics it needs over
    /// `[begin, end]`; results are discarded, errors are propagated.
    ///
    /// # Errors
    /// Returns the first error encountered from [`Manager::get_metrics`].
    #[instrument(skip(self, plan))]
    pub async fn preload_metrics(
        &self,
        plan: &[(Security, Vec<Metric>)],
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<()> {
        for (security, metrics) in plan {
            self.get_metrics(std::slice::from_ref(security), metrics, begin, end)
                .await?;
        }
        Ok(())
    }

    /// The underlying cache, for callers that need direct access (e.g. to
    /// read `size()`/`count()` for metrics/observability).
    #[must_use]
    pub fn cache(&self) -> &SecurityMetricCache {
        &self.cache
    }
}

fn pad_end(begin: NaiveDate, end: NaiveDate, min_request_duration: std::time::Duration) -> NaiveDate {
    let min_days = (min_request_duration.as_secs() / 86_400) as i64;
    let requested_days = (end - begin).num_days();
    if requested_days < min_days {
        begin
            .checked_add_days(Days::new(min_days as u64))
            .unwrap_or(end)
            .max(end)
    } else {
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{InMemoryCalendar, InMemoryFetcher};
    use std::time::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn trading_days() -> Vec<NaiveDate> {
        vec![
            d(2022, 8, 1),
            d(2022, 8, 2),
            d(2022, 8, 3),
            d(2022, 8, 4),
            d(2022, 8, 5),
            d(2022, 8, 8),
            d(2022, 8, 9),
        ]
    }

    fn test_config() -> CacheConfig {
        CacheConfig {
            metric_bytes: 1024,
            lru_size: 8,
            ttl: None,
            min_request_duration: Duration::from_secs(2 * 86_400),
        }
    }

    async fn connected_manager(fetcher: InMemoryFetcher) -> Manager {
        let calendar = Arc::new(InMemoryCalendar::new(trading_days()));
        Manager::connect(Arc::new(fetcher), calendar, test_config())
            .await
            .unwrap()
    }

    #[test]
    fn normalize_sparse_frame_drops_index_zero_for_dividend_cash() {
        let frame = Frame::new(vec![d(2022, 8, 3), d(2022, 8, 4), d(2022, 8, 5)], vec![0.0, 0.25, 0.50]);
        let normalized = normalize_sparse_frame(Metric::DividendCash, frame);
        assert_eq!(normalized.dates, vec![d(2022, 8, 4), d(2022, 8, 5)]);
        assert_eq!(normalized.values, vec![0.25, 0.50]);
    }

    #[test]
    fn normalize_sparse_frame_drops_only_index_one_for_split_factor() {
        let frame = Frame::new(vec![d(2022, 8, 3), d(2022, 8, 4), d(2022, 8, 5)], vec![1.0, 2.0, 3.0]);
        let normalized = normalize_sparse_frame(Metric::SplitFactor, frame);
        // Index 0 survives; only the element at index 1 is dropped.
        assert_eq!(normalized.dates, vec![d(2022, 8, 3), d(2022, 8, 5)]);
        assert_eq!(normalized.values, vec![1.0, 3.0]);
    }

    #[test]
    fn normalize_sparse_frame_leaves_dense_metrics_untouched() {
        let frame = Frame::new(vec![d(2022, 8, 3), d(2022, 8, 4)], vec![1.0, 2.0]);
        let normalized = normalize_sparse_frame(Metric::Close, frame.clone());
        assert_eq!(normalized, frame);
    }

    #[tokio::test]
    async fn get_metrics_fetches_a_gap_then_serves_from_cache_on_the_second_call() {
        let fetcher = InMemoryFetcher::new();
        let sec = Security::new("T", "T");
        fetcher
            .seed(
                &sec,
                Metric::Close,
                Frame::new(
                    vec![d(2022, 8, 3), d(2022, 8, 4), d(2022, 8, 5)],
                    vec![3.0, 4.0, 5.0],
                ),
            )
            .await;

        let manager = connected_manager(fetcher).await;
        let result = manager
            .get_metrics(&[sec.clone()], &[Metric::Close], d(2022, 8, 3), d(2022, 8, 5))
            .await
            .unwrap();

        let frame = result.get("T:Close").unwrap();
        assert_eq!(frame.values, vec![3.0, 4.0, 5.0]);
        assert_eq!(manager.cache().count().await, 1);
    }

    #[tokio::test]
    async fn price_bar_request_implicitly_warms_dividend_and_split_metrics() {
        let fetcher = InMemoryFetcher::new();
        let sec = Security::new("T", "T");
        fetcher
            .seed(
                &sec,
                Metric::Close,
                Frame::new(vec![d(2022, 8, 3), d(2022, 8, 4)], vec![1.0, 2.0]),
            )
            .await;
        fetcher
            .seed(
                &sec,
                Metric::DividendCash,
                // normalize_sparse_frame drops the leading row before storage;
                // seed an extra leading row inside the padded pull window so
                // one real event day survives the drop.
                Frame::new(
                    vec![d(2022, 8, 3), d(2022, 8, 4)],
                    vec![0.0, 0.25],
                ),
            )
            .await;

        let manager = connected_manager(fetcher).await;
        manager
            .get_metrics(&[sec.clone()], &[Metric::Close], d(2022, 8, 3), d(2022, 8, 4))
            .await
            .unwrap();

        assert_eq!(manager.cache().item_count(&sec, Metric::DividendCash).await, 1);
    }

    #[tokio::test]
    async fn cash_security_is_passed_through_with_an_empty_frame() {
        let fetcher = InMemoryFetcher::new();
        let manager = connected_manager(fetcher).await;
        let result = manager
            .get_metrics(&[Security::cash()], &[Metric::Close], d(2022, 8, 3), d(2022, 8, 4))
            .await
            .unwrap();
        assert!(result.get("$CASH:Close").unwrap().is_empty());
    }

    #[tokio::test]
    async fn unregistered_identifier_does_not_resolve() {
        let fetcher = InMemoryFetcher::new();
        let manager = connected_manager(fetcher).await;
        let err = manager.resolve_security("UNKNOWN").await.unwrap_err();
        assert!(matches!(err, CacheError::SecurityNotFound(_)));
    }

    #[tokio::test]
    async fn resolve_security_finds_a_registered_ticker_and_figi() {
        let fetcher = InMemoryFetcher::new();
        let manager = connected_manager(fetcher).await;
        manager.register_security(Security::new("AAPL", "BBG000B9XRY4")).await;

        assert_eq!(manager.resolve_security("AAPL").await.unwrap().composite_figi, "BBG000B9XRY4");
        assert_eq!(manager.resolve_security("BBG000B9XRY4").await.unwrap().ticker, "AAPL");
    }

    #[tokio::test]
    async fn get_metric_on_or_before_populates_the_cache_then_returns_the_latest_value() {
        let fetcher = InMemoryFetcher::new();
        let sec = Security::new("T", "T");
        fetcher
            .seed(
                &sec,
                Metric::Close,
                Frame::new(
                    vec![d(2022, 8, 3), d(2022, 8, 4), d(2022, 8, 5)],
                    vec![3.0, 4.0, 5.0],
                ),
            )
            .await;

        let manager = connected_manager(fetcher).await;
        let (value, for_date) = manager
            .get_metric_on_or_before(&sec, Metric::Close, d(2022, 8, 5))
            .await
            .unwrap();
        assert_eq!(value, 5.0);
        assert_eq!(for_date, d(2022, 8, 5));
    }

    #[tokio::test]
    async fn get_metric_on_or_before_falls_back_to_the_fetcher_when_the_cache_cannot_serve_it() {
        let fetcher = InMemoryFetcher::new();
        let sec = Security::new("T", "T");
        // Seeded far before the manager's lookback window, so get_metrics's
        // own pull will come back empty and the direct fallback must fire.
        fetcher
            .seed(&sec, Metric::Close, Frame::new(vec![d(2022, 8, 1)], vec![1.0]))
            .await;

        let manager = connected_manager(fetcher).await;
        let (value, for_date) = manager
            .get_metric_on_or_before(&sec, Metric::Close, d(2022, 8, 9))
            .await
            .unwrap();
        assert_eq!(value, 1.0);
        assert_eq!(for_date, d(2022, 8, 1));
    }

    #[tokio::test]
    async fn preload_metrics_warms_every_entry_in_the_plan() {
        let fetcher = InMemoryFetcher::new();
        let sec = Security::new("T", "T");
        fetcher
            .seed(
                &sec,
                Metric::Close,
                Frame::new(vec![d(2022, 8, 3), d(2022, 8, 4)], vec![1.0, 2.0]),
            )
            .await;

        let manager = connected_manager(fetcher).await;
        manager
            .preload_metrics(&[(sec.clone(), vec![Metric::Close])], d(2022, 8, 3), d(2022, 8, 4))
            .await
            .unwrap();

        assert_eq!(manager.cache().item_count(&sec, Metric::Close).await, 1);
    }
}
