//! Orchestration-level scenarios: metric expansion, security resolution,
//! range padding, sparse-metric normalization, and the on-or-before fallback
//! chain. Cache-layer interval algebra (merge/defrag/eviction) has its own
//! coverage in `cache`'s unit tests; these exercise the `Manager` that sits
//! in front of it.

use std::sync::Arc;
use std::time::Duration;

use cache_core::{CacheConfig, CacheError, Frame, Metric, Security};
use cache_manager::fakes::{InMemoryCalendar, InMemoryFetcher};
use cache_manager::Manager;
use chrono::NaiveDate;

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

fn config(min_request_days: u64) -> CacheConfig {
    CacheConfig {
        metric_bytes: 1024,
        lru_size: 8,
        ttl: None,
        min_request_duration: Duration::from_secs(min_request_days * 86_400),
    }
}

async fn manager(fetcher: InMemoryFetcher, min_request_days: u64) -> Manager {
    let calendar = Arc::new(InMemoryCalendar::new(trading_days()));
    Manager::connect(Arc::new(fetcher), calendar, config(min_request_days))
        .await
        .unwrap()
}

#[tokio::test]
async fn scenario_1_partial_window_served_through_the_manager() {
    let fetcher = InMemoryFetcher::new();
    let sec = Security::new("T", "T");
    fetcher
        .seed(
            &sec,
            Metric::AdjustedClose,
            Frame::new(
                vec![
                    d(2022, 8, 3),
                    d(2022, 8, 4),
                    d(2022, 8, 5),
                    d(2022, 8, 8),
                    d(2022, 8, 9),
                ],
                vec![0.0, 1.0, 2.0, 3.0, 4.0],
            ),
        )
        .await;

    let manager = manager(fetcher, 0).await;
    let result = manager
        .get_metrics(&[sec], &[Metric::AdjustedClose], d(2022, 8, 4), d(2022, 8, 8))
        .await
        .unwrap();

    let frame = result.get("T:AdjustedClose").unwrap();
    assert_eq!(frame.values, vec![1.0, 2.0, 3.0]);
    assert_eq!(frame.dates, vec![d(2022, 8, 4), d(2022, 8, 5), d(2022, 8, 8)]);
}

#[tokio::test]
async fn scenario_4_two_fetches_defragment_into_one_item_behind_the_manager() {
    let fetcher = InMemoryFetcher::new();
    let sec = Security::new("T", "T");
    // One fetcher holding the whole history; each get_metrics call below
    // only pulls (and the cache only stores) the sub-window it was asked
    // for, so the two calls exercise two separate inserts under one key.
    fetcher
        .seed(
            &sec,
            Metric::AdjustedClose,
            Frame::new(
                vec![
                    d(2022, 8, 3),
                    d(2022, 8, 4),
                    d(2022, 8, 5),
                    d(2022, 8, 8),
                    d(2022, 8, 9),
                ],
                vec![3.0, 4.0, 5.0, 8.0, 9.0],
            ),
        )
        .await;

    let manager = manager(fetcher, 0).await;
    manager
        .get_metrics(&[sec.clone()], &[Metric::AdjustedClose], d(2022, 8, 3), d(2022, 8, 5))
        .await
        .unwrap();
    manager
        .get_metrics(&[sec.clone()], &[Metric::AdjustedClose], d(2022, 8, 8), d(2022, 8, 9))
        .await
        .unwrap();

    assert_eq!(manager.cache().item_count(&sec, Metric::AdjustedClose).await, 1);
    let frame = manager
        .cache()
        .get(&sec, Metric::AdjustedClose, d(2022, 8, 3), d(2022, 8, 9))
        .await
        .unwrap();
    assert_eq!(frame.values, vec![3.0, 4.0, 5.0, 8.0, 9.0]);
}

#[tokio::test]
async fn price_bar_request_warms_dividend_and_split_but_only_returns_the_requested_metric() {
    let fetcher = InMemoryFetcher::new();
    let sec = Security::new("T", "T");
    fetcher
        .seed(
            &sec,
            Metric::Close,
            Frame::new(vec![d(2022, 8, 3), d(2022, 8, 4)], vec![10.0, 11.0]),
        )
        .await;
    fetcher
        .seed(
            &sec,
            Metric::DividendCash,
            Frame::new(vec![d(2022, 8, 3), d(2022, 8, 4)], vec![0.0, 0.25]),
        )
        .await;

    let manager = manager(fetcher, 0).await;
    let result = manager
        .get_metrics(&[sec.clone()], &[Metric::Close], d(2022, 8, 3), d(2022, 8, 4))
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert!(result.contains_key("T:Close"));
    assert_eq!(manager.cache().item_count(&sec, Metric::DividendCash).await, 1);
}

#[tokio::test]
async fn split_factor_warming_drops_only_index_one_of_the_fetched_frame() {
    let fetcher = InMemoryFetcher::new();
    let sec = Security::new("T", "T");
    fetcher
        .seed(
            &sec,
            Metric::Close,
            Frame::new(
                vec![d(2022, 8, 3), d(2022, 8, 4), d(2022, 8, 5)],
                vec![10.0, 11.0, 12.0],
            ),
        )
        .await;
    fetcher
        .seed(
            &sec,
            Metric::SplitFactor,
            Frame::new(
                vec![d(2022, 8, 3), d(2022, 8, 4), d(2022, 8, 5)],
                vec![1.0, 2.0, 3.0],
            ),
        )
        .await;

    let manager = manager(fetcher, 0).await;
    manager
        .get_metrics(&[sec.clone()], &[Metric::Close], d(2022, 8, 3), d(2022, 8, 5))
        .await
        .unwrap();

    // Index 1 (08-04, value 2.0) is dropped; 08-03 and 08-05 survive.
    let frame = manager
        .cache()
        .get(&sec, Metric::SplitFactor, d(2022, 8, 3), d(2022, 8, 5))
        .await
        .unwrap();
    assert_eq!(frame.dates, vec![d(2022, 8, 3), d(2022, 8, 5)]);
    assert_eq!(frame.values, vec![1.0, 3.0]);
}

#[tokio::test]
async fn range_padding_extends_a_short_window_to_the_minimum_request_duration() {
    let fetcher = InMemoryFetcher::new();
    let sec = Security::new("T", "T");
    fetcher
        .seed(
            &sec,
            Metric::Close,
            Frame::new(
                vec![d(2022, 8, 3), d(2022, 8, 4), d(2022, 8, 5)],
                vec![1.0, 2.0, 3.0],
            ),
        )
        .await;

    // Minimum request duration of 5 days should pad a 1-day request so the
    // fetcher is asked for the full [08-03, 08-08] window, pulling 08-04 and
    // 08-05 into the cache alongside the single requested day.
    let manager = manager(fetcher, 5).await;
    manager
        .get_metrics(&[sec.clone()], &[Metric::Close], d(2022, 8, 3), d(2022, 8, 3))
        .await
        .unwrap();

    let frame = manager.cache().get(&sec, Metric::Close, d(2022, 8, 3), d(2022, 8, 5)).await;
    assert!(frame.is_ok(), "padded pull should have covered through 08-05");
}

#[tokio::test]
async fn cash_security_never_touches_the_fetcher_or_the_cache() {
    let fetcher = InMemoryFetcher::new();
    let manager = manager(fetcher, 0).await;

    let result = manager
        .get_metrics(&[Security::cash()], &[Metric::Close], d(2022, 8, 3), d(2022, 8, 4))
        .await
        .unwrap();
    assert!(result.get("$CASH:Close").unwrap().is_empty());
    assert_eq!(manager.cache().count().await, 0);
}

#[tokio::test]
async fn unknown_identifier_resolution_fails_with_security_not_found() {
    let manager = manager(InMemoryFetcher::new(), 0).await;
    let err = manager.resolve_security("NOPE").await.unwrap_err();
    assert!(matches!(err, CacheError::SecurityNotFound(id) if id == "NOPE"));
}

#[tokio::test]
async fn ticker_and_figi_both_resolve_once_a_security_is_registered() {
    let manager = manager(InMemoryFetcher::new(), 0).await;
    manager
        .register_security(Security::new("MSFT", "BBG000BPH459"))
        .await;

    let by_ticker = manager.resolve_security("MSFT").await.unwrap();
    let by_figi = manager.resolve_security("BBG000BPH459").await.unwrap();
    assert_eq!(by_ticker, by_figi);
}

#[tokio::test]
async fn on_or_before_fallback_chain_reaches_the_fetcher_directly_on_cache_miss() {
    let fetcher = InMemoryFetcher::new();
    let sec = Security::new("T", "T");
    // Seeded a day the manager's short lookback window will not pull, so the
    // cache stays empty and the direct fetcher fallback must answer.
    fetcher
        .seed(&sec, Metric::Close, Frame::new(vec![d(2022, 8, 1)], vec![42.0]))
        .await;

    let manager = manager(fetcher, 1).await;
    let (value, for_date) = manager
        .get_metric_on_or_before(&sec, Metric::Close, d(2022, 8, 9))
        .await
        .unwrap();
    assert_eq!(value, 42.0);
    assert_eq!(for_date, d(2022, 8, 1));
}

#[tokio::test]
async fn preload_metrics_warms_a_multi_security_plan() {
    let fetcher = InMemoryFetcher::new();
    let a = Security::new("A", "FIGI-A");
    let b = Security::new("B", "FIGI-B");
    fetcher
        .seed(&a, Metric::Close, Frame::new(vec![d(2022, 8, 3)], vec![1.0]))
        .await;
    fetcher
        .seed(&b, Metric::Open, Frame::new(vec![d(2022, 8, 3)], vec![2.0]))
        .await;

    let manager = manager(fetcher, 0).await;
    manager
        .preload_metrics(
            &[(a.clone(), vec![Metric::Close]), (b.clone(), vec![Metric::Open])],
            d(2022, 8, 3),
            d(2022, 8, 3),
        )
        .await
        .unwrap();

    assert_eq!(manager.cache().item_count(&a, Metric::Close).await, 1);
    assert_eq!(manager.cache().item_count(&b, Metric::Open).await, 1);
}
