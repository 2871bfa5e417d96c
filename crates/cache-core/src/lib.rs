#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/security-cache/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and contracts for the security-metric time-series cache.
//!
//! This crate provides the foundational abstractions shared by [`cache`] (the
//! engine) and `cache-manager` (the coordinator):
//!
//! - [`Security`], [`Metric`], [`CacheKey`]: the cache's identity model
//! - [`Interval`]: inclusive date ranges and their predicates
//! - [`Frame`]: the parallel dates/values currency exchanged at the boundary
//! - [`Frequency`]: period-boundary filtering over a dense day vector
//! - [`EodFetcher`], [`TradingCalendar`]: external collaborator contracts
//! - [`CacheConfig`]: size budgets and padding defaults

/// Cache-wide configuration (byte budgets, LRU sizes, padding defaults).
pub mod config;
/// The closed error taxonomy for cache and manager operations.
pub mod error;
/// The `Frame` data currency and its Polars conversion helpers.
pub mod frame;
/// Period-boundary frequency filtering.
pub mod frequency;
/// External fetcher/calendar provider contracts.
pub mod provider;
/// Security identity, metric enumeration, and cache keys.
pub mod security;

pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use frame::Frame;
pub use frequency::Frequency;

/// Inclusive date intervals and their predicates.
pub mod interval;
pub use interval::Interval;
pub use provider::{EodFetcher, TradingCalendar};
pub use security::{CacheKey, Metric, Security};
