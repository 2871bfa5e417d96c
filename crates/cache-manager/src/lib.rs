#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/security-cache/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! The coordinator built on [`cache`] and [`cache_core`].
//!
//! - [`Manager`]: resolves securities, expands metrics, fills cache gaps
//!   from an `EodFetcher`, and assembles results.
//! - [`refresh`]: the daily `DateIndex` refresh background task.
//! - [`fakes`]: in-memory `EodFetcher`/`TradingCalendar` implementations for
//!   tests and local development.

/// The `Manager` coordinator.
pub mod manager;
/// The daily `DateIndex` refresh background task.
pub mod refresh;
/// In-memory fetcher/calendar implementations for tests and local use.
pub mod fakes;

pub use manager::Manager;
