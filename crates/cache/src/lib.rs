#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/security-cache/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! The cache engine built on [`cache_core`]'s types.
//!
//! - [`DateIndex`]: the shared master vector of trading days.
//! - [`CacheItem`]: a single contiguous run of cached values.
//! - [`SecurityMetricCache`]: the keyed, byte-budgeted, LRU-evicting store.
//! - [`BlobLru`]: a small independent entry-count LRU for opaque artifacts.

/// The shared master sequence of trading days.
pub mod date_index;
/// The per-key unit of storage.
pub mod item;
mod list_ops;
/// A small independent entry-count LRU for opaque byte blobs.
pub mod blob_lru;
/// The keyed, byte-budgeted, LRU-evicting cache engine.
pub mod security_metric_cache;

pub use blob_lru::BlobLru;
pub use date_index::DateIndex;
pub use item::CacheItem;
pub use security_metric_cache::SecurityMetricCache;
