//! Security identity, metric enumeration, and cache keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The literal ticker/FIGI used for the cash sentinel security.
const CASH_LITERAL: &str = "$CASH";

/// A security identity.
///
/// Equality is by `composite_figi`; `ticker` is a display/lookup convenience only.
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
pub struct Security {
    /// Trading ticker, as last observed. Not part of identity.
    pub ticker: String,
    /// Composite FIGI, stable across ticker changes. Sole identity key.
    pub composite_figi: String,
}

impl Security {
    /// Creates a new security from a ticker and composite FIGI.
    #[must_use]
    pub fn new(ticker: impl Into<String>, composite_figi: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            composite_figi: composite_figi.into(),
        }
    }

    /// The distinguished cash sentinel. Never cached as a metric.
    #[must_use]
    pub fn cash() -> Self {
        Self::new(CASH_LITERAL, CASH_LITERAL)
    }

    /// True if this is the cash sentinel.
    #[must_use]
    pub fn is_cash(&self) -> bool {
        self.composite_figi == CASH_LITERAL
    }
}

impl PartialEq for Security {
    fn eq(&self, other: &Self) -> bool {
        self.composite_figi == other.composite_figi
    }
}

impl std::hash::Hash for Security {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.composite_figi.hash(state);
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ticker)
    }
}

/// A closed enumeration of cacheable security metrics.
///
/// `DividendCash` and `SplitFactor` are sparse: values exist only on event days
/// and are always stored with a local date index. All other metrics are dense
/// and indexed by offset into the shared [`DateIndex`](crate::DateIndex).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Opening price.
    Open,
    /// Highest price during the period.
    High,
    /// Lowest price during the period.
    Low,
    /// Closing price.
    Close,
    /// Trading volume.
    Volume,
    /// Split/dividend adjusted closing price.
    AdjustedClose,
    /// Cash dividend paid, sparse (event-day only).
    DividendCash,
    /// Split factor applied, sparse (event-day only).
    SplitFactor,
}

impl Metric {
    /// Returns the metric's name as used in cache key rendering.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::High => "High",
            Self::Low => "Low",
            Self::Close => "Close",
            Self::Volume => "Volume",
            Self::AdjustedClose => "AdjustedClose",
            Self::DividendCash => "DividendCash",
            Self::SplitFactor => "SplitFactor",
        }
    }

    /// True for metrics with values only on event days, which are always stored
    /// with their own local date index rather than offsets into the shared one.
    #[must_use]
    pub const fn is_sparse(&self) -> bool {
        matches!(self, Self::DividendCash | Self::SplitFactor)
    }

    /// True for the price-bar metrics (O/H/L/C/AdjClose) whose request implicitly
    /// warms `DividendCash` and `SplitFactor` in the manager. Volume is dense but
    /// not a price-bar metric for this purpose: it carries no adjustment semantics.
    #[must_use]
    pub const fn is_price_bar(&self) -> bool {
        matches!(
            self,
            Self::Open | Self::High | Self::Low | Self::Close | Self::AdjustedClose
        )
    }
}

/// A `(Security, Metric)` pair identifying one entry in the cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The security's composite FIGI (identity is by FIGI, see [`Security`]).
    pub composite_figi: String,
    /// The cached metric.
    pub metric: Metric,
}

impl CacheKey {
    /// Creates a cache key from a security and metric.
    #[must_use]
    pub fn new(security: &Security, metric: Metric) -> Self {
        Self {
            composite_figi: security.composite_figi.clone(),
            metric,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.composite_figi, self.metric.name())
    }
}
