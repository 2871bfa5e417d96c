//! Configuration for the cache engine and manager.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default byte budget for the [`SecurityMetricCache`](https://docs.rs/cache):
/// 10 MiB.
pub const DEFAULT_METRIC_BYTES: u64 = 10 * 1024 * 1024;

/// Default entry capacity of the secondary blob LRU.
pub const DEFAULT_LRU_SIZE: usize = 32;

/// Default minimum request duration used to pad short date ranges: 366 days.
pub const DEFAULT_MIN_REQUEST_DURATION_DAYS: i64 = 366;

/// Cache-wide configuration, deserializable from application config under a
/// `cache`/`database` namespace.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `cache.metric_bytes`: byte budget for the `SecurityMetricCache`.
    pub metric_bytes: u64,
    /// `cache.lru_size`: entry capacity of the blob LRU.
    pub lru_size: usize,
    /// `cache.ttl`: optional expiry for blob LRU entries.
    #[serde(with = "duration_opt_secs")]
    pub ttl: Option<Duration>,
    /// `database.min_request_duration`: minimum padded range width the
    /// manager requests from the fetcher, amortizing fetch cost over future
    /// small queries.
    #[serde(with = "duration_secs")]
    pub min_request_duration: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            metric_bytes: DEFAULT_METRIC_BYTES,
            lru_size: DEFAULT_LRU_SIZE,
            ttl: None,
            min_request_duration: Duration::from_secs(
                DEFAULT_MIN_REQUEST_DURATION_DAYS as u64 * 86_400,
            ),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(de)?))
    }
}

mod duration_opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => ser.serialize_some(&d.as_secs()),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(de)?.map(Duration::from_secs))
    }
}
