//! Geocell and time-bucket keys.
//!
//! Two lookups that round to the same geocell and the same time bucket share a
//! cache entry and an in-flight fetch. This is the deduplication boundary, not
//! an accuracy boundary.

use crate::config::{EngineConfig, MAX_GEOCELL_PRECISION};
use crate::types::coordinate::Coordinate;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

const KEY_PREFIX: &str = "forecast";

/// Cache key for a forecast document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    precision: u8,
    lat_cell: i64,
    lon_cell: i64,
    bucket_start: i64,
}

impl CacheKey {
    /// Unix timestamp (seconds) at which this key's time bucket starts.
    pub fn bucket_start(&self) -> i64 {
        self.bucket_start
    }

    /// Store key string, e.g. `forecast:p2:4000:-10500:1717243200`.
    pub fn as_store_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:p{}:{}:{}:{}",
            KEY_PREFIX, self.precision, self.lat_cell, self.lon_cell, self.bucket_start
        )
    }
}

/// Turns coordinates and times into [`CacheKey`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeocellIndexer {
    precision: u8,
    bucket_width_secs: i64,
}

impl GeocellIndexer {
    /// `precision` is clamped to six digits and `bucket_width` to at least one
    /// second.
    pub fn new(precision: u8, bucket_width: Duration) -> Self {
        Self {
            precision: precision.min(MAX_GEOCELL_PRECISION),
            bucket_width_secs: bucket_width.as_secs().max(1) as i64,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.geocell_precision, config.time_bucket_width)
    }

    pub fn key(&self, coordinate: &Coordinate, time: DateTime<Utc>) -> CacheKey {
        CacheKey {
            precision: self.precision,
            lat_cell: self.cell(coordinate.latitude_e6()),
            lon_cell: self.cell(coordinate.longitude_e6()),
            bucket_start: self.bucket(time),
        }
    }

    /// Rounds half away from zero on the microdegree value.
    fn cell(&self, microdegrees: i32) -> i64 {
        let divisor = 10_i64.pow(u32::from(MAX_GEOCELL_PRECISION - self.precision));
        let value = i64::from(microdegrees);
        let half = divisor / 2;
        if divisor == 1 {
            value
        } else if value >= 0 {
            (value + half) / divisor
        } else {
            (value - half) / divisor
        }
    }

    fn bucket(&self, time: DateTime<Utc>) -> i64 {
        time.timestamp().div_euclid(self.bucket_width_secs) * self.bucket_width_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_same_cell_and_bucket_share_key() {
        let indexer = GeocellIndexer::new(2, Duration::from_secs(3600));
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 12, 5, 0).unwrap();
        let t_later = Utc.with_ymd_and_hms(2025, 6, 1, 12, 55, 0).unwrap();

        let a = indexer.key(&c(40.001, -105.004), t);
        let b = indexer.key(&c(39.996, -104.995), t_later);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "forecast:p2:4000:-10500:1748779200");
    }

    #[test]
    fn test_neighbouring_cell_or_bucket_differs() {
        let indexer = GeocellIndexer::new(2, Duration::from_secs(3600));
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 12, 59, 59).unwrap();
        let next_hour = Utc.with_ymd_and_hms(2025, 6, 1, 13, 0, 0).unwrap();

        let base = indexer.key(&c(40.0, -105.0), t);
        assert_ne!(base, indexer.key(&c(40.006, -105.0), t));
        assert_ne!(base, indexer.key(&c(40.0, -105.0), next_hour));
    }

    #[test]
    fn test_rounding_is_symmetric_around_zero() {
        let indexer = GeocellIndexer::new(1, Duration::from_secs(60));
        assert_eq!(indexer.cell(150_000), 2);
        assert_eq!(indexer.cell(-150_000), -2);
        assert_eq!(indexer.cell(-140_000), -1);

        let fine = GeocellIndexer::new(6, Duration::from_secs(60));
        assert_eq!(fine.cell(-1), -1);
    }

    #[test]
    fn test_buckets_before_epoch_floor() {
        let indexer = GeocellIndexer::new(2, Duration::from_secs(3600));
        let t = Utc.timestamp_opt(-1, 0).unwrap();
        assert_eq!(indexer.bucket(t), -3600);
    }
}
